use std::sync::Arc;

use obr_rs::repository::*;
use obr_rs::relationship_resolver::*;
use obr_rs_test_utils::*;

fn init() {
	let _ = env_logger::builder().is_test(true).try_init();
}

fn app(requirements: impl IntoIterator<Item = Requirement>) -> Arc<Resource> {
	Arc::new(bundle("app", "1.0").unwrap().requirements(requirements).build())
}

fn ids(resources: &[Arc<Resource>]) -> Vec<String> {
	resources.iter().map(|r| r.identity().unwrap().to_string()).collect()
}

fn foo_repository() -> Arc<Repository> {
	Repository::with_resources("remote", Locality::Remote, [
		library("foo", "1.0").unwrap().build(),
		library("foo", "2.0").unwrap().build(),
	])
}

fn resolver(repositories: impl IntoIterator<Item = Arc<Repository>>) -> Resolver {
	ResolverBuilder::new().repositories(repositories).build()
}

#[test]
fn picks_highest_version() {
	init();
	let resolver = resolver([foo_repository()]);
	let app = app([package_requirement("foo", "1.0").unwrap()]);
	resolver.add(app.clone());

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	let required = resolver.required_resources().unwrap();
	assert_eq!(ids(&required), ["foo@2.0.0"]);
	assert!(resolver.optional_resources().unwrap().is_empty());
	assert!(resolver.unsatisfied_requirements().unwrap().is_empty());

	let reasons = resolver.reason(&required[0]).unwrap().unwrap();
	assert_eq!(reasons.len(), 1);
	assert_eq!(reasons[0].resource, app);
}

#[test]
fn missing_provider_is_unsatisfied() {
	init();
	let resolver = resolver([foo_repository()]);
	let requirement = package_requirement("bar", "1.0").unwrap();
	let app = app([requirement.clone()]);
	resolver.add(app.clone());

	assert!(!resolver.resolve(ResolveFlags::empty()).unwrap());
	assert_eq!(resolver.unsatisfied_requirements().unwrap(), [Reason::new(app, requirement)]);
	assert!(resolver.required_resources().unwrap().is_empty());
}

#[test]
fn missing_optional_provider_is_fine() {
	init();
	let resolver = resolver([foo_repository()]);
	resolver.add(app([package_requirement("baz", "1.0").unwrap().optional(true)]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert!(resolver.unsatisfied_requirements().unwrap().is_empty());
	assert!(resolver.optional_resources().unwrap().is_empty());
}

#[test]
fn optional_resources_are_separate() {
	init();
	let remote = foo_repository();
	remote.add_resource(library("baz", "1.0").unwrap().build());
	let resolver = resolver([remote]);
	resolver.add(app([
		package_requirement("foo", "1.0").unwrap(),
		package_requirement("baz", "1.0").unwrap().optional(true),
	]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["foo@2.0.0"]);
	assert_eq!(ids(&resolver.optional_resources().unwrap()), ["baz@1.0.0"]);

	assert!(resolver.resolve(ResolveFlags::NO_OPTIONAL_RESOURCES).unwrap());
	assert!(resolver.optional_resources().unwrap().is_empty());
}

#[test]
fn mandatory_path_promotes_optional() {
	init();
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("shared", "1.0").unwrap().build(),
		library("tool", "1.0").unwrap().requirement(package_requirement("shared", "1.0").unwrap()).build(),
	]);
	let resolver = resolver([remote]);
	resolver.add(app([
		package_requirement("shared", "1.0").unwrap().optional(true),
		package_requirement("tool", "1.0").unwrap(),
	]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	let mut required = ids(&resolver.required_resources().unwrap());
	required.sort();
	assert_eq!(required, ["shared@1.0.0", "tool@1.0.0"]);
	assert!(resolver.optional_resources().unwrap().is_empty());
}

#[test]
fn promotion_leaves_dependencies_optional() {
	init();
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("qux", "1.0").unwrap().build(),
		library("baz", "1.0").unwrap().requirement(package_requirement("qux", "1.0").unwrap()).build(),
	]);
	let resolver = resolver([remote]);
	resolver.add(app([
		package_requirement("baz", "1.0").unwrap().optional(true),
		package_requirement("baz", "0.5").unwrap(),
	]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["baz@1.0.0"]);
	assert_eq!(ids(&resolver.optional_resources().unwrap()), ["qux@1.0.0"]);
}

#[test]
fn falls_back_to_next_candidate() {
	init();
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("lib", "1.0").unwrap().build(),
		library("lib", "2.0").unwrap().requirement(package_requirement("missing", "1.0").unwrap()).build(),
	]);
	let resolver = resolver([remote]);
	resolver.add(app([package_requirement("lib", "1.0").unwrap()]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["lib@1.0.0"]);
}

#[test]
fn cycle_terminates() {
	init();
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("a", "1.0").unwrap().requirement(package_requirement("b", "1.0").unwrap()).build(),
		library("b", "1.0").unwrap().requirement(package_requirement("a", "1.0").unwrap()).build(),
	]);
	let resolver = resolver([remote]);
	resolver.add(app([package_requirement("a", "1.0").unwrap()]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	let mut required = ids(&resolver.required_resources().unwrap());
	required.sort();
	assert_eq!(required, ["a@1.0.0", "b@1.0.0"]);
}

#[test]
fn added_resources_satisfy_requirements() {
	init();
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("plugin", "1.0").unwrap().requirement(package_requirement("host", "1.0").unwrap()).build(),
	]);
	let resolver = resolver([remote]);
	let host = Arc::new(library("host", "1.0").unwrap().requirement(package_requirement("plugin", "1.0").unwrap()).build());
	resolver.add(host);

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["plugin@1.0.0"]);
}

/* Revisits are optimistic: `y` was selected through a cycle with `x` before `x` failed */
#[test]
fn cycle_partner_of_failed_resource_stays_selected() {
	init();
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("x", "1.0").unwrap()
			.requirement(package_requirement("y", "1.0").unwrap())
			.requirement(package_requirement("missing", "1.0").unwrap())
			.build(),
		library("y", "1.0").unwrap().requirement(package_requirement("x", "1.0").unwrap()).build(),
	]);
	let resolver = resolver([remote]);
	resolver.add(app([package_requirement("x", "1.0").unwrap()]));

	assert!(!resolver.resolve(ResolveFlags::empty()).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["y@1.0.0"]);
	assert_eq!(resolver.unsatisfied_requirements().unwrap().len(), 2);
}

fn local_and_remote() -> (Arc<Repository>, Arc<Repository>) {
	let local = Repository::with_resources("local", Locality::Local, [
		library("lib", "1.0").unwrap().installed_as(DeploymentHandle(1)).build(),
	]);
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("lib", "2.0").unwrap().build(),
	]);
	(local, remote)
}

#[test]
fn installed_resources_are_preferred() {
	init();
	let (local, remote) = local_and_remote();
	let resolver = resolver([remote, local.clone()]);
	resolver.add(app([package_requirement("lib", "1.0").unwrap()]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert!(resolver.required_resources().unwrap().is_empty());
	let installed = local.resources()[0].clone();
	assert!(resolver.reason(&installed).unwrap().is_some());

	assert!(resolver.resolve(ResolveFlags::DO_NOT_PREFER_LOCAL).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["lib@2.0.0"]);
}

#[test]
fn local_resources_can_be_ignored() {
	init();
	let (local, remote) = local_and_remote();
	let resolver = resolver([local, remote]);
	resolver.add(app([package_requirement("lib", "1.0").unwrap()]));

	assert!(resolver.resolve(ResolveFlags::NO_LOCAL_RESOURCES).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["lib@2.0.0"]);
}

#[test]
fn system_resource_satisfies_and_is_never_required() {
	init();
	let system = Repository::system([Capability::named(capability::EXECUTION_ENVIRONMENT, "JavaSE-1.8")]);
	let resolver = resolver([system]);
	resolver.add(app([requirement(capability::EXECUTION_ENVIRONMENT, "(ee=JavaSE-1.8)").unwrap()]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert!(resolver.required_resources().unwrap().is_empty());

	assert!(!resolver.resolve(ResolveFlags::NO_SYSTEM_RESOURCE).unwrap());
}

#[test]
fn global_capabilities_satisfy_requirements() {
	init();
	let resolver = resolver([foo_repository()]);
	resolver.add_global_capability(Capability::named(capability::EXECUTION_ENVIRONMENT, "JavaSE-1.8"));
	resolver.add(app([requirement(capability::EXECUTION_ENVIRONMENT, "(ee=JavaSE-1.8)").unwrap()]));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert!(resolver.required_resources().unwrap().is_empty());
	assert_eq!(resolver.global_capabilities().len(), 1);
}

#[test]
fn bare_requirements_resolve() {
	init();
	let resolver = resolver([foo_repository()]);
	resolver.add_requirement(package_requirement("foo", "2.0").unwrap());
	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["foo@2.0.0"]);

	resolver.add_requirement(package_requirement("bar", "1.0").unwrap());
	assert!(!resolver.resolve(ResolveFlags::empty()).unwrap());
	let unsatisfied = resolver.unsatisfied_requirements().unwrap();
	assert_eq!(unsatisfied.len(), 1);
	assert!(unsatisfied[0].resource.symbolic_name().is_none());
}

#[test]
fn results_require_a_resolve() {
	init();
	let resolver = resolver([foo_repository()]);
	assert!(matches!(resolver.required_resources(), Err(obr_rs::Error::NotResolved)));

	resolver.resolve(ResolveFlags::empty()).unwrap();
	assert!(resolver.required_resources().is_ok());

	resolver.add(app([package_requirement("foo", "1.0").unwrap()]));
	assert!(matches!(resolver.unsatisfied_requirements(), Err(obr_rs::Error::NotResolved)));
}

#[test]
fn cancelled_resolve_is_interrupted() {
	init();
	let resolver = resolver([foo_repository()]);
	resolver.add(app([package_requirement("foo", "1.0").unwrap()]));

	resolver.cancel_handle().cancel();
	assert!(matches!(resolver.resolve(ResolveFlags::empty()), Err(obr_rs::Error::Interrupted)));
	assert!(matches!(resolver.required_resources(), Err(obr_rs::Error::NotResolved)));

	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());
}

#[test]
fn cancel_during_candidate_search_interrupts() {
	init();
	let resolver = resolver([foo_repository()]);
	let cancel = resolver.cancel_handle();

	/* Matches anything, cancelling the resolve the first time it's asked */
	let filter = obr_rs::filter::Filter::from_predicate("(package=*)", move |_: &Properties| {
		cancel.cancel();
		true
	});
	resolver.add(app([Requirement::new(capability::PACKAGE, filter)]));

	assert!(matches!(resolver.resolve(ResolveFlags::empty()), Err(obr_rs::Error::Interrupted)));
	assert!(matches!(resolver.required_resources(), Err(obr_rs::Error::NotResolved)));
	assert!(!resolver.cancel_handle().is_cancelled());
}

#[test]
fn resolve_is_idempotent() {
	init();
	let remote = foo_repository();
	remote.add_resource(library("baz", "1.0").unwrap().requirement(package_requirement("qux", "1.0").unwrap()).build());
	let resolver = resolver([remote]);
	resolver.add(app([
		package_requirement("foo", "1.0").unwrap(),
		package_requirement("baz", "1.0").unwrap().optional(true),
		package_requirement("bar", "1.0").unwrap(),
	]));

	let first = resolver.resolve(ResolveFlags::empty()).unwrap();
	let required = resolver.required_resources().unwrap();
	let optional = resolver.optional_resources().unwrap();
	let unsatisfied = resolver.unsatisfied_requirements().unwrap();

	assert_eq!(resolver.resolve(ResolveFlags::empty()).unwrap(), first);
	assert_eq!(resolver.required_resources().unwrap(), required);
	assert_eq!(resolver.optional_resources().unwrap(), optional);
	assert_eq!(resolver.unsatisfied_requirements().unwrap(), unsatisfied);
}

/// A small graph with shared and alternative providers.
fn web_of_libraries() -> (Resolver, Arc<Repository>) {
	let local = Repository::with_resources("local", Locality::Local, [
		library("log", "1.0").unwrap().installed_as(DeploymentHandle(1)).build(),
	]);
	let remote = Repository::with_resources("remote", Locality::Remote, [
		library("http", "1.0").unwrap()
			.requirement(package_requirement("io", "1.0").unwrap())
			.requirement(package_requirement("log", "1.0").unwrap())
			.build(),
		library("io", "1.0").unwrap().build(),
		library("io", "1.2").unwrap().requirement(package_requirement("log", "1.0").unwrap()).build(),
		library("json", "1.0").unwrap().requirement(package_requirement("io", "1.1").unwrap()).build(),
		library("unused", "1.0").unwrap().build(),
	]);
	let resolver = resolver([local.clone(), remote]);
	resolver.add(app([
		package_requirement("http", "1.0").unwrap(),
		package_requirement("json", "1.0").unwrap(),
	]));
	(resolver, local)
}

#[test]
fn every_mandatory_requirement_is_satisfied() {
	init();
	let (resolver, local) = web_of_libraries();
	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());

	let mut available = resolver.added_resources();
	available.extend(resolver.required_resources().unwrap());
	available.extend(resolver.optional_resources().unwrap());
	available.extend(local.resources().iter().cloned());

	for resource in resolver.added_resources().iter().chain(&resolver.required_resources().unwrap()) {
		for requirement in resource.requirements().iter().filter(|r| !r.is_optional()) {
			assert!(available.iter().any(|a| a.satisfies(requirement)), "{} of {} unsatisfied", requirement, resource);
		}
	}
}

#[test]
fn every_required_resource_is_needed() {
	init();
	let (resolver, local) = web_of_libraries();
	assert!(resolver.resolve(ResolveFlags::empty()).unwrap());

	let added = resolver.added_resources();
	let required = resolver.required_resources().unwrap();
	let mut ids = ids(&required);
	ids.sort();
	assert_eq!(ids, ["http@1.0.0", "io@1.2.0", "json@1.0.0"]);

	for removed in &required {
		let remaining: Vec<_> = added.iter()
			.chain(&required)
			.filter(|r| *r != removed)
			.chain(local.resources().iter())
			.cloned()
			.collect();
		let broken = remaining.iter().any(|r| {
			r.requirements().iter()
				.filter(|req| !req.is_optional())
				.any(|req| !remaining.iter().any(|a| a.satisfies(req)))
		});
		assert!(broken, "{} is not needed", removed);
	}
}

#[test]
fn resolver_is_shared_between_threads() {
	init();
	let resolver = Arc::new(resolver([foo_repository()]));
	resolver.add(app([package_requirement("foo", "1.0").unwrap()]));

	std::thread::scope(|s| {
		for _ in 0..4 {
			let resolver = resolver.clone();
			s.spawn(move || assert!(resolver.resolve(ResolveFlags::empty()).unwrap()));
		}
	});
	assert_eq!(ids(&resolver.required_resources().unwrap()), ["foo@2.0.0"]);
}
