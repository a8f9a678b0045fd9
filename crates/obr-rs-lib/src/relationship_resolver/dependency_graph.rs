//! Module for the graph between the resources of a deployment, used for ordering.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use petgraph::prelude::*;

use super::Reason;
use crate::repository::*;

/// Edges point from a resource to the resource selected for one of its requirements.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
	pub graph: DiGraph<Arc<Resource>, Requirement>,
	indices: HashMap<Arc<Resource>, NodeIndex>,
}

impl DependencyGraph {
	/// Builds the graph between `resources` from the recorded reasons.
	///
	/// Reasons involving resources outside `resources` are ignored.
	pub fn new(resources: impl IntoIterator<Item = Arc<Resource>>, reasons: &IndexMap<Arc<Resource>, Vec<Reason>>) -> Self {
		let mut graph = DiGraph::default();
		let mut indices = HashMap::new();
		for resource in resources {
			indices.entry(resource.clone()).or_insert_with(|| graph.add_node(resource));
		}

		for (dependency, reasons) in reasons {
			let Some(&to) = indices.get(dependency) else { continue };
			for reason in reasons {
				if let Some(&from) = indices.get(&reason.resource) {
					/* Self requirements don't order anything */
					if from != to {
						graph.add_edge(from, to, reason.requirement.clone());
					}
				}
			}
		}

		Self { graph, indices }
	}

	pub fn node_index(&self, resource: &Resource) -> Option<NodeIndex> {
		self.indices.get(resource).copied()
	}

	/// Resources ordered so dependencies come before the resources requiring them.
	///
	/// Resources in a cycle are kept together in the order they were given.
	pub fn install_order(&self) -> Vec<Arc<Resource>> {
		/* tarjan_scc yields components in reverse topological order, edges point at dependencies */
		petgraph::algo::tarjan_scc(&self.graph)
			.into_iter()
			.flat_map(|mut component| {
				component.sort();
				component
			})
			.map(|i| self.graph[i].clone())
			.collect()
	}

	/// Resources selected for the requirements of `resource`.
	pub fn dependencies_of(&self, resource: &Resource) -> Vec<Arc<Resource>> {
		self.neighbors(resource, Outgoing)
	}

	/// Resources that `resource` was selected for.
	pub fn dependents_of(&self, resource: &Resource) -> Vec<Arc<Resource>> {
		self.neighbors(resource, Incoming)
	}

	fn neighbors(&self, resource: &Resource, direction: petgraph::Direction) -> Vec<Arc<Resource>> {
		let Some(i) = self.node_index(resource) else { return Vec::new() };
		let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(i, direction).collect();
		found.sort();
		found.dedup();
		found.into_iter().map(|n| self.graph[n].clone()).collect()
	}
}
