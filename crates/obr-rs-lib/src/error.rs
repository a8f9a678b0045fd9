//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("filter error: {0}")]
	FilterSyntax(#[from] crate::filter::FilterSyntaxError),
	/// Results were requested before a completed resolve.
	#[error("the resources have not been resolved.")]
	NotResolved,
	/// The resolve was cancelled through a [`CancelHandle`](crate::relationship_resolver::CancelHandle).
	#[error("resolution interrupted.")]
	Interrupted,
	/// A repository changed after the last resolve, resolve again before deploying.
	#[error("repository state has changed, must resolve again.")]
	StateChanged,
	/// Deploy could not resolve its targets.
	#[error("cannot resolve target resources, {} unsatisfied requirement(s).", .0.len())]
	Unresolvable(Vec<crate::relationship_resolver::Reason>),
	#[error("deployment error: {0}")]
	Deployment(#[from] crate::deployment::DeploymentError),
}
