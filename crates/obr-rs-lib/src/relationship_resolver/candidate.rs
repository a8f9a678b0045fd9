//! Ranking of resources that could satisfy a requirement.
//!
//! Candidates are ordered by, highest first:
//! 1. locality, when local resources are preferred.
//! 1. the version of the matching capability, a versioned capability beats an unversioned one.
//! 1. the number of capabilities the resource offers.
//! 1. the order the candidates were found in, earlier wins.
//!
//! This is the same choice as scanning the list and only replacing the best on a strictly better
//! candidate, but repeated picks after failures don't rescan the whole list.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::repository::*;

/// A resource and the index of its capability matching the requirement being resolved.
#[derive(Debug, Clone)]
pub(super) struct Candidate {
	pub resource: Arc<Resource>,
	pub capability: usize,
}

impl Candidate {
	pub fn capability(&self) -> &Capability {
		&self.resource.capabilities()[self.capability]
	}
}

#[derive(Debug)]
struct Ranked {
	local: bool,
	version: Option<Version>,
	capability_count: usize,
	position: usize,
	candidate: Candidate,
}

impl Ranked {
	fn key(&self) -> (bool, Option<&Version>, usize, std::cmp::Reverse<usize>) {
		(self.local, self.version.as_ref(), self.capability_count, std::cmp::Reverse(self.position))
	}
}

impl PartialEq for Ranked {
	fn eq(&self, other: &Self) -> bool {
		self.key() == other.key()
	}
}

impl Eq for Ranked {}

impl Ord for Ranked {
	fn cmp(&self, other: &Self) -> Ordering {
		self.key().cmp(&other.key())
	}
}

impl PartialOrd for Ranked {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Candidates for one requirement, best first.
#[derive(Debug)]
pub(super) struct CandidateQueue {
	heap: BinaryHeap<Ranked>,
}

impl CandidateQueue {
	pub fn new(candidates: impl IntoIterator<Item = Candidate>, prefer_local: bool) -> Self {
		let heap = candidates.into_iter()
			.enumerate()
			.map(|(position, candidate)| Ranked {
				local: prefer_local && candidate.resource.is_local(),
				version: candidate.capability().version().cloned(),
				capability_count: candidate.resource.capabilities().len(),
				position,
				candidate,
			})
			.collect();
		Self { heap }
	}

	/// Removes and returns the best remaining candidate.
	pub fn pop_best(&mut self) -> Option<Candidate> {
		self.heap.pop().map(|r| r.candidate)
	}

	pub fn len(&self) -> usize {
		self.heap.len()
	}
}
