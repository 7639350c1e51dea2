//! Candidate deduplication.

use std::collections::HashSet;

use addrgeo_core::Candidate;

/// Insertion-ordered candidate set keyed by id. First occurrence wins.
#[derive(Debug, Default)]
pub struct CandidatePool {
    seen: HashSet<String>,
    items: Vec<Candidate>,
}

impl CandidatePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add candidates in order, skipping ids already present.
    pub fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        for candidate in candidates {
            if candidate.id.trim().is_empty() {
                tracing::warn!(name = candidate.name.as_str(), "dropping candidate with empty id");
                continue;
            }
            if self.seen.insert(candidate.id.clone()) {
                self.items.push(candidate);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Candidate> {
        self.items
    }
}

/// Merge candidate lists in argument order, deduplicating by id.
#[must_use]
pub fn merge_candidates<I>(lists: I) -> Vec<Candidate>
where
    I: IntoIterator<Item = Vec<Candidate>>,
{
    let mut pool = CandidatePool::new();
    for list in lists {
        pool.extend(list);
    }
    pool.into_vec()
}
