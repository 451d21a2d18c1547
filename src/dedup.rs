//! Run-scoped set of canonical URLs already collected.

use std::collections::HashSet;

use crate::models::Posting;

#[derive(Debug, Default)]
pub struct SeenUrls {
    urls: HashSet<String>,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url` and report whether it was unseen until now.
    ///
    /// Checking and marking happen in one call, so a URL is accepted at most
    /// once per run.
    pub fn is_new(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    /// Split `postings` into unseen ones (in order) and a duplicate count.
    pub fn partition(&mut self, postings: Vec<Posting>) -> (Vec<Posting>, usize) {
        let total = postings.len();
        let fresh: Vec<Posting> = postings
            .into_iter()
            .filter(|posting| self.is_new(&posting.url))
            .collect();
        let duplicates = total - fresh.len();
        (fresh, duplicates)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }
}
