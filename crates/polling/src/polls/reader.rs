use std::sync::Arc;

use serde::Serialize;

use super::domain::{Poll, PollId, PollOption};
use super::store::{PollStore, StoreError};

/// A poll with its options and their current counts, as rendered for results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollView {
    #[serde(flatten)]
    pub poll: Poll,
    pub options: Vec<PollOption>,
    pub total_votes: u64,
}

impl PollView {
    pub fn new(poll: Poll, options: Vec<PollOption>) -> Self {
        let total_votes = options.iter().map(|option| option.vote_count).sum();
        Self {
            poll,
            options,
            total_votes,
        }
    }

    /// Share of all votes held by each option, in percent.
    pub fn shares(&self) -> Vec<(&PollOption, f64)> {
        self.options
            .iter()
            .map(|option| {
                let share = if self.total_votes == 0 {
                    0.0
                } else {
                    option.vote_count as f64 * 100.0 / self.total_votes as f64
                };
                (option, share)
            })
            .collect()
    }
}

/// Read-only assembly of polls and options.
pub struct PollReader<S> {
    store: Arc<S>,
}

impl<S> PollReader<S>
where
    S: PollStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn get_poll(&self, poll_id: PollId) -> Result<PollView, StoreError> {
        let poll = self.store.get_poll(poll_id)?;
        let options = self.store.list_options(poll_id)?;
        Ok(PollView::new(poll, options))
    }

    /// All polls, newest first.
    pub fn list_polls(&self) -> Result<Vec<PollView>, StoreError> {
        self.store
            .list_polls_desc()?
            .into_iter()
            .map(|poll| {
                let options = self.store.list_options(poll.id)?;
                Ok(PollView::new(poll, options))
            })
            .collect()
    }
}
