use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::domain::{OptionId, OptionTally, PollId, PollOption, Vote};
use super::store::{PollStore, StoreError};

/// A vote was stored but its option's cached count was not bumped.
///
/// The vote stands; [`TallyMaintainer::reconcile`] repairs the count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("vote recorded for option {option_id} on poll {poll_id} but tally update failed: {cause}")]
pub struct PartialWriteWarning {
    pub poll_id: PollId,
    pub option_id: OptionId,
    pub cause: String,
}

/// Cached count that disagreed with the vote records and was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TallyCorrection {
    pub option_id: OptionId,
    pub cached: u64,
    pub actual: u64,
}

/// Outcome of recomputing a poll's counts from its votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub poll_id: PollId,
    pub counts: Vec<OptionTally>,
    pub corrected: Vec<TallyCorrection>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.corrected.is_empty()
    }
}

/// Sole writer of `PollOption::vote_count`.
pub struct TallyMaintainer<S> {
    store: Arc<S>,
}

impl<S> TallyMaintainer<S>
where
    S: PollStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply the +1 belonging to a freshly stored vote. A vote already counted by a concurrent
    /// reconcile is not counted again.
    pub fn record_vote(&self, vote: &Vote) -> Result<PollOption, PartialWriteWarning> {
        self.store.tally_vote(vote).map_err(|err| {
            let warning = PartialWriteWarning {
                poll_id: vote.poll_id,
                option_id: vote.option_id,
                cause: err.to_string(),
            };
            warn!(
                poll_id = %warning.poll_id,
                option_id = %warning.option_id,
                cause = %warning.cause,
                "vote stored without tally increment"
            );
            warning
        })
    }

    /// Record every vote of an admitted ballot, collecting the increments that failed.
    pub fn record_ballot(&self, votes: &[Vote]) -> Vec<PartialWriteWarning> {
        votes
            .iter()
            .filter_map(|vote| self.record_vote(vote).err())
            .collect()
    }

    /// Recompute the poll's counts from its vote records and report which cached values moved.
    pub fn reconcile(&self, poll_id: PollId) -> Result<Reconciliation, StoreError> {
        let recounts = self.store.recompute_option_counts(poll_id)?;

        let counts: Vec<OptionTally> = recounts.iter().map(|recount| recount.tally()).collect();
        let corrected: Vec<TallyCorrection> = recounts
            .iter()
            .filter(|recount| recount.previous != recount.vote_count)
            .map(|recount| TallyCorrection {
                option_id: recount.option_id,
                cached: recount.previous,
                actual: recount.vote_count,
            })
            .collect();

        for correction in &corrected {
            warn!(
                %poll_id,
                option_id = %correction.option_id,
                cached = correction.cached,
                actual = correction.actual,
                "tally drift corrected"
            );
        }

        Ok(Reconciliation {
            poll_id,
            counts,
            corrected,
        })
    }
}
