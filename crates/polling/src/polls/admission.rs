//! Vote admission: decides whether a ballot is acceptable for a poll given what the voter has
//! already cast, and which vote records it turns into.
//!
//! The checks are pure so the same rules apply on the first attempt and on a retry after a
//! concurrent write invalidated the voter's history.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{OptionId, Poll, PollId, PollOption, PollType, Vote};

/// Client-correctable reasons a ballot is refused. Nothing is written when one is raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AdmissionError {
    #[error("poll has expired")]
    Expired { expired_at: DateTime<Utc> },
    #[error("you have already voted on this poll")]
    AlreadyVoted,
    #[error("you can only vote for {limit} options total, but you're trying to vote for {attempted}")]
    QuotaExceeded { limit: u32, attempted: usize },
    #[error("option ID {option_id} does not belong to poll {poll_id}")]
    InvalidOption { option_id: OptionId, poll_id: PollId },
    #[error("you have already voted for option {option_id}")]
    DuplicateOption { option_id: OptionId },
}

/// Everything the rules need to know about the poll and the voter's history.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext<'a> {
    pub poll: &'a Poll,
    pub options: &'a [PollOption],
    /// Votes this voter already holds on the poll.
    pub existing: &'a [Vote],
}

/// The admitted ballot: options to write, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedBallot {
    pub poll_id: PollId,
    pub option_ids: Vec<OptionId>,
    /// History size the decision was based on; the store re-checks it at write time.
    pub existing_votes: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionEngine;

impl AdmissionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply the admission rules in order; the first failing rule decides the rejection.
    pub fn admit(
        &self,
        context: AdmissionContext<'_>,
        requested: &[OptionId],
        now: DateTime<Utc>,
    ) -> Result<AdmittedBallot, AdmissionError> {
        let poll = context.poll;

        if let Some(expired_at) = poll.expires_at.filter(|_| poll.is_expired(now)) {
            return Err(AdmissionError::Expired { expired_at });
        }

        let existing = context.existing.len();
        if poll.poll_type == PollType::SingleChoice && existing > 0 {
            return Err(AdmissionError::AlreadyVoted);
        }

        let limit = poll.vote_allowance();
        let attempted = existing + requested.len();
        if attempted > limit as usize {
            return Err(AdmissionError::QuotaExceeded { limit, attempted });
        }

        let offered: HashSet<OptionId> = context
            .options
            .iter()
            .filter(|option| option.poll_id == poll.id)
            .map(|option| option.id)
            .collect();
        if let Some(&option_id) = requested.iter().find(|id| !offered.contains(*id)) {
            return Err(AdmissionError::InvalidOption {
                option_id,
                poll_id: poll.id,
            });
        }

        let already_chosen: HashSet<OptionId> =
            context.existing.iter().map(|vote| vote.option_id).collect();
        if let Some(&option_id) = requested.iter().find(|id| already_chosen.contains(*id)) {
            return Err(AdmissionError::DuplicateOption { option_id });
        }

        let mut in_request = HashSet::with_capacity(requested.len());
        if let Some(&option_id) = requested.iter().find(|id| !in_request.insert(**id)) {
            return Err(AdmissionError::DuplicateOption { option_id });
        }

        Ok(AdmittedBallot {
            poll_id: poll.id,
            option_ids: requested.to_vec(),
            existing_votes: existing,
        })
    }
}
