use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a poll.
    PollId
);
numeric_id!(
    /// Identifier of a selectable option; unique across polls.
    OptionId
);
numeric_id!(
    /// Identifier of a single admitted vote record.
    VoteId
);
numeric_id!(UserId);

/// Voting rule attached to a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollType {
    SingleChoice,
    MultipleChoice,
}

impl PollType {
    pub fn label(&self) -> &'static str {
        match self {
            PollType::SingleChoice => "single_choice",
            PollType::MultipleChoice => "multiple_choice",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "single_choice" => Some(PollType::SingleChoice),
            "multiple_choice" => Some(PollType::MultipleChoice),
            _ => None,
        }
    }
}

/// A question with a fixed set of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub poll_type: PollType,
    pub created_by: String,
    pub max_votes_per_user: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Poll {
    /// Number of votes a single voter may hold on this poll.
    ///
    /// Single-choice polls always allow exactly one, whatever value was stored.
    pub fn vote_allowance(&self) -> u32 {
        match self.poll_type {
            PollType::SingleChoice => 1,
            PollType::MultipleChoice => self.max_votes_per_user.max(1),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// One selectable choice with its cached vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: OptionId,
    pub poll_id: PollId,
    pub option_text: String,
    pub vote_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Immutable record linking a voter to one option of one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub poll_id: PollId,
    pub option_id: OptionId,
    pub voter_identifier: String,
    pub created_at: DateTime<Utc>,
}

/// Validated poll fields ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub poll_type: PollType,
    pub created_by: String,
    pub max_votes_per_user: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub options: Vec<String>,
}

/// Account used by the login endpoint. Credential material never serializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip)]
    pub password_salt: String,
    #[serde(skip)]
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password_salt: String,
    pub password_digest: String,
}

/// Query over stored votes; `None` fields do not constrain the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteFilter {
    pub poll_id: PollId,
    pub option_id: Option<OptionId>,
    pub voter_identifier: Option<String>,
}

impl VoteFilter {
    pub fn poll(poll_id: PollId) -> Self {
        Self {
            poll_id,
            option_id: None,
            voter_identifier: None,
        }
    }

    pub fn voter(poll_id: PollId, voter_identifier: &str) -> Self {
        Self {
            poll_id,
            option_id: None,
            voter_identifier: Some(voter_identifier.to_string()),
        }
    }

    pub fn matches(&self, vote: &Vote) -> bool {
        vote.poll_id == self.poll_id
            && self.option_id.map_or(true, |id| vote.option_id == id)
            && self
                .voter_identifier
                .as_deref()
                .map_or(true, |voter| vote.voter_identifier == voter)
    }
}

/// Inbound ballot: the options one voter selects on one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotRequest {
    #[serde(default)]
    pub poll_id: PollId,
    #[serde(default)]
    pub option_ids: Vec<OptionId>,
    #[serde(default)]
    pub voter_identifier: String,
}

/// Authoritative per-option count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub option_id: OptionId,
    pub vote_count: u64,
}

/// Result of recounting one option: the cached value it replaced and the authoritative count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRecount {
    pub option_id: OptionId,
    pub previous: u64,
    pub vote_count: u64,
}

impl OptionRecount {
    pub fn tally(&self) -> OptionTally {
        OptionTally {
            option_id: self.option_id,
            vote_count: self.vote_count,
        }
    }
}
