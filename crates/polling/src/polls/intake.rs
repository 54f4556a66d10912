use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{BallotRequest, NewPoll, PollType};

const DEFAULT_CREATOR: &str = "anonymous";

/// Malformed or missing input on the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("poll title is required")]
    EmptyTitle,
    #[error("at least 2 options are required")]
    TooFewOptions,
    #[error("poll_type must be 'single_choice' or 'multiple_choice'")]
    InvalidPollType,
    #[error("max_votes_per_user must be at least 1 for multiple choice polls")]
    InvalidMaxVotes,
    #[error("invalid expires_at format, use RFC3339")]
    MalformedExpiry,
    #[error("expires_at must be in the future")]
    ExpiryInPast,
    #[error("poll_id is required")]
    MissingPollId,
    #[error("at least one option must be selected")]
    NoOptionsSelected,
    #[error("voter_identifier is required")]
    MissingVoter,
    #[error("email and password are required")]
    InvalidEmail,
}

/// Inbound poll definition as sent by clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePollRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poll_type: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub max_votes_per_user: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Turn a creation request into a storable poll, evaluated against `now`.
pub fn new_poll_from_request(
    request: CreatePollRequest,
    now: DateTime<Utc>,
) -> Result<NewPoll, ValidationError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let options: Vec<String> = request
        .options
        .iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect();
    if options.len() < 2 {
        return Err(ValidationError::TooFewOptions);
    }

    let poll_type = match request.poll_type.as_deref() {
        None => PollType::SingleChoice,
        Some(raw) => PollType::parse(raw).ok_or(ValidationError::InvalidPollType)?,
    };

    let max_votes_per_user = match poll_type {
        PollType::SingleChoice => 1,
        PollType::MultipleChoice => match request.max_votes_per_user {
            Some(max) if max >= 1 => u32::try_from(max).unwrap_or(u32::MAX),
            _ => return Err(ValidationError::InvalidMaxVotes),
        },
    };

    let expires_at = match request.expires_at.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| ValidationError::MalformedExpiry)?
                .with_timezone(&Utc);
            if parsed <= now {
                return Err(ValidationError::ExpiryInPast);
            }
            Some(parsed)
        }
    };

    let created_by = request
        .created_by
        .map(|creator| creator.trim().to_string())
        .filter(|creator| !creator.is_empty())
        .unwrap_or_else(|| DEFAULT_CREATOR.to_string());

    let description = request
        .description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    Ok(NewPoll {
        title,
        description,
        poll_type,
        created_by,
        max_votes_per_user,
        expires_at,
        options,
    })
}

/// Shape checks on a ballot before any storage access.
pub fn check_ballot(ballot: &BallotRequest) -> Result<(), ValidationError> {
    if ballot.poll_id.0 == 0 {
        return Err(ValidationError::MissingPollId);
    }
    if ballot.option_ids.is_empty() {
        return Err(ValidationError::NoOptionsSelected);
    }
    if ballot.voter_identifier.trim().is_empty() {
        return Err(ValidationError::MissingVoter);
    }
    Ok(())
}
