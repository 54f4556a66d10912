use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::accounts::{self, LoginRequest};
use super::admission::{AdmissionContext, AdmissionEngine, AdmissionError};
use super::domain::{BallotRequest, PollId, PollType, User, Vote, VoteFilter};
use super::intake::{self, CreatePollRequest, ValidationError};
use super::reader::{PollReader, PollView};
use super::store::{PollStore, StoreError};
use super::tally::{PartialWriteWarning, Reconciliation, TallyMaintainer};

/// Attempts made when a concurrent ballot from the same voter invalidates the admission check.
const MAX_ADMISSION_ATTEMPTS: usize = 3;

/// Service composing intake, admission, tally maintenance and reads over one store.
pub struct PollService<S> {
    store: Arc<S>,
    engine: AdmissionEngine,
    tally: TallyMaintainer<S>,
    reader: PollReader<S>,
}

/// Successful ballot: the stored votes plus the refreshed poll.
#[derive(Debug, Clone, Serialize)]
pub struct BallotReceipt {
    pub poll: PollView,
    pub votes: Vec<Vote>,
    /// Increments that failed after the votes were stored; counts were reconciled afterwards.
    pub warnings: Vec<PartialWriteWarning>,
}

impl<S> PollService<S>
where
    S: PollStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            tally: TallyMaintainer::new(store.clone()),
            reader: PollReader::new(store.clone()),
            engine: AdmissionEngine::new(),
            store,
        }
    }

    pub fn list_polls(&self) -> Result<Vec<PollView>, PollServiceError> {
        Ok(self.reader.list_polls()?)
    }

    pub fn get_poll(&self, poll_id: PollId) -> Result<PollView, PollServiceError> {
        self.reader.get_poll(poll_id).map_err(poll_lookup)
    }

    pub fn create_poll(&self, request: CreatePollRequest) -> Result<PollView, PollServiceError> {
        self.create_poll_at(request, Utc::now())
    }

    pub fn create_poll_at(
        &self,
        request: CreatePollRequest,
        now: DateTime<Utc>,
    ) -> Result<PollView, PollServiceError> {
        let new_poll = intake::new_poll_from_request(request, now)?;
        let (poll, options) = self.store.create_poll(new_poll)?;
        info!(
            poll_id = %poll.id,
            poll_type = poll.poll_type.label(),
            options = options.len(),
            "poll created"
        );
        Ok(PollView::new(poll, options))
    }

    pub fn submit_vote(&self, ballot: BallotRequest) -> Result<BallotReceipt, PollServiceError> {
        self.submit_vote_at(ballot, Utc::now())
    }

    /// Admit and store a ballot as one unit, then bring the affected counts up to date.
    pub fn submit_vote_at(
        &self,
        ballot: BallotRequest,
        now: DateTime<Utc>,
    ) -> Result<BallotReceipt, PollServiceError> {
        intake::check_ballot(&ballot)?;
        let voter = ballot.voter_identifier.trim();

        let poll = self.store.get_poll(ballot.poll_id).map_err(poll_lookup)?;
        let options = self.store.list_options(poll.id)?;

        for attempt in 1..=MAX_ADMISSION_ATTEMPTS {
            let existing = self.store.list_votes(&VoteFilter::voter(poll.id, voter))?;
            let context = AdmissionContext {
                poll: &poll,
                options: &options,
                existing: &existing,
            };
            let admitted = self
                .engine
                .admit(context, &ballot.option_ids, now)
                .inspect_err(|reason| debug!(poll_id = %poll.id, %reason, "ballot rejected"))?;

            let votes = match self.store.commit_votes(
                poll.id,
                voter,
                &admitted.option_ids,
                admitted.existing_votes,
            ) {
                Ok(votes) => votes,
                Err(StoreError::StaleBallot) => {
                    debug!(poll_id = %poll.id, attempt, "voter history changed, re-admitting");
                    continue;
                }
                Err(StoreError::UniqueViolation { option_id }) => {
                    let reason = match poll.poll_type {
                        PollType::SingleChoice => AdmissionError::AlreadyVoted,
                        PollType::MultipleChoice => AdmissionError::DuplicateOption { option_id },
                    };
                    return Err(reason.into());
                }
                Err(other) => return Err(other.into()),
            };

            let warnings = self.tally.record_ballot(&votes);
            if !warnings.is_empty() {
                self.repair_tally(poll.id);
            }

            info!(poll_id = %poll.id, votes = votes.len(), "ballot admitted");

            let view = match self.reader.get_poll(poll.id) {
                Ok(view) => view,
                Err(err) => {
                    warn!(poll_id = %poll.id, error = %err, "votes stored but poll refresh failed");
                    PollView::new(poll.clone(), options.clone())
                }
            };

            return Ok(BallotReceipt {
                poll: view,
                votes,
                warnings,
            });
        }

        warn!(poll_id = %poll.id, "ballot abandoned after repeated concurrent changes");
        Err(PollServiceError::Contended)
    }

    /// Recompute the poll's cached counts from its votes.
    pub fn reconcile(&self, poll_id: PollId) -> Result<Reconciliation, PollServiceError> {
        self.store.get_poll(poll_id).map_err(poll_lookup)?;
        self.tally.reconcile(poll_id).map_err(poll_lookup)
    }

    pub fn login(&self, request: LoginRequest) -> Result<User, PollServiceError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ValidationError::InvalidEmail.into());
        }

        let email = accounts::normalize_email(&request.email);
        match self.store.find_user_by_email(&email)? {
            Some(user) if accounts::verify_password(&user, &request.password) => Ok(user),
            _ => Err(PollServiceError::Unauthorized),
        }
    }

    pub fn register_user(&self, email: &str, password: &str) -> Result<User, PollServiceError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::InvalidEmail.into());
        }
        Ok(self.store.create_user(accounts::new_user(email, password))?)
    }

    pub fn has_users(&self) -> Result<bool, PollServiceError> {
        Ok(self.store.count_users()? > 0)
    }

    fn repair_tally(&self, poll_id: PollId) {
        match self.tally.reconcile(poll_id) {
            Ok(reconciliation) => debug!(
                %poll_id,
                corrected = reconciliation.corrected.len(),
                "tally repaired after partial write"
            ),
            Err(err) => warn!(%poll_id, error = %err, "tally repair deferred"),
        }
    }
}

fn poll_lookup(err: StoreError) -> PollServiceError {
    match err {
        StoreError::NotFound => PollServiceError::NotFound("poll not found"),
        other => PollServiceError::Storage(other),
    }
}

/// Error raised by the poll service.
#[derive(Debug, thiserror::Error)]
pub enum PollServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error("invalid email or password")]
    Unauthorized,
    /// The voter's other ballots on the poll kept changing while this one was admitted.
    #[error("another ballot from this voter was being recorded, please retry")]
    Contended,
    #[error(transparent)]
    Storage(#[from] StoreError),
}
