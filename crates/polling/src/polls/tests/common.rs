use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::polls::domain::{
    BallotRequest, NewPoll, NewUser, OptionId, OptionRecount, Poll, PollId, PollOption, PollType,
    User, Vote, VoteFilter, VoteId,
};
use crate::polls::intake::CreatePollRequest;
use crate::polls::memory::InMemoryPollStore;
use crate::polls::reader::PollView;
use crate::polls::service::PollService;
use crate::polls::store::{PollStore, StoreError};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn single_choice_request(options: &[&str]) -> CreatePollRequest {
    CreatePollRequest {
        title: "Favorite Programming Language".to_string(),
        description: Some("What's your go-to language for backend development?".to_string()),
        poll_type: Some("single_choice".to_string()),
        created_by: Some("admin@example.com".to_string()),
        max_votes_per_user: None,
        expires_at: None,
        options: options.iter().map(|text| text.to_string()).collect(),
    }
}

pub(super) fn multiple_choice_request(max: i64, options: &[&str]) -> CreatePollRequest {
    CreatePollRequest {
        title: "Preferred Pizza Toppings".to_string(),
        description: Some("Which toppings do you love?".to_string()),
        poll_type: Some("multiple_choice".to_string()),
        created_by: None,
        max_votes_per_user: Some(max),
        expires_at: None,
        options: options.iter().map(|text| text.to_string()).collect(),
    }
}

pub(super) fn ballot(poll_id: PollId, voter: &str, options: &[OptionId]) -> BallotRequest {
    BallotRequest {
        poll_id,
        option_ids: options.to_vec(),
        voter_identifier: voter.to_string(),
    }
}

pub(super) fn option_ids(view: &PollView) -> Vec<OptionId> {
    view.options.iter().map(|option| option.id).collect()
}

pub(super) fn count_of(view: &PollView, option_id: OptionId) -> u64 {
    view.options
        .iter()
        .find(|option| option.id == option_id)
        .map(|option| option.vote_count)
        .expect("option present")
}

pub(super) fn build_service() -> (PollService<InMemoryPollStore>, Arc<InMemoryPollStore>) {
    let store = Arc::new(InMemoryPollStore::new());
    let service = PollService::new(store.clone());
    (service, store)
}

/// Assert every cached count equals the number of vote records pointing at the option.
pub(super) fn assert_counts_match_votes<S: PollStore>(store: &S, poll_id: PollId) {
    let votes = store
        .list_votes(&VoteFilter::poll(poll_id))
        .expect("votes listed");
    for option in store.list_options(poll_id).expect("options listed") {
        let actual = votes
            .iter()
            .filter(|vote| vote.option_id == option.id)
            .count() as u64;
        assert_eq!(
            option.vote_count, actual,
            "option {} cached {} but has {} votes",
            option.id, option.vote_count, actual
        );
    }
}

pub(super) fn poll_fixture(poll_type: PollType, max_votes_per_user: u32) -> (Poll, Vec<PollOption>) {
    let created_at = now() - Duration::days(1);
    let poll = Poll {
        id: PollId(1),
        title: "Remote Work Preference".to_string(),
        description: None,
        poll_type,
        created_by: "anonymous".to_string(),
        max_votes_per_user,
        expires_at: None,
        created_at,
        updated_at: created_at,
    };
    let options = ["Fully Remote", "Hybrid", "Mostly Office"]
        .iter()
        .enumerate()
        .map(|(index, text)| PollOption {
            id: OptionId(10 + index as i64),
            poll_id: poll.id,
            option_text: text.to_string(),
            vote_count: 0,
            created_at,
        })
        .collect();
    (poll, options)
}

pub(super) fn vote_fixture(poll_id: PollId, option_id: OptionId, voter: &str) -> Vote {
    Vote {
        id: VoteId(100 + option_id.0),
        poll_id,
        option_id,
        voter_identifier: voter.to_string(),
        created_at: now() - Duration::hours(1),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Delegates to the in-memory store with scripted failures on the write path.
#[derive(Default)]
pub(super) struct FaultyStore {
    pub(super) inner: InMemoryPollStore,
    failures: AtomicUsize,
    commit_failures: Mutex<Vec<StoreError>>,
}

impl FaultyStore {
    pub(super) fn fail_next_tallies(&self, failures: usize) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    /// Queue `error` for the next commit; queued errors are returned oldest first.
    pub(super) fn fail_next_commit(&self, error: StoreError) {
        self.commit_failures
            .lock()
            .expect("fault mutex poisoned")
            .insert(0, error);
    }
}

impl PollStore for FaultyStore {
    fn get_poll(&self, id: PollId) -> Result<Poll, StoreError> {
        self.inner.get_poll(id)
    }

    fn list_polls_desc(&self) -> Result<Vec<Poll>, StoreError> {
        self.inner.list_polls_desc()
    }

    fn create_poll(&self, poll: NewPoll) -> Result<(Poll, Vec<PollOption>), StoreError> {
        self.inner.create_poll(poll)
    }

    fn create_option(&self, poll_id: PollId, text: &str) -> Result<PollOption, StoreError> {
        self.inner.create_option(poll_id, text)
    }

    fn list_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StoreError> {
        self.inner.list_options(poll_id)
    }

    fn list_votes(&self, filter: &VoteFilter) -> Result<Vec<Vote>, StoreError> {
        self.inner.list_votes(filter)
    }

    fn create_vote(
        &self,
        poll_id: PollId,
        option_id: OptionId,
        voter_identifier: &str,
    ) -> Result<Vote, StoreError> {
        self.inner.create_vote(poll_id, option_id, voter_identifier)
    }

    fn commit_votes(
        &self,
        poll_id: PollId,
        voter_identifier: &str,
        option_ids: &[OptionId],
        expected_existing: usize,
    ) -> Result<Vec<Vote>, StoreError> {
        if let Some(error) = self.commit_failures.lock().expect("fault mutex poisoned").pop() {
            return Err(error);
        }
        self.inner
            .commit_votes(poll_id, voter_identifier, option_ids, expected_existing)
    }

    fn increment_option_count(
        &self,
        option_id: OptionId,
        delta: u64,
    ) -> Result<PollOption, StoreError> {
        self.inner.increment_option_count(option_id, delta)
    }

    fn tally_vote(&self, vote: &Vote) -> Result<PollOption, StoreError> {
        let should_fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StoreError::Unavailable("counter write timed out".to_string()));
        }
        self.inner.tally_vote(vote)
    }

    fn recompute_option_counts(&self, poll_id: PollId) -> Result<Vec<OptionRecount>, StoreError> {
        self.inner.recompute_option_counts(poll_id)
    }

    fn count_users(&self) -> Result<usize, StoreError> {
        self.inner.count_users()
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_email(email)
    }

    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.inner.create_user(user)
    }
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

impl PollStore for UnavailableStore {
    fn get_poll(&self, _id: PollId) -> Result<Poll, StoreError> {
        offline()
    }

    fn list_polls_desc(&self) -> Result<Vec<Poll>, StoreError> {
        offline()
    }

    fn create_poll(&self, _poll: NewPoll) -> Result<(Poll, Vec<PollOption>), StoreError> {
        offline()
    }

    fn create_option(&self, _poll_id: PollId, _text: &str) -> Result<PollOption, StoreError> {
        offline()
    }

    fn list_options(&self, _poll_id: PollId) -> Result<Vec<PollOption>, StoreError> {
        offline()
    }

    fn list_votes(&self, _filter: &VoteFilter) -> Result<Vec<Vote>, StoreError> {
        offline()
    }

    fn create_vote(
        &self,
        _poll_id: PollId,
        _option_id: OptionId,
        _voter_identifier: &str,
    ) -> Result<Vote, StoreError> {
        offline()
    }

    fn commit_votes(
        &self,
        _poll_id: PollId,
        _voter_identifier: &str,
        _option_ids: &[OptionId],
        _expected_existing: usize,
    ) -> Result<Vec<Vote>, StoreError> {
        offline()
    }

    fn increment_option_count(
        &self,
        _option_id: OptionId,
        _delta: u64,
    ) -> Result<PollOption, StoreError> {
        offline()
    }

    fn tally_vote(&self, _vote: &Vote) -> Result<PollOption, StoreError> {
        offline()
    }

    fn recompute_option_counts(&self, _poll_id: PollId) -> Result<Vec<OptionRecount>, StoreError> {
        offline()
    }

    fn count_users(&self) -> Result<usize, StoreError> {
        offline()
    }

    fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        offline()
    }

    fn create_user(&self, _user: NewUser) -> Result<User, StoreError> {
        offline()
    }
}
