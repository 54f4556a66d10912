use super::domain::{
    NewPoll, NewUser, OptionId, OptionRecount, Poll, PollId, PollOption, User, Vote, VoteFilter,
};

/// Storage gateway consumed by the admission, tally and read paths.
///
/// Implementations must make `commit_votes` a single unit: either every vote in the batch is
/// written or none is.
pub trait PollStore: Send + Sync {
    fn get_poll(&self, id: PollId) -> Result<Poll, StoreError>;

    /// Polls ordered by creation time, newest first.
    fn list_polls_desc(&self) -> Result<Vec<Poll>, StoreError>;

    /// Persist a poll together with its options.
    fn create_poll(&self, poll: NewPoll) -> Result<(Poll, Vec<PollOption>), StoreError>;

    fn create_option(&self, poll_id: PollId, text: &str) -> Result<PollOption, StoreError>;

    /// Options of a poll in creation order.
    fn list_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StoreError>;

    fn list_votes(&self, filter: &VoteFilter) -> Result<Vec<Vote>, StoreError>;

    /// Insert one vote. Fails with [`StoreError::UniqueViolation`] when the
    /// (poll, option, voter) triple already exists.
    fn create_vote(
        &self,
        poll_id: PollId,
        option_id: OptionId,
        voter_identifier: &str,
    ) -> Result<Vote, StoreError>;

    /// Insert a voter's whole ballot atomically.
    ///
    /// `expected_existing` is the number of votes the voter held on the poll when the ballot
    /// was admitted; if it changed in the meantime nothing is written and
    /// [`StoreError::StaleBallot`] is returned. A colliding (poll, option, voter) triple
    /// aborts the batch with [`StoreError::UniqueViolation`].
    fn commit_votes(
        &self,
        poll_id: PollId,
        voter_identifier: &str,
        option_ids: &[OptionId],
        expected_existing: usize,
    ) -> Result<Vec<Vote>, StoreError>;

    /// Atomic add on the cached count.
    fn increment_option_count(
        &self,
        option_id: OptionId,
        delta: u64,
    ) -> Result<PollOption, StoreError>;

    /// Apply the +1 belonging to a stored vote, at most once per vote.
    ///
    /// A vote already reflected in the cached count, by an earlier call or by
    /// [`PollStore::recompute_option_counts`], leaves the count unchanged.
    fn tally_vote(&self, vote: &Vote) -> Result<PollOption, StoreError>;

    /// Rewrite every cached count of the poll from its vote records, marking each counted vote
    /// as tallied. The previous cached values are read in the same unit.
    fn recompute_option_counts(&self, poll_id: PollId) -> Result<Vec<OptionRecount>, StoreError>;

    fn count_users(&self) -> Result<usize, StoreError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("vote for option {option_id} by this voter already exists")]
    UniqueViolation { option_id: OptionId },
    #[error("voter's ballot changed concurrently")]
    StaleBallot,
    #[error("record already exists")]
    Conflict,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
