use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    NewPoll, NewUser, OptionId, OptionRecount, Poll, PollId, PollOption, User, UserId, Vote,
    VoteFilter, VoteId,
};
use super::store::{PollStore, StoreError};

/// Process-local gateway. All tables sit behind one lock, so every trait call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryPollStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    polls: BTreeMap<PollId, Poll>,
    options: BTreeMap<OptionId, PollOption>,
    votes: Vec<Vote>,
    ballots: HashSet<(PollId, OptionId, String)>,
    /// Votes whose +1 is already part of their option's cached count.
    tallied: HashSet<VoteId>,
    users: BTreeMap<UserId, User>,
    sequence: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn insert_vote(
        &mut self,
        poll_id: PollId,
        option_id: OptionId,
        voter_identifier: &str,
    ) -> Vote {
        let vote = Vote {
            id: VoteId(self.next_id()),
            poll_id,
            option_id,
            voter_identifier: voter_identifier.to_string(),
            created_at: Utc::now(),
        };
        self.ballots
            .insert((poll_id, option_id, voter_identifier.to_string()));
        self.votes.push(vote.clone());
        vote
    }

    fn option_in_poll(&self, poll_id: PollId, option_id: OptionId) -> Result<(), StoreError> {
        match self.options.get(&option_id) {
            Some(option) if option.poll_id == poll_id => Ok(()),
            _ => Err(StoreError::NotFound),
        }
    }
}

impl InMemoryPollStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl PollStore for InMemoryPollStore {
    fn get_poll(&self, id: PollId) -> Result<Poll, StoreError> {
        let state = self.lock()?;
        state.polls.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn list_polls_desc(&self) -> Result<Vec<Poll>, StoreError> {
        let state = self.lock()?;
        let mut polls: Vec<Poll> = state.polls.values().cloned().collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(polls)
    }

    fn create_poll(&self, poll: NewPoll) -> Result<(Poll, Vec<PollOption>), StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let stored = Poll {
            id: PollId(state.next_id()),
            title: poll.title,
            description: poll.description,
            poll_type: poll.poll_type,
            created_by: poll.created_by,
            max_votes_per_user: poll.max_votes_per_user,
            expires_at: poll.expires_at,
            created_at: now,
            updated_at: now,
        };

        let mut options = Vec::with_capacity(poll.options.len());
        for text in poll.options {
            let option = PollOption {
                id: OptionId(state.next_id()),
                poll_id: stored.id,
                option_text: text,
                vote_count: 0,
                created_at: now,
            };
            state.options.insert(option.id, option.clone());
            options.push(option);
        }

        state.polls.insert(stored.id, stored.clone());
        Ok((stored, options))
    }

    fn create_option(&self, poll_id: PollId, text: &str) -> Result<PollOption, StoreError> {
        let mut state = self.lock()?;
        if !state.polls.contains_key(&poll_id) {
            return Err(StoreError::NotFound);
        }
        let option = PollOption {
            id: OptionId(state.next_id()),
            poll_id,
            option_text: text.to_string(),
            vote_count: 0,
            created_at: Utc::now(),
        };
        state.options.insert(option.id, option.clone());
        Ok(option)
    }

    fn list_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StoreError> {
        let state = self.lock()?;
        // Ids are allocated monotonically, so key order is creation order.
        Ok(state
            .options
            .values()
            .filter(|option| option.poll_id == poll_id)
            .cloned()
            .collect())
    }

    fn list_votes(&self, filter: &VoteFilter) -> Result<Vec<Vote>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .votes
            .iter()
            .filter(|vote| filter.matches(vote))
            .cloned()
            .collect())
    }

    fn create_vote(
        &self,
        poll_id: PollId,
        option_id: OptionId,
        voter_identifier: &str,
    ) -> Result<Vote, StoreError> {
        let mut state = self.lock()?;
        state.option_in_poll(poll_id, option_id)?;
        if state
            .ballots
            .contains(&(poll_id, option_id, voter_identifier.to_string()))
        {
            return Err(StoreError::UniqueViolation { option_id });
        }
        Ok(state.insert_vote(poll_id, option_id, voter_identifier))
    }

    fn commit_votes(
        &self,
        poll_id: PollId,
        voter_identifier: &str,
        option_ids: &[OptionId],
        expected_existing: usize,
    ) -> Result<Vec<Vote>, StoreError> {
        let mut state = self.lock()?;

        let existing = state
            .votes
            .iter()
            .filter(|vote| vote.poll_id == poll_id && vote.voter_identifier == voter_identifier)
            .count();
        if existing != expected_existing {
            return Err(StoreError::StaleBallot);
        }

        let mut seen = HashSet::with_capacity(option_ids.len());
        for option_id in option_ids {
            state.option_in_poll(poll_id, *option_id)?;
            let key = (poll_id, *option_id, voter_identifier.to_string());
            if !seen.insert(*option_id) || state.ballots.contains(&key) {
                return Err(StoreError::UniqueViolation {
                    option_id: *option_id,
                });
            }
        }

        Ok(option_ids
            .iter()
            .map(|option_id| state.insert_vote(poll_id, *option_id, voter_identifier))
            .collect())
    }

    fn increment_option_count(
        &self,
        option_id: OptionId,
        delta: u64,
    ) -> Result<PollOption, StoreError> {
        let mut state = self.lock()?;
        let option = state
            .options
            .get_mut(&option_id)
            .ok_or(StoreError::NotFound)?;
        option.vote_count = option.vote_count.saturating_add(delta);
        Ok(option.clone())
    }

    fn tally_vote(&self, vote: &Vote) -> Result<PollOption, StoreError> {
        let mut state = self.lock()?;
        let key = (vote.poll_id, vote.option_id, vote.voter_identifier.clone());
        if !state.ballots.contains(&key) {
            return Err(StoreError::NotFound);
        }
        let first_tally = state.tallied.insert(vote.id);
        let option = state
            .options
            .get_mut(&vote.option_id)
            .ok_or(StoreError::NotFound)?;
        if first_tally {
            option.vote_count = option.vote_count.saturating_add(1);
        }
        Ok(option.clone())
    }

    fn recompute_option_counts(&self, poll_id: PollId) -> Result<Vec<OptionRecount>, StoreError> {
        let mut state = self.lock()?;
        if !state.polls.contains_key(&poll_id) {
            return Err(StoreError::NotFound);
        }

        let mut counts: BTreeMap<OptionId, u64> = state
            .options
            .values()
            .filter(|option| option.poll_id == poll_id)
            .map(|option| (option.id, 0))
            .collect();
        let mut counted = Vec::new();
        for vote in state.votes.iter().filter(|vote| vote.poll_id == poll_id) {
            if let Some(count) = counts.get_mut(&vote.option_id) {
                *count += 1;
                counted.push(vote.id);
            }
        }
        state.tallied.extend(counted);

        let mut recounts = Vec::with_capacity(counts.len());
        for (option_id, vote_count) in counts {
            if let Some(option) = state.options.get_mut(&option_id) {
                recounts.push(OptionRecount {
                    option_id,
                    previous: option.vote_count,
                    vote_count,
                });
                option.vote_count = vote_count;
            }
        }
        Ok(recounts)
    }

    fn count_users(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.users.len())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.lock()?;
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Conflict);
        }
        let stored = User {
            id: UserId(state.next_id()),
            email: user.email,
            password_salt: user.password_salt,
            password_digest: user.password_digest,
            created_at: Utc::now(),
        };
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }
}
