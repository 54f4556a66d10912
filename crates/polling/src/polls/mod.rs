//! Polls, options and votes: intake, admission, tally maintenance and result reads.
//!
//! [`PollService`] is the facade the HTTP layer talks to. It validates input through
//! [`intake`], decides ballots with the [`AdmissionEngine`], writes them through the
//! [`PollStore`] gateway and keeps option counts in step via the [`TallyMaintainer`].

pub mod accounts;
pub mod admission;
pub mod domain;
pub mod intake;
pub mod memory;
pub mod reader;
pub mod router;
pub mod service;
pub mod store;
pub mod tally;

#[cfg(test)]
mod tests;

pub use accounts::LoginRequest;
pub use admission::{AdmissionContext, AdmissionEngine, AdmissionError, AdmittedBallot};
pub use domain::{
    BallotRequest, NewPoll, NewUser, OptionId, OptionRecount, OptionTally, Poll, PollId, PollOption,
    PollType, User, UserId, Vote, VoteFilter, VoteId,
};
pub use intake::{CreatePollRequest, ValidationError};
pub use memory::InMemoryPollStore;
pub use reader::{PollReader, PollView};
pub use router::{poll_router, ApiResponse};
pub use service::{BallotReceipt, PollService, PollServiceError};
pub use store::{PollStore, StoreError};
pub use tally::{PartialWriteWarning, Reconciliation, TallyCorrection, TallyMaintainer};
