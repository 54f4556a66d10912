//! Polling service core: poll intake, vote admission, tally maintenance and result reads.
//!
//! The [`polls`] module holds the domain and the HTTP boundary; [`config`], [`telemetry`] and
//! [`error`] carry the ambient process concerns shared with the API binary.

pub mod config;
pub mod error;
pub mod polls;
pub mod telemetry;
