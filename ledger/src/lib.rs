//! Reward & progress ledger.
//!
//! Balances and counters only ever grow: every mutation is a store-side atomic
//! increment, so concurrent writers never race on a read-modify-write. No
//! decrement is exposed.

pub mod error;
pub mod ledger;
pub mod record;

pub use error::LedgerError;
pub use ledger::Ledger;
pub use record::{CommunityProgress, LedgerField, RewardLedger};
