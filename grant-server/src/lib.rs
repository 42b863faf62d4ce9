//! Tapcraft grant server.
//!
//! Verifies TON payments against the external ledger and issues game
//! rewards exactly once: purchase grants, task rewards, and referral
//! credits. Game math lives in `tapcraft_core`; this crate owns the
//! protocol and persistence.

pub mod api;
pub mod error;
pub mod grants;
pub mod ledger;
pub mod rewards;
pub mod storage;

pub use error::ApiError;
pub use grants::{PaymentVerifier, VerifyOutcome};
pub use ledger::{LedgerClient, TonHttpLedger};
pub use storage::{MemoryStore, PostgresStore, Store};
