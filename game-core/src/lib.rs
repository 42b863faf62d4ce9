//! Tapcraft economy core.
//!
//! Deterministic, presentation-free game logic shared by the client
//! simulation and the grant server:
//! - pricing curves (upgrades, shop, craft, referral and daily schedules)
//! - deterministic + weighted loot selection
//! - artifact bonus aggregation and rarity fusion
//! - boss encounter state machine
//! - offline accrual, craft board, tick driver, save blob

pub mod accrual;
pub mod artifacts;
pub mod boss;
pub mod catalog;
pub mod craft;
pub mod loot;
pub mod pricing;
pub mod save;
pub mod sim;

pub use artifacts::{ArtifactInstance, ChannelBonuses, Rarity};
pub use boss::Encounter;
pub use catalog::{PurchaseTier, TaskKey};
pub use save::SaveState;
pub use sim::GameSim;
