//! Matching & settlement logic for the peer-signed order exchange
//!
//! Makers sign orders offline; anyone may submit a compatible pair. This
//! crate validates the pair, computes the maximal consistent fill, records
//! it against replay, and plans the transfers (royalties, protocol fee,
//! payouts) that settle it.
//!
//! # Modules
//! - `config`: Exchange configuration and validation
//! - `security`: Reentrancy guard, roles, pause switch
//! - `signing`: Typed order digests and Ed25519 signatures
//! - `validator`: Order validation and token whitelist
//! - `matcher`: Asset type equivalence
//! - `fill`: Integer fill computation
//! - `ledger`: Fill ledger and batch-staged view
//! - `royalties`: Royalties registry and resolution
//! - `transfer`: Fee side, transfer plans, asset-transfer interface
//! - `vault`: In-memory asset custody executing transfer plans
//! - `engine`: Pure batch planner
//! - `exchange`: Stateful entry points and administration
//! - `events`: Exchange events

pub mod config;
pub mod security;
pub mod signing;
pub mod validator;
pub mod matcher;
pub mod fill;
pub mod ledger;
pub mod royalties;
pub mod transfer;
pub mod vault;
pub mod engine;
pub mod events;
pub mod exchange;

pub use config::ExchangeConfig;
pub use engine::{plan_batch, BatchPlan, MatchContext, OrderPair};
pub use events::{ExchangeEvent, MatchRecord};
pub use exchange::Exchange;
pub use transfer::{AssetTransfer, TransferPlan};
pub use vault::AssetVault;

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
