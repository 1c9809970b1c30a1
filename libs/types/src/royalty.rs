//! Royalty records and royalty-type classification

use serde::{Deserialize, Serialize};

use crate::errors::ExchangeError;
use crate::ids::Address;
use crate::numeric::Amount;

/// A basis-point share owed to an account.
///
/// Used both for creator royalties and for order payout splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    pub account: Address,
    pub basis_points: Amount,
}

impl Part {
    pub fn new(account: Address, basis_points: Amount) -> Self {
        Self { account, basis_points }
    }
}

/// A creator royalty entry.
pub type RoyaltyRecord = Part;

/// Checked sum of the basis points of a set of parts.
pub fn total_basis_points(parts: &[Part]) -> Result<Amount, ExchangeError> {
    parts.iter().try_fold(0 as Amount, |acc, part| {
        acc.checked_add(part.basis_points).ok_or(ExchangeError::Overflow)
    })
}

/// How royalties for a token contract are looked up.
///
/// Resolved lazily on first query and cached per token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoyaltyType {
    /// Not resolved yet
    #[default]
    Unset,
    /// Records set through the registry by the token owner or an admin
    ByRegistryEntry,
    /// An external provider registered for the token
    ByExternalProvider,
    /// The token's own royalty interface
    ByAssetNativeInterface,
    /// No royalties
    None,
}
