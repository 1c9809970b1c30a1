//! Royalties registry
//!
//! Resolves the creator royalties owed on an NFT sale. Each token contract
//! has a [`RoyaltyType`] that selects where records come from; it is
//! classified on first use and cached per contract.
//!
//! Resolution never writes: the classification a lookup computed is handed
//! back in [`Resolution::cache`] and the caller commits it once the batch it
//! belongs to has succeeded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use exchange_types::asset::AssetType;
use exchange_types::errors::{ExchangeError, ProviderError};
use exchange_types::ids::Address;
use exchange_types::numeric::{mul_div, Amount, BPS_DENOMINATOR, MAX_ROYALTY_BPS};
use exchange_types::royalty::{total_basis_points, Part, RoyaltyType};

/// Sale price passed to the native single-receiver method; the returned
/// amount is converted to basis points against it.
pub const NATIVE_ROYALTY_WEIGHT: Amount = 1_000_000;

/// External royalty source registered for a token contract.
pub trait RoyaltiesProvider: fmt::Debug + Send + Sync {
    fn royalties(&self, token: &Address, token_id: u128) -> Result<Vec<Part>, ProviderError>;
}

/// Royalty methods a token contract may expose itself.
///
/// Every method returns `None` when the contract does not implement it.
pub trait NativeRoyalties: fmt::Debug + Send + Sync {
    /// Single receiver and the amount owed on `sale_price`.
    fn royalty_info(&self, token_id: u128, sale_price: Amount) -> Option<(Address, Amount)>;

    /// Multi-recipient royalty list.
    fn recipients(&self, _token_id: u128) -> Option<Vec<Part>> {
        None
    }

    /// Original creator of the token.
    fn creator_of(&self, _token_id: u128) -> Option<Address> {
        None
    }

    /// Owner of the token contract, allowed to set registry entries.
    fn owner(&self) -> Option<Address> {
        None
    }
}

/// Outcome of a royalty lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub records: Vec<Part>,
    /// Classification to persist if the lookup had to compute one
    pub cache: Option<(Address, RoyaltyType)>,
}

#[derive(Debug, Clone, Default)]
pub struct RoyaltiesRegistry {
    by_token: HashMap<Address, Vec<Part>>,
    providers: HashMap<Address, Arc<dyn RoyaltiesProvider>>,
    native: HashMap<Address, Arc<dyn NativeRoyalties>>,
    types: HashMap<Address, RoyaltyType>,
}

impl RoyaltiesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ───────────────────────── Administration ─────────────────────────

    /// Replace the registry entry of a token and reclassify it.
    ///
    /// Records are capped at 100% here; the 50% match-time cap applies later.
    pub fn set_royalties_by_token(&mut self, token: Address, records: Vec<Part>) -> Result<(), ExchangeError> {
        if token.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "token" });
        }
        let total = total_basis_points(&records)?;
        if total > BPS_DENOMINATOR {
            return Err(ExchangeError::InvalidRoyalties { total });
        }
        if records.iter().any(|r| r.account.is_zero()) {
            return Err(ExchangeError::ZeroAddress { field: "royalty account" });
        }
        self.by_token.insert(token, records);
        self.types.insert(token, RoyaltyType::ByRegistryEntry);
        Ok(())
    }

    /// Register an external provider for a token and reclassify it.
    pub fn set_provider_by_token(&mut self, token: Address, provider: Arc<dyn RoyaltiesProvider>) {
        self.providers.insert(token, provider);
        self.types.insert(token, RoyaltyType::ByExternalProvider);
    }

    /// Attach a token contract's own royalty interface.
    pub fn register_native_interface(&mut self, token: Address, native: Arc<dyn NativeRoyalties>) {
        self.native.insert(token, native);
    }

    pub fn force_set_royalties_type(&mut self, token: Address, royalty_type: RoyaltyType) {
        self.types.insert(token, royalty_type);
    }

    /// Forget the cached classification; the next lookup recomputes it.
    pub fn clear_royalties_type(&mut self, token: &Address) {
        self.types.remove(token);
    }

    /// Persist a classification computed by [`resolve`](Self::resolve).
    pub fn commit_type(&mut self, token: Address, royalty_type: RoyaltyType) {
        self.types.entry(token).or_insert(royalty_type);
    }

    // ───────────────────────── Queries ─────────────────────────

    /// Cached classification, `Unset` when none.
    pub fn royalties_type(&self, token: &Address) -> RoyaltyType {
        self.types.get(token).copied().unwrap_or_default()
    }

    /// Owner reported by the token contract's native interface.
    pub fn token_owner(&self, token: &Address) -> Option<Address> {
        self.native.get(token).and_then(|native| native.owner())
    }

    /// Creator of a specific token, when the contract reports one.
    pub fn creator_of(&self, token: &Address, token_id: u128) -> Option<Address> {
        self.native
            .get(token)
            .and_then(|native| native.creator_of(token_id))
    }

    /// Royalty records owed on a sale of `asset_type`.
    ///
    /// Only item-identified assets carry royalties. Fails with
    /// `RoyaltiesTooHigh` when the records add up to more than 50%.
    pub fn resolve(&self, asset_type: &AssetType) -> Result<Resolution, ExchangeError> {
        let Some((token, token_id)) = asset_type.nft_id() else {
            return Ok(Resolution::default());
        };

        let (royalty_type, cache) = match self.royalties_type(&token) {
            RoyaltyType::Unset => {
                let computed = self.classify(&token);
                (computed, Some((token, computed)))
            }
            cached => (cached, None),
        };

        let records = match royalty_type {
            RoyaltyType::ByRegistryEntry => self.by_token.get(&token).cloned().unwrap_or_default(),
            RoyaltyType::ByExternalProvider => self.from_provider(&token, token_id),
            RoyaltyType::ByAssetNativeInterface => self.from_native(&token, token_id)?,
            RoyaltyType::None | RoyaltyType::Unset => Vec::new(),
        };

        let total_bps = total_basis_points(&records)?;
        if total_bps > MAX_ROYALTY_BPS {
            return Err(ExchangeError::RoyaltiesTooHigh { total_bps });
        }
        Ok(Resolution { records, cache })
    }

    fn classify(&self, token: &Address) -> RoyaltyType {
        if self.by_token.contains_key(token) {
            RoyaltyType::ByRegistryEntry
        } else if self.providers.contains_key(token) {
            RoyaltyType::ByExternalProvider
        } else if self.native.contains_key(token) {
            RoyaltyType::ByAssetNativeInterface
        } else {
            RoyaltyType::None
        }
    }

    fn from_provider(&self, token: &Address, token_id: u128) -> Vec<Part> {
        let Some(provider) = self.providers.get(token) else {
            return Vec::new();
        };
        match provider.royalties(token, token_id) {
            Ok(records) => records,
            Err(e) => {
                warn!(%token, token_id, error = %e, "royalties provider failed, no royalties applied");
                Vec::new()
            }
        }
    }

    fn from_native(&self, token: &Address, token_id: u128) -> Result<Vec<Part>, ExchangeError> {
        let Some(native) = self.native.get(token) else {
            return Ok(Vec::new());
        };
        if let Some((receiver, amount)) = native.royalty_info(token_id, NATIVE_ROYALTY_WEIGHT) {
            if receiver.is_zero() || amount == 0 {
                return Ok(Vec::new());
            }
            let basis_points = mul_div(amount, BPS_DENOMINATOR, NATIVE_ROYALTY_WEIGHT)?;
            return Ok(vec![Part::new(receiver, basis_points)]);
        }
        Ok(native.recipients(token_id).unwrap_or_default())
    }
}
