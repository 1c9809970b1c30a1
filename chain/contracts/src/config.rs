//! Exchange configuration
//!
//! Fee rates, fee receiver, batch limit, rounding tolerance and signing
//! domain. Loaded from JSON or built from [`ExchangeConfig::default`]; every
//! field is checked by [`ExchangeConfig::validate`] before use.

use serde::{Deserialize, Serialize};

use exchange_types::errors::ExchangeError;
use exchange_types::ids::Address;
use exchange_types::numeric::{Amount, MAX_PROTOCOL_FEE_BPS};

use crate::signing::SigningDomain;

/// Default cap on order pairs per call.
pub const DEFAULT_MATCHING_LIMIT: usize = 50;

/// Default rounding tolerance denominator: 1000 rejects drift of 0.1% or more.
pub const DEFAULT_ROUNDING_TOLERANCE: Amount = 1_000;

/// Configuration for the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Fee in basis points when the seller is the asset's creator.
    pub protocol_fee_primary: Amount,
    /// Fee in basis points on every other sale.
    pub protocol_fee_secondary: Amount,
    /// Receives protocol fees. Must not be zero.
    pub default_fee_receiver: Address,
    /// Maximum order pairs per `match_orders` call.
    pub matching_limit: usize,
    /// Relative truncation drift of `1 / rounding_tolerance` or more is rejected.
    pub rounding_tolerance: Amount,
    /// When false, make-asset tokens must be whitelisted.
    pub whitelist_open: bool,
    /// Domain bound into every order signature.
    pub domain: SigningDomain,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            protocol_fee_primary: 0,
            protocol_fee_secondary: 250,
            default_fee_receiver: Address::from_label("fee-receiver"),
            matching_limit: DEFAULT_MATCHING_LIMIT,
            rounding_tolerance: DEFAULT_ROUNDING_TOLERANCE,
            whitelist_open: true,
            domain: SigningDomain::default(),
        }
    }
}

impl ExchangeConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ExchangeError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ExchangeError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Enforce the same limits the admin setters enforce.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        check_fee(self.protocol_fee_primary)?;
        check_fee(self.protocol_fee_secondary)?;
        if self.default_fee_receiver.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "default fee receiver" });
        }
        if self.matching_limit == 0 {
            return Err(ExchangeError::InvalidMatchingLimit);
        }
        if self.rounding_tolerance == 0 {
            return Err(ExchangeError::InvalidConfig {
                reason: "rounding tolerance must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Protocol fee rates must be strictly below the cap.
pub(crate) fn check_fee(bps: Amount) -> Result<(), ExchangeError> {
    if bps >= MAX_PROTOCOL_FEE_BPS {
        return Err(ExchangeError::FeeTooHigh { bps });
    }
    Ok(())
}
