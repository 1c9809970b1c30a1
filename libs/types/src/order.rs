//! Signed order types and their hashes
//!
//! An order never lives in storage: it exists as a signed message and is
//! tracked only through its [`order_key`] in the fill ledger.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::asset::{encode_len, Asset};
use crate::errors::ExchangeError;
use crate::ids::{Address, OrderKey};
use crate::numeric::BPS_DENOMINATOR;
use crate::royalty::{total_basis_points, Part};

/// Which order of a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSide {
    Left,
    Right,
}

impl MatchSide {
    pub fn opposite(&self) -> Self {
        match self {
            MatchSide::Left => MatchSide::Right,
            MatchSide::Right => MatchSide::Left,
        }
    }
}

impl fmt::Display for MatchSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSide::Left => f.write_str("left"),
            MatchSide::Right => f.write_str("right"),
        }
    }
}

/// Extensible order payload selected by its data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderData {
    /// No extra semantics
    #[default]
    Default,
    /// What the order receives is split over these accounts.
    /// Shares must sum to exactly 10000 basis points.
    Payouts { payouts: Vec<Part> },
}

impl OrderData {
    fn type_name(&self) -> &'static str {
        match self {
            OrderData::Default => "DEFAULT",
            OrderData::Payouts { .. } => "PAYOUTS",
        }
    }

    /// Four-byte data type selector.
    pub fn data_type(&self) -> [u8; 4] {
        let digest = Sha256::digest(self.type_name().as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            OrderData::Default => Vec::new(),
            OrderData::Payouts { payouts } => {
                let mut out = Vec::with_capacity(8 + payouts.len() * 48);
                encode_len(&mut out, payouts.len());
                for part in payouts {
                    out.extend_from_slice(part.account.as_bytes());
                    out.extend_from_slice(&part.basis_points.to_be_bytes());
                }
                out
            }
        }
    }

    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.data_type());
        hasher.update(self.encode());
        hasher.finalize().into()
    }

    /// Payout split for what the order receives; the maker alone by default.
    pub fn payouts_or(&self, maker: Address) -> Vec<Part> {
        match self {
            OrderData::Payouts { payouts } if !payouts.is_empty() => payouts.clone(),
            _ => vec![Part::new(maker, BPS_DENOMINATOR)],
        }
    }

    /// Reject payout splits that do not add up to 100% or pay the zero address.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if let OrderData::Payouts { payouts } = self {
            let total = total_basis_points(payouts)?;
            if total != BPS_DENOMINATOR {
                return Err(ExchangeError::InvalidPayouts { total });
            }
            if payouts.iter().any(|p| p.account.is_zero()) {
                return Err(ExchangeError::ZeroAddress { field: "payout account" });
            }
        }
        Ok(())
    }
}

/// A maker's signed offer: give `make_asset`, receive `take_asset`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub maker: Address,
    pub make_asset: Asset,
    /// `Address::ZERO` allows any counterparty
    pub taker: Address,
    pub take_asset: Asset,
    /// Zero means only the maker may submit this order
    pub salt: u128,
    /// Unix seconds, 0 = no lower bound
    pub start: u64,
    /// Unix seconds, 0 = no upper bound
    pub end: u64,
    #[serde(default)]
    pub data: OrderData,
}

impl Order {
    /// Open-ended order with default data.
    pub fn new(maker: Address, make_asset: Asset, taker: Address, take_asset: Asset, salt: u128) -> Self {
        Self {
            maker,
            make_asset,
            taker,
            take_asset,
            salt,
            start: 0,
            end: 0,
            data: OrderData::Default,
        }
    }

    pub fn with_window(mut self, start: u64, end: u64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_data(mut self, data: OrderData) -> Self {
        self.data = data;
        self
    }

    /// Validity window check, bounds inclusive, 0 meaning unbounded.
    pub fn check_time(&self, now: u64) -> Result<(), ExchangeError> {
        if self.start != 0 && now < self.start {
            return Err(ExchangeError::OrderNotStarted { start: self.start, now });
        }
        if self.end != 0 && now > self.end {
            return Err(ExchangeError::OrderExpired { end: self.end, now });
        }
        Ok(())
    }

    pub fn is_active_at(&self, now: u64) -> bool {
        self.check_time(now).is_ok()
    }

    /// Whether `counterparty` satisfies this order's taker restriction.
    pub fn accepts_taker(&self, counterparty: &Address) -> bool {
        self.taker.is_zero() || self.taker == *counterparty
    }

    pub fn key(&self) -> OrderKey {
        order_key(self)
    }

    pub fn hash(&self) -> [u8; 32] {
        canonical_hash(self)
    }
}

/// Replay-protection key of an order.
///
/// Zero-salt orders hash maker, both asset type hashes and salt only, so the
/// key is stable whatever payload the maker attaches. Salted orders also
/// commit to non-default data.
pub fn order_key(order: &Order) -> OrderKey {
    let mut hasher = Sha256::new();
    hasher.update(b"OrderKey");
    hasher.update(order.maker.as_bytes());
    hasher.update(order.make_asset.asset_type.type_hash());
    hasher.update(order.take_asset.asset_type.type_hash());
    hasher.update(order.salt.to_be_bytes());
    if order.salt != 0 && order.data != OrderData::Default {
        hasher.update(order.data.hash());
    }
    OrderKey::from_bytes(hasher.finalize().into())
}

fn asset_hash(asset: &Asset) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"Asset(AssetType assetType,uint256 value)");
    hasher.update(asset.asset_type.type_hash());
    hasher.update(asset.value.to_be_bytes());
    hasher.finalize().into()
}

/// Full structured hash of an order, the message makers sign.
pub fn canonical_hash(order: &Order) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(
        b"Order(address maker,Asset makeAsset,address taker,Asset takeAsset,uint256 salt,uint256 start,uint256 end,bytes4 dataType,bytes data)",
    );
    hasher.update(order.maker.as_bytes());
    hasher.update(asset_hash(&order.make_asset));
    hasher.update(order.taker.as_bytes());
    hasher.update(asset_hash(&order.take_asset));
    hasher.update(order.salt.to_be_bytes());
    hasher.update(order.start.to_be_bytes());
    hasher.update(order.end.to_be_bytes());
    hasher.update(order.data.data_type());
    hasher.update(Sha256::digest(order.data.encode()));
    hasher.finalize().into()
}
