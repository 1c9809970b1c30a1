//! Error types for the exchange
//!
//! Comprehensive error taxonomy using thiserror. Every rejection carries a
//! stable [`ExchangeError::code`] so callers and tests can assert on cause.

use thiserror::Error;

use crate::ids::Address;
use crate::numeric::Amount;
use crate::order::MatchSide;

/// Broad classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller can fix the request; nothing was mutated.
    Precondition,
    /// The caller or sender may not act on this order.
    Authorization,
    /// Order parameters do not produce a clean integer fill; nothing was mutated.
    Arithmetic,
    /// The order key is cancelled or exhausted. Permanent for that key.
    TerminalOrderState,
    /// The asset-transfer collaborator refused the settlement plan.
    Collaborator,
}

/// Top-level exchange error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    // ─── Preconditions ───
    #[error("Empty batch: no order pairs submitted")]
    EmptyBatch,

    #[error("Too many matches: {count} pairs submitted, limit is {limit}")]
    TooManyMatches { count: usize, limit: usize },

    #[error("Exchange is paused")]
    Paused,

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Unauthorized: {caller} lacks the required role")]
    Unauthorized { caller: Address },

    #[error("Sender must not be the zero address")]
    ZeroSender,

    #[error("{field} must not be the zero address")]
    ZeroAddress { field: &'static str },

    #[error("Order has no maker")]
    NoMaker,

    #[error("Maker is not the transaction sender")]
    NotMaker,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Taker restriction of the {side} order does not allow this counterparty")]
    TakerMismatch { side: MatchSide },

    #[error("Order not started: starts at {start}, now {now}")]
    OrderNotStarted { start: u64, now: u64 },

    #[error("Order expired: ended at {end}, now {now}")]
    OrderExpired { end: u64, now: u64 },

    #[error("Assets don't match on the {side} make side")]
    AssetMismatch { side: MatchSide },

    #[error("Unique asset transfers must move exactly 1 unit, got {value}")]
    NonUnitValue { value: Amount },

    #[error("Token not whitelisted: {token}")]
    TokenNotWhitelisted { token: Address },

    #[error("Order key does not match the order")]
    InvalidOrderKey,

    #[error("Orders with zero salt cannot be cancelled")]
    ZeroSaltCancel,

    #[error("Payout shares must sum to 10000 basis points, got {total}")]
    InvalidPayouts { total: Amount },

    #[error("Royalties must not exceed 10000 basis points, got {total}")]
    InvalidRoyalties { total: Amount },

    #[error("Protocol fee {bps} basis points is not below the cap")]
    FeeTooHigh { bps: Amount },

    #[error("Matching limit must be at least 1")]
    InvalidMatchingLimit,

    #[error("Invalid address: {value}")]
    InvalidAddress { value: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ─── Arithmetic ───
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Rounding error exceeds tolerance")]
    RoundingError,

    #[error("Fill computed a zero amount on one side")]
    ZeroFill,

    #[error("fillLeft: unable to fill")]
    UnableToFillLeft,

    #[error("fillRight: unable to fill")]
    UnableToFillRight,

    #[error("Royalties are too high: {total_bps} basis points")]
    RoyaltiesTooHigh { total_bps: Amount },

    #[error("Arithmetic overflow")]
    Overflow,

    // ─── Terminal order state ───
    #[error("Order cancelled: {key}")]
    OrderCancelled { key: crate::ids::OrderKey },

    #[error("Nothing to fill")]
    NothingToFill,

    // ─── Collaborators ───
    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl ExchangeError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            ExchangeError::EmptyBatch => "EMPTY_BATCH",
            ExchangeError::TooManyMatches { .. } => "TOO_MANY_MATCHES",
            ExchangeError::Paused => "PAUSED",
            ExchangeError::Reentrancy => "REENTRANCY",
            ExchangeError::Unauthorized { .. } => "UNAUTHORIZED",
            ExchangeError::ZeroSender => "ZERO_SENDER",
            ExchangeError::ZeroAddress { .. } => "ZERO_ADDRESS",
            ExchangeError::NoMaker => "NO_MAKER",
            ExchangeError::NotMaker => "NOT_MAKER",
            ExchangeError::SignatureInvalid => "SIGNATURE_INVALID",
            ExchangeError::TakerMismatch { .. } => "TAKER_MISMATCH",
            ExchangeError::OrderNotStarted { .. } => "ORDER_NOT_STARTED",
            ExchangeError::OrderExpired { .. } => "ORDER_EXPIRED",
            ExchangeError::AssetMismatch { .. } => "ASSET_MISMATCH",
            ExchangeError::NonUnitValue { .. } => "NON_UNIT_VALUE",
            ExchangeError::TokenNotWhitelisted { .. } => "TOKEN_NOT_WHITELISTED",
            ExchangeError::InvalidOrderKey => "INVALID_ORDER_KEY",
            ExchangeError::ZeroSaltCancel => "ZERO_SALT_CANCEL",
            ExchangeError::InvalidPayouts { .. } => "INVALID_PAYOUTS",
            ExchangeError::InvalidRoyalties { .. } => "INVALID_ROYALTIES",
            ExchangeError::FeeTooHigh { .. } => "FEE_TOO_HIGH",
            ExchangeError::InvalidMatchingLimit => "INVALID_MATCHING_LIMIT",
            ExchangeError::InvalidAddress { .. } => "INVALID_ADDRESS",
            ExchangeError::InvalidConfig { .. } => "INVALID_CONFIG",
            ExchangeError::DivisionByZero => "DIVISION_BY_ZERO",
            ExchangeError::RoundingError => "ROUNDING_ERROR",
            ExchangeError::ZeroFill => "ZERO_FILL",
            ExchangeError::UnableToFillLeft => "UNABLE_TO_FILL_LEFT",
            ExchangeError::UnableToFillRight => "UNABLE_TO_FILL_RIGHT",
            ExchangeError::RoyaltiesTooHigh { .. } => "ROYALTIES_TOO_HIGH",
            ExchangeError::Overflow => "OVERFLOW",
            ExchangeError::OrderCancelled { .. } => "ORDER_CANCELLED",
            ExchangeError::NothingToFill => "NOTHING_TO_FILL",
            ExchangeError::Transfer(inner) => inner.code(),
        }
    }

    /// Which of the error families this rejection belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            ExchangeError::DivisionByZero
            | ExchangeError::RoundingError
            | ExchangeError::ZeroFill
            | ExchangeError::UnableToFillLeft
            | ExchangeError::UnableToFillRight
            | ExchangeError::RoyaltiesTooHigh { .. }
            | ExchangeError::Overflow => ErrorClass::Arithmetic,
            ExchangeError::OrderCancelled { .. } | ExchangeError::NothingToFill => {
                ErrorClass::TerminalOrderState
            }
            ExchangeError::Transfer(_) => ErrorClass::Collaborator,
            ExchangeError::Unauthorized { .. }
            | ExchangeError::NotMaker
            | ExchangeError::SignatureInvalid
            | ExchangeError::TakerMismatch { .. } => ErrorClass::Authorization,
            _ => ErrorClass::Precondition,
        }
    }
}

/// Errors raised by the asset-transfer collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Unique asset transfer needs value 1, got {value}")]
    NonUnitValue { value: Amount },

    #[error("Insufficient balance of {token}: required {required}, available {available}")]
    InsufficientBalance {
        token: Address,
        required: Amount,
        available: Amount,
    },

    #[error("{from} does not own token {token_id} of {token}")]
    NotOwner {
        token: Address,
        token_id: u128,
        from: Address,
    },

    #[error("Bundles cannot contain bundles")]
    NestedBundle,

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

impl TransferError {
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::NonUnitValue { .. } => "NON_UNIT_VALUE",
            TransferError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            TransferError::NotOwner { .. } => "NOT_OWNER",
            TransferError::NestedBundle => "NESTED_BUNDLE",
            TransferError::Overflow => "TRANSFER_OVERFLOW",
        }
    }
}

/// Errors from an external royalties provider. Never fatal to a match: the
/// resolver treats them as "no royalties".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider call failed: {reason}")]
    CallFailed { reason: String },

    #[error("Provider returned malformed data")]
    Malformed,
}
