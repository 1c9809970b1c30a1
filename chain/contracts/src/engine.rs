//! Matching engine
//!
//! Pure planning of a batch of order pairs. Every pair is validated, matched
//! and filled against a staged view of the fill ledger, so pairs later in a
//! batch see the fills of earlier ones. Nothing is written: the result is a
//! [`BatchPlan`] the caller commits as a whole, or drops on any error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use exchange_types::asset::AssetType;
use exchange_types::errors::ExchangeError;
use exchange_types::ids::{Address, OrderKey};
use exchange_types::numeric::Amount;
use exchange_types::order::{MatchSide, Order};
use exchange_types::royalty::RoyaltyType;

use crate::config::ExchangeConfig;
use crate::events::MatchRecord;
use crate::fill::fill_order;
use crate::ledger::{FillLedger, StagedFills};
use crate::matcher::AssetMatcher;
use crate::royalties::RoyaltiesRegistry;
use crate::security::{AccessControl, Role};
use crate::transfer::{
    check_unit_value, settle_payment, transfer_payouts, FeeSide, FeeTerms, Leg, TransferPlan,
};
use crate::validator::OrderValidator;

/// Two orders submitted for matching, with the makers' signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPair {
    pub left: Order,
    pub left_signature: Vec<u8>,
    pub right: Order,
    pub right_signature: Vec<u8>,
}

impl OrderPair {
    pub fn new(left: Order, left_signature: Vec<u8>, right: Order, right_signature: Vec<u8>) -> Self {
        Self {
            left,
            left_signature,
            right,
            right_signature,
        }
    }

    /// Pair submitted by a maker of both orders or with zero-salt orders.
    pub fn unsigned(left: Order, right: Order) -> Self {
        Self::new(left, Vec::new(), right, Vec::new())
    }
}

/// Read-only state a batch is planned against.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Recorded as the submitter of each match
    pub caller: Address,
    /// Identity used for maker-submitted and zero-salt authorization
    pub sender: Address,
    pub now: u64,
    pub config: &'a ExchangeConfig,
    pub validator: &'a OrderValidator,
    pub matcher: &'a AssetMatcher,
    pub royalties: &'a RoyaltiesRegistry,
    pub access: &'a AccessControl,
}

/// Everything a successful batch changes.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    /// New cumulative fills, keyed by order key
    pub fills: HashMap<OrderKey, Amount>,
    /// Royalty classifications computed while planning
    pub royalty_types: HashMap<Address, RoyaltyType>,
    pub transfers: TransferPlan,
    pub records: Vec<MatchRecord>,
}

/// Plan a whole batch or fail it.
pub fn plan_batch(
    ledger: &FillLedger,
    ctx: &MatchContext<'_>,
    pairs: &[OrderPair],
) -> Result<BatchPlan, ExchangeError> {
    if pairs.is_empty() {
        return Err(ExchangeError::EmptyBatch);
    }
    let limit = ctx.config.matching_limit;
    if pairs.len() > limit {
        return Err(ExchangeError::TooManyMatches {
            count: pairs.len(),
            limit,
        });
    }

    let mut staged = StagedFills::new(ledger);
    let mut plan = BatchPlan::default();
    for pair in pairs {
        let planned = plan_pair(&mut staged, ctx, pair)?;
        plan.transfers.extend(planned.transfers);
        for (token, royalty_type) in planned.royalty_types {
            plan.royalty_types.entry(token).or_insert(royalty_type);
        }
        plan.records.push(planned.record);
    }
    plan.fills = staged.into_updates();
    Ok(plan)
}

/// Result of planning a single pair.
#[derive(Debug, Clone)]
pub struct PairPlan {
    pub record: MatchRecord,
    pub transfers: TransferPlan,
    pub royalty_types: Vec<(Address, RoyaltyType)>,
}

/// Validate, match and fill one pair against the staged ledger.
pub fn plan_pair(
    staged: &mut StagedFills<'_>,
    ctx: &MatchContext<'_>,
    pair: &OrderPair,
) -> Result<PairPlan, ExchangeError> {
    let OrderPair {
        left,
        left_signature,
        right,
        right_signature,
    } = pair;
    let domain = &ctx.config.domain;

    ctx.validator.validate(left, left_signature, &ctx.sender, ctx.now, domain)?;
    ctx.validator.validate(right, right_signature, &ctx.sender, ctx.now, domain)?;

    if !left.accepts_taker(&right.maker) {
        return Err(ExchangeError::TakerMismatch { side: MatchSide::Left });
    }
    if !right.accepts_taker(&left.maker) {
        return Err(ExchangeError::TakerMismatch { side: MatchSide::Right });
    }

    let make_match = ctx
        .matcher
        .match_assets(&left.make_asset.asset_type, &right.take_asset.asset_type)
        .ok_or(ExchangeError::AssetMismatch { side: MatchSide::Left })?;
    let take_match = ctx
        .matcher
        .match_assets(&right.make_asset.asset_type, &left.take_asset.asset_type)
        .ok_or(ExchangeError::AssetMismatch { side: MatchSide::Right })?;

    let left_key = left.key();
    let right_key = right.key();
    let left_prior = prior_fill(staged, left, &left_key)?;
    let right_prior = prior_fill(staged, right, &right_key)?;

    let fill = fill_order(left, right, left_prior, right_prior, ctx.config.rounding_tolerance)?;
    check_unit_value(&make_match, fill.left_value)?;
    check_unit_value(&take_match, fill.right_value)?;

    // Each order's fill is counted in its take units
    let left_fill = record_fill(staged, left, left_key, left_prior, fill.right_value)?;
    let right_fill = record_fill(staged, right, right_key, right_prior, fill.left_value)?;

    let left_payouts = left.data.payouts_or(left.maker);
    let right_payouts = right.data.payouts_or(right.maker);
    let left_leg = Leg {
        asset_type: &make_match,
        amount: fill.left_value,
        from: left.maker,
        payouts: &right_payouts,
    };
    let right_leg = Leg {
        asset_type: &take_match,
        amount: fill.right_value,
        from: right.maker,
        payouts: &left_payouts,
    };

    let mut transfers = TransferPlan::new();
    let mut royalty_types = Vec::new();
    match FeeSide::of(&make_match, &take_match) {
        FeeSide::Left => {
            let terms = fee_terms(ctx, &left.maker, &take_match, &right.maker, &mut royalty_types)?;
            transfers.extend(settle_payment(&left_leg, &terms)?);
            transfers.extend(transfer_payouts(&right_leg)?);
        }
        FeeSide::Right => {
            let terms = fee_terms(ctx, &right.maker, &make_match, &left.maker, &mut royalty_types)?;
            transfers.extend(settle_payment(&right_leg, &terms)?);
            transfers.extend(transfer_payouts(&left_leg)?);
        }
        FeeSide::None => {
            transfers.extend(transfer_payouts(&left_leg)?);
            transfers.extend(transfer_payouts(&right_leg)?);
        }
    }

    debug!(
        %left_key,
        %right_key,
        left_value = %fill.left_value,
        right_value = %fill.right_value,
        transfers = transfers.len(),
        "pair planned"
    );

    Ok(PairPlan {
        record: MatchRecord {
            caller: ctx.caller,
            left_key,
            right_key,
            left_order: left.clone(),
            right_order: right.clone(),
            left_fill,
            right_fill,
            left_value: fill.left_value,
            right_value: fill.right_value,
        },
        transfers,
        royalty_types,
    })
}

/// Zero-salt orders are never recorded and always start unfilled.
fn prior_fill(staged: &StagedFills<'_>, order: &Order, key: &OrderKey) -> Result<Amount, ExchangeError> {
    if order.salt == 0 {
        return Ok(0);
    }
    staged.fill_of(key)
}

fn record_fill(
    staged: &mut StagedFills<'_>,
    order: &Order,
    key: OrderKey,
    prior: Amount,
    received: Amount,
) -> Result<Amount, ExchangeError> {
    if order.salt == 0 {
        return prior.checked_add(received).ok_or(ExchangeError::Overflow);
    }
    staged.add(key, received)
}

/// Royalties, protocol fee rate and exemption for the paying side.
fn fee_terms(
    ctx: &MatchContext<'_>,
    payer: &Address,
    nft: &AssetType,
    seller: &Address,
    royalty_types: &mut Vec<(Address, RoyaltyType)>,
) -> Result<FeeTerms, ExchangeError> {
    if ctx.access.has_role(payer, Role::FeeExempt) {
        return Ok(FeeTerms {
            exempt: true,
            ..FeeTerms::default()
        });
    }
    let resolution = ctx.royalties.resolve(nft)?;
    royalty_types.extend(resolution.cache);

    let primary = nft
        .nft_id()
        .and_then(|(token, token_id)| ctx.royalties.creator_of(&token, token_id))
        .map_or(false, |creator| creator == *seller);
    let protocol_fee_bps = if primary {
        ctx.config.protocol_fee_primary
    } else {
        ctx.config.protocol_fee_secondary
    };

    Ok(FeeTerms {
        royalties: resolution.records,
        protocol_fee_bps,
        fee_receiver: ctx.config.default_fee_receiver,
        exempt: false,
    })
}
