//! Transfer & fee planning
//!
//! Turns a computed fill into the list of transfers that settle it. Nothing
//! here moves assets: the resulting [`TransferPlan`] is handed to an
//! [`AssetTransfer`] implementation which executes it all-or-nothing.
//!
//! The payment side of a pair is the fungible one. Its value is charged, in
//! order, creator royalties of the NFT being bought, then the protocol fee,
//! and what remains goes to the seller's payout accounts.

use serde::{Deserialize, Serialize};

use exchange_types::asset::AssetType;
use exchange_types::errors::{ExchangeError, TransferError};
use exchange_types::ids::Address;
use exchange_types::numeric::{bps_of, Amount};
use exchange_types::order::MatchSide;
use exchange_types::royalty::Part;

/// Which side of a pair pays fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeSide {
    Left,
    Right,
    /// Both or neither side is fungible: plain transfers only
    None,
}

impl FeeSide {
    /// Fee side from the two make assets of a pair.
    pub fn of(left_make: &AssetType, right_make: &AssetType) -> Self {
        match (left_make.is_fungible(), right_make.is_fungible()) {
            (true, false) => FeeSide::Left,
            (false, true) => FeeSide::Right,
            _ => FeeSide::None,
        }
    }

    pub fn side(&self) -> Option<MatchSide> {
        match self {
            FeeSide::Left => Some(MatchSide::Left),
            FeeSide::Right => Some(MatchSide::Right),
            FeeSide::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Payout,
    Royalty,
    ProtocolFee,
}

/// One asset movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub asset_type: AssetType,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    pub kind: TransferKind,
}

/// Ordered transfers settling one or more matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub intents: Vec<TransferIntent>,
}

impl TransferPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, other: TransferPlan) {
        self.intents.extend(other.intents);
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransferIntent> {
        self.intents.iter()
    }

    /// Total of `asset_type` received by `to` across the plan.
    pub fn received(&self, to: &Address, asset_type: &AssetType) -> Amount {
        self.intents
            .iter()
            .filter(|i| i.to == *to && i.asset_type == *asset_type)
            .map(|i| i.amount)
            .sum()
    }

    /// Total paid out under `kind`.
    pub fn total_of(&self, kind: TransferKind) -> Amount {
        self.intents
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.amount)
            .sum()
    }

    fn push(&mut self, asset_type: &AssetType, from: Address, to: Address, amount: Amount, kind: TransferKind) {
        if amount == 0 {
            return;
        }
        self.intents.push(TransferIntent {
            asset_type: asset_type.clone(),
            from,
            to,
            amount,
            kind,
        });
    }
}

/// Executes transfer plans against asset balances.
pub trait AssetTransfer {
    /// Move `amount` of `asset_type` from `from` to `to`.
    fn transfer(
        &mut self,
        asset_type: &AssetType,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Execute every intent of `plan` or none of them.
    fn execute(&mut self, plan: &TransferPlan) -> Result<(), TransferError>;
}

/// One side's delivery: what moves, how much, and where it goes.
#[derive(Debug, Clone, Copy)]
pub struct Leg<'a> {
    pub asset_type: &'a AssetType,
    pub amount: Amount,
    pub from: Address,
    /// Payout split of the receiving order
    pub payouts: &'a [Part],
}

/// What the payment leg is charged.
#[derive(Debug, Clone, Default)]
pub struct FeeTerms {
    pub royalties: Vec<Part>,
    pub protocol_fee_bps: Amount,
    pub fee_receiver: Address,
    /// Payer is exempt from royalties and protocol fee
    pub exempt: bool,
}

/// Unique assets always move exactly one unit.
pub fn check_unit_value(asset_type: &AssetType, amount: Amount) -> Result<(), ExchangeError> {
    if asset_type.is_unique() && amount != 1 {
        return Err(ExchangeError::NonUnitValue { value: amount });
    }
    Ok(())
}

/// Deliver a leg to the receiving order's payout accounts without fees.
pub fn transfer_payouts(leg: &Leg<'_>) -> Result<TransferPlan, ExchangeError> {
    let mut plan = TransferPlan::new();
    split_payouts(&mut plan, leg, leg.amount)?;
    Ok(plan)
}

/// Deliver the payment leg: royalties, protocol fee, then payouts.
pub fn settle_payment(leg: &Leg<'_>, terms: &FeeTerms) -> Result<TransferPlan, ExchangeError> {
    if terms.exempt {
        return transfer_payouts(leg);
    }
    let mut plan = TransferPlan::new();
    let mut rest = leg.amount;

    for record in &terms.royalties {
        if record.account.is_zero() {
            continue;
        }
        let amount = bps_of(leg.amount, record.basis_points)?;
        rest = rest.checked_sub(amount).ok_or(ExchangeError::Overflow)?;
        plan.push(leg.asset_type, leg.from, record.account, amount, TransferKind::Royalty);
    }

    let fee = bps_of(leg.amount, terms.protocol_fee_bps)?;
    if fee > 0 {
        if terms.fee_receiver.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "default fee receiver" });
        }
        rest = rest.checked_sub(fee).ok_or(ExchangeError::Overflow)?;
        plan.push(leg.asset_type, leg.from, terms.fee_receiver, fee, TransferKind::ProtocolFee);
    }

    split_payouts(&mut plan, leg, rest)?;
    Ok(plan)
}

/// Split `amount` over the payout parts; the last part takes the dust.
fn split_payouts(plan: &mut TransferPlan, leg: &Leg<'_>, amount: Amount) -> Result<(), ExchangeError> {
    let Some((last, rest)) = leg.payouts.split_last() else {
        return Err(ExchangeError::InvalidPayouts { total: 0 });
    };
    let mut remaining = amount;
    for part in rest {
        let share = bps_of(amount, part.basis_points)?;
        remaining = remaining.checked_sub(share).ok_or(ExchangeError::Overflow)?;
        plan.push(leg.asset_type, leg.from, part.account, share, TransferKind::Payout);
    }
    plan.push(leg.asset_type, leg.from, last.account, remaining, TransferKind::Payout);
    Ok(())
}
