//! Asset vault: in-memory custody and the default transfer executor
//!
//! Holds every asset class the exchange settles:
//! - Fungible balances by (owner, token)
//! - Semi-fungible balances by (owner, token, id)
//! - Unique token ownership by (token, id)
//! - Bundles, moved item by item
//!
//! Plans execute all-or-nothing: a failing intent restores the state the
//! vault had before the plan started.

use std::collections::HashMap;

use tracing::debug;

use exchange_types::asset::{AssetType, BundleItem};
use exchange_types::errors::TransferError;
use exchange_types::ids::Address;
use exchange_types::numeric::Amount;

use crate::transfer::{AssetTransfer, TransferPlan};

/// Balance bucket inside one owner's holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Holding {
    Fungible(Address),
    SemiFungible(Address, u128),
}

/// In-memory asset custody.
#[derive(Debug, Clone, Default)]
pub struct AssetVault {
    /// Balances: owner -> (holding -> amount)
    balances: HashMap<Address, HashMap<Holding, Amount>>,
    /// Unique tokens: (token, id) -> owner
    owners: HashMap<(Address, u128), Address>,
}

impl AssetVault {
    pub fn new() -> Self {
        Self::default()
    }

    // ───────────────────────── Minting ─────────────────────────

    pub fn mint_erc20(&mut self, token: Address, to: Address, amount: Amount) -> Result<(), TransferError> {
        self.safe_credit(to, Holding::Fungible(token), amount)
    }

    pub fn mint_erc1155(
        &mut self,
        token: Address,
        token_id: u128,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.safe_credit(to, Holding::SemiFungible(token, token_id), amount)
    }

    /// Assign a unique token, replacing any previous owner.
    pub fn mint_erc721(&mut self, token: Address, token_id: u128, to: Address) {
        self.owners.insert((token, token_id), to);
    }

    // ───────────────────────── Balance Queries ─────────────────────────

    pub fn balance_of(&self, token: &Address, owner: &Address) -> Amount {
        self.holding(owner, &Holding::Fungible(*token))
    }

    pub fn balance_of_1155(&self, token: &Address, token_id: u128, owner: &Address) -> Amount {
        self.holding(owner, &Holding::SemiFungible(*token, token_id))
    }

    pub fn owner_of(&self, token: &Address, token_id: u128) -> Option<Address> {
        self.owners.get(&(*token, token_id)).copied()
    }

    /// Holdings of `owner` in the same units a transfer of `asset_type` uses.
    pub fn balance(&self, asset_type: &AssetType, owner: &Address) -> Amount {
        match asset_type {
            AssetType::Erc20 { token } => self.balance_of(token, owner),
            AssetType::Erc1155 { token, token_id } => self.balance_of_1155(token, *token_id, owner),
            AssetType::Erc721 { token, token_id } => {
                Amount::from(self.owner_of(token, *token_id) == Some(*owner))
            }
            // A bundle has no balance of its own
            AssetType::Bundle { .. } => 0,
        }
    }

    fn holding(&self, owner: &Address, holding: &Holding) -> Amount {
        self.balances
            .get(owner)
            .and_then(|held| held.get(holding))
            .copied()
            .unwrap_or(0)
    }

    // ───────────────────────── Safe Transfer ─────────────────────────

    fn safe_credit(&mut self, owner: Address, holding: Holding, amount: Amount) -> Result<(), TransferError> {
        let current = self.balances.entry(owner).or_default().entry(holding).or_insert(0);
        *current = current.checked_add(amount).ok_or(TransferError::Overflow)?;
        Ok(())
    }

    fn safe_debit(&mut self, owner: &Address, holding: Holding, amount: Amount) -> Result<(), TransferError> {
        let token = match holding {
            Holding::Fungible(token) | Holding::SemiFungible(token, _) => token,
        };
        let available = self.holding(owner, &holding);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                token,
                required: amount,
                available,
            });
        }
        if let Some(current) = self.balances.get_mut(owner).and_then(|held| held.get_mut(&holding)) {
            *current = available - amount;
        }
        Ok(())
    }

    fn move_holding(
        &mut self,
        holding: Holding,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.safe_debit(from, holding, amount)?;
        self.safe_credit(*to, holding, amount)
    }

    fn move_unique(
        &mut self,
        token: Address,
        token_id: u128,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if amount != 1 {
            return Err(TransferError::NonUnitValue { value: amount });
        }
        match self.owners.get_mut(&(token, token_id)) {
            Some(owner) if owner == from => {
                *owner = *to;
                Ok(())
            }
            _ => Err(TransferError::NotOwner { token, token_id, from: *from }),
        }
    }

    fn move_bundle(
        &mut self,
        items: &[BundleItem],
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        for item in items {
            if matches!(item.asset_type, AssetType::Bundle { .. }) {
                return Err(TransferError::NestedBundle);
            }
            let item_amount = item.value.checked_mul(amount).ok_or(TransferError::Overflow)?;
            self.transfer(&item.asset_type, from, to, item_amount)?;
        }
        Ok(())
    }
}

impl AssetTransfer for AssetVault {
    fn transfer(
        &mut self,
        asset_type: &AssetType,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        match asset_type {
            AssetType::Erc20 { token } => self.move_holding(Holding::Fungible(*token), from, to, amount),
            AssetType::Erc1155 { token, token_id } => {
                self.move_holding(Holding::SemiFungible(*token, *token_id), from, to, amount)
            }
            AssetType::Erc721 { token, token_id } => self.move_unique(*token, *token_id, from, to, amount),
            AssetType::Bundle { items } => self.move_bundle(items, from, to, amount),
        }
    }

    fn execute(&mut self, plan: &TransferPlan) -> Result<(), TransferError> {
        let snapshot = self.clone();
        for intent in plan.iter() {
            if let Err(e) = self.transfer(&intent.asset_type, &intent.from, &intent.to, intent.amount) {
                *self = snapshot;
                return Err(e);
            }
        }
        debug!(transfers = plan.len(), "transfer plan executed");
        Ok(())
    }
}
