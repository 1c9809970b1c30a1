//! Fill ledger
//!
//! Cumulative fill per order key, in units of the order's take asset.
//! [`CANCELLED`] marks a cancelled key. Zero-salt orders are never recorded.
//!
//! A batch reads and writes through a [`StagedFills`] overlay and the
//! staged values are applied in one step once the whole batch has planned.

use std::collections::HashMap;

use exchange_types::errors::ExchangeError;
use exchange_types::ids::OrderKey;
use exchange_types::numeric::{Amount, CANCELLED};

/// Previous ledger values, used to roll an applied update back.
#[derive(Debug, Clone, Default)]
pub struct LedgerUndo {
    previous: Vec<(OrderKey, Option<Amount>)>,
}

/// Persistent `OrderKey -> Amount` mapping.
#[derive(Debug, Clone, Default)]
pub struct FillLedger {
    fills: HashMap<OrderKey, Amount>,
}

impl FillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative fill of `key`; 0 when never touched.
    pub fn get(&self, key: &OrderKey) -> Amount {
        self.fills.get(key).copied().unwrap_or(0)
    }

    pub fn is_cancelled(&self, key: &OrderKey) -> bool {
        self.get(key) == CANCELLED
    }

    /// Mark `key` cancelled. Returns `false` if it already was.
    pub fn cancel(&mut self, key: OrderKey) -> bool {
        self.fills.insert(key, CANCELLED) != Some(CANCELLED)
    }

    /// Write staged values, returning what they replaced.
    pub fn apply(&mut self, updates: &HashMap<OrderKey, Amount>) -> LedgerUndo {
        let previous = updates
            .iter()
            .map(|(key, value)| (*key, self.fills.insert(*key, *value)))
            .collect();
        LedgerUndo { previous }
    }

    /// Restore the values an [`apply`](Self::apply) replaced.
    pub fn revert(&mut self, undo: LedgerUndo) {
        for (key, previous) in undo.previous {
            match previous {
                Some(value) => self.fills.insert(key, value),
                None => self.fills.remove(&key),
            };
        }
    }

    pub fn len(&self) -> usize {
        self.fills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }
}

/// Batch-local view over a ledger.
#[derive(Debug)]
pub struct StagedFills<'a> {
    base: &'a FillLedger,
    staged: HashMap<OrderKey, Amount>,
}

impl<'a> StagedFills<'a> {
    pub fn new(base: &'a FillLedger) -> Self {
        Self {
            base,
            staged: HashMap::new(),
        }
    }

    /// Current fill of `key`, staged value first.
    pub fn get(&self, key: &OrderKey) -> Amount {
        self.staged
            .get(key)
            .copied()
            .unwrap_or_else(|| self.base.get(key))
    }

    /// Fill of `key`, or `OrderCancelled` if the key is cancelled.
    pub fn fill_of(&self, key: &OrderKey) -> Result<Amount, ExchangeError> {
        match self.get(key) {
            CANCELLED => Err(ExchangeError::OrderCancelled { key: *key }),
            fill => Ok(fill),
        }
    }

    /// Add `amount` to the staged fill of `key`.
    ///
    /// A sum reaching the cancellation sentinel is treated as overflow.
    pub fn add(&mut self, key: OrderKey, amount: Amount) -> Result<Amount, ExchangeError> {
        let total = self
            .fill_of(&key)?
            .checked_add(amount)
            .filter(|total| *total != CANCELLED)
            .ok_or(ExchangeError::Overflow)?;
        self.staged.insert(key, total);
        Ok(total)
    }

    pub fn into_updates(self) -> HashMap<OrderKey, Amount> {
        self.staged
    }
}
