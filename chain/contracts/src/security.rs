//! Shared security primitives for the exchange
//!
//! Every mutating entry point goes through these: the reentrancy guard
//! around settlement, role checks for administration and relaying, and the
//! pause switch. Failures surface as [`ExchangeError`]s so callers can `?`
//! them directly.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use exchange_types::errors::ExchangeError;
use exchange_types::ids::Address;

/// Rejects a settlement started while another is in flight.
///
/// Transfers call out to asset contracts; a callback re-entering the
/// exchange mid-batch finds the guard entered and fails.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    entered: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) -> Result<(), ExchangeError> {
        if self.entered {
            return Err(ExchangeError::Reentrancy);
        }
        self.entered = true;
        Ok(())
    }

    /// Must run on every exit path, success or failure.
    pub fn exit(&mut self) {
        self.entered = false;
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }
}

/// Exchange roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Configuration, pause, royalty overrides
    Admin,
    /// May submit matches on behalf of another sender
    Operator,
    /// Pays no royalties or protocol fee when buying
    FeeExempt,
}

/// Role membership with one primary admin.
///
/// The primary admin always holds [`Role::Admin`] and can only be replaced
/// through [`AccessControl::transfer_admin`], never revoked. Further admins
/// may be granted alongside it.
#[derive(Debug, Clone)]
pub struct AccessControl {
    admin: Address,
    members: HashMap<Role, HashSet<Address>>,
}

impl AccessControl {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            members: HashMap::new(),
        }
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        (role == Role::Admin && *account == self.admin)
            || self.members.get(&role).is_some_and(|m| m.contains(account))
    }

    pub fn is_admin(&self, account: &Address) -> bool {
        self.has_role(account, Role::Admin)
    }

    /// `Unauthorized` unless `caller` holds `role`.
    pub fn require(&self, caller: &Address, role: Role) -> Result<(), ExchangeError> {
        if !self.has_role(caller, role) {
            return Err(ExchangeError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Grant `role` to `account`. Returns whether it was newly granted.
    pub fn grant(&mut self, caller: &Address, account: Address, role: Role) -> Result<bool, ExchangeError> {
        self.require(caller, Role::Admin)?;
        if account.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "account" });
        }
        Ok(self.members.entry(role).or_default().insert(account))
    }

    /// Revoke `role` from `account`. Returns whether it was held.
    pub fn revoke(&mut self, caller: &Address, account: &Address, role: Role) -> Result<bool, ExchangeError> {
        self.require(caller, Role::Admin)?;
        if role == Role::Admin && *account == self.admin {
            return Err(ExchangeError::Unauthorized { caller: *caller });
        }
        Ok(self.members.get_mut(&role).is_some_and(|m| m.remove(account)))
    }

    /// Hand the primary seat to `new_admin`. Only the primary admin may do this.
    pub fn transfer_admin(&mut self, caller: &Address, new_admin: Address) -> Result<(), ExchangeError> {
        if *caller != self.admin {
            return Err(ExchangeError::Unauthorized { caller: *caller });
        }
        if new_admin.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "admin" });
        }
        if let Some(admins) = self.members.get_mut(&Role::Admin) {
            admins.remove(caller);
        }
        self.admin = new_admin;
        Ok(())
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }
}

/// Pause switch. Matching, cancelling and royalty registration check it.
#[derive(Debug, Clone, Default)]
pub struct PauseGuard {
    paused: bool,
}

impl PauseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the state changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.paused != paused;
        self.paused = paused;
        changed
    }

    pub fn ensure_unpaused(&self) -> Result<(), ExchangeError> {
        if self.paused {
            return Err(ExchangeError::Paused);
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
