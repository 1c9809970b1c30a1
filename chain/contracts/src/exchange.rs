//! Exchange: stateful entry points and administration
//!
//! Owns the fill ledger, royalties registry and configuration, and drives
//! the engine:
//! 1. Plan the batch (pure, nothing written)
//! 2. Commit fills, royalty classifications and events
//! 3. Execute the transfer plan through the caller's [`AssetTransfer`]
//!
//! A rejected transfer plan rolls step 2 back, leaving no trace of the call.
//!
//! State-changing operations check, where applicable:
//! 1. Pause state
//! 2. Access control
//! 3. Reentrancy guard (matching only)

use std::sync::Arc;

use tracing::{info, warn};

use exchange_types::asset::AssetClass;
use exchange_types::errors::ExchangeError;
use exchange_types::ids::{Address, OrderKey};
use exchange_types::numeric::Amount;
use exchange_types::order::{order_key, Order};
use exchange_types::royalty::{Part, RoyaltyType};

use crate::config::{check_fee, ExchangeConfig};
use crate::engine::{plan_batch, BatchPlan, MatchContext, OrderPair};
use crate::events::{Cancelled, ExchangeEvent, MatchRecord};
use crate::ledger::FillLedger;
use crate::matcher::{AssetMatcher, ClassMatcher};
use crate::royalties::{NativeRoyalties, RoyaltiesProvider, RoyaltiesRegistry};
use crate::security::{AccessControl, PauseGuard, ReentrancyGuard, Role};
use crate::transfer::AssetTransfer;
use crate::validator::OrderValidator;

#[derive(Debug)]
pub struct Exchange {
    config: ExchangeConfig,
    ledger: FillLedger,
    royalties: RoyaltiesRegistry,
    matcher: AssetMatcher,
    validator: OrderValidator,
    /// Security: reentrancy guard
    reentrancy_guard: ReentrancyGuard,
    /// Security: pause guard
    pause_guard: PauseGuard,
    /// Security: role-based access control
    access_control: AccessControl,
    /// Emitted events log (append-only)
    events: Vec<ExchangeEvent>,
}

impl Exchange {
    /// Create an exchange administered by `admin`.
    pub fn new(admin: Address, config: ExchangeConfig) -> Result<Self, ExchangeError> {
        if admin.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "admin" });
        }
        config.validate()?;
        Ok(Self {
            validator: OrderValidator::new(config.whitelist_open),
            config,
            ledger: FillLedger::new(),
            royalties: RoyaltiesRegistry::new(),
            matcher: AssetMatcher::default(),
            reentrancy_guard: ReentrancyGuard::new(),
            pause_guard: PauseGuard::new(),
            access_control: AccessControl::new(admin),
            events: Vec::new(),
        })
    }

    // ───────────────────────── Matching ─────────────────────────

    /// Match and settle a batch submitted by `caller`.
    pub fn match_orders(
        &mut self,
        caller: Address,
        pairs: &[OrderPair],
        now: u64,
        transfers: &mut dyn AssetTransfer,
    ) -> Result<Vec<MatchRecord>, ExchangeError> {
        self.check_not_paused()?;
        self.guarded_match(caller, caller, pairs, now, transfers)
    }

    /// Match on behalf of `sender`. The caller must be an operator.
    pub fn match_orders_from(
        &mut self,
        caller: Address,
        sender: Address,
        pairs: &[OrderPair],
        now: u64,
        transfers: &mut dyn AssetTransfer,
    ) -> Result<Vec<MatchRecord>, ExchangeError> {
        self.check_not_paused()?;
        self.access_control.require(&caller, Role::Operator)?;
        if sender.is_zero() {
            return Err(ExchangeError::ZeroSender);
        }
        self.guarded_match(caller, sender, pairs, now, transfers)
    }

    fn guarded_match(
        &mut self,
        caller: Address,
        sender: Address,
        pairs: &[OrderPair],
        now: u64,
        transfers: &mut dyn AssetTransfer,
    ) -> Result<Vec<MatchRecord>, ExchangeError> {
        self.reentrancy_guard.enter()?;
        let result = self.settle_batch(caller, sender, pairs, now, transfers);
        self.reentrancy_guard.exit();
        if let Err(e) = &result {
            warn!(%caller, pairs = pairs.len(), code = e.code(), error = %e, "batch rejected");
        }
        result
    }

    fn settle_batch(
        &mut self,
        caller: Address,
        sender: Address,
        pairs: &[OrderPair],
        now: u64,
        transfers: &mut dyn AssetTransfer,
    ) -> Result<Vec<MatchRecord>, ExchangeError> {
        let ctx = MatchContext {
            caller,
            sender,
            now,
            config: &self.config,
            validator: &self.validator,
            matcher: &self.matcher,
            royalties: &self.royalties,
            access: &self.access_control,
        };
        let BatchPlan {
            fills,
            royalty_types,
            transfers: plan,
            records,
        } = plan_batch(&self.ledger, &ctx, pairs)?;

        // Commit before any transfer runs
        let undo = self.ledger.apply(&fills);
        let newly_typed: Vec<Address> = royalty_types
            .iter()
            .filter(|(token, _)| self.royalties.royalties_type(token) == RoyaltyType::Unset)
            .map(|(token, _)| *token)
            .collect();
        for (token, royalty_type) in royalty_types {
            self.royalties.commit_type(token, royalty_type);
        }
        let events_before = self.events.len();
        self.events
            .extend(records.iter().cloned().map(|r| ExchangeEvent::Match(Box::new(r))));

        if let Err(e) = transfers.execute(&plan) {
            self.ledger.revert(undo);
            for token in &newly_typed {
                self.royalties.clear_royalties_type(token);
            }
            self.events.truncate(events_before);
            return Err(e.into());
        }

        for record in &records {
            info!(
                %caller,
                left_key = %record.left_key,
                right_key = %record.right_key,
                left_value = %record.left_value,
                right_value = %record.right_value,
                "orders matched"
            );
        }
        Ok(records)
    }

    // ───────────────────────── Cancellation ─────────────────────────

    /// Cancel an order permanently. Only its maker may cancel it.
    pub fn cancel(&mut self, caller: Address, order: &Order, key: OrderKey) -> Result<(), ExchangeError> {
        self.check_not_paused()?;
        if order.maker != caller {
            return Err(ExchangeError::NotMaker);
        }
        if order.salt == 0 {
            return Err(ExchangeError::ZeroSaltCancel);
        }
        if order_key(order) != key {
            return Err(ExchangeError::InvalidOrderKey);
        }
        self.ledger.cancel(key);
        self.events.push(ExchangeEvent::Cancel(Cancelled {
            maker: caller,
            order_key: key,
        }));
        info!(maker = %caller, order_key = %key, "order cancelled");
        Ok(())
    }

    /// Cumulative fill of an order key, in its take units.
    pub fn fills(&self, key: &OrderKey) -> Amount {
        self.ledger.get(key)
    }

    // ───────────────────────── Configuration ─────────────────────────

    pub fn set_protocol_fee(&mut self, caller: Address, primary: Amount, secondary: Amount) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        check_fee(primary)?;
        check_fee(secondary)?;
        self.config.protocol_fee_primary = primary;
        self.config.protocol_fee_secondary = secondary;
        self.emit(ExchangeEvent::ProtocolFeeSet { primary, secondary });
        info!(%caller, primary = %primary, secondary = %secondary, "protocol fee set");
        Ok(())
    }

    pub fn set_default_fee_receiver(&mut self, caller: Address, receiver: Address) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        if receiver.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "default fee receiver" });
        }
        self.config.default_fee_receiver = receiver;
        self.emit(ExchangeEvent::DefaultFeeReceiverSet { receiver });
        info!(%caller, %receiver, "default fee receiver set");
        Ok(())
    }

    /// Swap in another royalties registry.
    pub fn set_royalties_registry(&mut self, caller: Address, registry: RoyaltiesRegistry) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.royalties = registry;
        self.emit(ExchangeEvent::RoyaltiesRegistrySet { caller });
        info!(%caller, "royalties registry replaced");
        Ok(())
    }

    pub fn set_matching_limit(&mut self, caller: Address, limit: usize) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        if limit == 0 {
            return Err(ExchangeError::InvalidMatchingLimit);
        }
        self.config.matching_limit = limit;
        self.emit(ExchangeEvent::MatchingLimitSet { limit });
        info!(%caller, limit, "matching limit set");
        Ok(())
    }

    pub fn register_class_matcher(
        &mut self,
        caller: Address,
        class: AssetClass,
        matcher: Box<dyn ClassMatcher>,
    ) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.matcher.register(class, matcher);
        info!(%caller, %class, "class matcher registered");
        Ok(())
    }

    // ───────────────────────── Token Whitelist ─────────────────────────

    pub fn set_whitelist_open(&mut self, caller: Address, open: bool) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.validator.set_open(open);
        self.config.whitelist_open = open;
        self.emit(ExchangeEvent::WhitelistChanged { token: None, allowed: open });
        Ok(())
    }

    pub fn whitelist_token(&mut self, caller: Address, token: Address) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.validator.add_token(token);
        self.emit(ExchangeEvent::WhitelistChanged { token: Some(token), allowed: true });
        Ok(())
    }

    pub fn remove_whitelisted_token(&mut self, caller: Address, token: Address) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.validator.remove_token(&token);
        self.emit(ExchangeEvent::WhitelistChanged { token: Some(token), allowed: false });
        Ok(())
    }

    pub fn is_whitelisted(&self, token: &Address) -> bool {
        self.validator.is_whitelisted(token)
    }

    // ───────────────────────── Royalties ─────────────────────────

    /// Set royalty records for a token. Allowed to the token's owner or an admin.
    pub fn set_royalties_by_token(
        &mut self,
        caller: Address,
        token: Address,
        royalties: Vec<Part>,
    ) -> Result<(), ExchangeError> {
        self.check_not_paused()?;
        self.check_token_owner_or_admin(&caller, &token)?;
        self.royalties.set_royalties_by_token(token, royalties.clone())?;
        self.emit(ExchangeEvent::RoyaltiesSetForToken { token, royalties });
        info!(%caller, %token, "royalties set for token");
        Ok(())
    }

    pub fn set_provider_by_token(
        &mut self,
        caller: Address,
        token: Address,
        provider: Arc<dyn RoyaltiesProvider>,
    ) -> Result<(), ExchangeError> {
        self.check_token_owner_or_admin(&caller, &token)?;
        self.royalties.set_provider_by_token(token, provider);
        self.emit(ExchangeEvent::ProviderSet { token });
        info!(%caller, %token, "royalties provider set");
        Ok(())
    }

    /// Record that a token contract exposes its own royalty methods.
    pub fn register_native_interface(
        &mut self,
        caller: Address,
        token: Address,
        native: Arc<dyn NativeRoyalties>,
    ) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.royalties.register_native_interface(token, native);
        Ok(())
    }

    pub fn force_set_royalties_type(
        &mut self,
        caller: Address,
        token: Address,
        royalty_type: RoyaltyType,
    ) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.royalties.force_set_royalties_type(token, royalty_type);
        self.emit(ExchangeEvent::RoyaltiesTypeSet { token, royalty_type });
        info!(%caller, %token, ?royalty_type, "royalties type forced");
        Ok(())
    }

    pub fn clear_royalties_type(&mut self, caller: Address, token: Address) -> Result<(), ExchangeError> {
        self.check_admin(&caller)?;
        self.royalties.clear_royalties_type(&token);
        self.emit(ExchangeEvent::RoyaltiesTypeSet {
            token,
            royalty_type: RoyaltyType::Unset,
        });
        Ok(())
    }

    pub fn royalties_type(&self, token: &Address) -> RoyaltyType {
        self.royalties.royalties_type(token)
    }

    pub fn royalties(&self) -> &RoyaltiesRegistry {
        &self.royalties
    }

    // ───────────────────────── Pause ─────────────────────────

    pub fn pause(&mut self, caller: Address) -> Result<(), ExchangeError> {
        self.access_control.require(&caller, Role::Admin)?;
        if self.pause_guard.set_paused(true) {
            self.emit(ExchangeEvent::Paused { caller });
            warn!(%caller, "exchange paused");
        }
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), ExchangeError> {
        self.access_control.require(&caller, Role::Admin)?;
        if self.pause_guard.set_paused(false) {
            self.emit(ExchangeEvent::Unpaused { caller });
            info!(%caller, "exchange unpaused");
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.pause_guard.is_paused()
    }

    // ───────────────────────── Access Control ─────────────────────────

    pub fn grant_role(&mut self, caller: Address, account: Address, role: Role) -> Result<(), ExchangeError> {
        if self.access_control.grant(&caller, account, role)? {
            self.emit(ExchangeEvent::RoleGranted { account, role });
            info!(%caller, %account, ?role, "role granted");
        }
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: Address, account: Address, role: Role) -> Result<(), ExchangeError> {
        if self.access_control.revoke(&caller, &account, role)? {
            self.emit(ExchangeEvent::RoleRevoked { account, role });
            info!(%caller, %account, ?role, "role revoked");
        }
        Ok(())
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.access_control.has_role(account, role)
    }

    /// Hand the primary admin seat to another identity.
    pub fn transfer_admin(&mut self, caller: Address, new_admin: Address) -> Result<(), ExchangeError> {
        self.access_control.transfer_admin(&caller, new_admin)?;
        info!(%caller, %new_admin, "admin transferred");
        Ok(())
    }

    pub fn admin(&self) -> &Address {
        self.access_control.admin()
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ExchangeEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<ExchangeEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: ExchangeEvent) {
        self.events.push(event);
    }

    // ───────────────────────── Internal Guards ─────────────────────────

    fn check_admin(&self, caller: &Address) -> Result<(), ExchangeError> {
        self.access_control.require(caller, Role::Admin)
    }

    fn check_token_owner_or_admin(&self, caller: &Address, token: &Address) -> Result<(), ExchangeError> {
        if self.royalties.token_owner(token) == Some(*caller) {
            return Ok(());
        }
        self.check_admin(caller)
    }

    fn check_not_paused(&self) -> Result<(), ExchangeError> {
        self.pause_guard.ensure_unpaused()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::AssetVault;
    use exchange_types::asset::Asset;

    fn admin() -> Address {
        Address::from_label("admin")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn exchange() -> Exchange {
        Exchange::new(admin(), ExchangeConfig::default()).unwrap()
    }

    fn salted(maker: Address, salt: u128) -> Order {
        Order::new(
            maker,
            Asset::erc20(Address::from_label("sand"), 10),
            Address::ZERO,
            Asset::erc20(Address::from_label("usdc"), 20),
            salt,
        )
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ExchangeConfig { matching_limit: 0, ..ExchangeConfig::default() };
        assert_eq!(Exchange::new(admin(), config).unwrap_err(), ExchangeError::InvalidMatchingLimit);
        assert!(Exchange::new(Address::ZERO, ExchangeConfig::default()).is_err());
    }

    #[test]
    fn test_cancel_rules() {
        let mut ex = exchange();
        let order = salted(alice(), 7);
        assert_eq!(ex.cancel(admin(), &order, order.key()), Err(ExchangeError::NotMaker));
        assert_eq!(
            ex.cancel(alice(), &order, OrderKey::from_bytes([0; 32])),
            Err(ExchangeError::InvalidOrderKey)
        );
        let zero = salted(alice(), 0);
        assert_eq!(ex.cancel(alice(), &zero, zero.key()), Err(ExchangeError::ZeroSaltCancel));

        ex.cancel(alice(), &order, order.key()).unwrap();
        ex.cancel(alice(), &order, order.key()).unwrap();
        assert_eq!(ex.fills(&order.key()), Amount::MAX);
        assert_eq!(ex.events().len(), 2);
    }

    #[test]
    fn test_admin_setters_require_admin() {
        let mut ex = exchange();
        assert_eq!(
            ex.set_protocol_fee(alice(), 1, 1),
            Err(ExchangeError::Unauthorized { caller: alice() })
        );
        assert_eq!(ex.set_matching_limit(alice(), 3), Err(ExchangeError::Unauthorized { caller: alice() }));
        assert_eq!(ex.pause(alice()), Err(ExchangeError::Unauthorized { caller: alice() }));
        assert!(ex.events().is_empty());
    }

    #[test]
    fn test_admin_setters_validate() {
        let mut ex = exchange();
        assert_eq!(ex.set_protocol_fee(admin(), 5_000, 0), Err(ExchangeError::FeeTooHigh { bps: 5_000 }));
        assert_eq!(ex.set_matching_limit(admin(), 0), Err(ExchangeError::InvalidMatchingLimit));
        assert!(matches!(
            ex.set_default_fee_receiver(admin(), Address::ZERO),
            Err(ExchangeError::ZeroAddress { .. })
        ));
        ex.set_protocol_fee(admin(), 100, 4_999).unwrap();
        ex.set_matching_limit(admin(), 2).unwrap();
        assert_eq!(ex.config().protocol_fee_secondary, 4_999);
        assert_eq!(ex.config().matching_limit, 2);
        assert_eq!(
            ex.events(),
            &[
                ExchangeEvent::ProtocolFeeSet { primary: 100, secondary: 4_999 },
                ExchangeEvent::MatchingLimitSet { limit: 2 },
            ]
        );
    }

    #[test]
    fn test_pause_blocks_matching_and_cancel() {
        let mut ex = exchange();
        let mut vault = AssetVault::new();
        ex.pause(admin()).unwrap();
        let order = salted(alice(), 1);
        let pair = OrderPair::unsigned(order.clone(), order.clone());
        assert_eq!(ex.match_orders(alice(), &[pair], 0, &mut vault), Err(ExchangeError::Paused));
        assert_eq!(ex.cancel(alice(), &order, order.key()), Err(ExchangeError::Paused));
        ex.unpause(admin()).unwrap();
        assert!(ex.cancel(alice(), &order, order.key()).is_ok());
    }

    #[test]
    fn test_pause_reported_before_operator_role() {
        let mut ex = exchange();
        let mut vault = AssetVault::new();
        let relayer = Address::from_label("relayer");
        ex.pause(admin()).unwrap();
        assert_eq!(
            ex.match_orders_from(relayer, alice(), &[], 0, &mut vault),
            Err(ExchangeError::Paused)
        );
        ex.unpause(admin()).unwrap();
        assert_eq!(
            ex.match_orders_from(relayer, alice(), &[], 0, &mut vault),
            Err(ExchangeError::Unauthorized { caller: relayer })
        );
    }

    #[test]
    fn test_pause_and_roles_emit_on_change_only() {
        let mut ex = exchange();
        let relayer = Address::from_label("relayer");
        ex.pause(admin()).unwrap();
        ex.pause(admin()).unwrap();
        ex.grant_role(admin(), relayer, Role::Operator).unwrap();
        ex.grant_role(admin(), relayer, Role::Operator).unwrap();
        assert_eq!(
            ex.events(),
            &[
                ExchangeEvent::Paused { caller: admin() },
                ExchangeEvent::RoleGranted { account: relayer, role: Role::Operator },
            ]
        );
    }

    #[test]
    fn test_operator_checks() {
        let mut ex = exchange();
        let mut vault = AssetVault::new();
        let relayer = Address::from_label("relayer");
        assert_eq!(
            ex.match_orders_from(relayer, alice(), &[], 0, &mut vault),
            Err(ExchangeError::Unauthorized { caller: relayer })
        );
        ex.grant_role(admin(), relayer, Role::Operator).unwrap();
        assert_eq!(
            ex.match_orders_from(relayer, Address::ZERO, &[], 0, &mut vault),
            Err(ExchangeError::ZeroSender)
        );
        assert_eq!(
            ex.match_orders_from(relayer, alice(), &[], 0, &mut vault),
            Err(ExchangeError::EmptyBatch)
        );
    }

    #[test]
    fn test_reentrancy_guard_released_after_error() {
        let mut ex = exchange();
        let mut vault = AssetVault::new();
        assert_eq!(ex.match_orders(alice(), &[], 0, &mut vault), Err(ExchangeError::EmptyBatch));
        assert_eq!(ex.match_orders(alice(), &[], 0, &mut vault), Err(ExchangeError::EmptyBatch));
    }

    #[test]
    fn test_royalty_administration() {
        let mut ex = exchange();
        let land = Address::from_label("land");
        let creator = Address::from_label("creator");
        assert_eq!(
            ex.set_royalties_by_token(alice(), land, vec![Part::new(creator, 100)]),
            Err(ExchangeError::Unauthorized { caller: alice() })
        );
        ex.set_royalties_by_token(admin(), land, vec![Part::new(creator, 100)]).unwrap();
        assert_eq!(ex.royalties_type(&land), RoyaltyType::ByRegistryEntry);
        ex.force_set_royalties_type(admin(), land, RoyaltyType::None).unwrap();
        assert_eq!(ex.royalties_type(&land), RoyaltyType::None);
        ex.clear_royalties_type(admin(), land).unwrap();
        assert_eq!(ex.royalties_type(&land), RoyaltyType::Unset);
    }

    #[test]
    fn test_whitelist_administration() {
        let mut ex = exchange();
        let sand = Address::from_label("sand");
        ex.set_whitelist_open(admin(), false).unwrap();
        assert!(!ex.is_whitelisted(&sand));
        ex.whitelist_token(admin(), sand).unwrap();
        assert!(ex.is_whitelisted(&sand));
        ex.remove_whitelisted_token(admin(), sand).unwrap();
        assert!(!ex.is_whitelisted(&sand));
        assert!(ex.whitelist_token(alice(), sand).is_err());
    }
}
