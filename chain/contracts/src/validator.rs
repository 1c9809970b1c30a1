//! Order validation: maker, validity window, token whitelist, authorization
//!
//! Authorization rules:
//! - zero-salt orders may only be submitted by their maker, no signature
//!   is checked;
//! - a maker submitting their own order needs no signature;
//! - anyone else must present the maker's signature over the typed digest.

use std::collections::HashSet;

use exchange_types::errors::ExchangeError;
use exchange_types::ids::Address;
use exchange_types::order::Order;

use crate::signing::{verify_order_signature, SigningDomain};

/// Validates orders before they reach the fill computation.
#[derive(Debug, Clone)]
pub struct OrderValidator {
    /// When open, any make token is accepted
    open: bool,
    /// Tokens accepted while the whitelist is closed
    whitelist: HashSet<Address>,
}

impl OrderValidator {
    pub fn new(open: bool) -> Self {
        Self {
            open,
            whitelist: HashSet::new(),
        }
    }

    // ───────────────────────── Token Whitelist ─────────────────────────

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn add_token(&mut self, token: Address) {
        self.whitelist.insert(token);
    }

    pub fn remove_token(&mut self, token: &Address) {
        self.whitelist.remove(token);
    }

    pub fn is_whitelisted(&self, token: &Address) -> bool {
        self.open || self.whitelist.contains(token)
    }

    // ───────────────────────── Validation ─────────────────────────

    /// Full validation of one order of a pair.
    pub fn validate(
        &self,
        order: &Order,
        signature: &[u8],
        sender: &Address,
        now: u64,
        domain: &SigningDomain,
    ) -> Result<(), ExchangeError> {
        if order.maker.is_zero() {
            return Err(ExchangeError::NoMaker);
        }
        order.check_time(now)?;
        order.data.validate()?;
        self.check_whitelist(order)?;
        validate_authorization(order, signature, sender, domain)
    }

    fn check_whitelist(&self, order: &Order) -> Result<(), ExchangeError> {
        if self.open {
            return Ok(());
        }
        match order
            .make_asset
            .asset_type
            .tokens()
            .into_iter()
            .find(|token| !self.whitelist.contains(token))
        {
            Some(token) => Err(ExchangeError::TokenNotWhitelisted { token }),
            None => Ok(()),
        }
    }
}

impl Default for OrderValidator {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Signature / sender authorization for a single order.
pub fn validate_authorization(
    order: &Order,
    signature: &[u8],
    sender: &Address,
    domain: &SigningDomain,
) -> Result<(), ExchangeError> {
    if order.salt == 0 {
        if order.maker != *sender {
            return Err(ExchangeError::NotMaker);
        }
        return Ok(());
    }
    if order.maker == *sender {
        return Ok(());
    }
    if !verify_order_signature(order, signature, domain) {
        return Err(ExchangeError::SignatureInvalid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{address_of, sign_order};
    use ed25519_dalek::SigningKey;
    use exchange_types::asset::Asset;

    fn maker_key() -> SigningKey {
        SigningKey::from_bytes(&[9u8; 32])
    }

    fn order(maker: Address, salt: u128) -> Order {
        Order::new(
            maker,
            Asset::erc721(Address::from_label("land"), 1),
            Address::ZERO,
            Asset::erc20(Address::from_label("sand"), 500),
            salt,
        )
    }

    #[test]
    fn test_zero_salt_requires_maker_sender() {
        let maker = address_of(&maker_key());
        let domain = SigningDomain::default();
        let order = order(maker, 0);
        // A valid signature does not help a third party
        let sig = sign_order(&order, &maker_key(), &domain);
        assert_eq!(
            validate_authorization(&order, &sig, &Address::from_label("relayer"), &domain),
            Err(ExchangeError::NotMaker)
        );
        assert!(validate_authorization(&order, &[], &maker, &domain).is_ok());
    }

    #[test]
    fn test_maker_sender_needs_no_signature() {
        let maker = address_of(&maker_key());
        let order = order(maker, 5);
        assert!(validate_authorization(&order, b"garbage", &maker, &SigningDomain::default()).is_ok());
    }

    #[test]
    fn test_relayer_needs_valid_signature() {
        let maker = address_of(&maker_key());
        let domain = SigningDomain::default();
        let order = order(maker, 5);
        let relayer = Address::from_label("relayer");
        assert_eq!(
            validate_authorization(&order, &[], &relayer, &domain),
            Err(ExchangeError::SignatureInvalid)
        );
        let sig = sign_order(&order, &maker_key(), &domain);
        assert!(validate_authorization(&order, &sig, &relayer, &domain).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_maker() {
        let validator = OrderValidator::default();
        let order = order(Address::ZERO, 1);
        assert_eq!(
            validator.validate(&order, &[], &Address::from_label("x"), 0, &SigningDomain::default()),
            Err(ExchangeError::NoMaker)
        );
    }

    #[test]
    fn test_closed_whitelist() {
        let mut validator = OrderValidator::new(false);
        let maker = address_of(&maker_key());
        let order = order(maker, 1);
        let land = Address::from_label("land");
        assert_eq!(
            validator.validate(&order, &[], &maker, 0, &SigningDomain::default()),
            Err(ExchangeError::TokenNotWhitelisted { token: land })
        );
        validator.add_token(land);
        assert!(validator.validate(&order, &[], &maker, 0, &SigningDomain::default()).is_ok());
        validator.remove_token(&land);
        assert!(!validator.is_whitelisted(&land));
        validator.set_open(true);
        assert!(validator.is_whitelisted(&land));
    }
}
