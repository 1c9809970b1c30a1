//! Exchange events
//!
//! Immutable records appended by committed operations. A rejected call
//! appends nothing.

use serde::{Deserialize, Serialize};

use exchange_types::ids::{Address, OrderKey};
use exchange_types::numeric::Amount;
use exchange_types::order::Order;
use exchange_types::royalty::{Part, RoyaltyType};

use crate::security::Role;

/// One settled pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub caller: Address,
    pub left_key: OrderKey,
    pub right_key: OrderKey,
    pub left_order: Order,
    pub right_order: Order,
    /// Cumulative ledger value of the left key after this match
    pub left_fill: Amount,
    /// Cumulative ledger value of the right key after this match
    pub right_fill: Amount,
    /// Left make units given
    pub left_value: Amount,
    /// Right make units given
    pub right_value: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancelled {
    pub maker: Address,
    pub order_key: OrderKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeEvent {
    Match(Box<MatchRecord>),
    Cancel(Cancelled),
    ProtocolFeeSet { primary: Amount, secondary: Amount },
    DefaultFeeReceiverSet { receiver: Address },
    RoyaltiesRegistrySet { caller: Address },
    MatchingLimitSet { limit: usize },
    Paused { caller: Address },
    Unpaused { caller: Address },
    RoleGranted { account: Address, role: Role },
    RoleRevoked { account: Address, role: Role },
    RoyaltiesSetForToken { token: Address, royalties: Vec<Part> },
    ProviderSet { token: Address },
    RoyaltiesTypeSet { token: Address, royalty_type: RoyaltyType },
    WhitelistChanged { token: Option<Address>, allowed: bool },
}

impl ExchangeEvent {
    pub fn as_match(&self) -> Option<&MatchRecord> {
        match self {
            ExchangeEvent::Match(record) => Some(&**record),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_types::asset::Asset;

    #[test]
    fn test_match_record_serialization() {
        let maker = Address::from_label("maker");
        let left = Order::new(
            maker,
            Asset::erc20(Address::from_label("sand"), 10),
            Address::ZERO,
            Asset::erc721(Address::from_label("land"), 1),
            3,
        );
        let right = Order::new(
            Address::from_label("seller"),
            Asset::erc721(Address::from_label("land"), 1),
            Address::ZERO,
            Asset::erc20(Address::from_label("sand"), 10),
            0,
        );
        let event = ExchangeEvent::Match(Box::new(MatchRecord {
            caller: maker,
            left_key: left.key(),
            right_key: right.key(),
            left_order: left,
            right_order: right,
            left_fill: 1,
            right_fill: 0,
            left_value: 10,
            right_value: 1,
        }));
        let json = serde_json::to_string(&event).unwrap();
        let deser: ExchangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
        assert_eq!(deser.as_match().unwrap().left_value, 10);
    }

    #[test]
    fn test_admin_event_serialization() {
        let event = ExchangeEvent::RoyaltiesTypeSet {
            token: Address::from_label("land"),
            royalty_type: RoyaltyType::ByRegistryEntry,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("BY_REGISTRY_ENTRY"));
        let deser: ExchangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
        assert!(deser.as_match().is_none());
    }
}
