//! Asset types and their canonical encoding
//!
//! An asset type is a class plus class-specific parameters. The canonical
//! byte encoding of those parameters is what the asset matcher compares and
//! what the order hashes commit to.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::ids::Address;
use crate::numeric::Amount;

/// Asset class discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetClass {
    /// Fungible, amount-based
    Erc20,
    /// Unique, amount must be exactly 1
    Erc721,
    /// Semi-fungible, amount-based per token id
    Erc1155,
    /// Ordered list of non-bundle items
    Bundle,
}

impl AssetClass {
    pub fn name(&self) -> &'static str {
        match self {
            AssetClass::Erc20 => "ERC20",
            AssetClass::Erc721 => "ERC721",
            AssetClass::Erc1155 => "ERC1155",
            AssetClass::Bundle => "BUNDLE",
        }
    }

    /// Four-byte class identifier: leading bytes of SHA-256 over the name.
    pub fn id(&self) -> [u8; 4] {
        let digest = Sha256::digest(self.name().as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single entry of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleItem {
    pub asset_type: AssetType,
    /// Units of this item per bundle unit
    pub value: Amount,
}

/// What is being traded, without the amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "UPPERCASE")]
pub enum AssetType {
    Erc20 { token: Address },
    Erc721 { token: Address, token_id: u128 },
    Erc1155 { token: Address, token_id: u128 },
    Bundle { items: Vec<BundleItem> },
}

impl AssetType {
    pub fn class(&self) -> AssetClass {
        match self {
            AssetType::Erc20 { .. } => AssetClass::Erc20,
            AssetType::Erc721 { .. } => AssetClass::Erc721,
            AssetType::Erc1155 { .. } => AssetClass::Erc1155,
            AssetType::Bundle { .. } => AssetClass::Bundle,
        }
    }

    /// Canonical parameter bytes (the "encodedParams" of the asset type).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            AssetType::Erc20 { token } => out.extend_from_slice(token.as_bytes()),
            AssetType::Erc721 { token, token_id } | AssetType::Erc1155 { token, token_id } => {
                out.extend_from_slice(token.as_bytes());
                out.extend_from_slice(&token_id.to_be_bytes());
            }
            AssetType::Bundle { items } => {
                encode_len(out, items.len());
                for item in items {
                    out.extend_from_slice(&item.asset_type.class().id());
                    let inner = item.asset_type.encode();
                    encode_len(out, inner.len());
                    out.extend_from_slice(&inner);
                    out.extend_from_slice(&item.value.to_be_bytes());
                }
            }
        }
    }

    /// Structured hash of the asset type: class id plus hash of the encoding.
    pub fn type_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"AssetType(bytes4 assetClass,bytes data)");
        hasher.update(self.class().id());
        hasher.update(Sha256::digest(self.encode()));
        hasher.finalize().into()
    }

    /// Token contract for single-token asset types.
    pub fn token(&self) -> Option<Address> {
        match self {
            AssetType::Erc20 { token }
            | AssetType::Erc721 { token, .. }
            | AssetType::Erc1155 { token, .. } => Some(*token),
            AssetType::Bundle { .. } => None,
        }
    }

    /// Every token contract referenced, bundle members included.
    pub fn tokens(&self) -> Vec<Address> {
        match self {
            AssetType::Bundle { items } => items
                .iter()
                .flat_map(|item| item.asset_type.tokens())
                .collect(),
            other => other.token().into_iter().collect(),
        }
    }

    /// `(token, token_id)` for item-identified assets.
    pub fn nft_id(&self) -> Option<(Address, u128)> {
        match self {
            AssetType::Erc721 { token, token_id } | AssetType::Erc1155 { token, token_id } => {
                Some((*token, *token_id))
            }
            _ => None,
        }
    }

    pub fn is_fungible(&self) -> bool {
        matches!(self, AssetType::Erc20 { .. })
    }

    pub fn is_unique(&self) -> bool {
        matches!(self, AssetType::Erc721 { .. })
    }
}

/// Asset type plus amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub asset_type: AssetType,
    pub value: Amount,
}

impl Asset {
    pub fn new(asset_type: AssetType, value: Amount) -> Self {
        Self { asset_type, value }
    }

    pub fn erc20(token: Address, value: Amount) -> Self {
        Self::new(AssetType::Erc20 { token }, value)
    }

    pub fn erc721(token: Address, token_id: u128) -> Self {
        Self::new(AssetType::Erc721 { token, token_id }, 1)
    }

    pub fn erc1155(token: Address, token_id: u128, value: Amount) -> Self {
        Self::new(AssetType::Erc1155 { token, token_id }, value)
    }

    pub fn bundle(items: Vec<BundleItem>, value: Amount) -> Self {
        Self::new(AssetType::Bundle { items }, value)
    }
}

/// Eight-byte big-endian length prefix used by the canonical encodings.
pub(crate) fn encode_len(out: &mut Vec<u8>, len: usize) {
    // usize is at most 64 bits on every supported target
    out.extend_from_slice(&(len as u64).to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn test_class_ids_distinct() {
        let ids = [
            AssetClass::Erc20.id(),
            AssetClass::Erc721.id(),
            AssetClass::Erc1155.id(),
            AssetClass::Bundle.id(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_type_hash_separates_classes_with_same_params() {
        let erc721 = AssetType::Erc721 { token: token("land"), token_id: 7 };
        let erc1155 = AssetType::Erc1155 { token: token("land"), token_id: 7 };
        assert_eq!(erc721.encode(), erc1155.encode());
        assert_ne!(erc721.type_hash(), erc1155.type_hash());
    }

    #[test]
    fn test_bundle_encoding_depends_on_item_order() {
        let a = BundleItem { asset_type: AssetType::Erc721 { token: token("a"), token_id: 1 }, value: 1 };
        let b = BundleItem { asset_type: AssetType::Erc20 { token: token("b") }, value: 50 };
        let ab = AssetType::Bundle { items: vec![a.clone(), b.clone()] };
        let ba = AssetType::Bundle { items: vec![b, a] };
        assert_ne!(ab.encode(), ba.encode());
    }

    #[test]
    fn test_bundle_encoding_layout() {
        let item = BundleItem { asset_type: AssetType::Erc20 { token: token("b") }, value: 50 };
        let encoded = AssetType::Bundle { items: vec![item] }.encode();
        // count, class id, inner length, token, value
        assert_eq!(encoded.len(), 8 + 4 + 8 + 32 + 16);
        assert_eq!(encoded[..8], 1u64.to_be_bytes());
        assert_eq!(encoded[8..12], AssetClass::Erc20.id());
        assert_eq!(encoded[12..20], 32u64.to_be_bytes());
        assert_eq!(encoded[20..52], *token("b").as_bytes());
    }

    #[test]
    fn test_tokens_flattens_bundles() {
        let bundle = AssetType::Bundle {
            items: vec![
                BundleItem { asset_type: AssetType::Erc721 { token: token("a"), token_id: 1 }, value: 1 },
                BundleItem { asset_type: AssetType::Erc1155 { token: token("b"), token_id: 2 }, value: 3 },
            ],
        };
        assert_eq!(bundle.tokens(), vec![token("a"), token("b")]);
        assert_eq!(bundle.token(), None);
    }

    #[test]
    fn test_asset_type_json_shape() {
        let asset_type = AssetType::Erc20 { token: token("sand") };
        let json = serde_json::to_value(&asset_type).unwrap();
        assert_eq!(json["class"], "ERC20");
        let back: AssetType = serde_json::from_value(json).unwrap();
        assert_eq!(back, asset_type);
    }
}
