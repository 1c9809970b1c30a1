//! Asset matcher
//!
//! Two asset types match when their classes are equal and their encoded
//! parameters are byte-identical, or when a matcher registered for the class
//! declares them equivalent.

use std::collections::HashMap;
use std::fmt;

use exchange_types::asset::{AssetClass, AssetType, BundleItem};

/// Class-specific equivalence of two asset types of the same class.
pub trait ClassMatcher: fmt::Debug + Send + Sync {
    /// Returns the resolved asset type when `left` and `right` are the same
    /// asset, `None` otherwise.
    fn match_assets(&self, left: &AssetType, right: &AssetType) -> Option<AssetType>;
}

/// Bundles with the same items in any order are the same bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleMatcher;

impl ClassMatcher for BundleMatcher {
    fn match_assets(&self, left: &AssetType, right: &AssetType) -> Option<AssetType> {
        let (AssetType::Bundle { items: l }, AssetType::Bundle { items: r }) = (left, right) else {
            return None;
        };
        if l.len() != r.len() {
            return None;
        }
        let sorted = |items: &[BundleItem]| {
            let mut encoded: Vec<(Vec<u8>, [u8; 4], u128)> = items
                .iter()
                .map(|item| (item.asset_type.encode(), item.asset_type.class().id(), item.value))
                .collect();
            encoded.sort();
            encoded
        };
        (sorted(l) == sorted(r)).then(|| left.clone())
    }
}

/// Registry of class matchers with the byte-equality fallback.
#[derive(Debug)]
pub struct AssetMatcher {
    matchers: HashMap<AssetClass, Box<dyn ClassMatcher>>,
}

impl AssetMatcher {
    /// Matcher with no class-specific rules.
    pub fn empty() -> Self {
        Self {
            matchers: HashMap::new(),
        }
    }

    /// Register (or replace) the matcher for a class.
    pub fn register(&mut self, class: AssetClass, matcher: Box<dyn ClassMatcher>) {
        self.matchers.insert(class, matcher);
    }

    /// Resolve the common asset type of `left` and `right`, if any.
    pub fn match_assets(&self, left: &AssetType, right: &AssetType) -> Option<AssetType> {
        let class = left.class();
        if class != right.class() {
            return None;
        }
        if left.encode() == right.encode() {
            return Some(left.clone());
        }
        self.matchers
            .get(&class)
            .and_then(|matcher| matcher.match_assets(left, right))
    }
}

impl Default for AssetMatcher {
    /// Bundles get order-insensitive matching.
    fn default() -> Self {
        let mut matcher = Self::empty();
        matcher.register(AssetClass::Bundle, Box::new(BundleMatcher));
        matcher
    }
}
