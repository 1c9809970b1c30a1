//! Signing Module: typed order digests, signing and verification
//!
//! Makers sign a typed digest: SHA-256 over the signing-domain separator and
//! the order's canonical hash. Binding the domain (exchange name, version,
//! chain id) keeps a signature from being replayed on another deployment.
//! Signatures are Ed25519; a party's [`Address`] is its verifying key.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use exchange_types::ids::Address;
use exchange_types::order::{canonical_hash, Order};

/// Signing schema version (frozen).
pub const SIGNING_SCHEMA_VERSION: &str = "1";

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Identifies the deployment a signature is valid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
}

impl Default for SigningDomain {
    fn default() -> Self {
        Self {
            name: "Exchange".to_owned(),
            version: SIGNING_SCHEMA_VERSION.to_owned(),
            chain_id: 1,
        }
    }
}

impl SigningDomain {
    /// Domain separator hash.
    pub fn separator(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"Domain(string name,string version,uint256 chainId)");
        hasher.update(Sha256::digest(self.name.as_bytes()));
        hasher.update(Sha256::digest(self.version.as_bytes()));
        hasher.update(self.chain_id.to_be_bytes());
        hasher.finalize().into()
    }

    /// Digest a maker signs for `order` under this domain.
    pub fn order_digest(&self, order: &Order) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update([0x19, 0x01]);
        hasher.update(self.separator());
        hasher.update(canonical_hash(order));
        hasher.finalize().into()
    }
}

/// Address controlled by a signing key.
pub fn address_of(signing_key: &SigningKey) -> Address {
    Address::from_bytes(signing_key.verifying_key().to_bytes())
}

/// Sign an order. Returns the 64 raw signature bytes.
pub fn sign_order(order: &Order, signing_key: &SigningKey, domain: &SigningDomain) -> Vec<u8> {
    let digest = domain.order_digest(order);
    signing_key.sign(&digest).to_bytes().to_vec()
}

/// Whether `signature` over `order` verifies under the maker's address.
///
/// Malformed signatures and makers that are not valid Ed25519 points both
/// simply fail verification.
pub fn verify_order_signature(order: &Order, signature: &[u8], domain: &SigningDomain) -> bool {
    let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(order.maker.as_bytes()) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_bytes);
    verifying_key
        .verify(&domain.order_digest(order), &signature)
        .is_ok()
}
