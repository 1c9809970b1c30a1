//! Types library for the peer-signed order exchange
//!
//! Core type definitions shared by the matching engine and its collaborators:
//! identities, assets, orders and their hashes, royalty records and the error
//! taxonomy.
//!
//! # Modules
//! - `ids`: Identities (`Address`) and order keys
//! - `numeric`: Integer amount arithmetic and basis-point constants
//! - `asset`: Asset classes, asset types and canonical encoding
//! - `order`: Orders, order data, order key and canonical hash
//! - `royalty`: Royalty records and royalty-type classification
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod asset;
pub mod order;
pub mod royalty;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::asset::*;
    pub use crate::order::*;
    pub use crate::royalty::*;
    pub use crate::errors::*;
}
