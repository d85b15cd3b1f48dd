//! Collateralized-debt-position arithmetic for Stateset vaults.
//!
//! Everything is integer base units. Prices are exact fractions and ratio
//! checks cross-multiply, so no floating point is involved.
//!
//! ```
//! use stateset_vault::{Price, VaultPosition};
//!
//! let price = Price::whole(2).unwrap();
//! let mut vault = VaultPosition::new(1_500, 0);
//! vault.mint(2_000, price, 15_000).unwrap();
//! assert_eq!(vault.ratio_bps(price).unwrap(), Some(15_000));
//! ```

pub mod error;
pub mod math;
pub mod position;
pub mod price;

pub use error::{Result, VaultError};
pub use math::{
    collateral_ratio_bps, collateral_value, is_healthy, liquidation_price, max_mintable,
    validate_ratio, BPS,
};
pub use position::VaultPosition;
pub use price::Price;
