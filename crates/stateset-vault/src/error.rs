/// Errors from vault arithmetic and position updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("invalid price {numerator}/{denominator}: both parts must be positive")]
    InvalidPrice { numerator: u128, denominator: u128 },

    #[error("invalid minimum ratio {0} bps: must be at least 10000")]
    InvalidRatio(u128),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("position would be undercollateralized: ratio {ratio_bps} bps below minimum {min_ratio_bps} bps")]
    Undercollateralized { ratio_bps: u128, min_ratio_bps: u128 },

    #[error("insufficient collateral: {requested} requested, {available} available")]
    InsufficientCollateral { requested: u128, available: u128 },

    #[error("repayment {amount} exceeds outstanding debt {debt}")]
    RepayExceedsDebt { amount: u128, debt: u128 },
}

pub type Result<T> = std::result::Result<T, VaultError>;
