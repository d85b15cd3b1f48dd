use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VaultError};
use crate::math;
use crate::price::Price;

/// A single collateralized debt position.
///
/// Operations that reduce the collateral ratio (`withdraw`, `mint`) check
/// health at the supplied price first and leave the position unchanged when
/// they would break it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPosition {
    pub collateral: u128,
    pub debt: u128,
}

impl VaultPosition {
    pub fn new(collateral: u128, debt: u128) -> Self {
        Self { collateral, debt }
    }

    pub fn deposit(&mut self, amount: u128) -> Result<()> {
        self.collateral = self
            .collateral
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        debug!(amount, collateral = self.collateral, "vault collateral deposited");
        Ok(())
    }

    pub fn withdraw(&mut self, amount: u128, price: Price, min_ratio_bps: u128) -> Result<()> {
        let collateral = self
            .collateral
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientCollateral {
                requested: amount,
                available: self.collateral,
            })?;
        Self::ensure_healthy(collateral, self.debt, price, min_ratio_bps)?;
        self.collateral = collateral;
        debug!(amount, collateral, "vault collateral withdrawn");
        Ok(())
    }

    pub fn mint(&mut self, amount: u128, price: Price, min_ratio_bps: u128) -> Result<()> {
        let debt = self.debt.checked_add(amount).ok_or(VaultError::Overflow)?;
        Self::ensure_healthy(self.collateral, debt, price, min_ratio_bps)?;
        self.debt = debt;
        debug!(amount, debt, "vault debt minted");
        Ok(())
    }

    pub fn repay(&mut self, amount: u128) -> Result<()> {
        self.debt = self
            .debt
            .checked_sub(amount)
            .ok_or(VaultError::RepayExceedsDebt {
                amount,
                debt: self.debt,
            })?;
        debug!(amount, debt = self.debt, "vault debt repaid");
        Ok(())
    }

    pub fn collateral_value(&self, price: Price) -> Result<u128> {
        math::collateral_value(self.collateral, price)
    }

    pub fn ratio_bps(&self, price: Price) -> Result<Option<u128>> {
        math::collateral_ratio_bps(self.collateral, self.debt, price)
    }

    pub fn is_healthy(&self, price: Price, min_ratio_bps: u128) -> Result<bool> {
        math::is_healthy(self.collateral, self.debt, price, min_ratio_bps)
    }

    pub fn liquidation_price(&self, min_ratio_bps: u128) -> Result<Option<Price>> {
        math::liquidation_price(self.collateral, self.debt, min_ratio_bps)
    }

    pub fn max_mintable(&self, price: Price, min_ratio_bps: u128) -> Result<u128> {
        math::max_mintable(self.collateral, self.debt, price, min_ratio_bps)
    }

    fn ensure_healthy(collateral: u128, debt: u128, price: Price, min_ratio_bps: u128) -> Result<()> {
        if math::is_healthy(collateral, debt, price, min_ratio_bps)? {
            return Ok(());
        }
        // Unhealthy implies debt > 0, so the ratio exists.
        let ratio_bps = math::collateral_ratio_bps(collateral, debt, price)?.unwrap_or(0);
        Err(VaultError::Undercollateralized {
            ratio_bps,
            min_ratio_bps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u128 = 15_000;

    fn two() -> Price {
        Price::whole(2).unwrap()
    }

    #[test]
    fn open_mint_repay_withdraw() {
        let mut vault = VaultPosition::default();
        vault.deposit(1_500).unwrap();
        assert_eq!(vault.max_mintable(two(), MIN).unwrap(), 2_000);

        vault.mint(2_000, two(), MIN).unwrap();
        assert_eq!(vault.ratio_bps(two()).unwrap(), Some(MIN));
        assert_eq!(vault.liquidation_price(MIN).unwrap(), Some(two()));

        vault.repay(500).unwrap();
        vault.withdraw(375, two(), MIN).unwrap();
        assert_eq!(vault, VaultPosition::new(1_125, 1_500));
        assert!(vault.is_healthy(two(), MIN).unwrap());
    }

    #[test]
    fn mint_past_limit_is_rejected_without_change() {
        let mut vault = VaultPosition::new(1_500, 0);
        let err = vault.mint(2_001, two(), MIN).unwrap_err();
        assert!(matches!(
            err,
            VaultError::Undercollateralized {
                ratio_bps: 14_992,
                min_ratio_bps: MIN
            }
        ));
        assert_eq!(vault.debt, 0);
    }

    #[test]
    fn withdraw_checks_balance_and_health() {
        let mut vault = VaultPosition::new(1_500, 2_000);
        assert_eq!(
            vault.withdraw(1_501, two(), MIN),
            Err(VaultError::InsufficientCollateral {
                requested: 1_501,
                available: 1_500
            })
        );
        assert!(matches!(
            vault.withdraw(1, two(), MIN),
            Err(VaultError::Undercollateralized { .. })
        ));
        assert_eq!(vault.collateral, 1_500);
    }

    #[test]
    fn withdraw_everything_without_debt() {
        let mut vault = VaultPosition::new(1_500, 0);
        vault.withdraw(1_500, two(), MIN).unwrap();
        assert_eq!(vault.collateral, 0);
    }

    #[test]
    fn repay_more_than_owed() {
        let mut vault = VaultPosition::new(10, 5);
        assert_eq!(
            vault.repay(6),
            Err(VaultError::RepayExceedsDebt { amount: 6, debt: 5 })
        );
        assert_eq!(vault.debt, 5);
    }

    #[test]
    fn deposit_overflow() {
        let mut vault = VaultPosition::new(u128::MAX, 0);
        assert_eq!(vault.deposit(1), Err(VaultError::Overflow));
    }

    #[test]
    fn price_drop_makes_vault_unhealthy() {
        let vault = VaultPosition::new(1_500, 2_000);
        let liquidation = vault.liquidation_price(MIN).unwrap().unwrap();
        assert!(vault.is_healthy(liquidation, MIN).unwrap());
        assert!(!vault.is_healthy(Price::new(199, 100).unwrap(), MIN).unwrap());
    }
}
