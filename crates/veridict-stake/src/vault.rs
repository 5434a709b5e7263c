use crate::balance::BalanceBook;
use crate::types::{AccountAddress, Amount};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Capability for holding responder stakes. Implementations must fail
/// without side effects when funds are insufficient; callers treat any
/// error as a fatal abort of the surrounding operation.
#[async_trait]
pub trait StakeVault: Send + Sync {
    /// Lock `amount` of the owner's funds in favor of `beneficiary`.
    async fn encumber_from(
        &self,
        owner: AccountAddress,
        beneficiary: AccountAddress,
        amount: Amount,
    ) -> Result<()>;

    /// Return previously encumbered funds to the owner.
    async fn release(&self, owner: AccountAddress, amount: Amount) -> Result<()>;

    /// Confiscate encumbered funds.
    async fn slash(&self, owner: AccountAddress, amount: Amount) -> Result<()>;
}

/// Native-value vault. Escrowed bounties and native bonds move into a pool
/// account; slashed stakes are redirected to the treasury rather than
/// destroyed.
pub struct NativeVault {
    book: Arc<BalanceBook>,
    pool: AccountAddress,
    treasury: AccountAddress,
}

impl NativeVault {
    pub fn new(book: Arc<BalanceBook>) -> Self {
        Self {
            book,
            pool: AccountAddress::escrow_pool(),
            treasury: AccountAddress::treasury(),
        }
    }

    pub fn book(&self) -> &BalanceBook {
        &self.book
    }

    pub fn pool(&self) -> AccountAddress {
        self.pool
    }

    pub fn treasury(&self) -> AccountAddress {
        self.treasury
    }

    /// Move bounty funds from the requester into the pool.
    pub async fn escrow(&self, from: AccountAddress, amount: Amount) -> Result<()> {
        self.book.transfer(from, self.pool, amount).await?;
        info!(from = %from, amount = amount.to_tokens(), "💰 Bounty escrowed");
        Ok(())
    }

    /// Pay pooled funds out to a recipient.
    pub async fn pay_out(&self, to: AccountAddress, amount: Amount) -> Result<()> {
        self.book.transfer(self.pool, to, amount).await?;
        info!(to = %to, amount = amount.to_tokens(), "💸 Payout sent");
        Ok(())
    }
}

#[async_trait]
impl StakeVault for NativeVault {
    async fn encumber_from(
        &self,
        owner: AccountAddress,
        beneficiary: AccountAddress,
        amount: Amount,
    ) -> Result<()> {
        if beneficiary != self.pool {
            bail!("Native stake must be encumbered to the escrow pool");
        }
        self.book.transfer(owner, self.pool, amount).await?;
        info!(owner = %owner, amount = amount.to_tokens(), "🔒 Native stake encumbered");
        Ok(())
    }

    async fn release(&self, owner: AccountAddress, amount: Amount) -> Result<()> {
        self.book.transfer(self.pool, owner, amount).await?;
        info!(owner = %owner, amount = amount.to_tokens(), "🔓 Native stake released");
        Ok(())
    }

    async fn slash(&self, owner: AccountAddress, amount: Amount) -> Result<()> {
        self.book.transfer(self.pool, self.treasury, amount).await?;
        info!(
            owner = %owner,
            treasury = %self.treasury,
            amount = amount.to_tokens(),
            "⚔️ Native stake forfeited to treasury"
        );
        Ok(())
    }
}

/// External slashable asset. Stakes are encumbered in place on the asset's
/// own book; slashing burns the locked amount.
pub struct BondedAssetVault {
    book: Arc<BalanceBook>,
}

impl BondedAssetVault {
    pub fn new(book: Arc<BalanceBook>) -> Self {
        Self { book }
    }
}

#[async_trait]
impl StakeVault for BondedAssetVault {
    async fn encumber_from(
        &self,
        owner: AccountAddress,
        beneficiary: AccountAddress,
        amount: Amount,
    ) -> Result<()> {
        self.book.lock(owner, amount).await?;
        info!(
            owner = %owner,
            beneficiary = %beneficiary,
            amount = amount.to_tokens(),
            "🔒 Bonded stake encumbered"
        );
        Ok(())
    }

    async fn release(&self, owner: AccountAddress, amount: Amount) -> Result<()> {
        self.book.unlock(owner, amount).await?;
        info!(owner = %owner, amount = amount.to_tokens(), "🔓 Bonded stake released");
        Ok(())
    }

    async fn slash(&self, owner: AccountAddress, amount: Amount) -> Result<()> {
        self.book.slash_locked(owner, amount).await?;
        info!(owner = %owner, amount = amount.to_tokens(), "⚔️ Bonded stake slashed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_native_bounty_flow() {
        let book = Arc::new(BalanceBook::new());
        let vault = NativeVault::new(book.clone());
        let asker = AccountAddress::from_bytes([1; 32]);
        let winner = AccountAddress::from_bytes([2; 32]);

        book.mint(asker, Amount::from_tokens(10.0)).await.unwrap();
        vault.escrow(asker, Amount::from_tokens(4.0)).await.unwrap();

        assert_eq!(book.balance(asker).await, Amount::from_tokens(6.0));
        assert_eq!(book.balance(vault.pool()).await, Amount::from_tokens(4.0));

        vault
            .pay_out(winner, Amount::from_tokens(4.0))
            .await
            .unwrap();
        assert_eq!(book.balance(winner).await, Amount::from_tokens(4.0));
        assert_eq!(book.balance(vault.pool()).await, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_native_stake_lifecycle() {
        let book = Arc::new(BalanceBook::new());
        let vault = NativeVault::new(book.clone());
        let responder = AccountAddress::from_bytes([3; 32]);

        book.mint(responder, Amount::from_tokens(5.0)).await.unwrap();
        vault
            .encumber_from(responder, vault.pool(), Amount::from_tokens(2.0))
            .await
            .unwrap();
        assert_eq!(book.balance(responder).await, Amount::from_tokens(3.0));

        // Wrong beneficiary is refused outright
        assert!(vault
            .encumber_from(responder, responder, Amount::from_tokens(1.0))
            .await
            .is_err());

        vault
            .release(responder, Amount::from_tokens(2.0))
            .await
            .unwrap();
        assert_eq!(book.balance(responder).await, Amount::from_tokens(5.0));
    }

    #[tokio::test]
    async fn test_native_slash_goes_to_treasury() {
        let book = Arc::new(BalanceBook::new());
        let vault = NativeVault::new(book.clone());
        let responder = AccountAddress::from_bytes([4; 32]);

        book.mint(responder, Amount::from_tokens(3.0)).await.unwrap();
        vault
            .encumber_from(responder, vault.pool(), Amount::from_tokens(3.0))
            .await
            .unwrap();
        vault.slash(responder, Amount::from_tokens(3.0)).await.unwrap();

        assert_eq!(
            book.balance(vault.treasury()).await,
            Amount::from_tokens(3.0)
        );
        // Retained, not destroyed
        assert_eq!(book.total_issued().await, Amount::from_tokens(3.0));
    }

    #[tokio::test]
    async fn test_bonded_slash_burns() {
        let book = Arc::new(BalanceBook::new());
        let vault = BondedAssetVault::new(book.clone());
        let owner = AccountAddress::from_bytes([5; 32]);
        let oracle = AccountAddress::from_bytes([6; 32]);

        book.mint(owner, Amount::from_tokens(8.0)).await.unwrap();
        vault
            .encumber_from(owner, oracle, Amount::from_tokens(6.0))
            .await
            .unwrap();
        assert_eq!(book.locked(owner).await, Amount::from_tokens(6.0));

        vault.release(owner, Amount::from_tokens(1.0)).await.unwrap();
        vault.slash(owner, Amount::from_tokens(5.0)).await.unwrap();

        assert_eq!(book.balance(owner).await, Amount::from_tokens(3.0));
        assert_eq!(book.locked(owner).await, Amount::ZERO);
        assert_eq!(book.total_issued().await, Amount::from_tokens(3.0));

        // Insufficient encumbrance fails with no effect
        assert!(vault.slash(owner, Amount::from_tokens(1.0)).await.is_err());
    }
}
