use crate::types::{AccountAddress, Amount};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
struct AccountEntry {
    balance: Amount,
    locked: Amount,
}

/// In-memory account ledger. Locked value stays on the owner's balance but
/// cannot be transferred until unlocked or slashed.
pub struct BalanceBook {
    accounts: Arc<RwLock<HashMap<AccountAddress, AccountEntry>>>,
    issued: Arc<RwLock<Amount>>,
}

impl BalanceBook {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            issued: Arc::new(RwLock::new(Amount::ZERO)),
        }
    }

    pub async fn mint(&self, to: AccountAddress, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut accounts = self.accounts.write().await;
        let entry = accounts.entry(to).or_default();
        let new_balance = entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("Balance overflow for {}", to))?;
        entry.balance = new_balance;

        let mut issued = self.issued.write().await;
        *issued = issued
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("Issued supply overflow"))?;

        info!(
            address = %to,
            amount = amount.to_tokens(),
            balance_after = new_balance.to_tokens(),
            "💰 Value minted"
        );
        Ok(())
    }

    pub async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        if from == to {
            bail!("Cannot transfer to same address");
        }

        let mut accounts = self.accounts.write().await;

        let from_entry = accounts.get(&from).copied().unwrap_or_default();
        let available = from_entry.balance.saturating_sub(from_entry.locked);
        if available < amount {
            bail!(
                "Insufficient available balance: {} has {}, needs {}",
                from,
                available,
                amount
            );
        }

        let to_entry = accounts.get(&to).copied().unwrap_or_default();
        let new_from_balance = from_entry.balance.saturating_sub(amount);
        let new_to_balance = to_entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("Balance overflow for {}", to))?;

        accounts.entry(from).or_default().balance = new_from_balance;
        accounts.entry(to).or_default().balance = new_to_balance;

        info!(
            from = %from,
            to = %to,
            amount = amount.to_tokens(),
            from_balance_after = new_from_balance.to_tokens(),
            to_balance_after = new_to_balance.to_tokens(),
            "💸 Value transferred"
        );
        Ok(())
    }

    pub async fn lock(&self, owner: AccountAddress, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut accounts = self.accounts.write().await;
        let entry = accounts.entry(owner).or_default();

        let available = entry.balance.saturating_sub(entry.locked);
        if available < amount {
            bail!(
                "Insufficient unlocked balance: {} has {}, needs {}",
                owner,
                available,
                amount
            );
        }

        entry.locked = entry.locked.saturating_add(amount);

        info!(
            address = %owner,
            amount = amount.to_tokens(),
            locked_after = entry.locked.to_tokens(),
            "🔒 Balance locked"
        );
        Ok(())
    }

    pub async fn unlock(&self, owner: AccountAddress, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut accounts = self.accounts.write().await;
        let entry = accounts
            .get_mut(&owner)
            .ok_or_else(|| anyhow::anyhow!("Account not found: {}", owner))?;

        if entry.locked < amount {
            bail!(
                "Insufficient locked balance: {} has {}, trying to unlock {}",
                owner,
                entry.locked,
                amount
            );
        }

        entry.locked = entry.locked.saturating_sub(amount);

        info!(
            address = %owner,
            amount = amount.to_tokens(),
            locked_after = entry.locked.to_tokens(),
            "🔓 Balance unlocked"
        );
        Ok(())
    }

    /// Destroy locked value, reducing both the owner's balance and the
    /// issued supply.
    pub async fn slash_locked(&self, owner: AccountAddress, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut accounts = self.accounts.write().await;
        let entry = accounts
            .get_mut(&owner)
            .ok_or_else(|| anyhow::anyhow!("Account not found: {}", owner))?;

        if entry.locked < amount {
            bail!(
                "Insufficient locked balance: {} has {}, trying to slash {}",
                owner,
                entry.locked,
                amount
            );
        }

        entry.locked = entry.locked.saturating_sub(amount);
        entry.balance = entry.balance.saturating_sub(amount);

        let mut issued = self.issued.write().await;
        *issued = issued.saturating_sub(amount);

        info!(
            address = %owner,
            amount = amount.to_tokens(),
            balance_after = entry.balance.to_tokens(),
            issued_after = issued.to_tokens(),
            "⚔️ Locked balance slashed"
        );
        Ok(())
    }

    pub async fn balance(&self, address: AccountAddress) -> Amount {
        let accounts = self.accounts.read().await;
        accounts
            .get(&address)
            .map(|e| e.balance)
            .unwrap_or(Amount::ZERO)
    }

    pub async fn locked(&self, address: AccountAddress) -> Amount {
        let accounts = self.accounts.read().await;
        accounts
            .get(&address)
            .map(|e| e.locked)
            .unwrap_or(Amount::ZERO)
    }

    pub async fn available(&self, address: AccountAddress) -> Amount {
        let accounts = self.accounts.read().await;
        accounts
            .get(&address)
            .map(|e| e.balance.saturating_sub(e.locked))
            .unwrap_or(Amount::ZERO)
    }

    pub async fn total_issued(&self) -> Amount {
        *self.issued.read().await
    }
}

impl Default for BalanceBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mint_and_transfer() {
        let book = BalanceBook::new();
        let alice = AccountAddress::from_bytes([1; 32]);
        let bob = AccountAddress::from_bytes([2; 32]);

        book.mint(alice, Amount::from_tokens(100.0)).await.unwrap();
        assert_eq!(book.balance(alice).await, Amount::from_tokens(100.0));
        assert_eq!(book.total_issued().await, Amount::from_tokens(100.0));

        book.transfer(alice, bob, Amount::from_tokens(30.0))
            .await
            .unwrap();
        assert_eq!(book.balance(alice).await, Amount::from_tokens(70.0));
        assert_eq!(book.balance(bob).await, Amount::from_tokens(30.0));

        // Transfers never change the issued supply
        assert_eq!(book.total_issued().await, Amount::from_tokens(100.0));
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_state_unchanged() {
        let book = BalanceBook::new();
        let alice = AccountAddress::from_bytes([3; 32]);
        let bob = AccountAddress::from_bytes([4; 32]);

        book.mint(alice, Amount::from_tokens(50.0)).await.unwrap();
        assert!(book
            .transfer(alice, bob, Amount::from_tokens(100.0))
            .await
            .is_err());

        assert_eq!(book.balance(alice).await, Amount::from_tokens(50.0));
        assert_eq!(book.balance(bob).await, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_locking() {
        let book = BalanceBook::new();
        let addr = AccountAddress::from_bytes([5; 32]);

        book.mint(addr, Amount::from_tokens(100.0)).await.unwrap();
        book.lock(addr, Amount::from_tokens(40.0)).await.unwrap();

        assert_eq!(book.locked(addr).await, Amount::from_tokens(40.0));
        assert_eq!(book.available(addr).await, Amount::from_tokens(60.0));

        // Cannot lock more than available
        assert!(book.lock(addr, Amount::from_tokens(70.0)).await.is_err());

        // Locked value cannot be transferred away
        let other = AccountAddress::from_bytes([6; 32]);
        assert!(book
            .transfer(addr, other, Amount::from_tokens(80.0))
            .await
            .is_err());

        book.unlock(addr, Amount::from_tokens(20.0)).await.unwrap();
        assert_eq!(book.locked(addr).await, Amount::from_tokens(20.0));
    }

    #[tokio::test]
    async fn test_slash_locked_burns_supply() {
        let book = BalanceBook::new();
        let addr = AccountAddress::from_bytes([7; 32]);

        book.mint(addr, Amount::from_tokens(10.0)).await.unwrap();
        book.lock(addr, Amount::from_tokens(4.0)).await.unwrap();
        book.slash_locked(addr, Amount::from_tokens(4.0))
            .await
            .unwrap();

        assert_eq!(book.balance(addr).await, Amount::from_tokens(6.0));
        assert_eq!(book.locked(addr).await, Amount::ZERO);
        assert_eq!(book.total_issued().await, Amount::from_tokens(6.0));

        // Nothing left to slash
        assert!(book
            .slash_locked(addr, Amount::from_tokens(1.0))
            .await
            .is_err());
    }
}
