//! Staked value primitives for the veridict oracle.
//!
//! Provides the account ledger ([`BalanceBook`]) and the [`StakeVault`]
//! capability with its two variants: [`NativeVault`] (escrow pool plus
//! treasury-retained forfeits) and [`BondedAssetVault`] (in-place
//! encumbrance on an external slashable asset, burned on slash).

pub mod balance;
pub mod types;
pub mod vault;

pub use balance::BalanceBook;
pub use types::{AccountAddress, Amount, VRD_BASE_UNIT, VRD_DECIMALS};
pub use vault::{BondedAssetVault, NativeVault, StakeVault};
