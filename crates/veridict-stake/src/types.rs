use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const VRD_DECIMALS: u32 = 9;
pub const VRD_BASE_UNIT: u64 = 1_000_000_000; // 10^9

/// A quantity of stakeable value, stored in base units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn from_tokens(tokens: f64) -> Self {
        Self((tokens * VRD_BASE_UNIT as f64) as u64)
    }

    pub fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_tokens(&self) -> f64 {
        self.0 as f64 / VRD_BASE_UNIT as f64
    }

    pub fn to_base_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_mul(&self, factor: u64) -> Self {
        Self(self.0.saturating_mul(factor))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9} VRD", self.to_tokens())
    }
}

/// Authenticated account identity. Callers are trusted to be unforgeable;
/// key handling lives outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s)?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| anyhow::anyhow!("Address must be 32 bytes"))?;
        Ok(Self(bytes))
    }

    /// All-zero sentinel used for not-yet-assigned identities.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Destination for retained forfeits.
    pub fn treasury() -> Self {
        Self([0xFE; 32])
    }

    /// Pool account holding escrowed bounties and native bonds.
    pub fn escrow_pool() -> Self {
        Self([0xFD; 32])
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_conversions() {
        let amount = Amount::from_tokens(1.5);
        assert_eq!(amount.to_base_units(), 1_500_000_000);
        assert_eq!(Amount::from_base_units(500_000_000).to_tokens(), 0.5);
        assert!(Amount::ZERO.is_zero());
    }

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::from_base_units(u64::MAX);
        let b = Amount::from_base_units(1);

        assert!(a.checked_add(b).is_none());
        assert_eq!(a.saturating_add(b), a);
        assert!(b.checked_sub(a).is_none());
        assert_eq!(b.saturating_sub(a), Amount::ZERO);
        assert_eq!(
            Amount::from_base_units(3).saturating_mul(2),
            Amount::from_base_units(6)
        );
    }

    #[test]
    fn test_well_known_addresses() {
        assert!(AccountAddress::zero().is_zero());
        assert!(!AccountAddress::treasury().is_zero());
        assert_ne!(AccountAddress::treasury(), AccountAddress::escrow_pool());
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = AccountAddress::from_bytes([7; 32]);
        let decoded = AccountAddress::from_hex(&addr.to_hex()).unwrap();
        assert_eq!(addr, decoded);
        assert!(AccountAddress::from_hex("0707").is_err());
    }
}
