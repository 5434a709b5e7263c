use crate::error::{OracleError, Result};
use crate::types::ContentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use veridict_stake::{AccountAddress, Amount};

/// Commitment to one accepted submission: the response, who staked it,
/// and their accumulated bond as of that moment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// blake3(response ++ responder ++ bond), bond as little-endian base
    /// units.
    pub fn compute(response: &ContentId, responder: &AccountAddress, bond: Amount) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(response.as_bytes());
        hasher.update(responder.as_bytes());
        hasher.update(&bond.to_base_units().to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Rolling commitment over every accepted submission, oldest first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryHash([u8; 32]);

impl HistoryHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// blake3(old ++ fingerprint). The concatenation order is load
    /// bearing: changing it invalidates every previously committed proof.
    pub fn fold(&self, fingerprint: &Fingerprint) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.0);
        hasher.update(fingerprint.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

impl fmt::Debug for HistoryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HistoryHash({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for HistoryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Recompute the rolling hash for an ordered fingerprint list, starting
/// from the zero sentinel. Public so auditors can re-derive the committed
/// chain from off-system logs.
pub fn recompute_history_hash(fingerprints: &[Fingerprint]) -> HistoryHash {
    fingerprints
        .iter()
        .fold(HistoryHash::ZERO, |acc, fp| acc.fold(fp))
}

/// Dual check backing reclaim and slash: the supplied list must recompute
/// to the committed hash exactly, and must contain the target fingerprint.
/// Passing one check without the other proves nothing.
pub fn verify_history(
    committed: &HistoryHash,
    fingerprints: &[Fingerprint],
    target: &Fingerprint,
) -> Result<()> {
    if recompute_history_hash(fingerprints) != *committed {
        return Err(OracleError::InvalidHistoryHash);
    }
    if !fingerprints.contains(target) {
        return Err(OracleError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fingerprints() -> (Fingerprint, Fingerprint) {
        let alice = AccountAddress::from_bytes([1; 32]);
        let bob = AccountAddress::from_bytes([2; 32]);
        (
            Fingerprint::compute(&ContentId::new(b"yes"), &alice, Amount::from_tokens(1.0)),
            Fingerprint::compute(&ContentId::new(b"no"), &bob, Amount::from_tokens(2.0)),
        )
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let (a, b) = sample_fingerprints();

        let first = recompute_history_hash(&[a, b]);
        let second = recompute_history_hash(&[a, b]);
        assert_eq!(first, second);
        assert!(!first.is_zero());
    }

    #[test]
    fn test_fold_is_order_sensitive() {
        let (a, b) = sample_fingerprints();
        assert_ne!(recompute_history_hash(&[a, b]), recompute_history_hash(&[b, a]));
    }

    #[test]
    fn test_empty_history_is_zero() {
        assert_eq!(recompute_history_hash(&[]), HistoryHash::ZERO);
    }

    #[test]
    fn test_fingerprint_binds_all_three_inputs() {
        let alice = AccountAddress::from_bytes([1; 32]);
        let bob = AccountAddress::from_bytes([2; 32]);
        let response = ContentId::new(b"yes");

        let base = Fingerprint::compute(&response, &alice, Amount::from_tokens(1.0));
        assert_ne!(
            base,
            Fingerprint::compute(&ContentId::new(b"no"), &alice, Amount::from_tokens(1.0))
        );
        assert_ne!(
            base,
            Fingerprint::compute(&response, &bob, Amount::from_tokens(1.0))
        );
        assert_ne!(
            base,
            Fingerprint::compute(&response, &alice, Amount::from_tokens(1.5))
        );
    }

    #[test]
    fn test_verify_history_dual_check() {
        let (a, b) = sample_fingerprints();
        let committed = recompute_history_hash(&[a, b]);

        assert!(verify_history(&committed, &[a, b], &a).is_ok());
        assert!(verify_history(&committed, &[a, b], &b).is_ok());

        // Reordered list no longer matches the commitment
        assert!(matches!(
            verify_history(&committed, &[b, a], &a),
            Err(OracleError::InvalidHistoryHash)
        ));

        // Truncated list fails the recomputation before membership
        assert!(matches!(
            verify_history(&committed, &[a], &a),
            Err(OracleError::InvalidHistoryHash)
        ));

        // Valid list, but the claimed fingerprint was never committed
        let stranger = Fingerprint::compute(
            &ContentId::new(b"maybe"),
            &AccountAddress::from_bytes([9; 32]),
            Amount::from_tokens(4.0),
        );
        assert!(matches!(
            verify_history(&committed, &[a, b], &stranger),
            Err(OracleError::NotFound)
        ));
    }
}
