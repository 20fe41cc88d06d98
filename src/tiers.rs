//! Risk tier registry.
//!
//! A market is bound to one bucket of the registry, and the bucket fixes its
//! LLTV. The registry is built once from config and never mutated. Buckets are
//! an immutable indexed slice, so lookup is a single bounds check.

use crate::types::Lltv;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    #[error("Unknown tier {bucket}: registry has {tiers} tiers")]
    UnknownTier { bucket: usize, tiers: usize },

    #[error("Registry needs at least one tier")]
    Empty,

    #[error("LLTV {0} outside (0, 1]")]
    InvalidLltv(Decimal),

    #[error("Tiers must be strictly ascending: {previous} then {next}")]
    NotAscending { previous: Decimal, next: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskTierRegistry {
    tiers: Box<[Lltv]>,
}

impl RiskTierRegistry {
    /// One global ratio, reachable as bucket 0.
    pub fn single(lltv: Lltv) -> Self {
        Self {
            tiers: vec![lltv].into_boxed_slice(),
        }
    }

    /// Ordered discrete tiers. Rejects an empty list, ratios outside (0, 1]
    /// and lists that are not strictly ascending.
    pub fn bucketed(ratios: &[Decimal]) -> Result<Self, TierError> {
        if ratios.is_empty() {
            return Err(TierError::Empty);
        }

        let mut tiers = Vec::with_capacity(ratios.len());
        for &ratio in ratios {
            let lltv = Lltv::new(ratio).ok_or(TierError::InvalidLltv(ratio))?;
            if let Some(previous) = tiers.last().map(Lltv::value) {
                if ratio <= previous {
                    return Err(TierError::NotAscending { previous, next: ratio });
                }
            }
            tiers.push(lltv);
        }

        Ok(Self {
            tiers: tiers.into_boxed_slice(),
        })
    }

    pub fn lltv_of(&self, bucket: usize) -> Result<Lltv, TierError> {
        self.tiers
            .get(bucket)
            .copied()
            .ok_or(TierError::UnknownTier {
                bucket,
                tiers: self.tiers.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Lltv)> + '_ {
        self.tiers.iter().copied().enumerate()
    }
}
