use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    #[error("adjustment threshold must be at least 1 miss")]
    InvalidAdjustThreshold,

    #[error("minimum-progress threshold must be above the adjustment threshold")]
    InvalidMinimumThreshold,

    #[error("reduction percent must be between 1 and 99")]
    InvalidReductionPercent,

    #[error("minimum daily load must be at least 1")]
    InvalidMinimumLoad,
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Escalation rules applied when check-ins are missed.
///
/// The defaults keep the first miss free, cut the load to 75% on the second
/// consecutive miss, and drop to a single unit per day from the third on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    adjust_after_misses: u32,
    minimum_after_misses: u32,
    reduction_percent: u32,
    minimum_load: u32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            adjust_after_misses: 2,
            minimum_after_misses: 3,
            reduction_percent: 75,
            minimum_load: 1,
        }
    }
}

impl RecoveryPolicy {
    /// Creates a custom policy.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if a threshold is zero or out of order, if the
    /// reduction is not a real reduction, or if the minimum load is zero.
    pub fn new(
        adjust_after_misses: u32,
        minimum_after_misses: u32,
        reduction_percent: u32,
        minimum_load: u32,
    ) -> Result<Self, PolicyError> {
        if adjust_after_misses == 0 {
            return Err(PolicyError::InvalidAdjustThreshold);
        }
        if minimum_after_misses <= adjust_after_misses {
            return Err(PolicyError::InvalidMinimumThreshold);
        }
        if !(1..=99).contains(&reduction_percent) {
            return Err(PolicyError::InvalidReductionPercent);
        }
        if minimum_load == 0 {
            return Err(PolicyError::InvalidMinimumLoad);
        }

        Ok(Self {
            adjust_after_misses,
            minimum_after_misses,
            reduction_percent,
            minimum_load,
        })
    }

    // Accessors
    #[must_use]
    pub fn adjust_after_misses(&self) -> u32 {
        self.adjust_after_misses
    }

    #[must_use]
    pub fn minimum_after_misses(&self) -> u32 {
        self.minimum_after_misses
    }

    #[must_use]
    pub fn reduction_percent(&self) -> u32 {
        self.reduction_percent
    }

    #[must_use]
    pub fn minimum_load(&self) -> u32 {
        self.minimum_load
    }

    /// `max(minimum_load, floor(load * reduction_percent / 100))`.
    #[must_use]
    pub fn reduced_load(&self, load: u32) -> u32 {
        let reduced = u64::from(load) * u64::from(self.reduction_percent) / 100;
        u32::try_from(reduced)
            .unwrap_or(u32::MAX)
            .max(self.minimum_load)
    }
}
