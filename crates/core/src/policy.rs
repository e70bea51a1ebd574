use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::store::StorageError;

/// Threshold applied when unset anywhere else: 1,000,000 currency units.
pub fn default_threshold() -> Decimal {
    Decimal::from(1_000_000u64)
}

/// Source of the procurement-review threshold. Read on every routing
/// decision; the value in force at manager-approval time is the one that
/// sticks for that request.
#[async_trait]
pub trait ThresholdPolicy: Send + Sync {
    async fn current_threshold(&self) -> Result<Decimal, StorageError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedThresholdPolicy {
    value: Decimal,
}

impl FixedThresholdPolicy {
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }
}

impl Default for FixedThresholdPolicy {
    fn default() -> Self {
        Self { value: default_threshold() }
    }
}

#[async_trait]
impl ThresholdPolicy for FixedThresholdPolicy {
    async fn current_threshold(&self) -> Result<Decimal, StorageError> {
        Ok(self.value)
    }
}
