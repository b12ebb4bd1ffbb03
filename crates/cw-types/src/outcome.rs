use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of a mutating ledger operation.
///
/// Every variant other than `Success` is an expected, recoverable outcome:
/// the operation left both the ledger and the inventory unchanged. The
/// ledger never logs these; the caller translates them for the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationResult {
    Success,
    /// The resource's max stack size is 1 (tools, armor, ...).
    NotStackable,
    /// The instance carries per-instance data.
    NotSimple,
    /// The ledger holds fewer units than requested.
    InsufficientStock,
    /// The inventory lacks the requested units, or the slot is empty or out of range.
    NotInInventory,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotStackable => "not-stackable",
            Self::NotSimple => "not-simple",
            Self::InsufficientStock => "insufficient-stock",
            Self::NotInInventory => "not-in-inventory",
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which ledger operation produced an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    DepositByType,
    DepositAll,
    WithdrawByType,
    DepositFromSlot,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepositByType => write!(f, "deposit-by-type"),
            Self::DepositAll => write!(f, "deposit-all"),
            Self::WithdrawByType => write!(f, "withdraw-by-type"),
            Self::DepositFromSlot => write!(f, "deposit-from-slot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_success_is_success() {
        assert!(OperationResult::Success.is_success());
        for r in [
            OperationResult::NotStackable,
            OperationResult::NotSimple,
            OperationResult::InsufficientStock,
            OperationResult::NotInInventory,
        ] {
            assert!(!r.is_success());
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(OperationResult::InsufficientStock.to_string(), "insufficient-stock");
        assert_eq!(OperationKind::DepositFromSlot.to_string(), "deposit-from-slot");
    }
}
