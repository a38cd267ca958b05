//! # Error Types
//!
//! Domain-specific error types for ledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ledger-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ledger-db errors                                                      │
//! │  └── DbError          - Store failures                                 │
//! │                                                                         │
//! │  ledger-sync errors                                                    │
//! │  └── SyncError        - Transport / protocol / config / auth           │
//! │                                                                         │
//! │  central-api errors                                                    │
//! │  └── ApiError         - HTTP status + JSON body                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::{OrderSyncState, PriceLevelSyncState};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Order line references a product the tenant does not have.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Price level not found: {0}")]
    PriceLevelNotFound(String),

    /// A sync state change that would move a record backwards.
    ///
    /// ## When This Occurs
    /// - A bridge agent reports `pending` for an order it just processed
    /// - An admin tool tries to mark a Synced price level PendingSync
    #[error("Order {id} cannot move from {from:?} to {to:?}")]
    InvalidOrderTransition {
        id: String,
        from: OrderSyncState,
        to: OrderSyncState,
    },

    #[error("Price level {id} cannot move from {from:?} to {to:?}")]
    InvalidPriceLevelTransition {
        id: String,
        from: PriceLevelSyncState,
        to: PriceLevelSyncState,
    },

    /// The Standard price level is system-defined.
    #[error("The Standard price level cannot be modified or deleted")]
    StandardPriceLevelImmutable,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., a second "Wholesale" price level).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message() {
        let err = CoreError::InvalidOrderTransition {
            id: "o-1".into(),
            from: OrderSyncState::PostedToErp,
            to: OrderSyncState::Pending,
        };
        assert_eq!(
            err.to_string(),
            "Order o-1 cannot move from PostedToErp to Pending"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Duplicate {
            field: "price_level".into(),
            value: "Wholesale".into(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(
            core_err.to_string(),
            "Validation error: price_level 'Wholesale' already exists"
        );
    }
}
