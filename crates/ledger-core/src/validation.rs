//! # Validation Module
//!
//! Input validation for records that eventually reach an ERP terminal.
//!
//! ## Where Validation Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout / settings / REST handlers                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  THIS MODULE: names, quantities, endpoints                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite constraints: UNIQUE(account, name), CHECKs on sync state        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ERP terminal: rejects what it does not know (LINEERROR)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Anything rejected here never costs a network round trip.

use crate::error::ValidationError;
use crate::types::NewOrder;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Customer names become ledger names in the ERP terminal.
///
/// ```rust
/// use ledger_core::validation::validate_customer_name;
///
/// assert!(validate_customer_name("Acme Traders").is_ok());
/// assert!(validate_customer_name("  ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    required("customer_name", name, 200)
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required("name", name, 200)
}

/// Validates a price level name.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Uniqueness per tenant is enforced by the store
pub fn validate_price_level_name(name: &str) -> ValidationResult<()> {
    required("price_level", name, 100)
}

/// Validates an ERP terminal host as entered in settings.
///
/// Accepts bare hosts (`192.168.1.20`, `erp.local`) and `http(s)://` URLs.
/// Whitespace inside the host is rejected.
pub fn validate_erp_host(host: &str) -> ValidationResult<()> {
    required("erp_host", host, 255)?;

    let bare = host
        .trim()
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    if bare.is_empty() || bare.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "erp_host".to_string(),
            reason: "must be a host name or address".to_string(),
        });
    }

    Ok(())
}

pub fn validate_erp_port(port: u16) -> ValidationResult<()> {
    if port == 0 {
        return Err(ValidationError::OutOfRange {
            field: "erp_port".to_string(),
            min: 1,
            max: u16::MAX as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_ITEM_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Zero is allowed; negative prices are not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// 0 to 10000 bps (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a checkout payload before any pricing happens.
///
/// ## Rules
/// - Customer name present
/// - 1 to [`MAX_ORDER_LINES`] lines
/// - Every line has a product, a valid quantity and a valid tax rate
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    validate_customer_name(&order.customer_name)?;

    if order.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }
    if order.lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    for line in &order.lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            });
        }
        validate_quantity(line.quantity)?;
        validate_tax_rate_bps(line.tax_rate.bps())?;
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewOrderLine, TaxRate};

    fn new_order(lines: usize) -> NewOrder {
        NewOrder {
            account_id: "a".into(),
            customer_name: "Acme".into(),
            price_level: None,
            payment_mode: None,
            lines: (0..lines)
                .map(|i| NewOrderLine {
                    product_id: format!("p{i}"),
                    quantity: 1,
                    tax_rate: TaxRate::zero(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_price_level_name("Wholesale").is_ok());
        assert!(validate_price_level_name("").is_err());
        assert!(validate_price_level_name(&"W".repeat(101)).is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_erp_host() {
        assert!(validate_erp_host("192.168.1.20").is_ok());
        assert!(validate_erp_host("http://erp.local").is_ok());
        assert!(validate_erp_host("").is_err());
        assert!(validate_erp_host("http://").is_err());
        assert!(validate_erp_host("erp local").is_err());
        assert!(validate_erp_port(0).is_err());
        assert!(validate_erp_port(9000).is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_new_order() {
        assert!(validate_new_order(&new_order(2)).is_ok());
        assert!(validate_new_order(&new_order(0)).is_err());
        assert!(validate_new_order(&new_order(MAX_ORDER_LINES + 1)).is_err());

        let mut bad = new_order(1);
        bad.lines[0].quantity = 0;
        assert!(matches!(
            validate_new_order(&bad),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(1800).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
        assert!(validate_price_cents(-1).is_err());
    }
}
