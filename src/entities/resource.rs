// 📦 Resource Entity - inventory items tracked across projects
//
// Resources are maintained by the inventory side of the system. This crate
// only reads them: quantity is the total stock, allocations are claims
// against it.

use serde::{Deserialize, Serialize};

// ============================================================================
// STOCK STATUS
// ============================================================================

/// Fraction of total quantity below which a resource is reported as low.
pub const LOW_STOCK_RATIO: f64 = 0.2;

/// Decimal places quantities are compared at. Fractional units (kg, m)
/// accumulate binary rounding noise when summed: 0.3 - 0.1 is not 0.2.
pub const QUANTITY_DECIMALS: i32 = 6;

/// Round a quantity (or a sum/difference of quantities) to
/// `QUANTITY_DECIMALS` places.
pub fn round_quantity(quantity: f64) -> f64 {
    let scale = 10f64.powi(QUANTITY_DECIMALS);
    (quantity * scale).round() / scale
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    /// More than 20% of the total quantity is still free
    Available,

    /// Something is left, but less than 20% of the total quantity
    #[serde(rename = "Low Stock")]
    LowStock,

    /// Nothing left to allocate
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "Available",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }

    /// Band an available quantity against the resource's total quantity.
    ///
    /// First match wins: `available <= 0` is out of stock, anything strictly
    /// below `LOW_STOCK_RATIO * quantity` is low, everything else is available.
    /// Exactly 20% is therefore `Available`.
    pub fn classify(available: f64, quantity: f64) -> Self {
        if available <= 0.0 {
            StockStatus::OutOfStock
        } else if available < LOW_STOCK_RATIO * quantity {
            StockStatus::LowStock
        } else {
            StockStatus::Available
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RESOURCE
// ============================================================================

/// A resource row as stored (and as imported from CSV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,

    pub name: String,

    /// Free-form category, e.g. "Equipment" or "Material"
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Unit of measure ("pcs", "kg", "m", ...)
    pub unit: String,

    /// Total quantity owned, never negative
    pub quantity: f64,

    pub cost_per_unit: f64,

    /// Returnable resources come back after use, consumables are used up.
    /// Informational only; availability treats both the same way.
    pub returnable: bool,

    /// Status label as written by the inventory system. Availability views
    /// recompute their own status and do not trust this one.
    #[serde(default)]
    pub status: String,
}

impl Resource {
    pub fn new(id: &str, name: &str, quantity: f64) -> Self {
        Resource {
            id: id.to_string(),
            name: name.to_string(),
            resource_type: "Material".to_string(),
            unit: "pcs".to_string(),
            quantity,
            cost_per_unit: 0.0,
            returnable: false,
            status: StockStatus::Available.as_str().to_string(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        if self.returnable {
            "Returnable"
        } else {
            "Consumable"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        assert_eq!(StockStatus::classify(0.0, 10.0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(-3.0, 10.0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(15.0, 100.0), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(50.0, 50.0), StockStatus::Available);
    }

    #[test]
    fn test_classify_twenty_percent_is_available() {
        // Comparison is strict, so the boundary itself is not low
        assert_eq!(StockStatus::classify(20.0, 100.0), StockStatus::Available);
        assert_eq!(StockStatus::classify(19.999, 100.0), StockStatus::LowStock);
    }

    #[test]
    fn test_classify_zero_quantity_resource() {
        assert_eq!(StockStatus::classify(0.0, 0.0), StockStatus::OutOfStock);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(StockStatus::Available.to_string(), "Available");
        assert_eq!(StockStatus::LowStock.to_string(), "Low Stock");
        assert_eq!(StockStatus::OutOfStock.to_string(), "Out of Stock");
    }

    #[test]
    fn test_status_serializes_as_label() {
        assert_eq!(serde_json::to_value(StockStatus::LowStock).unwrap(), "Low Stock");
        assert_eq!(serde_json::to_value(StockStatus::OutOfStock).unwrap(), "Out of Stock");
        assert_eq!(serde_json::to_value(StockStatus::Available).unwrap(), "Available");

        let parsed: StockStatus = serde_json::from_str("\"Low Stock\"").unwrap();
        assert_eq!(parsed, StockStatus::LowStock);
    }

    #[test]
    fn test_round_quantity_absorbs_float_noise() {
        assert_ne!(0.3 - 0.1, 0.2);
        assert_eq!(round_quantity(0.3 - 0.1), 0.2);
        assert_eq!(round_quantity(0.1 + 0.2), 0.3);
        assert_eq!(round_quantity(12.5), 12.5);
        assert_eq!(round_quantity(-2.0), -2.0);
    }

    #[test]
    fn test_kind_label() {
        let mut r = Resource::new("r1", "Scaffolding", 10.0);
        assert_eq!(r.kind_label(), "Consumable");
        r.returnable = true;
        assert_eq!(r.kind_label(), "Returnable");
    }
}
