//! Inventory items and stock-level bands.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryItem {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub min_threshold: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock band derived from quantity relative to the minimum threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Out,
    Low,
    Medium,
    Healthy,
}

impl StockLevel {
    pub fn classify(quantity: Decimal, min_threshold: Decimal) -> Self {
        if quantity <= Decimal::ZERO {
            StockLevel::Out
        } else if quantity <= min_threshold {
            StockLevel::Low
        } else if min_threshold
            .checked_mul(Decimal::TWO)
            .map_or(true, |medium| quantity <= medium)
        {
            StockLevel::Medium
        } else {
            StockLevel::Healthy
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            StockLevel::Out => "red",
            StockLevel::Low => "orange",
            StockLevel::Medium => "yellow",
            StockLevel::Healthy => "green",
        }
    }

    /// Whether the band should raise a low-stock alert.
    pub fn needs_restock(&self) -> bool {
        matches!(self, StockLevel::Out | StockLevel::Low)
    }
}

/// Inventory item as returned to the inventory screen.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryItemView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub stock_level: StockLevel,
    pub color: &'static str,
}

impl From<InventoryItem> for InventoryItemView {
    fn from(item: InventoryItem) -> Self {
        let stock_level = StockLevel::classify(item.quantity, item.min_threshold);
        Self {
            item,
            stock_level,
            color: stock_level.color(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInventoryItem {
    #[validate(length(min = 1, max = 120, message = "must be 1 to 120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "must be 1 to 20 characters"))]
    pub unit: String,
    pub quantity: Decimal,
    pub min_threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Default, Validate)]
pub struct UpdateInventoryItem {
    #[validate(length(min = 1, max = 120, message = "must be 1 to 120 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "must be 1 to 20 characters"))]
    pub unit: Option<String>,
    pub min_threshold: Option<Decimal>,
}

/// Signed change applied to an item's quantity (restock or usage).
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStock {
    pub delta: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn zero_quantity_is_out_of_stock() {
        assert_eq!(StockLevel::classify(d(0), d(5)), StockLevel::Out);
        assert_eq!(StockLevel::classify(d(0), d(0)), StockLevel::Out);
    }

    #[test]
    fn bands_follow_threshold_multiples() {
        assert_eq!(StockLevel::classify(d(5), d(5)), StockLevel::Low);
        assert_eq!(StockLevel::classify(d(6), d(5)), StockLevel::Medium);
        assert_eq!(StockLevel::classify(d(10), d(5)), StockLevel::Medium);
        assert_eq!(StockLevel::classify(d(11), d(5)), StockLevel::Healthy);
    }

    #[test]
    fn huge_threshold_does_not_overflow() {
        assert_eq!(StockLevel::classify(Decimal::MAX, Decimal::MAX), StockLevel::Low);
        assert_eq!(
            StockLevel::classify(Decimal::MAX, Decimal::MAX - d(1)),
            StockLevel::Medium
        );
    }

    #[test]
    fn no_threshold_means_any_stock_is_healthy() {
        assert_eq!(StockLevel::classify(Decimal::new(1, 1), d(0)), StockLevel::Healthy);
    }

    #[test]
    fn colors_and_restock_flags() {
        assert_eq!(StockLevel::Out.color(), "red");
        assert_eq!(StockLevel::Healthy.color(), "green");
        assert!(StockLevel::Low.needs_restock());
        assert!(!StockLevel::Medium.needs_restock());
    }

    #[test]
    fn view_serializes_flat_with_band() {
        let view = InventoryItemView::from(InventoryItem {
            id: Uuid::nil(),
            shop_id: Uuid::nil(),
            name: "Flour".to_string(),
            unit: "kg".to_string(),
            quantity: d(3),
            min_threshold: d(4),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Flour");
        assert_eq!(json["stock_level"], "low");
        assert_eq!(json["color"], "orange");
    }
}
