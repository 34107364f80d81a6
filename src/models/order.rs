//! Order model: line items, status lifecycle and payment method.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Orders still moving through the kitchen.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Preparing | OrderStatus::Ready
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Mobile,
}

/// Line item stored inside the order document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub items: Json<Vec<OrderItem>>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999, message = "must be between 1 and 999"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrder {
    #[validate(length(min = 1, message = "must contain at least one item"), nested)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(length(max = 80, message = "must be at most 80 characters"))]
    pub customer_name: Option<String>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

/// Query filters for the orders screen.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OrderFilters {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.as_str());
        }
    }

    #[test]
    fn active_statuses() {
        assert!(OrderStatus::Pending.is_active());
        assert!(OrderStatus::Ready.is_active());
        assert!(!OrderStatus::Completed.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
    }

    #[test]
    fn line_total_multiplies_quantity() {
        let item = OrderItem {
            product_id: Uuid::nil(),
            name: "Latte".to_string(),
            image_url: None,
            quantity: 3,
            unit_price: Decimal::new(450, 2),
        };
        assert_eq!(item.line_total(), Decimal::new(1350, 2));
    }

    #[test]
    fn create_order_requires_items() {
        let order = CreateOrder {
            items: vec![],
            payment_method: PaymentMethod::Card,
            customer_name: None,
            notes: None,
        };
        assert!(order.validate().is_err());
    }

    #[test]
    fn create_order_rejects_zero_quantity() {
        let order = CreateOrder {
            items: vec![CartLine {
                product_id: Uuid::nil(),
                quantity: 0,
            }],
            payment_method: PaymentMethod::Cash,
            customer_name: None,
            notes: None,
        };
        assert!(order.validate().is_err());
    }

    #[test]
    fn payment_method_defaults_to_cash() {
        let order: CreateOrder = serde_json::from_value(serde_json::json!({
            "items": [{ "product_id": Uuid::nil(), "quantity": 2 }]
        }))
        .unwrap();
        assert_eq!(order.payment_method, PaymentMethod::Cash);
        assert!(order.validate().is_ok());
    }
}
