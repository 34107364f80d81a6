//! Sales analytics over a trailing window, plus CSV export.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::models::pagination::DateRange;

const DEFAULT_DAYS: i64 = 30;
const MAX_DAYS: i64 = 365;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}

impl AnalyticsQuery {
    pub fn days(&self) -> Result<i64, AppError> {
        match self.days {
            None => Ok(DEFAULT_DAYS),
            Some(d) if (1..=MAX_DAYS).contains(&d) => Ok(d),
            Some(d) => Err(AppError::Validation(format!(
                "days: must be between 1 and {MAX_DAYS}, got {d}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductRank {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub days: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
    pub daily: Vec<DailyPoint>,
    pub status_counts: Vec<StatusCount>,
    pub products: Vec<ProductRank>,
}

/// Summarize orders over the `days` calendar days ending today.
///
/// Cancelled orders count towards order and status totals but never towards
/// revenue, average order value or product ranking.
pub fn summarize(orders: &[Order], days: i64, now: DateTime<FixedOffset>) -> AnalyticsSummary {
    let offset = now.timezone();
    let to = now.date_naive();
    let from = to - Duration::days(days - 1);

    let mut daily: BTreeMap<NaiveDate, DailyPoint> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            (
                date,
                DailyPoint {
                    date,
                    orders: 0,
                    revenue: Decimal::ZERO,
                },
            )
        })
        .collect();
    let mut by_status: HashMap<OrderStatus, i64> = HashMap::new();
    let mut products: HashMap<Uuid, ProductRank> = HashMap::new();
    let mut paid_orders = 0i64;
    let mut total_revenue = Decimal::ZERO;
    let mut total_orders = 0i64;

    for order in orders {
        let day = order.created_at.with_timezone(&offset).date_naive();
        let Some(point) = daily.get_mut(&day) else {
            continue;
        };
        total_orders += 1;
        point.orders += 1;
        *by_status.entry(order.status).or_default() += 1;

        if order.status == OrderStatus::Cancelled {
            continue;
        }
        paid_orders += 1;
        point.revenue += order.total;
        total_revenue += order.total;

        for line in order.items.iter() {
            let rank = products.entry(line.product_id).or_insert_with(|| ProductRank {
                product_id: line.product_id,
                name: line.name.clone(),
                quantity_sold: 0,
                revenue: Decimal::ZERO,
            });
            rank.quantity_sold += i64::from(line.quantity);
            rank.revenue += line.line_total();
        }
    }

    let average_order_value = if paid_orders == 0 {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(paid_orders)).round_dp(2)
    };

    let status_counts = OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: by_status.get(&status).copied().unwrap_or(0),
        })
        .collect();

    let mut products: Vec<ProductRank> = products.into_values().collect();
    products.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| a.name.cmp(&b.name))
    });

    AnalyticsSummary {
        days,
        from,
        to,
        total_orders,
        total_revenue,
        average_order_value,
        daily: daily.into_values().collect(),
        status_counts,
        products,
    }
}

/// Fetch the window's orders and summarize them.
pub async fn summary(
    pool: &PgPool,
    shop_id: Uuid,
    days: i64,
    now: DateTime<FixedOffset>,
) -> Result<AnalyticsSummary, AppError> {
    // Widen by a day so offset-local days at the edge are fully covered.
    let since = now.with_timezone(&Utc) - Duration::days(days + 1);
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE shop_id = $1 AND created_at >= $2",
    )
    .bind(shop_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    tracing::debug!(shop_id = %shop_id, days, orders = orders.len(), "Analytics window loaded");
    Ok(summarize(&orders, days, now))
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: Uuid,
    created_at: String,
    completed_at: String,
    status: &'static str,
    payment_method: String,
    customer_name: &'a str,
    item_count: i64,
    items: String,
    total: Decimal,
}

/// Render orders as CSV with a header row.
pub fn orders_to_csv(orders: &[Order]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for order in orders {
        let items = order
            .items
            .iter()
            .map(|i| format!("{} x{}", i.name, i.quantity))
            .collect::<Vec<_>>()
            .join("; ");
        writer
            .serialize(CsvRow {
                id: order.id,
                created_at: order.created_at.to_rfc3339(),
                completed_at: order.completed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                status: order.status.as_str(),
                payment_method: format!("{:?}", order.payment_method).to_lowercase(),
                customer_name: order.customer_name.as_deref().unwrap_or(""),
                item_count: order.items.iter().map(|i| i64::from(i.quantity)).sum(),
                items,
                total: order.total,
            })
            .map_err(|e| AppError::Internal(format!("CSV encoding failed: {e}")))?;
    }
    if orders.is_empty() {
        writer
            .write_record([
                "id",
                "created_at",
                "completed_at",
                "status",
                "payment_method",
                "customer_name",
                "item_count",
                "items",
                "total",
            ])
            .map_err(|e| AppError::Internal(format!("CSV encoding failed: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {e}")))
}

/// CSV of the shop's orders created within `range`.
pub async fn export_csv(pool: &PgPool, shop_id: Uuid, range: &DateRange) -> Result<String, AppError> {
    range.validate()?;
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE shop_id = $1 AND created_at >= $2 AND created_at < $3 \
         ORDER BY created_at ASC",
    )
    .bind(shop_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await?;

    tracing::info!(shop_id = %shop_id, rows = orders.len(), "Orders exported");
    orders_to_csv(&orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard::tests::{line, order};
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2026, 5, 20, 15, 0, 0)
            .unwrap()
            .fixed_offset()
    }

    #[test]
    fn days_default_and_bounds() {
        assert_eq!(AnalyticsQuery::default().days().unwrap(), 30);
        assert_eq!(AnalyticsQuery { days: Some(365) }.days().unwrap(), 365);
        assert!(AnalyticsQuery { days: Some(0) }.days().is_err());
        assert!(AnalyticsQuery { days: Some(366) }.days().is_err());
    }

    #[test]
    fn every_day_in_window_is_present() {
        let summary = summarize(&[], 7, now());
        assert_eq!(summary.daily.len(), 7);
        assert_eq!(summary.from, NaiveDate::from_ymd_opt(2026, 5, 14).unwrap());
        assert_eq!(summary.to, NaiveDate::from_ymd_opt(2026, 5, 20).unwrap());
        assert!(summary.daily.iter().all(|p| p.orders == 0));
        assert_eq!(summary.average_order_value, Decimal::ZERO);
        assert_eq!(summary.status_counts.len(), OrderStatus::ALL.len());
    }

    #[test]
    fn cancelled_orders_do_not_earn_revenue() {
        let t = now().with_timezone(&Utc);
        let tea = Uuid::new_v4();
        let orders = vec![
            order(10, t, OrderStatus::Completed, Some(t), vec![line(tea, "Tea", 2)]),
            order(20, t, OrderStatus::Pending, None, vec![line(tea, "Tea", 1)]),
            order(99, t, OrderStatus::Cancelled, None, vec![line(tea, "Tea", 9)]),
            order(50, t - Duration::days(40), OrderStatus::Completed, Some(t), vec![]),
        ];

        let summary = summarize(&orders, 30, now());
        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.total_revenue, Decimal::from(30));
        assert_eq!(summary.average_order_value, Decimal::from(15));
        assert_eq!(summary.daily.last().unwrap().orders, 3);
        assert_eq!(summary.products.len(), 1);
        assert_eq!(summary.products[0].quantity_sold, 3);

        let cancelled = summary
            .status_counts
            .iter()
            .find(|s| s.status == OrderStatus::Cancelled)
            .unwrap();
        assert_eq!(cancelled.count, 1);
    }

    #[test]
    fn products_are_ranked_by_quantity() {
        let t = now().with_timezone(&Utc);
        let orders = vec![order(1, t, OrderStatus::Completed, Some(t), vec![
            line(Uuid::new_v4(), "Soup", 1),
            line(Uuid::new_v4(), "Bread", 4),
            line(Uuid::new_v4(), "Salad", 2),
        ])];
        let names: Vec<String> = summarize(&orders, 1, now())
            .products
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Bread", "Salad", "Soup"]);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let t = now().with_timezone(&Utc);
        let orders = vec![order(12, t, OrderStatus::Ready, None, vec![line(Uuid::nil(), "Tea", 2)])];
        let csv = orders_to_csv(&orders).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,created_at,completed_at,status"));
        let row = lines.next().unwrap();
        assert!(row.contains(",ready,cash,"));
        assert!(row.contains("Tea x2"));
        assert!(row.ends_with(",12"));
    }

    #[test]
    fn empty_csv_still_has_header() {
        let csv = orders_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("id,"));
    }
}
