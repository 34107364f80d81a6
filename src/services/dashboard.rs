//! Dashboard aggregation over a shop's raw orders.
//!
//! Orders are bucketed by the calendar day of `created_at` in the dashboard's
//! offset. Prep time uses `completed_at - created_at` for orders completed on
//! the day in question. Popular items rank products by quantity sold in
//! completed orders from the trailing seven days.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::models::product::Product;

const POPULAR_ITEMS_LIMIT: usize = 3;
const POPULAR_WINDOW_DAYS: i64 = 7;
const RECENT_ORDERS_LIMIT: usize = 5;

/// Today-versus-yesterday figures for the overview cards.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct DailyStats {
    pub today_orders_count: i64,
    pub today_revenue: Decimal,
    pub yesterday_orders_count: i64,
    pub yesterday_revenue: Decimal,
    pub current_average_prep_time: f64,
    pub previous_average_prep_time: f64,
    pub popular_items: Vec<PopularItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PopularItem {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity_sold: i64,
}

/// Percentage-change labels shown under each card.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatChanges {
    pub orders: String,
    pub revenue: String,
    pub prep_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentOrder {
    pub id: Uuid,
    pub customer_name: Option<String>,
    pub item_count: i64,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub time_ago: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub daily: DailyStats,
    pub changes: StatChanges,
    pub recent_orders: Vec<RecentOrder>,
}

fn local_day(instant: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    instant.with_timezone(offset).date_naive()
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Compute the daily figures from every order of a shop.
pub fn aggregate(
    orders: &[Order],
    products: &HashMap<Uuid, Product>,
    now: DateTime<FixedOffset>,
) -> DailyStats {
    let offset = now.timezone();
    let today = now.date_naive();
    let yesterday = today.pred_opt().unwrap_or(today);

    let mut stats = DailyStats::default();
    let mut today_prep: Vec<f64> = Vec::new();
    let mut yesterday_prep: Vec<f64> = Vec::new();

    for order in orders {
        let created_day = local_day(order.created_at, &offset);
        if created_day == today {
            stats.today_orders_count += 1;
            stats.today_revenue += order.total;
        } else if created_day == yesterday {
            stats.yesterday_orders_count += 1;
            stats.yesterday_revenue += order.total;
        }

        if order.status != OrderStatus::Completed {
            continue;
        }
        let Some(completed_at) = order.completed_at else {
            continue;
        };
        let minutes = (completed_at - order.created_at).num_seconds() as f64 / 60.0;
        if minutes <= 0.0 {
            continue;
        }
        let completed_day = local_day(completed_at, &offset);
        if completed_day == today {
            today_prep.push(minutes);
        } else if completed_day == yesterday {
            yesterday_prep.push(minutes);
        }
    }

    stats.current_average_prep_time = average(&today_prep);
    stats.previous_average_prep_time = average(&yesterday_prep);
    stats.popular_items = popular_items(orders, products, now.with_timezone(&Utc));
    stats
}

/// Top products by quantity across completed orders in the trailing window.
pub fn popular_items(
    orders: &[Order],
    products: &HashMap<Uuid, Product>,
    now: DateTime<Utc>,
) -> Vec<PopularItem> {
    let window_start = now - Duration::days(POPULAR_WINDOW_DAYS);
    let mut totals: HashMap<Uuid, PopularItem> = HashMap::new();

    let recent_completed = orders.iter().filter(|o| {
        o.status == OrderStatus::Completed && o.created_at >= window_start && o.created_at <= now
    });

    for order in recent_completed {
        for line in order.items.iter() {
            let entry = totals.entry(line.product_id).or_insert_with(|| {
                let (name, image_url) = match products.get(&line.product_id) {
                    Some(product) => (product.name.clone(), product.image_url.clone()),
                    None => (line.name.clone(), line.image_url.clone()),
                };
                PopularItem {
                    product_id: line.product_id,
                    name,
                    image_url,
                    quantity_sold: 0,
                }
            });
            entry.quantity_sold += i64::from(line.quantity);
        }
    }

    let mut ranked: Vec<PopularItem> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(POPULAR_ITEMS_LIMIT);
    ranked
}

/// Signed change from `previous` to `current`, rounded to a whole percent.
pub fn percentage_change(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return if current > 0.0 {
            "+100%".to_string()
        } else {
            "N/A".to_string()
        };
    }
    let change = ((current - previous) / previous * 100.0).round() as i64;
    if change > 0 {
        format!("+{change}%")
    } else {
        format!("{change}%")
    }
}

fn ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Coarse relative time using the largest unit that fits.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let seconds = (now - then).num_seconds().max(0);
    if seconds >= YEAR {
        ago(seconds / YEAR, "year")
    } else if seconds >= MONTH {
        ago(seconds / MONTH, "month")
    } else if seconds >= DAY {
        ago(seconds / DAY, "day")
    } else if seconds >= HOUR {
        ago(seconds / HOUR, "hour")
    } else if seconds >= MINUTE {
        ago(seconds / MINUTE, "minute")
    } else {
        ago(seconds, "second")
    }
}

/// `time_ago` for an RFC 3339 / ISO 8601 timestamp string.
pub fn time_ago_iso(timestamp: &str, now: DateTime<Utc>) -> Result<String, AppError> {
    let then = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| AppError::Validation(format!("Invalid timestamp '{timestamp}': {e}")))?;
    Ok(time_ago(then.with_timezone(&Utc), now))
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Assemble the full dashboard payload from already-fetched data.
pub fn build_stats(
    orders: &[Order],
    products: &HashMap<Uuid, Product>,
    now: DateTime<FixedOffset>,
) -> DashboardStats {
    let daily = aggregate(orders, products, now);
    let now_utc = now.with_timezone(&Utc);

    let changes = StatChanges {
        orders: percentage_change(
            daily.today_orders_count as f64,
            daily.yesterday_orders_count as f64,
        ),
        revenue: percentage_change(to_f64(daily.today_revenue), to_f64(daily.yesterday_revenue)),
        prep_time: percentage_change(
            daily.current_average_prep_time,
            daily.previous_average_prep_time,
        ),
    };

    let mut newest: Vec<&Order> = orders.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_orders = newest
        .into_iter()
        .take(RECENT_ORDERS_LIMIT)
        .map(|o| RecentOrder {
            id: o.id,
            customer_name: o.customer_name.clone(),
            item_count: o.items.iter().map(|i| i64::from(i.quantity)).sum(),
            total: o.total,
            status: o.status,
            created_at: o.created_at,
            time_ago: time_ago(o.created_at, now_utc),
        })
        .collect();

    DashboardStats {
        daily,
        changes,
        recent_orders,
    }
}

/// Fetch a shop's orders and products and aggregate them.
///
/// A failed fetch is logged and yields zeroed statistics.
pub async fn get_stats(pool: &PgPool, shop_id: Uuid, now: DateTime<FixedOffset>) -> DashboardStats {
    match tokio::try_join!(fetch_orders(pool, shop_id), fetch_products(pool, shop_id)) {
        Ok((orders, products)) => build_stats(&orders, &products, now),
        Err(e) => {
            tracing::error!(error = %e, shop_id = %shop_id, "Dashboard fetch failed");
            build_stats(&[], &HashMap::new(), now)
        }
    }
}

async fn fetch_orders(pool: &PgPool, shop_id: Uuid) -> Result<Vec<Order>, AppError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE shop_id = $1")
        .bind(shop_id)
        .fetch_all(pool)
        .await?;
    Ok(orders)
}

async fn fetch_products(pool: &PgPool, shop_id: Uuid) -> Result<HashMap<Uuid, Product>, AppError> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE shop_id = $1")
        .bind(shop_id)
        .fetch_all(pool)
        .await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::order::{OrderItem, PaymentMethod};
    use chrono::TimeZone;
    use sqlx::types::Json;

    pub(crate) fn order(
        total: i64,
        created_at: DateTime<Utc>,
        status: OrderStatus,
        completed_at: Option<DateTime<Utc>>,
        items: Vec<OrderItem>,
    ) -> Order {
        Order {
            id: Uuid::new_v4(),
            shop_id: Uuid::nil(),
            items: Json(items),
            total: Decimal::from(total),
            status,
            payment_method: PaymentMethod::Cash,
            customer_name: None,
            notes: None,
            created_by: None,
            created_at,
            completed_at,
            updated_at: created_at,
        }
    }

    pub(crate) fn line(product_id: Uuid, name: &str, quantity: i32) -> OrderItem {
        OrderItem {
            product_id,
            name: name.to_string(),
            image_url: Some(format!("{name}.png")),
            quantity,
            unit_price: Decimal::ONE,
        }
    }

    fn product(id: Uuid, name: &str) -> Product {
        Product {
            id,
            shop_id: Uuid::nil(),
            category_id: None,
            name: name.to_string(),
            description: None,
            price: Decimal::ONE,
            image_url: Some(format!("catalog/{name}.jpg")),
            is_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn noon() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
            .unwrap()
            .fixed_offset()
    }

    #[test]
    fn revenue_is_split_between_today_and_yesterday() {
        let now = noon();
        let today = now.with_timezone(&Utc) - Duration::hours(1);
        let yesterday = today - Duration::days(1);
        let orders = vec![
            order(10, today, OrderStatus::Pending, None, vec![]),
            order(5, yesterday, OrderStatus::Pending, None, vec![]),
            order(99, yesterday - Duration::days(3), OrderStatus::Completed, None, vec![]),
        ];

        let stats = aggregate(&orders, &HashMap::new(), now);
        assert_eq!(stats.today_revenue, Decimal::from(10));
        assert_eq!(stats.yesterday_revenue, Decimal::from(5));
        assert_eq!(stats.today_orders_count, 1);
        assert_eq!(stats.yesterday_orders_count, 1);
    }

    #[test]
    fn day_boundaries_follow_the_dashboard_offset() {
        // 23:30 UTC on the 9th is already the 10th at UTC+2.
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = noon().with_timezone(&offset);
        let late_evening = Utc.with_ymd_and_hms(2026, 3, 9, 23, 30, 0).unwrap();
        let orders = vec![order(7, late_evening, OrderStatus::Pending, None, vec![])];

        let stats = aggregate(&orders, &HashMap::new(), now);
        assert_eq!(stats.today_orders_count, 1);
        assert_eq!(stats.yesterday_orders_count, 0);

        let utc_stats = aggregate(&orders, &HashMap::new(), noon());
        assert_eq!(utc_stats.yesterday_orders_count, 1);
    }

    #[test]
    fn prep_time_averages_completed_orders() {
        let now = noon();
        let created = now.with_timezone(&Utc) - Duration::minutes(30);
        let orders = vec![order(
            12,
            created,
            OrderStatus::Completed,
            Some(created + Duration::minutes(15)),
            vec![],
        )];

        let stats = aggregate(&orders, &HashMap::new(), now);
        assert_eq!(stats.current_average_prep_time, 15.0);
        assert_eq!(stats.previous_average_prep_time, 0.0);
    }

    #[test]
    fn prep_time_is_zero_without_qualifying_orders() {
        let now = noon();
        let created = now.with_timezone(&Utc) - Duration::minutes(30);
        let orders = vec![
            order(1, created, OrderStatus::Ready, None, vec![]),
            // completion stamp earlier than creation is ignored
            order(1, created, OrderStatus::Completed, Some(created - Duration::minutes(1)), vec![]),
            order(1, created, OrderStatus::Completed, Some(created), vec![]),
        ];
        let stats = aggregate(&orders, &HashMap::new(), now);
        assert_eq!(stats.current_average_prep_time, 0.0);
    }

    #[test]
    fn yesterday_prep_time_uses_completion_day() {
        let now = noon();
        let completed = now.with_timezone(&Utc) - Duration::days(1);
        let orders = vec![
            order(1, completed - Duration::minutes(10), OrderStatus::Completed, Some(completed), vec![]),
            order(1, completed - Duration::minutes(20), OrderStatus::Completed, Some(completed), vec![]),
        ];
        let stats = aggregate(&orders, &HashMap::new(), now);
        assert_eq!(stats.previous_average_prep_time, 15.0);
    }

    #[test]
    fn popular_items_rank_by_quantity() {
        let now = noon();
        let recent = now.with_timezone(&Utc) - Duration::days(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let orders = vec![
            order(3, recent, OrderStatus::Completed, Some(recent), vec![line(a, "Bagel", 3)]),
            order(5, recent, OrderStatus::Completed, Some(recent), vec![line(b, "Croissant", 5)]),
        ];

        let ranked = popular_items(&orders, &HashMap::new(), now.with_timezone(&Utc));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].product_id, b);
        assert_eq!(ranked[0].quantity_sold, 5);
        assert_eq!(ranked[1].product_id, a);
    }

    #[test]
    fn popular_items_keep_top_three_of_recent_completed_orders() {
        let now = noon().with_timezone(&Utc);
        let recent = now - Duration::days(1);
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let orders = vec![
            order(1, recent, OrderStatus::Completed, Some(recent), vec![
                line(ids[0], "Tea", 1),
                line(ids[1], "Soup", 2),
                line(ids[2], "Cake", 3),
                line(ids[3], "Pie", 4),
            ]),
            order(1, recent, OrderStatus::Completed, Some(recent), vec![line(ids[0], "Tea", 9)]),
            // not completed and too old: both ignored
            order(1, recent, OrderStatus::Pending, None, vec![line(ids[4], "Wrap", 50)]),
            order(1, now - Duration::days(8), OrderStatus::Completed, Some(recent), vec![
                line(ids[4], "Wrap", 50),
            ]),
        ];

        let ranked = popular_items(&orders, &HashMap::new(), now);
        let names: Vec<&str> = ranked.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Tea", "Pie", "Cake"]);
        assert_eq!(ranked[0].quantity_sold, 10);
    }

    #[test]
    fn popular_items_prefer_catalog_details() {
        let now = noon().with_timezone(&Utc);
        let known = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let products = HashMap::from([(known, product(known, "Flat White"))]);
        let orders = vec![order(1, now, OrderStatus::Completed, Some(now), vec![
            line(known, "old name", 2),
            line(removed, "Seasonal Tart", 1),
        ])];

        let ranked = popular_items(&orders, &products, now);
        assert_eq!(ranked[0].name, "Flat White");
        assert_eq!(ranked[0].image_url.as_deref(), Some("catalog/Flat White.jpg"));
        assert_eq!(ranked[1].name, "Seasonal Tart");
        assert_eq!(ranked[1].image_url.as_deref(), Some("Seasonal Tart.png"));
    }

    #[test]
    fn percentage_change_cases() {
        assert_eq!(percentage_change(0.0, 0.0), "N/A");
        assert_eq!(percentage_change(5.0, 0.0), "+100%");
        assert_eq!(percentage_change(8.0, 10.0), "-20%");
        assert_eq!(percentage_change(15.0, 12.0), "+25%");
        assert_eq!(percentage_change(10.0, 10.0), "0%");
        assert_eq!(percentage_change(1.0, 3.0), "-67%");
        assert_eq!(percentage_change(9.996, 10.0), "0%");
    }

    #[test]
    fn time_ago_picks_largest_unit() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(59), now), "59 seconds ago");
        assert_eq!(time_ago(now - Duration::seconds(60), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(time_ago(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(time_ago(now - Duration::days(1), now), "1 day ago");
        assert_eq!(time_ago(now - Duration::days(45), now), "1 month ago");
        assert_eq!(time_ago(now - Duration::days(800), now), "2 years ago");
        assert_eq!(time_ago(now + Duration::minutes(5), now), "0 seconds ago");
    }

    #[test]
    fn time_ago_parses_iso_input() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let text = time_ago_iso("2026-06-01T11:59:01Z", now).unwrap();
        assert!(text.contains("seconds"));
        let text = time_ago_iso("2026-06-01T10:00:00+00:00", now).unwrap();
        assert!(text.contains("hours"));
        assert!(time_ago_iso("yesterday", now).is_err());
    }

    #[test]
    fn build_stats_reports_changes_and_recent_orders() {
        let now = noon();
        let now_utc = now.with_timezone(&Utc);
        let orders: Vec<Order> = (0..7)
            .map(|i| order(10, now_utc - Duration::minutes(i * 10), OrderStatus::Pending, None, vec![
                line(Uuid::nil(), "Tea", 2),
            ]))
            .collect();

        let stats = build_stats(&orders, &HashMap::new(), now);
        assert_eq!(stats.changes.orders, "+100%");
        assert_eq!(stats.changes.prep_time, "N/A");
        assert_eq!(stats.recent_orders.len(), 5);
        assert_eq!(stats.recent_orders[0].time_ago, "0 seconds ago");
        assert_eq!(stats.recent_orders[1].time_ago, "10 minutes ago");
        assert_eq!(stats.recent_orders[0].item_count, 2);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let stats = build_stats(&[], &HashMap::new(), noon());
        assert_eq!(stats.daily, DailyStats::default());
        assert_eq!(stats.changes.revenue, "N/A");
        assert!(stats.recent_orders.is_empty());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["today_orders_count"], 0);
        assert!(json["popular_items"].as_array().unwrap().is_empty());
    }
}
