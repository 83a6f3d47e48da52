use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::admin::{
        AdminOrderRow, AdminProductRow, DailyOrders, DashboardPage, OrdersPage, ProductFormPage,
        ProductsPage, RecentOrder, ReportsPage, StatusCount, TopProduct, UserRow, UsersPage,
    },
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
        user_profiles::Entity as UserProfiles,
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::{Order, OrderStatus, Product, StatusChoice, UnknownOrderStatus},
    services::{order_service, product_service},
    session::CurrentUser,
    state::AppState,
};

const RECENT_ORDERS: u64 = 5;
const LOW_STOCK_THRESHOLD: i32 = 5;
const TOP_PRODUCTS: i64 = 5;
const REPORT_DAYS: i64 = 7;

fn search_term(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term.to_lowercase())
}

/// `LOWER(table.column) LIKE pattern`, with `pattern` already lowercased.
fn lower_like<T, C>(table: T, column: C, pattern: &str) -> SimpleExpr
where
    T: sea_orm::sea_query::Iden + 'static,
    C: sea_orm::sea_query::Iden + 'static,
{
    Expr::expr(Func::lower(Expr::col((table, column)))).like(pattern)
}

async fn total_revenue(state: &AppState) -> AppResult<Decimal> {
    let (revenue,): (Option<Decimal>,) = sqlx::query_as("SELECT SUM(total_price) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    Ok(revenue.unwrap_or(Decimal::ZERO))
}

async fn customer_emails(state: &AppState, user_ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, String>> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|user| (user.id, user.email))
        .collect())
}

pub async fn dashboard(state: &AppState) -> AppResult<DashboardPage> {
    let total_users = Users::find().count(&state.orm).await? as i64;
    let total_products = Products::find().count(&state.orm).await? as i64;
    let total_orders = Orders::find().count(&state.orm).await? as i64;
    let total_revenue = total_revenue(state).await?;

    let recent = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .limit(RECENT_ORDERS)
        .all(&state.orm)
        .await?;
    let emails = customer_emails(state, recent.iter().map(|o| o.user_id).collect()).await?;
    let recent_orders = recent
        .into_iter()
        .map(|order| RecentOrder {
            customer_email: emails.get(&order.user_id).cloned().unwrap_or_default(),
            order: Order::from(order),
        })
        .collect();

    let low_stock_products = Products::find()
        .filter(ProdCol::Stock.lt(LOW_STOCK_THRESHOLD))
        .order_by_asc(ProdCol::Stock)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(DashboardPage {
        total_users,
        total_products,
        total_orders,
        total_revenue,
        recent_orders,
        low_stock_products,
    })
}

pub async fn list_users(state: &AppState, search: Option<String>) -> AppResult<UsersPage> {
    let search_query = search_term(search);

    let mut finder = Users::find().find_also_related(UserProfiles);
    if !search_query.is_empty() {
        let pattern = like_pattern(&search_query);
        finder = finder.filter(
            Condition::any()
                .add(lower_like(Users, UserCol::Email, &pattern))
                .add(lower_like(Users, UserCol::Name, &pattern)),
        );
    }

    let users = finder
        .order_by_desc(UserCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(user, profile)| UserRow {
            id: user.id,
            email: user.email,
            name: user.name,
            is_staff: user.is_staff,
            phone: profile.map(|p| p.phone),
            created_at: user.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(UsersPage {
        users,
        search_query,
    })
}

pub async fn list_products(state: &AppState, search: Option<String>) -> AppResult<ProductsPage> {
    let search_query = search_term(search);

    let mut finder = Products::find().find_also_related(Categories);
    if !search_query.is_empty() {
        let pattern = like_pattern(&search_query);
        finder = finder.filter(
            Condition::any()
                .add(lower_like(Products, ProdCol::Name, &pattern))
                .add(lower_like(Categories, CategoryCol::Name, &pattern)),
        );
    }

    let products = finder
        .order_by_desc(ProdCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, category)| AdminProductRow {
            category_name: category.map(|c| c.name).unwrap_or_default(),
            product: Product::from(product),
        })
        .collect();

    Ok(ProductsPage {
        products,
        search_query,
    })
}

pub async fn product_form(state: &AppState) -> AppResult<ProductFormPage> {
    Ok(ProductFormPage {
        categories: product_service::list_categories(state).await?,
    })
}

/// Parse the `status` filter. Blank means no filter; an unknown value is rejected.
pub fn parse_status_filter(raw: Option<&str>) -> AppResult<Option<OrderStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<OrderStatus>()
            .map(Some)
            .map_err(|e| AppError::BadRequest(e.to_string())),
    }
}

pub async fn list_orders(state: &AppState, status: Option<OrderStatus>) -> AppResult<OrdersPage> {
    let mut finder = Orders::find();
    if let Some(status) = status {
        finder = finder.filter(OrderCol::Status.eq(status));
    }
    let orders = finder
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let emails = customer_emails(state, orders.iter().map(|o| o.user_id).collect()).await?;
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut lines = order_service::order_lines(&state.orm, &order_ids).await?;

    let orders = orders
        .into_iter()
        .map(|order| AdminOrderRow {
            customer_email: emails.get(&order.user_id).cloned().unwrap_or_default(),
            items: lines.remove(&order.id).unwrap_or_default(),
            order: Order::from(order),
        })
        .collect();

    Ok(OrdersPage {
        orders,
        status_filter: status,
        status_choices: OrderStatus::ALL.into_iter().map(StatusChoice::from).collect(),
    })
}

pub async fn update_order_status(
    state: &AppState,
    admin: &CurrentUser,
    order_id: Uuid,
    raw_status: &str,
) -> AppResult<Order> {
    let status: OrderStatus = raw_status
        .parse()
        .map_err(|e: UnknownOrderStatus| AppError::BadRequest(e.to_string()))?;

    let existing = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::ItemNotFound)?;
    let previous = existing.status;

    let mut active: OrderActive = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %status, "order status updated");
    audit::record(
        &state.pool,
        Some(admin.id),
        AuditAction::OrderStatusUpdate,
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "from": previous.as_str(),
            "to": status.as_str(),
        }),
    )
    .await;

    Ok(Order::from(order))
}

#[derive(FromRow)]
struct DayCountRow {
    day: NaiveDate,
    count: i64,
}

#[derive(FromRow)]
struct TopProductRow {
    product_name: String,
    total_quantity: i64,
}

#[derive(FromRow)]
struct StatusCountRow {
    status: String,
    count: i64,
}

/// One entry per day ending at `today`, oldest first, zero-filled.
pub fn fill_daily_counts(today: NaiveDate, counts: &HashMap<NaiveDate, i64>) -> Vec<DailyOrders> {
    (0..REPORT_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            DailyOrders {
                label: date.weekday().to_string(),
                date,
                count: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

pub async fn reports(state: &AppState) -> AppResult<ReportsPage> {
    let total_revenue = total_revenue(state).await?;
    let total_orders = Orders::find().count(&state.orm).await? as i64;
    let avg_order_value = if total_orders > 0 {
        (total_revenue / Decimal::from(total_orders)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let today = Utc::now().date_naive();
    let since = today - Duration::days(REPORT_DAYS - 1);
    let day_rows = sqlx::query_as::<_, DayCountRow>(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count
        FROM orders
        WHERE (created_at AT TIME ZONE 'UTC')::date >= $1
        GROUP BY day
        "#,
    )
    .bind(since)
    .fetch_all(&state.pool)
    .await?;
    let counts: HashMap<NaiveDate, i64> =
        day_rows.into_iter().map(|row| (row.day, row.count)).collect();

    let top_products = sqlx::query_as::<_, TopProductRow>(
        r#"
        SELECT p.name AS product_name, SUM(oi.quantity)::BIGINT AS total_quantity
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        GROUP BY p.id, p.name
        ORDER BY total_quantity DESC, p.name ASC
        LIMIT $1
        "#,
    )
    .bind(TOP_PRODUCTS)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|row| TopProduct {
        product_name: row.product_name,
        total_quantity: row.total_quantity,
    })
    .collect();

    let status_rows = sqlx::query_as::<_, StatusCountRow>(
        "SELECT status, COUNT(*) AS count FROM orders GROUP BY status",
    )
    .fetch_all(&state.pool)
    .await?;
    let by_status: HashMap<String, i64> = status_rows
        .into_iter()
        .map(|row| (row.status, row.count))
        .collect();
    let status_breakdown = OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            count: by_status.get(status.as_str()).copied().unwrap_or(0),
            status,
        })
        .collect();

    Ok(ReportsPage {
        total_revenue,
        total_orders,
        avg_order_value,
        daily_orders: fill_daily_counts(today, &counts),
        top_products,
        status_breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_counts_cover_a_week_oldest_first() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(); // Sunday
        let mut counts = HashMap::new();
        counts.insert(today, 3);
        counts.insert(today - Duration::days(6), 1);

        let days = fill_daily_counts(today, &counts);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(days[0].label, "Mon");
        assert_eq!(days[0].count, 1);
        assert_eq!(days[6].label, "Sun");
        assert_eq!(days[6].count, 3);
        assert!(days[1..6].iter().all(|d| d.count == 0));
    }

    #[test]
    fn blank_status_filter_means_all() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("Shipped")).unwrap(),
            Some(OrderStatus::Shipped)
        );
    }

    #[test]
    fn unknown_status_filter_is_rejected() {
        assert!(matches!(
            parse_status_filter(Some("lost")),
            Err(AppError::BadRequest(_))
        ));
    }
}
