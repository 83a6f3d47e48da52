use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::orders::OrderLine,
    models::{Category, Order, OrderStatus, Product, StatusChoice},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderFilterQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusForm {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentOrder {
    pub order: Order,
    pub customer_email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardPage {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    pub recent_orders: Vec<RecentOrder>,
    pub low_stock_products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_staff: bool,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersPage {
    pub users: Vec<UserRow>,
    pub search_query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProductRow {
    pub product: Product,
    pub category_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductsPage {
    pub products: Vec<AdminProductRow>,
    pub search_query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductFormPage {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderRow {
    pub order: Order,
    pub customer_email: String,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrdersPage {
    pub orders: Vec<AdminOrderRow>,
    pub status_filter: Option<OrderStatus>,
    pub status_choices: Vec<StatusChoice>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailyOrders {
    /// Abbreviated weekday, e.g. `Mon`.
    pub label: String,
    pub date: chrono::NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_name: String,
    pub total_quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportsPage {
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    pub total_orders: i64,
    #[schema(value_type = String)]
    pub avg_order_value: Decimal,
    pub daily_orders: Vec<DailyOrders>,
    pub top_products: Vec<TopProduct>,
    pub status_breakdown: Vec<StatusCount>,
}
