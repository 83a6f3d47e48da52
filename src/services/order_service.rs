use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{CheckoutForm, CheckoutPage, OrderLine, OrderList, OrderWithItems},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
        user_profiles::{Column as ProfileCol, Entity as UserProfiles},
    },
    error::{AppError, AppResult},
    models::{Order, OrderItem, OrderStatus},
    services::cart_service,
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct LockedCartLine {
    item_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    name: String,
    price: Decimal,
    stock: i32,
}

// Products are locked in id order so concurrent checkouts cannot deadlock.
const LOCK_CART_LINES_SQL: &str = r#"
    SELECT ci.id AS item_id, ci.product_id, ci.quantity, p.name, p.price, p.stock
    FROM cart_items ci
    JOIN carts c ON c.id = ci.cart_id
    JOIN products p ON p.id = ci.product_id
    WHERE c.user_id = $1
    ORDER BY p.id
    FOR UPDATE OF ci, p
"#;

pub async fn checkout_page(state: &AppState, user_id: Uuid) -> AppResult<CheckoutPage> {
    if !cart_service::has_items(state, user_id).await? {
        return Err(AppError::EmptyCart);
    }
    let cart = cart_service::view_cart(state, user_id).await?;

    let user_phone = UserProfiles::find()
        .filter(ProfileCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?
        .map(|profile| profile.phone)
        .unwrap_or_default();

    Ok(CheckoutPage { cart, user_phone })
}

/// Turn the user's cart into an order in a single transaction.
///
/// Cart lines and their products are locked up front. A line asking for
/// more than the remaining stock rejects the whole checkout, so stock never
/// goes negative and nothing is written on failure.
pub async fn checkout(state: &AppState, user_id: Uuid, form: CheckoutForm) -> AppResult<Order> {
    let shipping_address = form.shipping_address.trim().to_string();
    let phone = form.phone.trim().to_string();
    if shipping_address.is_empty() || phone.is_empty() {
        return Err(AppError::BadRequest(
            "Shipping address and phone are required.".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let rows = LockedCartLine::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        LOCK_CART_LINES_SQL,
        [user_id.into()],
    ))
    .all(&txn)
    .await?;

    if rows.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut total_price = Decimal::ZERO;
    for row in &rows {
        if row.stock < row.quantity {
            return Err(AppError::InsufficientStock(row.name.clone()));
        }
        total_price += cart_service::line_total(row.price, row.quantity);
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        total_price: Set(total_price),
        shipping_address: Set(shipping_address),
        phone: Set(phone),
        status: Set(OrderStatus::Pending),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for row in &rows {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(row.product_id),
            quantity: Set(row.quantity),
            price: Set(row.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(row.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(ProdCol::Id.eq(row.product_id))
            .exec(&txn)
            .await?;
    }

    // only the ordered lines go; one added meanwhile stays in the cart
    CartItems::delete_many()
        .filter(CartItemCol::Id.is_in(rows.iter().map(|row| row.item_id)))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user_id, total = %order.total_price, "order placed");
    audit::record(
        &state.pool,
        Some(user_id),
        AuditAction::Checkout,
        "orders",
        serde_json::json!({ "order_id": order.id, "lines": rows.len() }),
    )
    .await;

    Ok(Order::from(order))
}

pub async fn get_order(state: &AppState, user_id: Uuid, id: Uuid) -> AppResult<OrderWithItems> {
    let order = Orders::find()
        .filter(OrderCol::UserId.eq(user_id))
        .filter(OrderCol::Id.eq(id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::ItemNotFound)?;

    let mut lines = order_lines(&state.orm, &[order.id]).await?;
    Ok(OrderWithItems {
        items: lines.remove(&order.id).unwrap_or_default(),
        order: Order::from(order),
    })
}

pub async fn list_orders(state: &AppState, user_id: Uuid) -> AppResult<OrderList> {
    let items = Orders::find()
        .filter(OrderCol::UserId.eq(user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();
    Ok(OrderList { items })
}

/// Load the line items of several orders at once, keyed by order id.
pub async fn order_lines<C: ConnectionTrait>(
    conn: &C,
    order_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<OrderLine>>> {
    let mut grouped: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(OrderItemCol::CreatedAt)
        .find_also_related(Products)
        .all(conn)
        .await?;

    for (item, product) in rows {
        let line = OrderLine {
            product_name: product.map(|p| p.name).unwrap_or_default(),
            item: OrderItem::from(item),
        };
        grouped.entry(line.item.order_id).or_default().push(line);
    }
    Ok(grouped)
}
