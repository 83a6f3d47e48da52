use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    db::DbPool,
    dto::cart::{CartLine, CartView},
    error::{AppError, AppResult},
    models::Product,
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    item_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    category_id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    is_active: bool,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartItemChange {
    Updated,
    Removed,
}

pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    price * Decimal::from(quantity)
}

pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(|line| line.line_total).sum()
}

/// Return the user's cart id, creating the cart on first use.
pub async fn get_or_create_cart(pool: &DbPool, user_id: Uuid) -> AppResult<Uuid> {
    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(pool)
        .await?;

    let (cart_id,): (Uuid,) = sqlx::query_as("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(cart_id)
}

pub async fn view_cart(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let cart_id = get_or_create_cart(&state.pool, user_id).await?;

    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS item_id, ci.quantity,
               p.id AS product_id, p.category_id, p.name, p.description, p.price,
               p.stock, p.is_active, p.image, p.created_at, p.updated_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at ASC
        "#,
    )
    .bind(cart_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<CartLine> = rows
        .into_iter()
        .map(|row| CartLine {
            id: row.item_id,
            quantity: row.quantity,
            line_total: line_total(row.price, row.quantity),
            product: Product {
                id: row.product_id,
                category_id: row.category_id,
                name: row.name,
                description: row.description,
                price: row.price,
                stock: row.stock,
                is_active: row.is_active,
                image: row.image,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
        .collect();

    let total_price = cart_total(&items);
    let total_items = items.iter().map(|line| i64::from(line.quantity)).sum();

    Ok(CartView {
        cart_id,
        items,
        total_price,
        total_items,
    })
}

pub async fn has_items(state: &AppState, user_id: Uuid) -> AppResult<bool> {
    let cart_id = get_or_create_cart(&state.pool, user_id).await?;
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM cart_items WHERE cart_id = $1)")
            .bind(cart_id)
            .fetch_one(&state.pool)
            .await?;
    Ok(exists)
}

/// Add `quantity` of an active product, incrementing an existing line.
pub async fn add_to_cart(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1.".to_string(),
        ));
    }

    let product: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
            .bind(product_id)
            .fetch_optional(&state.pool)
            .await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let cart_id = get_or_create_cart(&state.pool, user_id).await?;

    sqlx::query(
        r#"
        INSERT INTO cart_items (id, cart_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .execute(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(user_id),
        AuditAction::CartUpdate,
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;
    Ok(())
}

pub async fn remove_from_cart(state: &AppState, user_id: Uuid, item_id: Uuid) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items ci
        USING carts c
        WHERE ci.id = $1 AND ci.cart_id = c.id AND c.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ItemNotFound);
    }

    audit::record(
        &state.pool,
        Some(user_id),
        AuditAction::CartRemove,
        "cart_items",
        serde_json::json!({ "item_id": item_id }),
    )
    .await;
    Ok(())
}

/// Set a line's quantity. Zero or less removes the line instead.
pub async fn update_cart_item(
    state: &AppState,
    user_id: Uuid,
    item_id: Uuid,
    quantity: i32,
) -> AppResult<CartItemChange> {
    if quantity <= 0 {
        remove_from_cart(state, user_id, item_id).await?;
        return Ok(CartItemChange::Removed);
    }

    let result = sqlx::query(
        r#"
        UPDATE cart_items ci
        SET quantity = $3
        FROM carts c
        WHERE ci.id = $1 AND ci.cart_id = c.id AND c.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user_id)
    .bind(quantity)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ItemNotFound);
    }

    audit::record(
        &state.pool,
        Some(user_id),
        AuditAction::CartUpdate,
        "cart_items",
        serde_json::json!({ "item_id": item_id, "quantity": quantity }),
    )
    .await;
    Ok(CartItemChange::Updated)
}
