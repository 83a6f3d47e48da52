mod common;

use std::{sync::Arc, time::Duration};

use common::{
    RecordingMailer, create_product, create_user, database_url, product_stock, setup_state,
    unique_email,
};
use nexus_storefront::{
    db::DbPool,
    dto::orders::CheckoutForm,
    error::AppError,
    models::OrderStatus,
    services::{admin_service, cart_service, order_service},
};
use rust_decimal::Decimal;
use uuid::Uuid;

fn checkout_form() -> CheckoutForm {
    CheckoutForm {
        shipping_address: "12 Mall Road, Lahore".into(),
        phone: "0300-1234567".into(),
    }
}

/// Wait until some backend is stuck behind a lock held by `holder`.
async fn wait_until_blocked_by(pool: &DbPool, holder: i32) -> anyhow::Result<()> {
    for _ in 0..100 {
        let (blocked,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM pg_stat_activity WHERE $1 = ANY(pg_blocking_pids(pid)))",
        )
        .bind(holder)
        .fetch_one(pool)
        .await?;
        if blocked {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("no backend waited on the held product lock")
}

// Product(price=100, stock=5), quantity 2 -> total 200, stock 3, cart empty.
#[tokio::test]
async fn checkout_freezes_total_and_decrements_stock() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let user = create_user(&state.pool, &unique_email("shopper"), false).await?;
    let product_id = create_product(&state.pool, Decimal::new(100, 0), 5).await?;

    cart_service::add_to_cart(&state, user.id, product_id, 1).await?;
    cart_service::add_to_cart(&state, user.id, product_id, 1).await?;
    let cart = cart_service::view_cart(&state, user.id).await?;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.total_price, Decimal::new(200, 0));

    let page = order_service::checkout_page(&state, user.id).await?;
    assert_eq!(page.user_phone, "0300-1234567");

    let order = order_service::checkout(&state, user.id, checkout_form()).await?;
    assert_eq!(order.total_price, Decimal::new(200, 0));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(product_stock(&state.pool, product_id).await?, 3);
    assert!(!cart_service::has_items(&state, user.id).await?);

    sqlx::query("UPDATE products SET price = 150 WHERE id = $1")
        .bind(product_id)
        .execute(&state.pool)
        .await?;

    let stored = order_service::get_order(&state, user.id, order.id).await?;
    assert_eq!(stored.order.total_price, Decimal::new(200, 0));
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].item.price, Decimal::new(100, 0));
    assert_eq!(stored.items[0].item.quantity, 2);

    let mine = order_service::list_orders(&state, user.id).await?;
    assert!(mine.items.iter().any(|o| o.id == order.id));
    Ok(())
}

#[tokio::test]
async fn insufficient_stock_writes_nothing() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let user = create_user(&state.pool, &unique_email("greedy"), false).await?;
    let product_id = create_product(&state.pool, Decimal::new(4150, 2), 1).await?;

    cart_service::add_to_cart(&state, user.id, product_id, 2).await?;
    let err = order_service::checkout(&state, user.id, checkout_form())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    assert_eq!(product_stock(&state.pool, product_id).await?, 1);
    assert!(cart_service::has_items(&state, user.id).await?);
    assert!(order_service::list_orders(&state, user.id).await?.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_check_out() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let user = create_user(&state.pool, &unique_email("empty"), false).await?;

    let page_err = order_service::checkout_page(&state, user.id).await.unwrap_err();
    assert!(matches!(page_err, AppError::EmptyCart));
    let err = order_service::checkout(&state, user.id, checkout_form())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    let blank = order_service::checkout(
        &state,
        user.id,
        CheckoutForm {
            shipping_address: "  ".into(),
            phone: "0300".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(blank, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn cart_lines_belong_to_their_owner() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let owner = create_user(&state.pool, &unique_email("owner"), false).await?;
    let other = create_user(&state.pool, &unique_email("other"), false).await?;
    let product_id = create_product(&state.pool, Decimal::new(5000, 2), 10).await?;

    cart_service::add_to_cart(&state, owner.id, product_id, 3).await?;
    let item_id = cart_service::view_cart(&state, owner.id).await?.items[0].id;

    let err = cart_service::remove_from_cart(&state, other.id, item_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ItemNotFound));
    let err = cart_service::update_cart_item(&state, other.id, item_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ItemNotFound));

    let change = cart_service::update_cart_item(&state, owner.id, item_id, 0).await?;
    assert_eq!(change, cart_service::CartItemChange::Removed);
    assert!(!cart_service::has_items(&state, owner.id).await?);

    let missing = cart_service::add_to_cart(&state, owner.id, Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn staff_updates_order_status() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let user = create_user(&state.pool, &unique_email("customer"), false).await?;
    let admin = create_user(&state.pool, &unique_email("staff"), true).await?;
    let product_id = create_product(&state.pool, Decimal::new(7500, 0), 4).await?;

    cart_service::add_to_cart(&state, user.id, product_id, 3).await?;
    let order = order_service::checkout(&state, user.id, checkout_form()).await?;

    let updated = admin_service::update_order_status(&state, &admin, order.id, "shipped").await?;
    assert_eq!(updated.status, OrderStatus::Shipped);

    let bad = admin_service::update_order_status(&state, &admin, order.id, "lost")
        .await
        .unwrap_err();
    assert!(matches!(bad, AppError::BadRequest(_)));
    let missing = admin_service::update_order_status(&state, &admin, Uuid::new_v4(), "shipped")
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::ItemNotFound));

    let shipped = admin_service::list_orders(&state, Some(OrderStatus::Shipped)).await?;
    let row = shipped
        .orders
        .iter()
        .find(|row| row.order.id == order.id)
        .expect("shipped order listed");
    assert_eq!(row.customer_email, user.email);
    assert_eq!(row.items.len(), 1);
    assert_eq!(shipped.status_choices.len(), OrderStatus::ALL.len());

    let dashboard = admin_service::dashboard(&state).await?;
    assert!(dashboard.low_stock_products.iter().any(|p| p.id == product_id));

    let reports = admin_service::reports(&state).await?;
    assert_eq!(reports.daily_orders.len(), 7);
    assert!(reports.daily_orders.last().is_some_and(|day| day.count >= 1));
    assert_eq!(reports.status_breakdown.len(), 5);
    assert!(reports.total_orders >= 1);
    Ok(())
}

#[tokio::test]
async fn line_added_while_checkout_waits_stays_in_cart() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let user = create_user(&state.pool, &unique_email("twotab"), false).await?;
    let ordered = create_product(&state.pool, Decimal::new(100, 0), 5).await?;
    let late = create_product(&state.pool, Decimal::new(60, 0), 5).await?;
    cart_service::add_to_cart(&state, user.id, ordered, 1).await?;

    // another buyer holds the product row
    let mut holder = state.pool.begin().await?;
    let (holder_pid,): (i32,) = sqlx::query_as("SELECT pg_backend_pid()")
        .fetch_one(&mut *holder)
        .await?;
    sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(ordered)
        .execute(&mut *holder)
        .await?;

    let checkout = tokio::spawn({
        let state = state.clone();
        let user_id = user.id;
        async move { order_service::checkout(&state, user_id, checkout_form()).await }
    });
    wait_until_blocked_by(&state.pool, holder_pid).await?;
    cart_service::add_to_cart(&state, user.id, late, 1).await?;
    holder.commit().await?;

    let order = checkout.await??;
    assert_eq!(order.total_price, Decimal::new(100, 0));
    let placed = order_service::get_order(&state, user.id, order.id).await?;
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].item.product_id, ordered);

    let cart = cart_service::view_cart(&state, user.id).await?;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product.id, late);
    assert_eq!(product_stock(&state.pool, ordered).await?, 4);
    assert_eq!(product_stock(&state.pool, late).await?, 5);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_for_last_unit_sell_it_once() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let product_id = create_product(&state.pool, Decimal::new(9000, 2), 1).await?;

    let mut buyers = Vec::new();
    for n in 0..6 {
        let user = create_user(&state.pool, &unique_email(&format!("rush{n}")), false).await?;
        cart_service::add_to_cart(&state, user.id, product_id, 1).await?;
        buyers.push(user.id);
    }

    let mut tasks = tokio::task::JoinSet::new();
    for user_id in buyers {
        let state = state.clone();
        tasks.spawn(async move { order_service::checkout(&state, user_id, checkout_form()).await });
    }

    let (mut placed, mut refused) = (0, 0);
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(_) => placed += 1,
            Err(AppError::InsufficientStock(_)) => refused += 1,
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(placed, 1);
    assert_eq!(refused, 5);
    assert_eq!(product_stock(&state.pool, product_id).await?, 0);
    Ok(())
}
