#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nexus_storefront::{
    db::{DbPool, create_orm_conn, create_pool, run_migrations},
    services::{
        auth_service::hash_password,
        email_service::{EmailError, Mailer},
    },
    session::CurrentUser,
    state::AppState,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The code from the latest OTP email sent to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|mail| mail.to == to && mail.subject.contains("OTP"))
            .and_then(|mail| {
                let start = mail.body.find("is: ")? + 4;
                mail.body.get(start..start + 6).map(str::to_string)
            })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Refuses every message.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<(), EmailError> {
        Err(EmailError::InvalidAddress(to.to_string()))
    }
}

pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

pub async fn setup_state(database_url: &str, mailer: Arc<dyn Mailer>) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    Ok(AppState::new(pool.clone(), create_orm_conn(&pool), mailer))
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

pub async fn create_user(pool: &DbPool, email: &str, is_staff: bool) -> anyhow::Result<CurrentUser> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, is_staff) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(email)
    .bind("Test User")
    .bind(hash_password("secret-pass")?)
    .bind(is_staff)
    .execute(pool)
    .await?;
    sqlx::query("INSERT INTO user_profiles (id, user_id, phone) VALUES ($1, $2, '0300-1234567')")
        .bind(Uuid::new_v4())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(CurrentUser {
        id,
        email: email.to_string(),
        name: "Test User".into(),
        is_staff,
    })
}

/// A fresh category holding one active product.
pub async fn create_product(pool: &DbPool, price: Decimal, stock: i32) -> anyhow::Result<Uuid> {
    let suffix = Uuid::new_v4().simple().to_string();
    let category_id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name, description) VALUES ($1, $2, '')")
        .bind(category_id)
        .bind(format!("Test Category {suffix}"))
        .execute(pool)
        .await?;

    let product_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products (id, category_id, name, description, price, stock, is_active)
        VALUES ($1, $2, $3, 'for tests', $4, $5, TRUE)
        "#,
    )
    .bind(product_id)
    .bind(category_id)
    .bind(format!("Test Shoe {suffix}"))
    .bind(price)
    .bind(stock)
    .execute(pool)
    .await?;
    Ok(product_id)
}

pub async fn product_stock(pool: &DbPool, product_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await?;
    Ok(stock)
}
