use nexus_storefront::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct SeedProduct {
    category: &'static str,
    name: &'static str,
    price: &'static str,
    description: &'static str,
    stock: i32,
}

const CATEGORIES: [(&str, &str); 3] = [
    ("Men's Shoes", "Premium collection of men's footwear"),
    ("Women's Shoes", "Exclusive women's shoe collection"),
    ("Unisex Shoes", "Comfortable shoes for everyone"),
];

const PRODUCTS: [SeedProduct; 15] = [
    SeedProduct { category: "Men's Shoes", name: "Casual Running Shoes", price: "7500.00", description: "Lightweight and comfortable running shoes perfect for daily activities", stock: 50 },
    SeedProduct { category: "Men's Shoes", name: "Premium Formal Shoes", price: "10800.00", description: "Elegant formal shoes ideal for business meetings and special occasions", stock: 35 },
    SeedProduct { category: "Men's Shoes", name: "Sports Performance Shoes", price: "10000.00", description: "High-performance athletic shoes designed for maximum comfort", stock: 45 },
    SeedProduct { category: "Men's Shoes", name: "Urban Sneakers", price: "8300.00", description: "Trendy urban sneakers with modern design and durability", stock: 60 },
    SeedProduct { category: "Men's Shoes", name: "Classic Loafers", price: "9150.00", description: "Timeless loafers perfect for casual and semi-formal occasions", stock: 40 },
    SeedProduct { category: "Women's Shoes", name: "Elegant Heels", price: "8300.00", description: "Stylish high heels perfect for evening events and parties", stock: 30 },
    SeedProduct { category: "Women's Shoes", name: "Comfortable Flats", price: "6650.00", description: "Casual and comfortable flat shoes for everyday wear", stock: 55 },
    SeedProduct { category: "Women's Shoes", name: "Women's Running Shoes", price: "7900.00", description: "Lightweight running shoes designed specifically for women", stock: 48 },
    SeedProduct { category: "Women's Shoes", name: "Trendy Boots", price: "10000.00", description: "Fashionable boots perfect for any season", stock: 35 },
    SeedProduct { category: "Women's Shoes", name: "Casual Sneakers", price: "7500.00", description: "Cute and comfortable sneakers for casual outings", stock: 50 },
    SeedProduct { category: "Unisex Shoes", name: "Canvas Slip-Ons", price: "5000.00", description: "Versatile canvas shoes perfect for casual occasions", stock: 70 },
    SeedProduct { category: "Unisex Shoes", name: "Minimalist Walking Shoes", price: "6250.00", description: "Minimalist design with maximum comfort for all-day walking", stock: 55 },
    SeedProduct { category: "Unisex Shoes", name: "Adventure Hiking Boots", price: "11650.00", description: "Durable hiking boots for outdoor adventures", stock: 25 },
    SeedProduct { category: "Unisex Shoes", name: "Casual Sandals", price: "4150.00", description: "Comfortable sandals perfect for summer", stock: 80 },
    SeedProduct { category: "Unisex Shoes", name: "Professional Slides", price: "5800.00", description: "Professional slides suitable for both home and casual outings", stock: 60 },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "Store Admin", "admin@nexusstore.com", "admin123", true).await?;
    let user_id = ensure_user(&pool, "Demo Customer", "customer@example.com", "customer123", false).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    is_staff: bool,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, name, password_hash, is_staff)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET is_staff = EXCLUDED.is_staff
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(is_staff)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        "INSERT INTO user_profiles (id, user_id, phone) VALUES ($1, $2, '') ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(pool)
    .await?;

    println!("Ensured user {email} (staff={is_staff})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for (name, description) in CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (id, name, description) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    for product in PRODUCTS {
        let price: Decimal = product.price.parse()?;
        sqlx::query(
            r#"
            INSERT INTO products (id, category_id, name, description, price, stock, is_active)
            SELECT $1, c.id, $3, $4, $5, $6, TRUE
            FROM categories c
            WHERE c.name = $2
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.category)
        .bind(product.name)
        .bind(product.description)
        .bind(price)
        .bind(product.stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} categories and {} products", CATEGORIES.len(), PRODUCTS.len());
    Ok(())
}
