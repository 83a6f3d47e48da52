use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    SqlErr,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::products::{
        CatalogPage, HomePage, ProductDetailPage, ProductForm, StockLevel, StockPage,
        UpdateProductForm,
    },
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{Category, Product},
    session::CurrentUser,
    state::AppState,
};

const FEATURED_LIMIT: u64 = 8;
const RELATED_LIMIT: u64 = 4;

pub async fn home_products(state: &AppState) -> AppResult<HomePage> {
    let products = Products::find()
        .filter(Column::IsActive.eq(true))
        .order_by_desc(Column::CreatedAt)
        .limit(FEATURED_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    Ok(HomePage { products })
}

pub async fn list_categories(state: &AppState) -> AppResult<Vec<Category>> {
    Ok(Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect())
}

/// Active products, optionally narrowed to one category by name.
pub async fn catalog(state: &AppState, category: Option<String>) -> AppResult<CatalogPage> {
    let selected_category = category
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let mut finder = Products::find().filter(Column::IsActive.eq(true));
    if let Some(name) = &selected_category {
        let category = Categories::find()
            .filter(CategoryCol::Name.eq(name.as_str()))
            .one(&state.orm)
            .await?;
        finder = match category {
            Some(category) => finder.filter(Column::CategoryId.eq(category.id)),
            // unknown category: nothing matches
            None => finder.filter(Column::Id.is_null()),
        };
    }

    let products = finder
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(CatalogPage {
        products,
        categories: list_categories(state).await?,
        selected_category,
    })
}

pub async fn product_detail(state: &AppState, id: Uuid) -> AppResult<ProductDetailPage> {
    let (product, category) = Products::find_by_id(id)
        .filter(Column::IsActive.eq(true))
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let category = category.ok_or(AppError::NotFound)?;

    let related_products = Products::find()
        .filter(Column::CategoryId.eq(product.category_id))
        .filter(Column::IsActive.eq(true))
        .filter(Column::Id.ne(product.id))
        .order_by_desc(Column::CreatedAt)
        .limit(RELATED_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ProductDetailPage {
        product: Product::from(product),
        category: Category::from(category),
        related_products,
    })
}

pub async fn stock_levels(state: &AppState) -> AppResult<StockPage> {
    let items = Products::find()
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::Name)
        .find_also_related(Categories)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, category)| StockLevel {
            product_id: product.id,
            name: product.name,
            category: category.map(|c| c.name).unwrap_or_default(),
            stock: product.stock,
            in_stock: product.stock > 0,
        })
        .collect();
    Ok(StockPage { items })
}

pub fn parse_price(raw: &str) -> AppResult<Decimal> {
    let price = Decimal::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid price `{}`.", raw.trim())))?;
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("Price cannot be negative.".into()));
    }
    Ok(price.round_dp(2))
}

pub fn parse_stock(raw: &str) -> AppResult<i32> {
    let stock = raw
        .trim()
        .parse::<i32>()
        .map_err(|_| AppError::BadRequest(format!("Invalid stock `{}`.", raw.trim())))?;
    if stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative.".into()));
    }
    Ok(stock)
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "off" | "false" | "0"
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_category_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest("Unknown category.".into()))
}

async fn ensure_category(state: &AppState, category_id: Uuid) -> AppResult<()> {
    Categories::find_by_id(category_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Unknown category.".into()))?;
    Ok(())
}

fn map_product_write_error(err: sea_orm::DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::BadRequest("A product with this name already exists.".into())
        }
        _ => AppError::OrmError(err),
    }
}

pub async fn create_product(
    state: &AppState,
    user: &CurrentUser,
    form: ProductForm,
) -> AppResult<Product> {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required.".into()));
    }
    let price = parse_price(&form.price)?;
    let stock = parse_stock(&form.stock)?;
    let category_id = parse_category_id(&form.category_id)?;
    ensure_category(state, category_id).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        category_id: Set(category_id),
        name: Set(name),
        description: Set(form.description.trim().to_string()),
        price: Set(price),
        stock: Set(stock),
        is_active: Set(true),
        image: Set(non_blank(form.image)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(map_product_write_error)?;

    tracing::info!(product_id = %product.id, "product created");
    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::ProductCreate,
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(Product::from(product))
}

/// Apply the non-blank fields of `form` to an existing product.
pub async fn update_product(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    form: UpdateProductForm,
) -> AppResult<Product> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = non_blank(form.name) {
        active.name = Set(name);
    }
    if let Some(raw) = non_blank(form.category_id) {
        let category_id = parse_category_id(&raw)?;
        ensure_category(state, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(raw) = non_blank(form.price) {
        active.price = Set(parse_price(&raw)?);
    }
    if let Some(description) = form.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(raw) = non_blank(form.stock) {
        active.stock = Set(parse_stock(&raw)?);
    }
    if let Some(image) = form.image {
        active.image = Set(non_blank(Some(image)));
    }
    if let Some(flag) = form.is_active {
        active.is_active = Set(parse_flag(&flag));
    }
    active.updated_at = Set(chrono::Utc::now().into());

    let product = active
        .update(&state.orm)
        .await
        .map_err(map_product_write_error)?;

    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::ProductUpdate,
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(Product::from(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_accepts_decimal_text() {
        assert_eq!(parse_price(" 7500.00 ").unwrap(), Decimal::new(750000, 2));
        assert_eq!(parse_price("19.999").unwrap(), Decimal::new(2000, 2));
    }

    #[test]
    fn price_rejects_garbage_and_negatives() {
        assert!(matches!(parse_price("abc"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_price("-1"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn stock_must_be_non_negative_integer() {
        assert_eq!(parse_stock("12").unwrap(), 12);
        assert!(parse_stock("-3").is_err());
        assert!(parse_stock("2.5").is_err());
    }

    #[test]
    fn checkbox_values() {
        assert!(parse_flag("on"));
        assert!(parse_flag("true"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }
}
