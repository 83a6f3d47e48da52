use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomePage {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub selected_category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetailPage {
    pub product: Product,
    pub category: Category,
    pub related_products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub name: String,
    pub category: String,
    pub stock: i32,
    pub in_stock: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockPage {
    pub items: Vec<StockLevel>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StaticPage {
    pub page: String,
    pub title: String,
}

/// Admin product form. Numeric fields arrive as text so a malformed value
/// becomes a form error instead of a rejected request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductForm {
    pub name: String,
    pub category_id: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    pub stock: String,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductForm {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub stock: Option<String>,
    pub image: Option<String>,
    /// Checkbox value; any non-empty value other than "off"/"false" means active.
    pub is_active: Option<String>,
}
