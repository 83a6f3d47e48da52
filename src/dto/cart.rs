use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuantityForm {
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

impl Default for QuantityForm {
    fn default() -> Self {
        Self {
            quantity: default_quantity(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub total_items: i64,
}
