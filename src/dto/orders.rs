use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::cart::CartView,
    models::{Order, OrderItem},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutForm {
    pub shipping_address: String,
    pub phone: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutPage {
    pub cart: CartView,
    /// Profile phone offered as the default contact number.
    pub user_phone: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLine {
    pub item: OrderItem,
    pub product_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
