use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            AdminOrderRow, AdminProductRow, DailyOrders, DashboardPage, OrdersPage,
            ProductFormPage, ProductsPage, RecentOrder, ReportsPage, StatusCount, TopProduct,
            UpdateOrderStatusForm, UserRow, UsersPage,
        },
        auth::{AuthPage, LoginForm, RegisterForm, VerifyOtpForm, VerifyOtpPage},
        cart::{CartLine, CartView, QuantityForm},
        orders::{CheckoutForm, CheckoutPage, OrderLine, OrderList, OrderWithItems},
        products::{
            CatalogPage, HomePage, ProductDetailPage, ProductForm, StaticPage, StockLevel,
            StockPage, UpdateProductForm,
        },
    },
    models::{Category, Order, OrderItem, OrderStatus, Product, StatusChoice, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, products},
    session::{CurrentUser, FlashLevel, FlashMessage},
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Nexus Store", description = "Storefront and back-office HTTP surface"),
    paths(
        health::health_check,
        auth::register_page,
        auth::register,
        auth::login_page,
        auth::login,
        auth::verify_otp_page,
        auth::verify_otp,
        auth::logout,
        products::home,
        products::catalog,
        products::product_detail,
        products::stock,
        products::about_us,
        products::contact,
        cart::view_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::update_cart_item,
        orders::checkout_page,
        orders::checkout,
        orders::order_confirmation,
        orders::my_orders,
        admin::dashboard,
        admin::users,
        admin::products,
        admin::add_product_page,
        admin::add_product,
        admin::edit_product,
        admin::orders,
        admin::update_order_status,
        admin::reports
    ),
    components(
        schemas(
            User,
            CurrentUser,
            Category,
            Product,
            Order,
            OrderItem,
            OrderStatus,
            StatusChoice,
            FlashLevel,
            FlashMessage,
            Meta,
            health::HealthData,
            RegisterForm,
            LoginForm,
            VerifyOtpForm,
            VerifyOtpPage,
            AuthPage,
            HomePage,
            CatalogPage,
            ProductDetailPage,
            StockLevel,
            StockPage,
            StaticPage,
            ProductForm,
            UpdateProductForm,
            QuantityForm,
            CartLine,
            CartView,
            CheckoutForm,
            CheckoutPage,
            OrderLine,
            OrderWithItems,
            OrderList,
            RecentOrder,
            DashboardPage,
            UserRow,
            UsersPage,
            AdminProductRow,
            ProductsPage,
            ProductFormPage,
            AdminOrderRow,
            OrdersPage,
            UpdateOrderStatusForm,
            DailyOrders,
            TopProduct,
            StatusCount,
            ReportsPage,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<DashboardPage>,
            ApiResponse<ReportsPage>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and OTP login"),
        (name = "Catalog", description = "Storefront pages"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Admin", description = "Staff back-office"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
