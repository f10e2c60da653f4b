use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        orders::{
            CheckoutRequest, CheckoutResponse, CustomerOrderItem, CustomerOrderList,
            UpdateItemStatusRequest, VendorOrderItem, VendorOrderList,
        },
        products::{CreateProductRequest, ProductList, ProductView, UpdateProductRequest},
    },
    models::{CartItem, OrderItem, Product, User},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::checkout,
        orders::vendor_orders,
        orders::customer_orders,
        orders::update_item_status
    ),
    components(
        schemas(
            User,
            Product,
            CartItem,
            OrderItem,
            Claims,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductView,
            ProductList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CheckoutRequest,
            CheckoutResponse,
            UpdateItemStatusRequest,
            VendorOrderItem,
            VendorOrderList,
            CustomerOrderItem,
            CustomerOrderList,
            params::Pagination,
            Meta,
            ApiResponse<User>,
            ApiResponse<LoginResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartItem>,
            ApiResponse<CartList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<VendorOrderList>,
            ApiResponse<CustomerOrderList>,
            ApiResponse<OrderItem>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Products", description = "Vendor catalog management and browsing"),
        (name = "Cart", description = "Customer cart"),
        (name = "Orders", description = "Checkout and fulfillment"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
