use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CheckoutRequest, CheckoutResponse, CustomerOrderList, UpdateItemStatusRequest,
        VendorOrderList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderItem,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/vendor", get(vendor_orders))
        .route("/customer", get(customer_orders))
        .route("/vendor/{item_id}/status", put(update_item_status))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Convert the whole cart into an order atomically", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart, missing address or insufficient stock"),
        (status = 403, description = "Caller is not a customer"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CheckoutResponse>>)> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders/vendor",
    responses(
        (status = 200, description = "All items sold by the calling vendor, newest order first", body = ApiResponse<VendorOrderList>),
        (status = 403, description = "Caller is not a vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn vendor_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VendorOrderList>>> {
    let resp = order_service::list_vendor_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/customer",
    responses(
        (status = 200, description = "All items bought by the calling customer, newest order first", body = ApiResponse<CustomerOrderList>),
        (status = 403, description = "Caller is not a customer"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn customer_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CustomerOrderList>>> {
    let resp = order_service::list_customer_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/vendor/{item_id}/status",
    params(
        ("item_id" = Uuid, Path, description = "Order item ID")
    ),
    request_body = UpdateItemStatusRequest,
    responses(
        (status = 200, description = "Update one sold item's status", body = ApiResponse<OrderItem>),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Caller is not a vendor"),
        (status = 404, description = "Item missing or sold by another vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_item_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = order_service::update_item_status(&state, &user, item_id, payload).await?;
    Ok(Json(resp))
}
