use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub delivery_address: String,
    /// Defaults to "Cash on Delivery" when omitted.
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemStatusRequest {
    pub status: String,
    pub expected_delivery_date: Option<NaiveDate>,
}

/// One sold item as the vendor sees it: order context plus the buyer.
/// `product_name` is `None` once the product has been deleted; the item row
/// itself is a purchase-time snapshot and stays listed.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct VendorOrderItem {
    pub item_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub customer_name: String,
    pub delivery_address: String,
    pub quantity: i32,
    pub price: i64,
    pub status: String,
    pub expected_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// One bought item as the customer sees it: order context plus the seller.
/// `product_name` is `None` once the product has been deleted.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CustomerOrderItem {
    pub item_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub vendor_name: String,
    pub delivery_address: String,
    pub quantity: i32,
    pub price: i64,
    pub status: String,
    pub expected_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorOrderList {
    pub items: Vec<VendorOrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerOrderList {
    pub items: Vec<CustomerOrderItem>,
}
