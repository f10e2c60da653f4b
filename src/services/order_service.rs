use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CheckoutRequest, CheckoutResponse, CustomerOrderItem, CustomerOrderList,
        UpdateItemStatusRequest, VendorOrderItem, VendorOrderList,
    },
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as ItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::ActiveModel as OrderActive,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer, ensure_vendor},
    models::OrderItem,
    response::{ApiResponse, Meta},
    state::AppState,
};

const DEFAULT_PAYMENT_METHOD: &str = "Cash on Delivery";

const VALID_ITEM_STATUSES: [&str; 4] = ["Pending", "Shipped", "Delivered", "Cancelled"];

/// Convert the caller's cart into a durable order.
///
/// The whole sequence runs in one transaction. The cart snapshot takes
/// `FOR UPDATE` locks on the joined cart and product rows and holds them until
/// commit; a competing checkout on the same product blocks there and then
/// validates against the committed stock. Any error aborts the unit of work
/// with no partial state: no order header, no items, no stock change, cart
/// untouched.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    ensure_customer(user)?;

    let delivery_address = payload.delivery_address.trim().to_string();
    if delivery_address.is_empty() {
        return Err(AppError::BadRequest("Delivery address is required".into()));
    }
    let payment_method = payload
        .payment_method
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

    #[derive(Debug, FromQueryResult)]
    struct CartLineRow {
        product_id: Uuid,
        quantity: i32,
        price: i64,
        stock: i32,
        vendor_id: Uuid,
    }

    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .select_only()
        .column(CartCol::ProductId)
        .column(CartCol::Quantity)
        .column_as(ProdCol::Price, "price")
        .column_as(ProdCol::Stock, "stock")
        .column_as(ProdCol::VendorId, "vendor_id")
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .filter(CartCol::CustomerId.eq(user.user_id))
        .lock(LockType::Update)
        .into_model::<CartLineRow>()
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    // Validate every line before touching anything.
    let mut total_amount: i64 = 0;
    for line in &lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        if line.quantity > line.stock {
            return Err(AppError::InsufficientStock {
                product_id: line.product_id,
                available: line.stock,
            });
        }
        total_amount += line.price * (line.quantity as i64);
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        total_amount: Set(total_amount),
        delivery_address: Set(delivery_address.clone()),
        payment_method: Set(payment_method),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for line in &lines {
        // Price and owning vendor are copied onto the item row; later product
        // edits or deletion do not rewrite order history.
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            vendor_id: Set(line.vendor_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            status: NotSet,
            expected_delivery_date: NotSet,
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        // reduce stock
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;
    }

    // clear cart
    CartItems::delete_many()
        .filter(CartCol::CustomerId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    // Post-commit conveniences; neither may fail an already committed order.
    if let Err(err) = sqlx::query("UPDATE users SET address = $1 WHERE id = $2 AND address IS NULL")
        .bind(&delivery_address)
        .bind(user.user_id)
        .execute(&state.pool)
        .await
    {
        tracing::warn!(error = %err, "default address update failed");
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed successfully",
        CheckoutResponse { order_id: order.id },
        Some(Meta::empty()),
    ))
}

/// Everything the vendor has sold, joined with order context and the buyer's
/// name, newest order first. The product join is outer: item rows are
/// purchase-time snapshots and stay listed after the product is deleted.
pub async fn list_vendor_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<VendorOrderList>> {
    ensure_vendor(user)?;
    let items = sqlx::query_as::<_, VendorOrderItem>(
        r#"
        SELECT oi.id AS item_id, oi.order_id, oi.product_id, oi.quantity, oi.price,
               oi.status, oi.expected_delivery_date,
               o.delivery_address, o.created_at,
               p.name AS product_name,
               u.username AS customer_name
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        LEFT JOIN products p ON p.id = oi.product_id
        JOIN users u ON u.id = o.customer_id
        WHERE oi.vendor_id = $1
        ORDER BY o.created_at DESC, oi.id
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        VendorOrderList { items },
        Some(Meta::empty()),
    ))
}

/// Everything the customer has bought, joined with order context and the
/// seller's name, newest order first. As with the vendor listing, deleted
/// products leave the item row listed without a current name.
pub async fn list_customer_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CustomerOrderList>> {
    ensure_customer(user)?;
    let items = sqlx::query_as::<_, CustomerOrderItem>(
        r#"
        SELECT oi.id AS item_id, oi.order_id, oi.product_id, oi.quantity, oi.price,
               oi.status, oi.expected_delivery_date,
               o.delivery_address, o.created_at,
               p.name AS product_name,
               u.username AS vendor_name
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        LEFT JOIN products p ON p.id = oi.product_id
        JOIN users u ON u.id = oi.vendor_id
        WHERE o.customer_id = $1
        ORDER BY o.created_at DESC, oi.id
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        CustomerOrderList { items },
        Some(Meta::empty()),
    ))
}

/// Update one sold item's fulfillment status. The lookup is scoped to the
/// calling vendor; foreign items surface as NotFound. Only the addressed row
/// changes: sibling items, the order header and totals stay as they are, and
/// cancelling an item does not return its quantity to product stock.
pub async fn update_item_status(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateItemStatusRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    ensure_vendor(user)?;
    if !VALID_ITEM_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest("Invalid status".into()));
    }

    let item = OrderItems::find()
        .filter(
            Condition::all()
                .add(ItemCol::Id.eq(item_id))
                .add(ItemCol::VendorId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let mut active: OrderItemActive = item.into();
    active.status = Set(payload.status);
    if let Some(date) = payload.expected_delivery_date {
        active.expected_delivery_date = Set(Some(date));
    }
    let item = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_item_status",
        Some("order_items"),
        Some(serde_json::json!({ "item_id": item.id, "status": item.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order status updated",
        order_item_from_entity(item),
        Some(Meta::empty()),
    ))
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        vendor_id: model.vendor_id,
        quantity: model.quantity,
        price: model.price,
        status: model.status,
        expected_delivery_date: model.expected_delivery_date,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
