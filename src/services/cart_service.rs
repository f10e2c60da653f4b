use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    vendor_id: Uuid,
    vendor_name: String,
    name: String,
    description: Option<String>,
    price: i64,
    stock: i32,
    created_at: DateTime<Utc>,
}

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    ensure_customer(user)?;
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.vendor_id, p.name, p.description, p.price, p.stock,
               p.created_at,
               u.username AS vendor_name
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        JOIN users u ON u.id = p.vendor_id
        WHERE ci.customer_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE customer_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.cart_id,
            product: Product {
                id: row.product_id,
                vendor_id: row.vendor_id,
                name: row.name,
                description: row.description,
                price: row.price,
                stock: row.stock,
                created_at: row.created_at,
            },
            vendor_name: row.vendor_name,
            quantity: row.quantity,
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

/// Put a product in the cart. A second add of the same product accumulates
/// onto the existing line; the accumulated quantity is capped by live stock.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product: Option<(i32,)> = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&state.pool)
        .await?;
    let available = match product {
        Some((stock,)) => stock,
        None => return Err(AppError::NotFound),
    };

    if payload.quantity > available {
        return Err(AppError::BadRequest(format!(
            "Only {available} items available in stock"
        )));
    }

    // One statement covers both the fresh line and the accumulate case, so
    // two concurrent adds of the same product land on the unique
    // (customer_id, product_id) line instead of racing it. The conditional
    // DO UPDATE enforces the stock cap on the accumulated total; no row back
    // means the cap was passed.
    let cart_item: Option<CartItem> = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, customer_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (customer_id, product_id) DO UPDATE
        SET quantity = cart_items.quantity + EXCLUDED.quantity
        WHERE cart_items.quantity + EXCLUDED.quantity <= $5
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .bind(available)
    .fetch_optional(&state.pool)
    .await?;
    let cart_item = match cart_item {
        Some(item) => item,
        None => {
            return Err(AppError::BadRequest(format!(
                "Only {available} items available in stock"
            )));
        }
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(
            serde_json::json!({ "product_id": payload.product_id, "quantity": cart_item.quantity }),
        ),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Added to cart", cart_item, None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    cart_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    // Scoped to the caller; a foreign line reads the same as a missing one.
    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        SELECT p.stock
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.id = $1 AND ci.customer_id = $2
        "#,
    )
    .bind(cart_id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;
    let available = match row {
        Some((stock,)) => stock,
        None => return Err(AppError::NotFound),
    };
    if payload.quantity > available {
        return Err(AppError::BadRequest(format!(
            "Only {available} items available in stock"
        )));
    }

    let item: CartItem = sqlx::query_as(
        r#"
        UPDATE cart_items
        SET quantity = $3
        WHERE id = $1 AND customer_id = $2
        RETURNING *
        "#,
    )
    .bind(cart_id)
    .bind(user.user_id)
    .bind(payload.quantity)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_id": cart_id, "quantity": item.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Cart updated", item, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    cart_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_customer(user)?;
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND customer_id = $2")
        .bind(cart_id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_id": cart_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
