use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::dto::products::{CreateProductRequest, ProductList, ProductView, UpdateProductRequest};
use crate::{
    audit::log_audit,
    entity::products::{self, ActiveModel, Column, Entity as Products, Model as ProductModel},
    entity::users,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Role, ensure_vendor},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Role-filtered catalog. Vendors see their own inventory including sold-out
/// rows; customers only see what can still be bought.
pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();

    let condition = match user.role {
        Role::Vendor => Condition::all().add(Column::VendorId.eq(user.user_id)),
        Role::Customer => Condition::all().add(Column::Stock.gt(0)),
    };

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    #[derive(Debug, FromQueryResult)]
    struct ProductVendorRow {
        id: Uuid,
        vendor_id: Uuid,
        vendor_name: String,
        name: String,
        description: Option<String>,
        price: i64,
        stock: i32,
        created_at: DateTimeWithTimeZone,
    }

    let rows = finder
        .join(JoinType::InnerJoin, products::Relation::Vendor.def())
        .select_only()
        .column(Column::Id)
        .column(Column::VendorId)
        .column_as(users::Column::Username, "vendor_name")
        .column(Column::Name)
        .column(Column::Description)
        .column(Column::Price)
        .column(Column::Stock)
        .column(Column::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .into_model::<ProductVendorRow>()
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| ProductView {
            id: row.id,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            created_at: row.created_at.with_timezone(&Utc),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_vendor(user)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if payload.stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(user.user_id),
        name: Set(payload.name),
        description: Set(Some(payload.description)),
        price: Set(payload.price),
        stock: Set(payload.stock),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Partial update. The lookup carries the ownership predicate, a product owned
/// by someone else is indistinguishable from a missing one.
pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_vendor(user)?;

    if payload.name.is_none()
        && payload.description.is_none()
        && payload.price.is_none()
        && payload.stock.is_none()
    {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }
    if payload.price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if payload.stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }

    let existing = Products::find_by_id(id)
        .filter(Column::VendorId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_vendor(user)?;

    // Ownership is part of the delete predicate; order history keeps its own
    // denormalized copy and is unaffected.
    let result = Products::delete_many()
        .filter(Column::Id.eq(id))
        .filter(Column::VendorId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        vendor_id: model.vendor_id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
