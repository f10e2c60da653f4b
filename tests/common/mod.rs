#![allow(dead_code)]

use std::sync::Arc;

use axum_marketplace_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Model as ProductModel},
        users::ActiveModel as UserActive,
    },
    middleware::auth::{AuthKeys, AuthUser, Role},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Allow skipping when no DB is configured in the environment.
pub fn test_database_url() -> Option<String> {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok();
    if url.is_none() {
        eprintln!(
            "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
        );
    }
    url
}

/// Fixtures carry fresh UUIDs, so tests stay independent without truncating.
pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    Ok(AppState {
        pool,
        orm,
        auth: Arc::new(AuthKeys::from_secret(TEST_JWT_SECRET)),
    })
}

pub async fn create_user(state: &AppState, username: &str, role: Role) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{username}-{}@example.com", Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        role: Set(role.as_str().to_string()),
        address: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_product(
    state: &AppState,
    vendor: &AuthUser,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor.user_id),
        name: Set(name.to_string()),
        description: Set(Some("integration fixture".into())),
        price: Set(price),
        stock: Set(stock),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product)
}

pub async fn product_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(stock)
}
