use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_marketplace_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let vendor_id = ensure_user(&pool, "atelier", "vendor@example.com", "vendor123", "vendor").await?;
    let customer_id =
        ensure_user(&pool, "casey", "customer@example.com", "customer123", "customer").await?;
    seed_products(&pool, vendor_id).await?;

    println!("Seed completed. Vendor ID: {vendor_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    // DO UPDATE keeps the insert idempotent while still returning the id.
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool, vendor_id: Uuid) -> anyhow::Result<()> {
    let products: Vec<(&str, &str, i64, i32)> = vec![
        ("Hand-thrown Ceramic Mug", "Stoneware mug, 350ml", 180000, 40),
        ("Walnut Desk Organizer", "Five compartments, oiled finish", 450000, 25),
        ("Linen Tote Bag", "Natural linen with reinforced straps", 120000, 80),
        ("Letterpress Notebook", "A5 dot grid, 120gsm paper", 90000, 150),
    ];

    for (name, desc, price, stock) in products {
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM products WHERE vendor_id = $1 AND name = $2")
                .bind(vendor_id)
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if existing.is_some() {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO products (id, vendor_id, name, description, price, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vendor_id)
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
