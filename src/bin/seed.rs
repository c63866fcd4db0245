use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Days, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use microgreens_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    status::StatusRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    // Status catalog first; orders reference it.
    StatusRegistry::load_or_seed(&orm).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "admin").await?;
    ensure_user(&pool, "grower@example.com", "grower123", "user").await?;

    let customer_id = seed_customer(&pool, "Green Fork Bistro", "orders@greenfork.example").await?;
    let variation_id = seed_catalog(&pool, customer_id).await?;
    seed_demo_template(&pool, customer_id, variation_id).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
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

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_customer(pool: &sqlx::PgPool, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO customers (id, name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let customer_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM customers WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };
    println!("Ensured customer {name}");
    Ok(customer_id)
}

/// Seeds a small catalog: products with tray yields, retail price
/// variations, and one customer-specific override.
async fn seed_catalog(pool: &sqlx::PgPool, customer_id: Uuid) -> anyhow::Result<Uuid> {
    let products = [
        ("Sunflower Shoots", Decimal::from(350), 9),
        ("Pea Shoots", Decimal::from(400), 11),
        ("Radish Mix", Decimal::from(300), 7),
    ];

    let mut first_variation = None;

    for (name, grams_per_tray, grow_days) in products {
        let product_id: Uuid = {
            let row: Option<(Uuid,)> = sqlx::query_as(
                r#"
                INSERT INTO products (id, name, grams_per_tray, grow_days)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (name) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(grams_per_tray)
            .bind(grow_days)
            .fetch_optional(pool)
            .await?;
            match row {
                Some((id,)) => id,
                None => {
                    let existing: (Uuid,) =
                        sqlx::query_as("SELECT id FROM products WHERE name = $1")
                            .bind(name)
                            .fetch_one(pool)
                            .await?;
                    existing.0
                }
            }
        };

        let variation_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO price_variations (id, product_id, name, unit, unit_grams, price)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (
                SELECT 1 FROM price_variations WHERE product_id = $2 AND name = $3
            )
            "#,
        )
        .bind(variation_id)
        .bind(product_id)
        .bind("100g clamshell")
        .bind("clamshell")
        .bind(Decimal::from(100))
        .bind(Decimal::new(650, 2))
        .execute(pool)
        .await?;

        if first_variation.is_none() {
            let existing: (Uuid,) = sqlx::query_as(
                "SELECT id FROM price_variations WHERE product_id = $1 AND name = $2",
            )
            .bind(product_id)
            .bind("100g clamshell")
            .fetch_one(pool)
            .await?;
            first_variation = Some(existing.0);
        }
    }

    let variation_id =
        first_variation.ok_or_else(|| anyhow::anyhow!("no price variation seeded"))?;

    // wholesale customer pays below catalog
    sqlx::query(
        r#"
        INSERT INTO customer_prices (id, customer_id, price_variation_id, price)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (customer_id, price_variation_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(variation_id)
    .bind(Decimal::new(550, 2))
    .execute(pool)
    .await?;

    println!("Seeded products and pricing");
    Ok(variation_id)
}

async fn seed_demo_template(
    pool: &sqlx::PgPool,
    customer_id: Uuid,
    variation_id: Uuid,
) -> anyhow::Result<()> {
    let exists: (i64,) = sqlx::query_as(
        "SELECT count(*) FROM orders WHERE is_recurring = TRUE AND parent_recurring_order_id IS NULL",
    )
    .fetch_one(pool)
    .await?;
    if exists.0 > 0 {
        println!("Recurring template already present; skipping");
        return Ok(());
    }

    let product_id: (Uuid,) =
        sqlx::query_as("SELECT product_id FROM price_variations WHERE id = $1")
            .bind(variation_id)
            .fetch_one(pool)
            .await?;

    let template_id = Uuid::new_v4();
    let start = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(7))
        .ok_or_else(|| anyhow::anyhow!("date out of range"))?;
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, customer_id, status, order_type, billing_frequency, total_amount,
            requires_invoice, is_recurring, is_recurring_active,
            recurring_frequency, recurring_interval, recurring_start_date
        )
        VALUES ($1, $2, 'template', 'standard', 'per_order', $3, FALSE, TRUE, TRUE, 'weekly', 1, $4)
        "#,
    )
    .bind(template_id)
    .bind(customer_id)
    .bind(Decimal::new(3250, 2))
    .bind(start)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO order_items (id, order_id, product_id, price_variation_id, quantity, unit_price)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(template_id)
    .bind(product_id.0)
    .bind(variation_id)
    .bind(Decimal::from(5))
    .bind(Decimal::new(650, 2))
    .execute(pool)
    .await?;

    println!("Seeded weekly recurring template {template_id}");
    Ok(())
}
