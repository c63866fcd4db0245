use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use microgreens_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    services::recurrence_service,
    state::AppState,
};

/// Scheduled recurrence driver. Intended to run from cron; one pass per
/// invocation. Per-template failures are reported in the pass summary and do
/// not affect the exit code — only a catastrophic failure (no datastore,
/// broken config) exits non-zero.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,microgreens_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let state = AppState::build(pool, orm).await?;

    let report = recurrence_service::process_recurring_orders(&state).await?;

    for error in &report.errors {
        tracing::warn!(template_id = %error.order_id, message = %error.message, "template failed");
    }
    println!(
        "Recurrence pass: processed={} generated={} errors={}",
        report.processed,
        report.generated,
        report.errors.len()
    );

    Ok(())
}
