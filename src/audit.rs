use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult, status::Stage};

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Immutable audit entry for a status change: old/new code and stage plus actor.
pub async fn log_status_change(
    pool: &DbPool,
    actor: Option<Uuid>,
    order_id: Uuid,
    old_status: &str,
    old_stage: Stage,
    new_status: &str,
    new_stage: Stage,
) -> AppResult<()> {
    log_audit(
        pool,
        actor,
        "order_status_change",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order_id,
            "old_status": old_status,
            "old_stage": old_stage.as_str(),
            "new_status": new_status,
            "new_stage": new_stage.as_str(),
        })),
    )
    .await
}
