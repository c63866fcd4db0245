use std::collections::HashMap;

use chrono::{Days, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    entity::{
        crop_batches::{ActiveModel as BatchActive, Column as BatchCol, Entity as CropBatches},
        crop_plans::{ActiveModel as PlanActive, Column as PlanCol, Entity as CropPlans},
        crops::{ActiveModel as CropActive, Column as CropCol, Entity as Crops},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::Entity as Orders,
        price_variations::Entity as PriceVariations,
        products::Entity as Products,
    },
    dto::crop_plans::{CropList, CropPlanList},
    error::{AppError, AppResult},
    events::Event,
    models::{Crop, CropPlan},
    response::{ApiResponse, Meta},
    routes::params::{CropListQuery, CropPlanListQuery},
    state::AppState,
    status::codes,
};

/// Crop lifecycle stages. Distinct from order status: a crop tracks one
/// tray's production progress.
pub mod crop_stages {
    pub const PLANTED: &str = "planted";
    pub const GROWING: &str = "growing";
    pub const READY_TO_HARVEST: &str = "ready_to_harvest";
    pub const HARVESTING: &str = "harvesting";
    pub const HARVESTED: &str = "harvested";
    pub const CANCELLED: &str = "cancelled";
}

const SETTABLE_STAGES: &[&str] = &[
    crop_stages::PLANTED,
    crop_stages::GROWING,
    crop_stages::READY_TO_HARVEST,
    crop_stages::HARVESTING,
    crop_stages::HARVESTED,
];

/// Analyze an order's line items into draft crop plans, one per product.
///
/// Existing draft plans for the order are regenerated from scratch; active
/// plans (already approved into crops) are left alone. Each plan is attached
/// to the production batch for its product and harvest date, and batch
/// totals are recomputed.
pub async fn generate_plans_for_order(
    state: &AppState,
    actor: Uuid,
    order_id: Uuid,
) -> AppResult<Vec<CropPlan>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.status == codes::TEMPLATE {
        return Err(AppError::BadRequest(
            "Templates are not planned for production; plans are made per generated order".into(),
        ));
    }
    let harvest_date = order
        .harvest_date
        .ok_or_else(|| AppError::BadRequest("Order has no harvest date".into()))?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(&state.orm)
        .await?;
    if items.is_empty() {
        return Err(AppError::BadRequest("Order has no line items".into()));
    }

    // grams required per product, derived from quantity x variation weight
    let mut grams_by_product: HashMap<Uuid, Decimal> = HashMap::new();
    for item in &items {
        let variation = PriceVariations::find_by_id(item.price_variation_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        *grams_by_product.entry(item.product_id).or_default() +=
            item.quantity * variation.unit_grams;
    }

    let txn = state.orm.begin().await?;

    // regenerate: drop previous drafts, remembering their batches for recalc
    let stale_drafts = CropPlans::find()
        .filter(
            Condition::all()
                .add(PlanCol::OrderId.eq(order_id))
                .add(PlanCol::Status.eq("draft")),
        )
        .all(&txn)
        .await?;
    let mut touched_batches: Vec<Uuid> = stale_drafts.iter().filter_map(|p| p.batch_id).collect();
    CropPlans::delete_many()
        .filter(
            Condition::all()
                .add(PlanCol::OrderId.eq(order_id))
                .add(PlanCol::Status.eq("draft")),
        )
        .exec(&txn)
        .await?;

    let mut plans = Vec::new();
    for (product_id, grams_needed) in grams_by_product {
        let product = Products::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        if product.grams_per_tray <= Decimal::ZERO {
            return Err(AppError::BadRequest(format!(
                "Product '{}' has no tray yield configured",
                product.name
            )));
        }
        let trays_needed = (grams_needed / product.grams_per_tray)
            .ceil()
            .to_i32()
            .ok_or_else(|| AppError::BadRequest("Tray count out of range".into()))?;
        let plant_by_date = harvest_date
            .checked_sub_days(Days::new(product.grow_days.max(0) as u64))
            .ok_or_else(|| AppError::BadRequest("Plant-by date out of range".into()))?;

        let batch_id = find_or_create_batch(&txn, product_id, harvest_date).await?;
        touched_batches.push(batch_id);

        let plan = PlanActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product_id),
            batch_id: Set(Some(batch_id)),
            status: Set("draft".to_string()),
            trays_needed: Set(trays_needed),
            grams_needed: Set(grams_needed),
            plant_by_date: Set(plant_by_date),
            expected_harvest_date: Set(harvest_date),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;
        plans.push(CropPlan::from(plan));
    }

    touched_batches.sort();
    touched_batches.dedup();
    for batch_id in &touched_batches {
        recalculate_aggregation(&txn, *batch_id).await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor),
        "crop_plans_generated",
        Some("crop_plans"),
        Some(serde_json::json!({ "order_id": order_id, "plans": plans.len() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(plans)
}

/// Approve a draft plan: it becomes active and its crops come into
/// existence, one per tray.
pub async fn approve_plan(state: &AppState, actor: Uuid, plan_id: Uuid) -> AppResult<CropPlan> {
    let plan = CropPlans::find_by_id(plan_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if plan.status != "draft" {
        return Err(AppError::BadRequest(
            "Only draft crop plans can be approved".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let order_id = plan.order_id;
    let trays = plan.trays_needed.max(0);
    let mut active: PlanActive = plan.into();
    active.status = Set("active".to_string());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    let now = Utc::now();
    for _ in 0..trays {
        CropActive {
            id: Set(Uuid::new_v4()),
            crop_plan_id: Set(plan_id),
            order_id: Set(order_id),
            stage: Set(crop_stages::PLANTED.to_string()),
            planted_at: Set(Some(now.into())),
            harvested_at: Set(None),
            cancelled_at: Set(None),
            cancel_reason: Set(None),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor),
        "crop_plan_approved",
        Some("crop_plans"),
        Some(serde_json::json!({ "plan_id": plan_id, "crops_created": trays })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(updated.into())
}

/// Cancel a plan. Refused while any crops are attached; those must be
/// cancelled or harvested through their own lifecycle first.
pub async fn cancel_plan(state: &AppState, actor: Uuid, plan_id: Uuid) -> AppResult<CropPlan> {
    let plan = CropPlans::find_by_id(plan_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if plan.status == "cancelled" {
        return Err(AppError::BadRequest("Crop plan is already cancelled".into()));
    }

    let attached = Crops::find()
        .filter(CropCol::CropPlanId.eq(plan_id))
        .count(&state.orm)
        .await?;
    if attached > 0 {
        return Err(AppError::BadRequest(format!(
            "Crop plan has {attached} crops attached and cannot be cancelled"
        )));
    }

    let batch_id = plan.batch_id;
    let mut active: PlanActive = plan.into();
    active.status = Set("cancelled".to_string());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    if let Some(batch_id) = batch_id {
        if let Err(err) = recalculate_aggregation(&state.orm, batch_id).await {
            tracing::warn!(batch_id = %batch_id, error = %err, "batch recalculation failed");
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor),
        "crop_plan_cancelled",
        Some("crop_plans"),
        Some(serde_json::json!({ "plan_id": plan_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(updated.into())
}

/// Recompute a production batch's tray/gram totals from its constituent
/// plans. Pure arithmetic consistency; authorization is the caller's job.
pub async fn recalculate_aggregation<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> AppResult<()> {
    let plans = CropPlans::find()
        .filter(
            Condition::all()
                .add(PlanCol::BatchId.eq(batch_id))
                .add(PlanCol::Status.ne("cancelled")),
        )
        .all(conn)
        .await?;

    let total_trays: i32 = plans.iter().map(|p| p.trays_needed).sum();
    let total_grams: Decimal = plans.iter().map(|p| p.grams_needed).sum();

    let batch = CropBatches::find_by_id(batch_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut active: BatchActive = batch.into();
    active.total_trays = Set(total_trays);
    active.total_grams = Set(total_grams);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

/// Move a crop through its production stages. The stage feed is what later
/// drives the `crops.ready` / `harvest.completed` business events.
pub async fn update_crop_stage(
    state: &AppState,
    actor: Uuid,
    crop_id: Uuid,
    stage: &str,
) -> AppResult<Crop> {
    if !SETTABLE_STAGES.contains(&stage) {
        return Err(AppError::BadRequest(format!("Unknown crop stage '{stage}'")));
    }

    let crop = Crops::find_by_id(crop_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if crop.stage == crop_stages::CANCELLED {
        return Err(AppError::BadRequest("Crop is cancelled".into()));
    }

    let order_id = crop.order_id;
    let planted_at = crop.planted_at;
    let now = Utc::now();
    let mut active: CropActive = crop.into();
    active.stage = Set(stage.to_string());
    if stage == crop_stages::PLANTED && planted_at.is_none() {
        active.planted_at = Set(Some(now.into()));
    }
    if stage == crop_stages::HARVESTED {
        active.harvested_at = Set(Some(now.into()));
    }
    let updated = active.update(&state.orm).await?;

    if let Err(err) = state
        .events
        .send(Event::CropStageChanged {
            crop_id,
            order_id,
            stage: stage.to_string(),
        })
        .await
    {
        tracing::warn!(error = %err, "event publish failed");
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor),
        "crop_stage_updated",
        Some("crops"),
        Some(serde_json::json!({ "crop_id": crop_id, "stage": stage })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(updated.into())
}

pub async fn list_plans(
    state: &AppState,
    query: CropPlanListQuery,
) -> AppResult<ApiResponse<CropPlanList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(order_id) = query.order_id {
        condition = condition.add(PlanCol::OrderId.eq(order_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(PlanCol::Status.eq(status.clone()));
    }

    let finder = CropPlans::find()
        .filter(condition)
        .order_by_asc(PlanCol::PlantByDate);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(CropPlan::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Crop plans",
        CropPlanList { items },
        Some(meta),
    ))
}

pub async fn list_crops(
    state: &AppState,
    query: CropListQuery,
) -> AppResult<ApiResponse<CropList>> {
    let mut condition = Condition::all();
    if let Some(order_id) = query.order_id {
        condition = condition.add(CropCol::OrderId.eq(order_id));
    }
    let items = Crops::find()
        .filter(condition)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Crop::from)
        .collect();
    Ok(ApiResponse::success(
        "Crops",
        CropList { items },
        Some(Meta::empty()),
    ))
}

async fn find_or_create_batch<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    harvest_date: chrono::NaiveDate,
) -> AppResult<Uuid> {
    let existing = CropBatches::find()
        .filter(
            Condition::all()
                .add(BatchCol::ProductId.eq(product_id))
                .add(BatchCol::HarvestDate.eq(harvest_date)),
        )
        .one(conn)
        .await?;
    if let Some(batch) = existing {
        return Ok(batch.id);
    }
    let id = Uuid::new_v4();
    BatchActive {
        id: Set(id),
        product_id: Set(product_id),
        harvest_date: Set(harvest_date),
        total_trays: Set(0),
        total_grams: Set(Decimal::ZERO),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(id)
}
