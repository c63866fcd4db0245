use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity::{
        crop_plans::{Column as PlanCol, Entity as CropPlans},
        crops::{Column as CropCol, Entity as Crops},
        orders::{Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    models::Order,
    services::{
        crop_plan_service::crop_stages,
        order_service,
        status_service::{self, TransitionContext},
    },
    state::AppState,
    status::codes,
};

/// Production and payment events the router reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessEvent {
    CropPlanted,
    CropsReady,
    HarvestCompleted,
    PackingCompleted,
    PaymentReceived,
}

impl BusinessEvent {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "crop.planted" => Some(Self::CropPlanted),
            "crops.ready" => Some(Self::CropsReady),
            "harvest.completed" => Some(Self::HarvestCompleted),
            "packing.completed" => Some(Self::PackingCompleted),
            "payment.received" => Some(Self::PaymentReceived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CropPlanted => "crop.planted",
            Self::CropsReady => "crops.ready",
            Self::HarvestCompleted => "harvest.completed",
            Self::PackingCompleted => "packing.completed",
            Self::PaymentReceived => "payment.received",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Guard {
    /// Always fires.
    None,
    /// Every crop plan on the order has at least one planted crop.
    AllPlansPlanted,
    /// Every remaining crop on the order is ready to harvest (or beyond).
    AllCropsReady,
    /// Order does not require immediate invoicing, or is already paid.
    ClearForDispatch,
    /// Order became fully paid while sitting in packing.
    PaidWhilePacking,
}

struct EventRule {
    event: BusinessEvent,
    guard: Guard,
    target: &'static str,
}

/// Declarative event -> guard -> transition table. Adding a reaction to a
/// new production event means adding a row here, not a new call site.
const RULES: &[EventRule] = &[
    EventRule {
        event: BusinessEvent::CropPlanted,
        guard: Guard::AllPlansPlanted,
        target: codes::GROWING,
    },
    EventRule {
        event: BusinessEvent::CropsReady,
        guard: Guard::AllCropsReady,
        target: codes::READY_TO_HARVEST,
    },
    EventRule {
        event: BusinessEvent::HarvestCompleted,
        guard: Guard::None,
        target: codes::PACKING,
    },
    EventRule {
        event: BusinessEvent::PackingCompleted,
        guard: Guard::ClearForDispatch,
        target: codes::READY_FOR_DELIVERY,
    },
    EventRule {
        event: BusinessEvent::PaymentReceived,
        guard: Guard::PaidWhilePacking,
        target: codes::READY_FOR_DELIVERY,
    },
];

/// Route a business event to its status transition.
///
/// A failed guard is deliberate backpressure: the order stays where it is and
/// waits for the next satisfying event. Redelivered events are idempotent —
/// once the transition has happened the registry rejects the repeat edge and
/// the router treats that as a no-op.
pub async fn handle_business_event(
    state: &AppState,
    order_id: Uuid,
    event_name: &str,
) -> AppResult<Option<Order>> {
    let event = BusinessEvent::parse(event_name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown business event '{event_name}'")))?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let rule = RULES
        .iter()
        .find(|r| r.event == event)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("no rule for {}", event.as_str())))?;

    if !guard_passes(state, rule.guard, &order).await? {
        tracing::debug!(
            order_id = %order.id,
            event = event.as_str(),
            "business event guard not satisfied; leaving order in place"
        );
        return Ok(None);
    }

    let ctx = TransitionContext::from_event(event.as_str());
    match status_service::transition(state, order.id, rule.target, &ctx).await {
        Ok(updated) => Ok(Some(updated)),
        Err(AppError::InvalidTransition { from, to }) => {
            tracing::debug!(
                order_id = %order.id,
                event = event.as_str(),
                %from,
                %to,
                "transition already applied or not reachable; ignoring event"
            );
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

async fn guard_passes(state: &AppState, guard: Guard, order: &OrderModel) -> AppResult<bool> {
    match guard {
        Guard::None => Ok(true),
        Guard::AllPlansPlanted => all_plans_planted(state, order.id).await,
        Guard::AllCropsReady => all_crops_ready(state, order.id).await,
        Guard::ClearForDispatch => {
            if !order.requires_invoice {
                return Ok(true);
            }
            order_service::fully_paid(&state.orm, order).await
        }
        Guard::PaidWhilePacking => {
            if order.status != codes::PACKING {
                return Ok(false);
            }
            order_service::fully_paid(&state.orm, order).await
        }
    }
}

async fn all_plans_planted(state: &AppState, order_id: Uuid) -> AppResult<bool> {
    let plans = CropPlans::find()
        .filter(
            Condition::all()
                .add(PlanCol::OrderId.eq(order_id))
                .add(PlanCol::Status.ne("cancelled")),
        )
        .all(&state.orm)
        .await?;
    if plans.is_empty() {
        return Ok(false);
    }
    for plan in plans {
        let planted = Crops::find()
            .filter(
                Condition::all()
                    .add(CropCol::CropPlanId.eq(plan.id))
                    .add(CropCol::Stage.ne(crop_stages::CANCELLED)),
            )
            .count(&state.orm)
            .await?;
        if planted == 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn all_crops_ready(state: &AppState, order_id: Uuid) -> AppResult<bool> {
    let total = Crops::find()
        .filter(
            Condition::all()
                .add(CropCol::OrderId.eq(order_id))
                .add(CropCol::Stage.ne(crop_stages::CANCELLED)),
        )
        .count(&state.orm)
        .await?;
    if total == 0 {
        return Ok(false);
    }
    let still_growing = Crops::find()
        .filter(
            Condition::all()
                .add(CropCol::OrderId.eq(order_id))
                .add(CropCol::Stage.is_in([crop_stages::PLANTED, crop_stages::GROWING])),
        )
        .count(&state.orm)
        .await?;
    Ok(still_growing == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusRegistry;

    #[test]
    fn event_names_round_trip() {
        for name in [
            "crop.planted",
            "crops.ready",
            "harvest.completed",
            "packing.completed",
            "payment.received",
        ] {
            let event = BusinessEvent::parse(name).expect(name);
            assert_eq!(event.as_str(), name);
        }
        assert!(BusinessEvent::parse("order.shipped").is_none());
    }

    #[test]
    fn every_rule_targets_a_catalog_status() {
        let registry = StatusRegistry::new(StatusRegistry::default_catalog());
        for rule in RULES {
            assert!(
                registry.get(rule.target).is_some(),
                "rule for {} targets unknown status {}",
                rule.event.as_str(),
                rule.target
            );
        }
    }

    #[test]
    fn every_event_has_exactly_one_rule() {
        for event in [
            BusinessEvent::CropPlanted,
            BusinessEvent::CropsReady,
            BusinessEvent::HarvestCompleted,
            BusinessEvent::PackingCompleted,
            BusinessEvent::PaymentReceived,
        ] {
            assert_eq!(RULES.iter().filter(|r| r.event == event).count(), 1);
        }
    }
}
