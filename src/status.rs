use std::collections::{HashMap, HashSet};

use sea_orm::ActiveValue::Set;
use sea_orm::EntityTrait;
use sea_orm::sea_query::OnConflict;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::OrmConn;
use crate::entity::order_statuses::{ActiveModel as StatusActive, Entity as OrderStatuses};
use crate::error::{AppError, AppResult};

/// Status codes used across the lifecycle engine. The catalog is seeded from
/// these at first startup and treated as read-only configuration afterwards.
pub mod codes {
    pub const TEMPLATE: &str = "template";
    pub const PENDING: &str = "pending";
    pub const CONFIRMED: &str = "confirmed";
    pub const PLANTING: &str = "planting";
    pub const GROWING: &str = "growing";
    pub const READY_TO_HARVEST: &str = "ready_to_harvest";
    pub const HARVESTING: &str = "harvesting";
    pub const PACKING: &str = "packing";
    pub const READY_FOR_DELIVERY: &str = "ready_for_delivery";
    pub const DELIVERING: &str = "delivering";
    pub const DELIVERED: &str = "delivered";
    pub const COMPLETED: &str = "completed";
    pub const CANCELLED: &str = "cancelled";
}

/// Coarse grouping of statuses used for filtering and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreProduction,
    Production,
    Fulfillment,
    Final,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PreProduction => "pre_production",
            Stage::Production => "production",
            Stage::Fulfillment => "fulfillment",
            Stage::Final => "final",
        }
    }

    pub fn parse(value: &str) -> Option<Stage> {
        match value {
            "pre_production" => Some(Stage::PreProduction),
            "production" => Some(Stage::Production),
            "fulfillment" => Some(Stage::Fulfillment),
            "final" => Some(Stage::Final),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusDef {
    pub code: String,
    pub name: String,
    pub stage: Stage,
    pub is_final: bool,
    pub allowed_next: HashSet<String>,
    pub sort_order: i32,
}

impl StatusDef {
    fn new(
        code: &str,
        name: &str,
        stage: Stage,
        is_final: bool,
        allowed_next: &[&str],
        sort_order: i32,
    ) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            stage,
            is_final,
            allowed_next: allowed_next.iter().map(|s| s.to_string()).collect(),
            sort_order,
        }
    }
}

/// Immutable transition graph over the status catalog. Built once at process
/// start; every transition is validated against it.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    by_code: HashMap<String, StatusDef>,
}

impl StatusRegistry {
    pub fn new(defs: Vec<StatusDef>) -> Self {
        let by_code = defs.into_iter().map(|d| (d.code.clone(), d)).collect();
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&StatusDef> {
        self.by_code.get(code)
    }

    /// Resolve a status code, failing with `UnknownStatus` when absent.
    pub fn resolve(&self, code: &str) -> AppResult<&StatusDef> {
        self.by_code
            .get(code)
            .ok_or_else(|| AppError::UnknownStatus(code.to_string()))
    }

    pub fn is_valid_transition(&self, from: &str, to: &str) -> bool {
        self.by_code
            .get(from)
            .map(|def| def.allowed_next.contains(to))
            .unwrap_or(false)
    }

    pub fn allowed_next(&self, from: &str) -> HashSet<String> {
        self.by_code
            .get(from)
            .map(|def| def.allowed_next.clone())
            .unwrap_or_default()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(|c| c.as_str())
    }

    /// The built-in catalog. Stages are ordered pre_production -> production
    /// -> fulfillment -> final; `planting -> confirmed` is the declared
    /// backward correction edge; final statuses have no outgoing edges.
    /// Templates never transition and have no edges at all.
    pub fn default_catalog() -> Vec<StatusDef> {
        use codes::*;
        vec![
            StatusDef::new(TEMPLATE, "Template", Stage::PreProduction, false, &[], 0),
            StatusDef::new(
                PENDING,
                "Pending",
                Stage::PreProduction,
                false,
                &[CONFIRMED, CANCELLED],
                10,
            ),
            StatusDef::new(
                CONFIRMED,
                "Confirmed",
                Stage::PreProduction,
                false,
                &[PLANTING, CANCELLED],
                20,
            ),
            StatusDef::new(
                PLANTING,
                "Planting",
                Stage::Production,
                false,
                &[GROWING, CONFIRMED, CANCELLED],
                30,
            ),
            StatusDef::new(
                GROWING,
                "Growing",
                Stage::Production,
                false,
                &[READY_TO_HARVEST, CANCELLED],
                40,
            ),
            StatusDef::new(
                READY_TO_HARVEST,
                "Ready to harvest",
                Stage::Production,
                false,
                &[HARVESTING, CANCELLED],
                50,
            ),
            StatusDef::new(
                HARVESTING,
                "Harvesting",
                Stage::Production,
                false,
                &[PACKING, CANCELLED],
                60,
            ),
            StatusDef::new(
                PACKING,
                "Packing",
                Stage::Fulfillment,
                false,
                &[READY_FOR_DELIVERY, CANCELLED],
                70,
            ),
            StatusDef::new(
                READY_FOR_DELIVERY,
                "Ready for delivery",
                Stage::Fulfillment,
                false,
                &[DELIVERING, DELIVERED, COMPLETED, CANCELLED],
                80,
            ),
            StatusDef::new(
                DELIVERING,
                "Delivering",
                Stage::Fulfillment,
                false,
                &[DELIVERED],
                90,
            ),
            StatusDef::new(DELIVERED, "Delivered", Stage::Final, true, &[], 100),
            StatusDef::new(COMPLETED, "Completed", Stage::Final, true, &[], 110),
            StatusDef::new(CANCELLED, "Cancelled", Stage::Final, true, &[], 120),
        ]
    }

    /// Load the catalog from the database, seeding it from the built-in
    /// definitions on first run. The returned registry is immutable.
    /// Seeding is conflict-free so overlapping startups cannot leave a
    /// partial catalog.
    pub async fn load_or_seed(conn: &OrmConn) -> anyhow::Result<Self> {
        let mut rows = OrderStatuses::find().all(conn).await?;
        if rows.is_empty() {
            let actives: Vec<StatusActive> = Self::default_catalog()
                .into_iter()
                .map(|def| {
                    let allowed: Vec<String> = def.allowed_next.iter().cloned().collect();
                    StatusActive {
                        id: Set(Uuid::new_v4()),
                        code: Set(def.code),
                        name: Set(def.name),
                        stage: Set(def.stage.as_str().to_string()),
                        is_final: Set(def.is_final),
                        allowed_next: Set(serde_json::json!(allowed)),
                        sort_order: Set(def.sort_order),
                    }
                })
                .collect();
            OrderStatuses::insert_many(actives)
                .on_conflict(
                    OnConflict::column(crate::entity::order_statuses::Column::Code)
                        .do_nothing()
                        .to_owned(),
                )
                .do_nothing()
                .exec(conn)
                .await?;
            tracing::info!("seeded order status catalog");
            rows = OrderStatuses::find().all(conn).await?;
        }

        let mut defs = Vec::with_capacity(rows.len());
        for row in rows {
            let stage = Stage::parse(&row.stage)
                .ok_or_else(|| anyhow::anyhow!("unknown stage '{}' in status catalog", row.stage))?;
            let allowed_next: HashSet<String> =
                serde_json::from_value(row.allowed_next.clone()).unwrap_or_default();
            defs.push(StatusDef {
                code: row.code,
                name: row.name,
                stage,
                is_final: row.is_final,
                allowed_next,
                sort_order: row.sort_order,
            });
        }
        Ok(Self::new(defs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StatusRegistry {
        StatusRegistry::new(StatusRegistry::default_catalog())
    }

    #[test]
    fn final_statuses_have_no_outgoing_edges() {
        let reg = registry();
        for code in [codes::DELIVERED, codes::COMPLETED, codes::CANCELLED] {
            assert!(reg.get(code).unwrap().is_final);
            assert!(reg.allowed_next(code).is_empty(), "{code} should be final");
        }
    }

    #[test]
    fn forward_transitions_are_allowed() {
        let reg = registry();
        assert!(reg.is_valid_transition(codes::PENDING, codes::CONFIRMED));
        assert!(reg.is_valid_transition(codes::CONFIRMED, codes::PLANTING));
        assert!(reg.is_valid_transition(codes::HARVESTING, codes::PACKING));
        assert!(reg.is_valid_transition(codes::PACKING, codes::READY_FOR_DELIVERY));
        assert!(reg.is_valid_transition(codes::DELIVERING, codes::DELIVERED));
    }

    #[test]
    fn backward_correction_edge_is_declared() {
        let reg = registry();
        assert!(reg.is_valid_transition(codes::PLANTING, codes::CONFIRMED));
        // but not arbitrary backwards moves
        assert!(!reg.is_valid_transition(codes::PACKING, codes::GROWING));
        assert!(!reg.is_valid_transition(codes::DELIVERED, codes::PENDING));
    }

    #[test]
    fn absent_edges_are_rejected() {
        let reg = registry();
        assert!(!reg.is_valid_transition(codes::PENDING, codes::PACKING));
        assert!(!reg.is_valid_transition(codes::GROWING, codes::GROWING));
        assert!(!reg.is_valid_transition(codes::TEMPLATE, codes::PENDING));
        assert!(!reg.is_valid_transition("nope", codes::PENDING));
    }

    #[test]
    fn every_edge_points_at_a_known_status() {
        let reg = registry();
        for code in reg.codes() {
            for next in reg.allowed_next(code) {
                assert!(reg.get(&next).is_some(), "{code} -> {next} dangles");
            }
        }
    }

    #[test]
    fn unknown_code_resolution_fails() {
        let reg = registry();
        assert!(matches!(
            reg.resolve("does_not_exist"),
            Err(AppError::UnknownStatus(_))
        ));
    }
}
