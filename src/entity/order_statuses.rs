use sea_orm::entity::prelude::*;
use serde_json::Value;

/// Fixed status catalog. Seeded once at system initialization and treated as
/// immutable at runtime; the in-memory registry is built from these rows.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_statuses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub stage: String,
    pub is_final: bool,
    pub allowed_next: Value,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
