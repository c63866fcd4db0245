use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub name: String,
    pub grams_per_tray: Decimal,
    pub grow_days: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::price_variations::Entity")]
    PriceVariations,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::crop_plans::Entity")]
    CropPlans,
}

impl Related<super::price_variations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceVariations.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::crop_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CropPlans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
