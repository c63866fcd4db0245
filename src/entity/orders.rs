use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub order_type: String,
    pub billing_frequency: String,
    pub total_amount: Decimal,
    pub requires_invoice: bool,
    pub is_recurring: bool,
    pub is_recurring_active: bool,
    pub parent_recurring_order_id: Option<Uuid>,
    pub recurring_frequency: Option<String>,
    pub recurring_interval: Option<i32>,
    pub recurring_start_date: Option<Date>,
    pub recurring_end_date: Option<Date>,
    pub next_generation_date: Option<Date>,
    pub last_generated_at: Option<Date>,
    pub delivery_date: Option<Date>,
    pub harvest_date: Option<Date>,
    pub invoice_id: Option<Uuid>,
    pub consolidated_invoice_id: Option<Uuid>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id"
    )]
    Customers,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentRecurringOrderId",
        to = "Column::Id"
    )]
    ParentTemplate,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::order_packaging::Entity")]
    OrderPackaging,
    #[sea_orm(has_many = "super::crop_plans::Entity")]
    CropPlans,
    #[sea_orm(has_many = "super::crops::Entity")]
    Crops,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::order_packaging::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderPackaging.def()
    }
}

impl Related<super::crop_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CropPlans.def()
    }
}

impl Related<super::crops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Crops.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
