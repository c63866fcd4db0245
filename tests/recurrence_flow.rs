use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use microgreens_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::recurring::MakeRecurringRequest,
    entity::{
        customer_prices::ActiveModel as CustomerPriceActive,
        customers::ActiveModel as CustomerActive,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        price_variations::ActiveModel as VariationActive,
        products::ActiveModel as ProductActive,
    },
    services::recurrence_service,
    state::AppState,
    status::codes,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// The worked scheduler example: a weekly template last generated on
// 2025-01-01 with a stale $10 line, customer currently priced at $12. A pass
// on 2025-01-08 produces exactly one order for delivery on the 9th, priced
// at $12, and a retried pass produces nothing more.
#[tokio::test]
async fn weekly_template_generates_once_with_current_pricing() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer_id = seed_customer(&state).await?;
    let (product_id, variation_id) = seed_product(&state, Decimal::from(10)).await?;
    // current customer-specific price differs from the template's snapshot
    CustomerPriceActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        price_variation_id: Set(variation_id),
        price: Set(Decimal::from(12)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let template_id = seed_template(
        &state,
        customer_id,
        product_id,
        variation_id,
        date(2025, 1, 1),  // start
        Some(date(2025, 1, 1)), // last generated
        None,
    )
    .await?;

    recurrence_service::process_recurring_orders_as_of(&state, date(2025, 1, 8)).await?;

    let children = Orders::find()
        .filter(OrderCol::ParentRecurringOrderId.eq(template_id))
        .all(&state.orm)
        .await?;
    assert_eq!(children.len(), 1);
    let child = &children[0];
    assert_eq!(child.status, codes::PENDING);
    assert!(!child.is_recurring);
    assert_eq!(child.harvest_date, Some(date(2025, 1, 8)));
    assert_eq!(child.delivery_date, Some(date(2025, 1, 9)));
    assert_eq!(child.total_amount, Decimal::from(60));

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(child.id))
        .all(&state.orm)
        .await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, Decimal::from(5));
    assert_eq!(items[0].unit_price, Decimal::from(12));

    let template = Orders::find_by_id(template_id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(template.last_generated_at, Some(date(2025, 1, 8)));
    assert_eq!(template.next_generation_date, Some(date(2025, 1, 15)));

    // Retried pass on the same day: the delivery-date guard makes it a no-op.
    recurrence_service::process_recurring_orders_as_of(&state, date(2025, 1, 8)).await?;
    let children_after = Orders::find()
        .filter(OrderCol::ParentRecurringOrderId.eq(template_id))
        .all(&state.orm)
        .await?;
    assert_eq!(children_after.len(), 1);

    Ok(())
}

#[tokio::test]
async fn template_past_end_date_is_deactivated_and_generates_nothing() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer_id = seed_customer(&state).await?;
    let (product_id, variation_id) = seed_product(&state, Decimal::from(8)).await?;
    let template_id = seed_template(
        &state,
        customer_id,
        product_id,
        variation_id,
        date(2025, 1, 1),
        Some(date(2025, 2, 1)),
        Some(date(2025, 3, 1)), // ended in the past
    )
    .await?;

    recurrence_service::process_recurring_orders_as_of(&state, date(2025, 6, 1)).await?;

    let template = Orders::find_by_id(template_id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert!(!template.is_recurring_active);
    let children = Orders::find()
        .filter(OrderCol::ParentRecurringOrderId.eq(template_id))
        .all(&state.orm)
        .await?;
    assert!(children.is_empty());

    // and it stays quiet on later passes
    recurrence_service::process_recurring_orders_as_of(&state, date(2025, 7, 1)).await?;
    let children = Orders::find()
        .filter(OrderCol::ParentRecurringOrderId.eq(template_id))
        .all(&state.orm)
        .await?;
    assert!(children.is_empty());

    Ok(())
}

#[tokio::test]
async fn future_due_date_defers_generation() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer_id = seed_customer(&state).await?;
    let (product_id, variation_id) = seed_product(&state, Decimal::from(8)).await?;
    let template_id = seed_template(
        &state,
        customer_id,
        product_id,
        variation_id,
        date(2025, 1, 1),
        Some(date(2025, 1, 8)),
        None,
    )
    .await?;

    // next due is the 15th; a pass on the 10th does nothing
    recurrence_service::process_recurring_orders_as_of(&state, date(2025, 1, 10)).await?;
    let children = Orders::find()
        .filter(OrderCol::ParentRecurringOrderId.eq(template_id))
        .all(&state.orm)
        .await?;
    assert!(children.is_empty());

    Ok(())
}

#[tokio::test]
async fn make_recurring_clones_an_order_into_a_template() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let actor = Uuid::new_v4();
    let customer_id = seed_customer(&state).await?;
    let (product_id, variation_id) = seed_product(&state, Decimal::from(7)).await?;

    // a regular delivered-style order to clone
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        status: Set(codes::PENDING.to_string()),
        order_type: Set("standard".into()),
        billing_frequency: Set("per_order".into()),
        total_amount: Set(Decimal::from(21)),
        requires_invoice: Set(false),
        is_recurring: Set(false),
        is_recurring_active: Set(false),
        parent_recurring_order_id: Set(None),
        recurring_frequency: Set(None),
        recurring_interval: Set(None),
        recurring_start_date: Set(None),
        recurring_end_date: Set(None),
        next_generation_date: Set(None),
        last_generated_at: Set(None),
        delivery_date: Set(Some(date(2025, 3, 2))),
        harvest_date: Set(Some(date(2025, 3, 1))),
        invoice_id: Set(None),
        consolidated_invoice_id: Set(None),
        confirmed_at: Set(None),
        cancelled_at: Set(None),
        delivered_at: Set(None),
        notes: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        product_id: Set(product_id),
        price_variation_id: Set(variation_id),
        quantity: Set(Decimal::from(3)),
        unit_price: Set(Decimal::from(7)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let template = recurrence_service::make_recurring(
        &state,
        actor,
        order.id,
        MakeRecurringRequest {
            frequency: "weekly".into(),
            interval: None,
            start_date: date(2025, 3, 1),
            end_date: None,
        },
    )
    .await?;

    assert_eq!(template.status, codes::TEMPLATE);
    assert!(template.is_recurring);
    assert!(template.is_recurring_active);
    assert!(template.parent_recurring_order_id.is_none());
    assert!(template.delivery_date.is_none());
    assert_eq!(template.next_generation_date, Some(date(2025, 3, 8)));

    let template_items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(template.id))
        .all(&state.orm)
        .await?;
    assert_eq!(template_items.len(), 1);
    assert_eq!(template_items[0].quantity, Decimal::from(3));

    // the source order is untouched
    let source = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(order.id))
                .add(OrderCol::IsRecurring.eq(false)),
        )
        .one(&state.orm)
        .await?;
    assert!(source.is_some());

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    Ok(Some(AppState::build(pool, orm).await?))
}

async fn seed_customer(state: &AppState) -> anyhow::Result<Uuid> {
    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        name: Set("Recurring Cafe".into()),
        email: Set(format!("cafe-{}@example.com", Uuid::new_v4())),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(customer.id)
}

async fn seed_product(state: &AppState, price: Decimal) -> anyhow::Result<(Uuid, Uuid)> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Recurring Greens {}", Uuid::new_v4())),
        grams_per_tray: Set(Decimal::from(350)),
        grow_days: Set(9),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let variation = VariationActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        name: Set("100g clamshell".into()),
        unit: Set("clamshell".into()),
        unit_grams: Set(Decimal::from(100)),
        price: Set(price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok((product.id, variation.id))
}

async fn seed_template(
    state: &AppState,
    customer_id: Uuid,
    product_id: Uuid,
    variation_id: Uuid,
    start: NaiveDate,
    last_generated_at: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<Uuid> {
    let template = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        status: Set(codes::TEMPLATE.to_string()),
        order_type: Set("standard".into()),
        billing_frequency: Set("per_order".into()),
        total_amount: Set(Decimal::from(50)),
        requires_invoice: Set(false),
        is_recurring: Set(true),
        is_recurring_active: Set(true),
        parent_recurring_order_id: Set(None),
        recurring_frequency: Set(Some("weekly".into())),
        recurring_interval: Set(Some(1)),
        recurring_start_date: Set(Some(start)),
        recurring_end_date: Set(end),
        next_generation_date: Set(None),
        last_generated_at: Set(last_generated_at),
        delivery_date: Set(None),
        harvest_date: Set(None),
        invoice_id: Set(None),
        consolidated_invoice_id: Set(None),
        confirmed_at: Set(None),
        cancelled_at: Set(None),
        delivered_at: Set(None),
        notes: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // a stale snapshot price on the template line
    OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(template.id),
        product_id: Set(product_id),
        price_variation_id: Set(variation_id),
        quantity: Set(Decimal::from(5)),
        unit_price: Set(Decimal::from(10)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(template.id)
}
