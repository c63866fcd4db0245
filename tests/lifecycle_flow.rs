use chrono::{Days, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use microgreens_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::{CreateOrderItemRequest, CreateOrderRequest, RecordPaymentRequest},
    entity::{
        crops::{Column as CropCol, Entity as Crops},
        customers::ActiveModel as CustomerActive,
        invoices::{ActiveModel as InvoiceActive, Entity as Invoices},
        orders::Entity as Orders,
        price_variations::ActiveModel as VariationActive,
        products::ActiveModel as ProductActive,
    },
    error::AppError,
    services::{crop_plan_service, event_service, order_service, status_service},
    state::AppState,
    status::codes,
};

// Integration flow: an order walks the whole lifecycle, driven by manual
// transitions and production events; payment gates dispatch; cancellation
// cascades to crops and the pending invoice.
#[tokio::test]
async fn order_lifecycle_and_cancellation_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let actor = Uuid::new_v4();
    let customer_id = seed_customer(&state).await?;
    let (product_id, variation_id) = seed_product(&state, 350, Decimal::new(650, 2)).await?;

    let delivery = Utc::now().date_naive() + Days::new(10);
    let created = order_service::create_order(
        &state,
        actor,
        CreateOrderRequest {
            customer_id,
            delivery_date: delivery,
            harvest_date: None,
            requires_invoice: true,
            order_type: None,
            billing_frequency: None,
            notes: None,
            items: vec![CreateOrderItemRequest {
                product_id,
                price_variation_id: variation_id,
                quantity: Decimal::from(5),
                unit_price: None,
            }],
            packaging: vec![],
        },
    )
    .await?;
    let order = created.data.unwrap().order;
    assert_eq!(order.status, codes::PENDING);
    assert_eq!(order.total_amount, Decimal::new(3250, 2));
    assert_eq!(order.harvest_date, Some(delivery - Days::new(1)));

    // An edge absent from the graph is rejected and the status is untouched.
    let ctx = status_service::TransitionContext::manual(actor, None);
    let err = status_service::transition(&state, order.id, codes::PACKING, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    let unchanged = Orders::find_by_id(order.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(unchanged.status, codes::PENDING);

    // pending -> confirmed stamps confirmed_at once.
    let confirmed = status_service::transition(&state, order.id, codes::CONFIRMED, &ctx).await?;
    assert!(confirmed.confirmed_at.is_some());

    // Analyze into draft plans, then approve: crops come into existence.
    let plans = crop_plan_service::generate_plans_for_order(&state, actor, order.id).await?;
    assert_eq!(plans.len(), 1);
    // 5 x 100g = 500g at 350g/tray -> 2 trays
    assert_eq!(plans[0].trays_needed, 2);
    let plan = crop_plan_service::approve_plan(&state, actor, plans[0].id).await?;
    assert_eq!(plan.status, "active");
    let crops = Crops::find()
        .filter(CropCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;
    assert_eq!(crops.len(), 2);

    // confirmed -> planting, then crop.planted advances to growing.
    status_service::transition(&state, order.id, codes::PLANTING, &ctx).await?;
    let advanced = event_service::handle_business_event(&state, order.id, "crop.planted").await?;
    assert_eq!(advanced.unwrap().status, codes::GROWING);

    // Redelivery is a no-op.
    let repeat = event_service::handle_business_event(&state, order.id, "crop.planted").await?;
    assert!(repeat.is_none());

    // crops.ready is held back until every crop is ready.
    let held = event_service::handle_business_event(&state, order.id, "crops.ready").await?;
    assert!(held.is_none());
    for crop in &crops {
        crop_plan_service::update_crop_stage(&state, actor, crop.id, "ready_to_harvest").await?;
    }
    let ready = event_service::handle_business_event(&state, order.id, "crops.ready").await?;
    assert_eq!(ready.unwrap().status, codes::READY_TO_HARVEST);

    // Entering harvesting drags every ready crop along.
    status_service::transition(&state, order.id, codes::HARVESTING, &ctx).await?;
    let harvesting_crops = Crops::find()
        .filter(CropCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;
    assert!(harvesting_crops.iter().all(|c| c.stage == "harvesting"));

    for crop in &harvesting_crops {
        crop_plan_service::update_crop_stage(&state, actor, crop.id, "harvested").await?;
    }
    let packed = event_service::handle_business_event(&state, order.id, "harvest.completed").await?;
    assert_eq!(packed.unwrap().status, codes::PACKING);

    // Invoice-required order cannot ship unpaid: packing.completed is a no-op.
    order_service::issue_invoice(&state, actor, order.id).await?;
    let blocked =
        event_service::handle_business_event(&state, order.id, "packing.completed").await?;
    assert!(blocked.is_none());

    // Full payment releases it.
    order_service::record_payment(
        &state,
        actor,
        order.id,
        RecordPaymentRequest {
            amount: Decimal::new(3250, 2),
            method: None,
        },
    )
    .await?;
    let released =
        event_service::handle_business_event(&state, order.id, "payment.received").await?;
    assert_eq!(released.unwrap().status, codes::READY_FOR_DELIVERY);

    // Delivery settles the invoice of a fully paid order.
    let delivered = status_service::transition(&state, order.id, codes::DELIVERED, &ctx).await?;
    assert!(delivered.delivered_at.is_some());
    let invoice = Invoices::find_by_id(delivered.invoice_id.unwrap())
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(invoice.status, "paid");

    // Final states accept nothing further.
    let err = status_service::transition(&state, order.id, codes::PENDING, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    // --- cancellation cascade on a second order ---
    let doomed = order_service::create_order(
        &state,
        actor,
        CreateOrderRequest {
            customer_id,
            delivery_date: delivery,
            harvest_date: None,
            requires_invoice: true,
            order_type: None,
            billing_frequency: None,
            notes: None,
            items: vec![CreateOrderItemRequest {
                product_id,
                price_variation_id: variation_id,
                quantity: Decimal::from(2),
                unit_price: None,
            }],
            packaging: vec![],
        },
    )
    .await?
    .data
    .unwrap()
    .order;

    let plans = crop_plan_service::generate_plans_for_order(&state, actor, doomed.id).await?;
    crop_plan_service::approve_plan(&state, actor, plans[0].id).await?;
    order_service::issue_invoice(&state, actor, doomed.id).await?;

    let cancel_ctx = status_service::TransitionContext::manual(
        actor,
        Some("Customer closed for the season".to_string()),
    );
    let cancelled =
        status_service::transition(&state, doomed.id, codes::CANCELLED, &cancel_ctx).await?;
    assert!(cancelled.cancelled_at.is_some());

    let doomed_crops = Crops::find()
        .filter(CropCol::OrderId.eq(doomed.id))
        .all(&state.orm)
        .await?;
    assert!(!doomed_crops.is_empty());
    for crop in &doomed_crops {
        assert_eq!(crop.stage, "cancelled");
        assert!(crop.cancelled_at.is_some());
        assert_eq!(
            crop.cancel_reason.as_deref(),
            Some("Customer closed for the season")
        );
    }
    let doomed_invoice = Invoices::find_by_id(cancelled.invoice_id.unwrap())
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(doomed_invoice.status, "cancelled");

    // A paid invoice survives its order's cancellation untouched.
    let kept = order_service::create_order(
        &state,
        actor,
        CreateOrderRequest {
            customer_id,
            delivery_date: delivery,
            harvest_date: None,
            requires_invoice: true,
            order_type: None,
            billing_frequency: None,
            notes: None,
            items: vec![CreateOrderItemRequest {
                product_id,
                price_variation_id: variation_id,
                quantity: Decimal::ONE,
                unit_price: None,
            }],
            packaging: vec![],
        },
    )
    .await?
    .data
    .unwrap()
    .order;
    let kept_invoice = order_service::issue_invoice(&state, actor, kept.id).await?;
    mark_invoice_paid(&state, kept_invoice.id).await?;
    status_service::transition(&state, kept.id, codes::CANCELLED, &cancel_ctx).await?;
    let survivor = Invoices::find_by_id(kept_invoice.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(survivor.status, "paid");

    Ok(())
}

#[tokio::test]
async fn bulk_transition_skips_templates_and_final_orders() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let actor = Uuid::new_v4();
    let customer_id = seed_customer(&state).await?;
    let (product_id, variation_id) = seed_product(&state, 300, Decimal::new(500, 2)).await?;

    let delivery = Utc::now().date_naive() + Days::new(5);
    let mut ids = Vec::new();
    for _ in 0..2 {
        let order = order_service::create_order(
            &state,
            actor,
            CreateOrderRequest {
                customer_id,
                delivery_date: delivery,
                harvest_date: None,
                requires_invoice: false,
                order_type: None,
                billing_frequency: None,
                notes: None,
                items: vec![CreateOrderItemRequest {
                    product_id,
                    price_variation_id: variation_id,
                    quantity: Decimal::ONE,
                    unit_price: None,
                }],
                packaging: vec![],
            },
        )
        .await?
        .data
        .unwrap()
        .order;
        ids.push(order.id);
    }

    let ctx = status_service::TransitionContext::manual(actor, None);
    // put one order in a final state
    status_service::transition(&state, ids[1], codes::CANCELLED, &ctx).await?;

    let report =
        status_service::bulk_transition(&state, ids.clone(), codes::CONFIRMED, &ctx).await?;
    assert_eq!(report.successful, vec![ids[0]]);
    assert_eq!(report.skipped, vec![ids[1]]);
    assert!(report.failed.is_empty());

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
        name: Set("Test Bistro".into()),
        email: Set(format!("bistro-{}@example.com", Uuid::new_v4())),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(customer.id)
}

async fn seed_product(
    state: &AppState,
    grams_per_tray: i64,
    price: Decimal,
) -> anyhow::Result<(Uuid, Uuid)> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Test Greens {}", Uuid::new_v4())),
        grams_per_tray: Set(Decimal::from(grams_per_tray)),
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

async fn mark_invoice_paid(state: &AppState, invoice_id: Uuid) -> anyhow::Result<()> {
    let invoice = Invoices::find_by_id(invoice_id)
        .one(&state.orm)
        .await?
        .expect("invoice exists");
    let mut active: InvoiceActive = invoice.into();
    active.status = Set("paid".to_string());
    active.paid_at = Set(Some(Utc::now().into()));
    active.update(&state.orm).await?;
    Ok(())
}
