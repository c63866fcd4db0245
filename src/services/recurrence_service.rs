use chrono::{Days, Months, NaiveDate, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::recurring::{MakeRecurringRequest, RecurrenceError, RecurrenceReport},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        order_packaging::{
            ActiveModel as PackagingActive, Column as PackagingCol, Entity as OrderPackaging,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    models::Order,
    notify::NotificationKind,
    services::generation_service,
    state::AppState,
    status::codes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

impl Frequency {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "weekly" => Some(Self::Weekly),
            "biweekly" => Some(Self::Biweekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }

    pub fn default_interval(&self) -> i32 {
        match self {
            Self::Biweekly => 2,
            _ => 1,
        }
    }

    /// One frequency step forward from `from`. Calendar-month steps preserve
    /// the day of month and clamp at month end (Jan 31 + 1 month is Feb 28
    /// or 29, never Mar 2/3).
    pub fn step(&self, from: NaiveDate, interval: i32) -> Option<NaiveDate> {
        let interval = interval.max(1) as u64;
        match self {
            Self::Weekly => from.checked_add_days(Days::new(7)),
            Self::Biweekly => from.checked_add_days(Days::new(7 * interval)),
            Self::Monthly => from.checked_add_months(Months::new(1)),
            Self::Quarterly => from.checked_add_months(Months::new(3)),
        }
    }
}

/// The generation date a template is next due for, stepped forward from the
/// last generated instance (or the recurrence start when none exists yet).
pub fn next_due_date(
    last_generated_at: Option<NaiveDate>,
    start: NaiveDate,
    frequency: Frequency,
    interval: i32,
) -> Option<NaiveDate> {
    let base = last_generated_at.unwrap_or(start);
    frequency.step(base, interval)
}

fn compute_due(template: &OrderModel) -> Result<(Frequency, i32, NaiveDate), String> {
    let raw = template
        .recurring_frequency
        .as_deref()
        .ok_or_else(|| "template has no recurring frequency".to_string())?;
    let frequency =
        Frequency::parse(raw).ok_or_else(|| format!("unknown recurring frequency '{raw}'"))?;
    let start = template
        .recurring_start_date
        .ok_or_else(|| "template has no recurring start date".to_string())?;
    let interval = template
        .recurring_interval
        .unwrap_or_else(|| frequency.default_interval());
    let due = next_due_date(template.last_generated_at, start, frequency, interval)
        .ok_or_else(|| "next generation date overflows the calendar".to_string())?;
    Ok((frequency, interval, due))
}

/// One scheduler pass over every recurring template, as of `today`.
///
/// Templates are processed independently; one failure is recorded and never
/// blocks the rest. Duplicate generation is prevented by the delivery-date
/// existence check rather than locking, which makes overlapping or retried
/// passes safe.
pub async fn process_recurring_orders_as_of(
    state: &AppState,
    today: NaiveDate,
) -> AppResult<RecurrenceReport> {
    let templates = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::IsRecurring.eq(true))
                .add(OrderCol::ParentRecurringOrderId.is_null()),
        )
        .all(&state.orm)
        .await?;

    let mut report = RecurrenceReport::default();

    for template in templates {
        report.processed += 1;
        let template_id = template.id;

        if !template.is_recurring_active {
            continue;
        }

        if let Some(end) = template.recurring_end_date {
            if end < today {
                if let Err(err) = deactivate_template(state, template).await {
                    report.errors.push(RecurrenceError {
                        order_id: template_id,
                        message: format!("failed to deactivate expired template: {err}"),
                    });
                }
                continue;
            }
        }

        let (frequency, interval, due) = match compute_due(&template) {
            Ok(v) => v,
            Err(message) => {
                report.errors.push(RecurrenceError {
                    order_id: template_id,
                    message,
                });
                continue;
            }
        };

        if due > today {
            continue;
        }

        let harvest_date = due;
        let delivery_date = match due.checked_add_days(Days::new(1)) {
            Some(d) => d,
            None => {
                report.errors.push(RecurrenceError {
                    order_id: template_id,
                    message: "delivery date overflows the calendar".to_string(),
                });
                continue;
            }
        };

        // Idempotency key: a generated instance already exists for this
        // delivery date, so a retried or overlapping pass skips it.
        let duplicates = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::ParentRecurringOrderId.eq(template_id))
                    .add(OrderCol::DeliveryDate.eq(delivery_date)),
            )
            .count(&state.orm)
            .await?;
        if duplicates > 0 {
            tracing::debug!(template_id = %template_id, %delivery_date, "instance already generated; skipping");
            continue;
        }

        match generation_service::generate_from_template(state, &template, harvest_date, delivery_date)
            .await
        {
            Ok(order) => {
                report.generated += 1;
                if let Err(err) =
                    stamp_generated(state, template_id, due, frequency, interval).await
                {
                    report.errors.push(RecurrenceError {
                        order_id: template_id,
                        message: format!("generated order {} but failed to stamp template: {err}", order.id),
                    });
                }
            }
            Err(err) => {
                report.errors.push(RecurrenceError {
                    order_id: template_id,
                    message: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        generated = report.generated,
        errors = report.errors.len(),
        "recurrence pass finished"
    );
    Ok(report)
}

pub async fn process_recurring_orders(state: &AppState) -> AppResult<RecurrenceReport> {
    process_recurring_orders_as_of(state, Utc::now().date_naive()).await
}

async fn deactivate_template(state: &AppState, template: OrderModel) -> AppResult<()> {
    let template_id = template.id;
    let mut active: OrderActive = template.into();
    active.is_recurring_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;
    tracing::info!(template_id = %template_id, "recurring template past its end date; deactivated");
    Ok(())
}

async fn stamp_generated(
    state: &AppState,
    template_id: Uuid,
    due: NaiveDate,
    frequency: Frequency,
    interval: i32,
) -> AppResult<()> {
    let template = Orders::find_by_id(template_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut active: OrderActive = template.into();
    active.last_generated_at = Set(Some(due));
    active.next_generation_date = Set(frequency.step(due, interval));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;
    Ok(())
}

/// Clone a regular order into a recurring template. The template keeps the
/// order's lines as a definition only; prices are re-resolved every time an
/// instance is materialized.
pub async fn make_recurring(
    state: &AppState,
    actor: Uuid,
    order_id: Uuid,
    req: MakeRecurringRequest,
) -> AppResult<Order> {
    let frequency = Frequency::parse(&req.frequency)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown frequency '{}'", req.frequency)))?;
    let interval = req.interval.unwrap_or_else(|| frequency.default_interval());
    if let Some(end) = req.end_date {
        if end < req.start_date {
            return Err(AppError::BadRequest(
                "Recurrence end date precedes start date".into(),
            ));
        }
    }

    let source = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if source.status == codes::TEMPLATE {
        return Err(AppError::BadRequest(
            "Order is already a recurring template".into(),
        ));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(source.id))
        .all(&state.orm)
        .await?;
    let packaging = OrderPackaging::find()
        .filter(PackagingCol::OrderId.eq(source.id))
        .all(&state.orm)
        .await?;

    let txn = state.orm.begin().await?;

    let template_id = Uuid::new_v4();
    let template = OrderActive {
        id: Set(template_id),
        customer_id: Set(source.customer_id),
        status: Set(codes::TEMPLATE.to_string()),
        order_type: Set(source.order_type.clone()),
        billing_frequency: Set(source.billing_frequency.clone()),
        total_amount: Set(source.total_amount),
        requires_invoice: Set(source.requires_invoice),
        is_recurring: Set(true),
        is_recurring_active: Set(true),
        parent_recurring_order_id: Set(None),
        recurring_frequency: Set(Some(frequency.as_str().to_string())),
        recurring_interval: Set(Some(interval)),
        recurring_start_date: Set(Some(req.start_date)),
        recurring_end_date: Set(req.end_date),
        next_generation_date: Set(frequency.step(req.start_date, interval)),
        last_generated_at: Set(None),
        delivery_date: Set(None),
        harvest_date: Set(None),
        invoice_id: Set(None),
        consolidated_invoice_id: Set(None),
        confirmed_at: Set(None),
        cancelled_at: Set(None),
        delivered_at: Set(None),
        notes: Set(source.notes.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for item in &items {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(template_id),
            product_id: Set(item.product_id),
            price_variation_id: Set(item.price_variation_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    for pack in &packaging {
        PackagingActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(template_id),
            packaging_type: Set(pack.packaging_type.clone()),
            quantity: Set(pack.quantity),
            notes: Set(pack.notes.clone()),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor),
        "order_made_recurring",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order_id,
            "template_id": template_id,
            "frequency": frequency.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state.notifier.notify(
        NotificationKind::Success,
        "Recurring template created",
        &format!("Order {order_id} now recurs {}", frequency.as_str()),
    );

    Ok(template.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_steps_seven_days() {
        assert_eq!(
            Frequency::Weekly.step(date(2025, 1, 1), 1),
            Some(date(2025, 1, 8))
        );
    }

    #[test]
    fn biweekly_steps_interval_weeks() {
        assert_eq!(
            Frequency::Biweekly.step(date(2025, 1, 1), 2),
            Some(date(2025, 1, 15))
        );
        assert_eq!(
            Frequency::Biweekly.step(date(2025, 1, 1), 3),
            Some(date(2025, 1, 22))
        );
    }

    #[test]
    fn monthly_clamps_at_month_end() {
        assert_eq!(
            Frequency::Monthly.step(date(2025, 1, 31), 1),
            Some(date(2025, 2, 28))
        );
        // leap year
        assert_eq!(
            Frequency::Monthly.step(date(2024, 1, 31), 1),
            Some(date(2024, 2, 29))
        );
        // day of month preserved when it fits
        assert_eq!(
            Frequency::Monthly.step(date(2025, 3, 15), 1),
            Some(date(2025, 4, 15))
        );
    }

    #[test]
    fn quarterly_clamps_at_month_end() {
        assert_eq!(
            Frequency::Quarterly.step(date(2024, 11, 30), 1),
            Some(date(2025, 2, 28))
        );
        assert_eq!(
            Frequency::Quarterly.step(date(2025, 1, 10), 1),
            Some(date(2025, 4, 10))
        );
    }

    #[test]
    fn next_due_uses_start_when_never_generated() {
        assert_eq!(
            next_due_date(None, date(2025, 1, 1), Frequency::Weekly, 1),
            Some(date(2025, 1, 8))
        );
        assert_eq!(
            next_due_date(Some(date(2025, 1, 8)), date(2025, 1, 1), Frequency::Weekly, 1),
            Some(date(2025, 1, 15))
        );
    }

    #[test]
    fn frequency_parse_round_trips() {
        for name in ["weekly", "biweekly", "monthly", "quarterly"] {
            assert_eq!(Frequency::parse(name).unwrap().as_str(), name);
        }
        assert!(Frequency::parse("daily").is_none());
    }
}
