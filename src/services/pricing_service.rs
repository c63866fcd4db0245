use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity::{
        customer_prices::{Column as CustomerPriceCol, Entity as CustomerPrices},
        price_variations::Entity as PriceVariations,
    },
    error::{AppError, AppResult},
};

/// Resolve the current unit price for a customer and price variation:
/// the customer-specific override when one exists, otherwise the catalog
/// price of the variation. Generic over the connection so the materializer
/// can resolve inside its transaction.
pub async fn price_for<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    price_variation_id: Uuid,
) -> AppResult<Decimal> {
    let override_price = CustomerPrices::find()
        .filter(
            Condition::all()
                .add(CustomerPriceCol::CustomerId.eq(customer_id))
                .add(CustomerPriceCol::PriceVariationId.eq(price_variation_id)),
        )
        .one(conn)
        .await?;

    if let Some(row) = override_price {
        return Ok(row.price);
    }

    let variation = PriceVariations::find_by_id(price_variation_id)
        .one(conn)
        .await?;
    match variation {
        Some(v) => Ok(v.price),
        None => Err(AppError::NotFound),
    }
}
