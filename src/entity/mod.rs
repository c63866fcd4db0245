pub mod audit_logs;
pub mod crop_batches;
pub mod crop_plans;
pub mod crops;
pub mod customer_prices;
pub mod customers;
pub mod invoices;
pub mod order_items;
pub mod order_packaging;
pub mod order_statuses;
pub mod orders;
pub mod payments;
pub mod price_variations;
pub mod products;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use crop_batches::Entity as CropBatches;
pub use crop_plans::Entity as CropPlans;
pub use crops::Entity as Crops;
pub use customer_prices::Entity as CustomerPrices;
pub use customers::Entity as Customers;
pub use invoices::Entity as Invoices;
pub use order_items::Entity as OrderItems;
pub use order_packaging::Entity as OrderPackaging;
pub use order_statuses::Entity as OrderStatuses;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use price_variations::Entity as PriceVariations;
pub use products::Entity as Products;
pub use users::Entity as Users;
