pub mod auth_service;
pub mod crop_plan_service;
pub mod event_service;
pub mod generation_service;
pub mod order_service;
pub mod pricing_service;
pub mod recurrence_service;
pub mod status_service;
