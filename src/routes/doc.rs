use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        crop_plans::{CropList, CropPlanList, UpdateCropStageRequest},
        orders::{
            BulkTransitionReport, BulkTransitionRequest, BusinessEventRequest,
            CreateOrderItemRequest, CreateOrderRequest, CreatePackagingRequest, FailedTransition,
            OrderList, OrderWithItems, RecordPaymentRequest, TransitionRequest,
        },
        recurring::{MakeRecurringRequest, RecurrenceError, RecurrenceReport, TemplateList},
    },
    models::{Crop, CropPlan, Customer, Invoice, Order, OrderItem, OrderPackaging, Payment, User},
    response::{ApiResponse, Meta},
    routes::{auth, crop_plans, crops, health, orders, params, recurring},
    status::Stage,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_status,
        orders::bulk_update_status,
        orders::submit_business_event,
        orders::record_payment,
        orders::issue_invoice,
        orders::make_recurring,
        orders::generate_crop_plans,
        recurring::list_templates,
        recurring::run_scheduler,
        crop_plans::list_crop_plans,
        crop_plans::approve_crop_plan,
        crop_plans::cancel_crop_plan,
        crops::list_crops,
        crops::update_crop_stage
    ),
    components(
        schemas(
            User,
            Customer,
            Order,
            OrderItem,
            OrderPackaging,
            CropPlan,
            Crop,
            Invoice,
            Payment,
            Stage,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateOrderRequest,
            CreateOrderItemRequest,
            CreatePackagingRequest,
            TransitionRequest,
            BulkTransitionRequest,
            BulkTransitionReport,
            FailedTransition,
            BusinessEventRequest,
            RecordPaymentRequest,
            OrderWithItems,
            OrderList,
            MakeRecurringRequest,
            RecurrenceReport,
            RecurrenceError,
            TemplateList,
            CropPlanList,
            CropList,
            UpdateCropStageRequest,
            params::Pagination,
            params::OrderListQuery,
            params::CropPlanListQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<BulkTransitionReport>,
            ApiResponse<RecurrenceReport>,
            ApiResponse<CropPlanList>,
            ApiResponse<CropList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Recurring", description = "Recurring template endpoints"),
        (name = "CropPlans", description = "Crop plan endpoints"),
        (name = "Crops", description = "Crop production endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
