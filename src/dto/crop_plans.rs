use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Crop, CropPlan};

#[derive(Debug, Serialize, ToSchema)]
pub struct CropPlanList {
    pub items: Vec<CropPlan>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CropList {
    pub items: Vec<Crop>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCropStageRequest {
    /// planted | growing | ready_to_harvest | harvesting | harvested
    pub stage: String,
}
