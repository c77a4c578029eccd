use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ExtractVariablesRequest {
    #[schema(example = "Hi {{ name }}, use {{coupon}}. Bye {{name}}")]
    pub content: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ExtractVariablesResponse {
    /// Distinct names in first-occurrence order.
    #[schema(example = json!(["name", "coupon"]))]
    pub variables: Vec<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RenderPreviewRequest {
    /// Template contents in segment order.
    #[schema(example = json!(["Hello {{name}}", "Bye {{name}}"]))]
    pub templates: Vec<String>,
    #[serde(default)]
    #[schema(example = json!({"name": "Sam"}))]
    pub values: HashMap<String, String>,
    #[serde(default)]
    #[schema(example = " | ")]
    pub separator: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PreviewResponse {
    #[schema(example = "Hello Sam | Bye Sam")]
    pub description: String,
}
