use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An enrolled browser/device combination. Authorization is granted by
/// inserting or reactivating a row, revoked by deactivating it.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AuthorizedDevice {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "3f6c1a09be7d4e21a8f0c5d2e9b74631a2c8f05d6e9b13472c5a8d0e1f6b3947")]
    pub fingerprint: String,
    #[schema(example = "Front desk PC")]
    pub label: String,
    pub user_agent: String,
    #[schema(example = "1920x1080x24")]
    pub screen: String,
    #[schema(example = "America/Mexico_City")]
    pub timezone: String,
    #[schema(example = "es-MX")]
    pub language: String,
    #[schema(example = "Linux x86_64")]
    pub platform: String,
    #[schema(example = 8)]
    pub hardware_concurrency: u32,
    #[schema(example = json!(8.0), nullable = true)]
    pub device_memory: Option<f64>,
    #[schema(example = 24)]
    pub color_depth: u32,
    #[schema(example = json!(1.0))]
    pub pixel_ratio: f64,
    #[schema(example = true)]
    pub is_active: bool,
    #[schema(example = "2025-03-10T15:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
