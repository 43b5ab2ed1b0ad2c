use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Carolina Nieto")]
    pub name: String,
    #[schema(example = "carolina")]
    pub username: String,
    #[schema(example = 2)]
    pub role_id: u8,
    #[schema(example = true)]
    pub is_active: bool,
}
