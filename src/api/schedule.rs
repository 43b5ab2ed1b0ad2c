use crate::auth::auth::AuthUser;
use crate::model::schedule::Schedule;
use crate::policy::ScheduleWindow;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateScheduleReq {
    #[schema(example = 3)]
    pub user_id: u64,
    /// 24-hour "HH:MM"
    #[schema(example = "08:00")]
    pub entry_time: String,
    #[schema(example = "17:00")]
    pub exit_time: String,
    #[schema(example = 10)]
    pub grace_minutes: u32,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ScheduleQuery {
    pub user_id: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct ScheduleResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = "Ana Martinez")]
    pub name: String,
    #[schema(example = "08:00:00", value_type = String)]
    pub entry_time: NaiveTime,
    #[schema(example = "17:00:00", value_type = String)]
    pub exit_time: NaiveTime,
    #[schema(example = 10)]
    pub grace_minutes: u32,
}

fn parse_clock(field: &str, value: &str) -> Result<NaiveTime, HttpResponse> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        HttpResponse::BadRequest().json(json!({
            "message": format!("{} must be HH:MM (24-hour)", field)
        }))
    })
}

/// The window the evaluator uses for an employee: the active schedule row,
/// or the shop default when none is configured.
pub(crate) async fn effective_window(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<ScheduleWindow, sqlx::Error> {
    let schedule = sqlx::query_as::<_, Schedule>(
        r#"
        SELECT id, user_id, entry_time, exit_time, grace_minutes, is_active
        FROM schedules
        WHERE user_id = ? AND is_active = 1
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(schedule
        .map(|s| s.window())
        .unwrap_or_default())
}

/// Create schedule
#[utoipa::path(
    post,
    path = "/api/v1/schedules",
    request_body = CreateScheduleReq,
    responses(
        (status = 201, description = "Schedule created; the previous active one is deactivated"),
        (status = 400, description = "Bad time format"),
        (status = 404, description = "Account not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn create_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateScheduleReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let entry_time = match parse_clock("entry_time", &payload.entry_time) {
        Ok(t) => t,
        Err(resp) => return Ok(resp),
    };
    let exit_time = match parse_clock("exit_time", &payload.exit_time) {
        Ok(t) => t,
        Err(resp) => return Ok(resp),
    };

    let owner_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? LIMIT 1)",
    )
    .bind(payload.user_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to check schedule owner");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if !owner_exists {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Account not found"
        })));
    }

    // One active schedule per employee: retire the old row and insert the
    // new one atomically.
    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query("UPDATE schedules SET is_active = 0 WHERE user_id = ? AND is_active = 1")
        .bind(payload.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to retire previous schedule");
            ErrorInternalServerError("Internal Server Error")
        })?;

    sqlx::query(
        r#"
        INSERT INTO schedules (user_id, entry_time, exit_time, grace_minutes, is_active)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(payload.user_id)
    .bind(entry_time)
    .bind(exit_time)
    .bind(payload.grace_minutes)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert schedule");
        ErrorInternalServerError("Internal Server Error")
    })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit schedule");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Schedule created"
    })))
}

/// List active schedules
#[utoipa::path(
    get,
    path = "/api/v1/schedules",
    params(ScheduleQuery),
    responses(
        (status = 200, description = "Active schedules with their owners", body = [ScheduleResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn list_schedules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ScheduleQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let base = r#"
        SELECT s.id, s.user_id, u.name, s.entry_time, s.exit_time, s.grace_minutes
        FROM schedules s
        JOIN users u ON u.id = s.user_id
        WHERE s.is_active = 1
    "#;

    let schedules = if let Some(user_id) = query.user_id {
        sqlx::query_as::<_, ScheduleResponse>(&format!("{} AND s.user_id = ? ORDER BY u.name", base))
            .bind(user_id)
            .fetch_all(pool.get_ref())
            .await
    } else {
        sqlx::query_as::<_, ScheduleResponse>(&format!("{} ORDER BY u.name", base))
            .fetch_all(pool.get_ref())
            .await
    }
    .map_err(|e| {
        error!(error = %e, "Failed to list schedules");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(schedules))
}

/// Deactivate schedule
#[utoipa::path(
    put,
    path = "/api/v1/schedules/{id}/deactivate",
    params(("id", Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Deactivated; the default window applies again"),
        (status = 404, description = "Schedule not found or already inactive"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedules"
)]
pub async fn deactivate_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let schedule_id = path.into_inner();

    let result = sqlx::query("UPDATE schedules SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(schedule_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, schedule_id, "Failed to deactivate schedule");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Schedule not found or already inactive"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Schedule deactivated"
    })))
}
