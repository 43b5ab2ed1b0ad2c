use crate::api::{device, schedule};
use crate::auth::password::verify_password;
use crate::config::Config;
use crate::fingerprint::{self, DeviceAttributes};
use crate::model::attendance::Attendance;
use crate::model::role::Role;
use crate::models::UserSql;
use crate::policy::{self, EntryClass, ExitClass};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct EntryReq {
    #[schema(example = "ana")]
    pub username: String,
    pub password: String,
    pub device: DeviceAttributes,
    /// Present when resubmitting after a late-arrival prompt. An empty
    /// string is accepted; absence means the employee has not been asked
    /// yet.
    #[schema(nullable = true)]
    pub late_reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ExitReq {
    #[schema(example = "ana")]
    pub username: String,
    pub password: String,
    pub device: DeviceAttributes,
}

/// Per-request kiosk authentication. Unknown name, wrong password and
/// deactivated account all collapse into the same generic message.
async fn authenticate(
    pool: &MySqlPool,
    username: &str,
    password: &str,
) -> Result<UserSql, HttpResponse> {
    let user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, name, username, password, role_id, is_active
        FROM users
        WHERE username = ? AND is_active = 1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            return Err(HttpResponse::Unauthorized().json(json!({
                "message": "Invalid credentials"
            })));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching kiosk user");
            return Err(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, please try again"
            })));
        }
    };

    if !verify_password(password, &user.password) {
        return Err(HttpResponse::Unauthorized().json(json!({
            "message": "Invalid credentials"
        })));
    }

    Ok(user)
}

/// Returns None when the device may check in. Only employee-role accounts
/// are gated; admins may clock from anywhere.
async fn gate_device(pool: &MySqlPool, user: &UserSql, attrs: &DeviceAttributes) -> Option<HttpResponse> {
    if Role::from_id(user.role_id) != Some(Role::Employee) {
        return None;
    }

    let fp = fingerprint::derive(attrs);
    if device::is_device_authorized(pool, &fp).await {
        return None;
    }

    let short = fingerprint::short_id(&fp);
    info!(user_id = user.id, device = %short, "Check-in refused: device not authorized");
    Some(HttpResponse::Forbidden().json(json!({
        "message": format!("This device ({}) is not authorized for check-ins. Ask an administrator to enroll it.", short),
        "device_id": short
    })))
}

async fn today_record(
    pool: &MySqlPool,
    user_id: u64,
    date: chrono::NaiveDate,
) -> Result<Option<Attendance>, HttpResponse> {
    sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, user_id, date, check_in, check_out, late_reason
        FROM attendance
        WHERE user_id = ? AND date = ?
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to load today's attendance");
        HttpResponse::InternalServerError().json(json!({
            "message": "Something went wrong, please try again"
        }))
    })
}

/// Record entry
#[utoipa::path(
    post,
    path = "/checkin/entry",
    request_body = EntryReq,
    responses(
        (status = 200, description = "Entry recorded", body = Object, example = json!({
            "message": "Good day Ana! Entry recorded at 09:02",
            "late": false
        })),
        (status = 400, description = "Entry already recorded or missing fields"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Device not authorized"),
        (status = 409, description = "Late arrival, reason required", body = Object, example = json!({
            "message": "Late arrival, please provide a reason",
            "late": true,
            "reason_required": true
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Checkin"
)]
pub async fn check_in(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<EntryReq>,
) -> actix_web::Result<impl Responder> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Please fill in every field"
        })));
    }

    let user = match authenticate(pool.get_ref(), payload.username.trim(), &payload.password).await
    {
        Ok(u) => u,
        Err(resp) => return Ok(resp),
    };

    if let Some(resp) = gate_device(pool.get_ref(), &user, &payload.device).await {
        return Ok(resp);
    }

    let now = chrono::Utc::now();
    let offset = config.local_offset_minutes;
    let today = policy::local_date(now, offset);
    let clock = policy::local_clock(now, offset);

    let existing = match today_record(pool.get_ref(), user.id, today).await {
        Ok(r) => r,
        Err(resp) => return Ok(resp),
    };

    if let Some(at) = existing.as_ref().and_then(|r| r.check_in) {
        let at = policy::local_clock(at, offset).format("%H:%M").to_string();
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("Entry already recorded today at {}", at)
        })));
    }

    let window = match schedule::effective_window(pool.get_ref(), user.id).await {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, user_id = user.id, "Failed to load schedule");
            return Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, please try again"
            })));
        }
    };

    let class = policy::classify_entry(clock, &window);

    // The reason capture is a UX pause, not a hard gate: the client must
    // ask once, but may resubmit with an empty reason.
    if class == EntryClass::Late && payload.late_reason.is_none() {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Late arrival, please provide a reason",
            "late": true,
            "reason_required": true
        })));
    }

    let late_reason = payload
        .late_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    // Single upsert keyed on (user_id, date): fills the entry only while it
    // is still NULL, so a concurrent duplicate loses cleanly. late_reason is
    // assigned first because MySQL evaluates the assignments in order.
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, check_in, late_reason)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            late_reason = IF(check_in IS NULL, VALUES(late_reason), late_reason),
            check_in = IF(check_in IS NULL, VALUES(check_in), check_in)
        "#,
    )
    .bind(user.id)
    .bind(today)
    .bind(now)
    .bind(late_reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = user.id, "Check-in failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Entry already recorded today"
        })));
    }

    info!(user_id = user.id, classification = %class, "Entry recorded");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Good day {}! Entry recorded at {}", user.name, clock.format("%H:%M")),
        "late": class == EntryClass::Late
    })))
}

/// Record exit
#[utoipa::path(
    post,
    path = "/checkin/exit",
    request_body = ExitReq,
    responses(
        (status = 200, description = "Exit recorded", body = Object, example = json!({
            "message": "See you tomorrow Ana! Exit recorded at 19:04",
            "early": false
        })),
        (status = 400, description = "No entry yet, or exit already recorded"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Device not authorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Checkin"
)]
pub async fn check_out(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<ExitReq>,
) -> actix_web::Result<impl Responder> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Please fill in every field"
        })));
    }

    let user = match authenticate(pool.get_ref(), payload.username.trim(), &payload.password).await
    {
        Ok(u) => u,
        Err(resp) => return Ok(resp),
    };

    if let Some(resp) = gate_device(pool.get_ref(), &user, &payload.device).await {
        return Ok(resp);
    }

    let now = chrono::Utc::now();
    let offset = config.local_offset_minutes;
    let today = policy::local_date(now, offset);
    let clock = policy::local_clock(now, offset);

    let record = match today_record(pool.get_ref(), user.id, today).await {
        Ok(r) => r,
        Err(resp) => return Ok(resp),
    };

    match &record {
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "You must record your entry before your exit"
            })));
        }
        Some(r) if r.check_in.is_none() => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "You must record your entry before your exit"
            })));
        }
        Some(r) => {
            if let Some(at) = r.check_out {
                let at = policy::local_clock(at, offset).format("%H:%M").to_string();
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": format!("Exit already recorded today at {}", at)
                })));
            }
        }
    }

    let window = match schedule::effective_window(pool.get_ref(), user.id).await {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, user_id = user.id, "Failed to load schedule");
            return Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, please try again"
            })));
        }
    };

    let class = policy::classify_exit(clock, &window);

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?
        WHERE user_id = ?
          AND date = ?
          AND check_in IS NOT NULL
          AND check_out IS NULL
        "#,
    )
    .bind(now)
    .bind(user.id)
    .bind(today)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = user.id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Exit already recorded today"
        })));
    }

    info!(user_id = user.id, classification = %class, "Exit recorded");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("See you tomorrow {}! Exit recorded at {}", user.name, clock.format("%H:%M")),
        "early": class == ExitClass::Early
    })))
}
