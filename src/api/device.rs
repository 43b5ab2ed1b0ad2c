use crate::auth::auth::AuthUser;
use crate::fingerprint::{self, DeviceAttributes};
use crate::model::device::AuthorizedDevice;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct AuthorizeDeviceReq {
    /// Optional human label; generated from the platform when absent.
    #[schema(example = "Front desk PC", nullable = true)]
    pub label: Option<String>,
    pub device: DeviceAttributes,
}

#[derive(Deserialize, ToSchema)]
pub struct RevokeDevicesReq {
    /// Fingerprint to revoke. When absent, `all` must be set and every
    /// active device is deactivated.
    #[schema(nullable = true)]
    pub fingerprint: Option<String>,
    /// Explicit confirmation for mass revocation.
    #[serde(default)]
    pub all: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct RenameDeviceReq {
    #[schema(example = "Reception tablet")]
    pub label: String,
}

/// Decides the gate outcome when no active row matched the fingerprint.
///
/// `enrolled_count` counts every device row, revoked ones included, and is
/// None when the count query itself failed. A clean no-match only passes
/// while nothing has ever been enrolled (first-run bootstrap); revoked rows
/// keep the gate closed. A failed lookup additionally degrades open when
/// the count query fails too (store outage).
fn bootstrap_allowance(lookup_failed: bool, enrolled_count: Option<i64>) -> bool {
    match (lookup_failed, enrolled_count) {
        (_, Some(0)) => true,
        (true, None) => true,
        (true, Some(_)) => false,
        (false, _) => false,
    }
}

/// Gate for non-administrative check-ins. Admin accounts are exempt at the
/// call site; this only answers "may this fingerprint clock in".
pub(crate) async fn is_device_authorized(pool: &MySqlPool, fp: &str) -> bool {
    let lookup = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM authorized_devices WHERE fingerprint = ? AND is_active = 1",
    )
    .bind(fp)
    .fetch_one(pool)
    .await;

    let lookup_failed = match lookup {
        Ok(n) if n > 0 => return true,
        Ok(_) => false,
        Err(e) => {
            error!(error = %e, "Authorized-device lookup failed");
            true
        }
    };

    let enrolled_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authorized_devices")
        .fetch_one(pool)
        .await
        .ok();

    let allowed = bootstrap_allowance(lookup_failed, enrolled_count);
    if allowed {
        warn!(
            device = %fingerprint::short_id(fp),
            lookup_failed,
            "Device gate passed by bootstrap/fail-open fallback"
        );
    }
    allowed
}

/// Authorize a device
#[utoipa::path(
    post,
    path = "/api/v1/devices",
    request_body = AuthorizeDeviceReq,
    responses(
        (status = 200, description = "Device authorized", body = Object, example = json!({
            "device_id": "3f6c1a09be7d4e21a8f0c5d2e9b74631a2c8f05d6e9b13472c5a8d0e1f6b3947",
            "label": "Front desk PC"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Devices"
)]
pub async fn authorize_device(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AuthorizeDeviceReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let fp = fingerprint::derive(&payload.device);
    let label = payload
        .label
        .clone()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| format!("{} device", payload.device.platform));

    // Re-authorizing a known device is a no-op; a previously revoked row is
    // reactivated in place. Other devices stay authorized.
    sqlx::query(
        r#"
        INSERT INTO authorized_devices
        (fingerprint, label, user_agent, screen, timezone, language, platform,
         hardware_concurrency, device_memory, color_depth, pixel_ratio, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
        ON DUPLICATE KEY UPDATE is_active = 1
        "#,
    )
    .bind(&fp)
    .bind(&label)
    .bind(&payload.device.user_agent)
    .bind(&payload.device.screen)
    .bind(&payload.device.timezone)
    .bind(&payload.device.language)
    .bind(&payload.device.platform)
    .bind(payload.device.hardware_concurrency)
    .bind(payload.device.device_memory)
    .bind(payload.device.color_depth)
    .bind(payload.device.pixel_ratio)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to authorize device");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let stored_label = sqlx::query_scalar::<_, String>(
        "SELECT label FROM authorized_devices WHERE fingerprint = ?",
    )
    .bind(&fp)
    .fetch_one(pool.get_ref())
    .await
    .unwrap_or(label);

    Ok(HttpResponse::Ok().json(json!({
        "device_id": fp,
        "label": stored_label
    })))
}

/// List authorized devices
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    responses(
        (status = 200, description = "Active devices, newest first", body = [AuthorizedDevice]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Devices"
)]
pub async fn list_devices(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let devices = sqlx::query_as::<_, AuthorizedDevice>(
        r#"
        SELECT id, fingerprint, label, user_agent, screen, timezone, language,
               platform, hardware_concurrency, device_memory, color_depth,
               pixel_ratio, is_active, created_at
        FROM authorized_devices
        WHERE is_active = 1
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list devices");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(devices))
}

/// Revoke device authorization
#[utoipa::path(
    post,
    path = "/api/v1/devices/revoke",
    request_body = RevokeDevicesReq,
    responses(
        (status = 200, description = "Revoked", body = Object, example = json!({"revoked": 1})),
        (status = 400, description = "Mass revocation not confirmed"),
        (status = 404, description = "Device not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Devices"
)]
pub async fn revoke_devices(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RevokeDevicesReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if let Some(fp) = &payload.fingerprint {
        let result =
            sqlx::query("UPDATE authorized_devices SET is_active = 0 WHERE fingerprint = ?")
                .bind(fp)
                .execute(pool.get_ref())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to revoke device");
                    actix_web::error::ErrorInternalServerError("Internal Server Error")
                })?;

        if result.rows_affected() == 0 {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Device not found"
            })));
        }

        return Ok(HttpResponse::Ok().json(json!({ "revoked": 1 })));
    }

    if !payload.all {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Revoking every device requires \"all\": true"
        })));
    }

    let result = sqlx::query("UPDATE authorized_devices SET is_active = 0 WHERE is_active = 1")
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to revoke all devices");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    warn!(
        revoked = result.rows_affected(),
        admin = %auth.username,
        "All device authorizations revoked"
    );

    Ok(HttpResponse::Ok().json(json!({ "revoked": result.rows_affected() })))
}

/// Rename a device
#[utoipa::path(
    put,
    path = "/api/v1/devices/{fingerprint}",
    params(("fingerprint", Path, description = "Device fingerprint")),
    request_body = RenameDeviceReq,
    responses(
        (status = 200, description = "Renamed"),
        (status = 400, description = "Empty label"),
        (status = 404, description = "Device not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Devices"
)]
pub async fn rename_device(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<RenameDeviceReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let fp = path.into_inner();
    let label = payload.label.trim();

    if label.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Label must not be empty"
        })));
    }

    let result = sqlx::query("UPDATE authorized_devices SET label = ? WHERE fingerprint = ?")
        .bind(label)
        .bind(&fp)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to rename device");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Device not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Device renamed" })))
}

/// Delete a device permanently
#[utoipa::path(
    delete,
    path = "/api/v1/devices/{fingerprint}",
    params(("fingerprint", Path, description = "Device fingerprint")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Device not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Devices"
)]
pub async fn delete_device(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let fp = path.into_inner();

    let result = sqlx::query("DELETE FROM authorized_devices WHERE fingerprint = ?")
        .bind(&fp)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to delete device");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Device not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Device deleted" })))
}

#[cfg(test)]
mod tests {
    use super::bootstrap_allowance;

    #[test]
    fn empty_table_permits_any_device() {
        // first-run bootstrap: nothing enrolled yet
        assert!(bootstrap_allowance(false, Some(0)));
        assert!(bootstrap_allowance(true, Some(0)));
    }

    #[test]
    fn enrolled_devices_close_the_gate_for_strangers() {
        assert!(!bootstrap_allowance(false, Some(3)));
        assert!(!bootstrap_allowance(true, Some(3)));
    }

    #[test]
    fn mass_revocation_does_not_reopen_the_gate() {
        // rows still exist after revoking everything; only a never-populated
        // table bootstraps
        assert!(!bootstrap_allowance(false, Some(2)));
    }

    #[test]
    fn store_outage_degrades_open_only_after_a_failed_lookup() {
        assert!(bootstrap_allowance(true, None));
        // clean no-match plus a failed count stays closed
        assert!(!bootstrap_allowance(false, None));
    }
}
