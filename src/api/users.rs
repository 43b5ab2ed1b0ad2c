use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::db_utils::{SqlValue, build_update_sql, execute_update};
use crate::utils::username_cache;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Columns a dashboard edit may touch. Password values are re-hashed before
/// they get here.
const UPDATABLE_COLUMNS: &[&str] = &["name", "username", "password", "role_id", "is_active"];

fn default_role() -> String {
    "employee".to_string()
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[schema(example = "Ana Martinez")]
    pub name: String,
    #[schema(example = "ana")]
    pub username: String,
    pub password: String,
    #[schema(example = "employee")]
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// "admin" or "employee"
    pub role: Option<String>,
    pub active: Option<bool>,
    /// Matches name or login name
    pub search: Option<String>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 12)]
    pub total: i64,
}

/// true  => login name AVAILABLE
/// false => login name TAKEN
async fn is_username_available(username: &str, pool: &MySqlPool) -> bool {
    let username = username.to_lowercase();

    // Fast positive from the warmed cache
    if username_cache::is_taken(&username).await {
        return false;
    }

    // Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(&username)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// Create account
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "Account created", body = Object, example = json!({
            "message": "Account created"
        })),
        (status = 400, description = "Missing fields or unknown role"),
        (status = 409, description = "Login name already taken"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUserReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = payload.name.trim();
    let username = payload.username.trim().to_lowercase();

    if name.is_empty() || username.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Name, login name and password must not be empty"
        })));
    }

    let role = match Role::from_str(&payload.role.to_lowercase()) {
        Ok(r) => r,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "error": "Role must be \"admin\" or \"employee\""
            })));
        }
    };

    if !is_username_available(&username, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": "Login name already taken"
        })));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query(
        "INSERT INTO users (name, username, password, role_id) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(&username)
    .bind(&hashed)
    .bind(role.id())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            username_cache::mark_taken(&username).await;
            Ok(HttpResponse::Created().json(json!({
                "message": "Account created"
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "error": "Login name already taken"
                    })));
                }
            }

            error!(error = %e, "Failed to create account");
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create account"
            })))
        }
    }
}

/// List accounts
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated account list", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    if let Some(role) = query.role.as_deref() {
        let role = Role::from_str(&role.to_lowercase()).map_err(|_| {
            actix_web::error::ErrorBadRequest("Role must be \"admin\" or \"employee\"")
        })?;
        conditions.push("role_id = ?");
        bindings.push(SqlValue::I64(role.id() as i64));
    }

    if let Some(active) = query.active {
        conditions.push("is_active = ?");
        bindings.push(SqlValue::Bool(active));
    }

    if let Some(search) = &query.search {
        conditions.push("(name LIKE ? OR username LIKE ?)");
        let like = format!("%{}%", search);
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like));
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    debug!(sql = %count_sql, "Counting accounts");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            SqlValue::String(v) => count_query.bind(v.clone()),
            SqlValue::I64(v) => count_query.bind(*v),
            SqlValue::Bool(v) => count_query.bind(*v),
            _ => count_query,
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count accounts");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT id, name, username, role_id, is_active FROM users {} ORDER BY name LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching accounts");

    let mut data_query = sqlx::query_as::<_, User>(&data_sql);
    for b in bindings {
        data_query = match b {
            SqlValue::String(v) => data_query.bind(v),
            SqlValue::I64(v) => data_query.bind(v),
            SqlValue::Bool(v) => data_query.bind(v),
            _ => data_query,
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let users = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch accounts");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Get account by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = User),
        (status = 404, description = "Account not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, username, role_id, is_active FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch account");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match user {
        Some(u) => Ok(HttpResponse::Ok().json(u)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Account not found"
        }))),
    }
}

/// Update account
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "Account ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Account updated"),
        (status = 400, description = "Unknown field or empty payload"),
        (status = 404, description = "Account not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let mut payload = body.into_inner();

    // A blank password in the edit form means "keep the current one".
    if let Some(obj) = payload.as_object_mut() {
        match obj.get("password").and_then(|v| v.as_str()) {
            Some("") => {
                obj.remove("password");
            }
            Some(pw) => {
                let hashed = hash_password(pw).map_err(|e| {
                    error!(error = %e, "Password hashing failed");
                    ErrorInternalServerError("Internal Server Error")
                })?;
                obj.insert("password".to_string(), Value::String(hashed));
            }
            None => {}
        }
    }

    let update = build_update_sql("users", &payload, UPDATABLE_COLUMNS, "id", user_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Account not found"));
    }

    if let Some(username) = payload.get("username").and_then(|v| v.as_str()) {
        username_cache::mark_taken(username).await;
    }

    Ok(HttpResponse::Ok().body("Account updated"))
}

/// Deactivate account
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account deactivated"),
        (status = 400, description = "Cannot deactivate own account"),
        (status = 404, description = "Account not found or already inactive"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn deactivate_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    if user_id == auth.user_id {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "You cannot deactivate your own account"
        })));
    }

    // Accounts are never hard-deleted; attendance history keeps pointing at
    // them.
    let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to deactivate account");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Account not found or already inactive"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Account deactivated"
    })))
}
