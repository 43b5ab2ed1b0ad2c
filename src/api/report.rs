use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::schedule::Schedule;
use crate::policy::{self, ScheduleWindow};
use crate::utils::db_utils::SqlValue;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ReportQuery {
    /// Defaults to 30 days before `to`
    pub from: Option<NaiveDate>,
    /// Defaults to today in the shop's zone
    pub to: Option<NaiveDate>,
    pub user_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(sqlx::FromRow)]
struct AttendanceJoinRow {
    id: u64,
    user_id: u64,
    name: String,
    date: NaiveDate,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    late_reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReportRow {
    #[schema(example = 41)]
    pub id: u64,
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = "Ana Martinez")]
    pub name: String,
    #[schema(example = "2025-03-10", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Local wall clock, "HH:MM"
    #[schema(example = "09:02", nullable = true)]
    pub check_in: Option<String>,
    #[schema(example = "19:04", nullable = true)]
    pub check_out: Option<String>,
    pub late: bool,
    pub early: bool,
    #[schema(nullable = true)]
    pub late_reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReportResponse {
    pub data: Vec<AttendanceReportRow>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeSummary {
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = "Ana Martinez")]
    pub name: String,
    /// Days with any attendance activity
    #[schema(example = 21)]
    pub days: u32,
    #[schema(example = 2)]
    pub late: u32,
    #[schema(example = 1)]
    pub early: u32,
    /// Days with both entry and exit recorded
    #[schema(example = 20)]
    pub complete: u32,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    pub data: Vec<EmployeeSummary>,
    #[schema(example = "2025-02-08", value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(example = "2025-03-10", value_type = String, format = "date")]
    pub to: NaiveDate,
}

fn range(query: &ReportQuery, offset_minutes: i32) -> (NaiveDate, NaiveDate) {
    let to = query
        .to
        .unwrap_or_else(|| policy::local_date(Utc::now(), offset_minutes));
    let from = query.from.unwrap_or(to - Duration::days(30));
    (from, to)
}

/// Active schedules keyed by owner, for classifying fetched rows without a
/// per-row query.
async fn window_map(pool: &MySqlPool) -> Result<HashMap<u64, ScheduleWindow>, sqlx::Error> {
    let schedules = sqlx::query_as::<_, Schedule>(
        r#"
        SELECT id, user_id, entry_time, exit_time, grace_minutes, is_active
        FROM schedules
        WHERE is_active = 1
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(schedules
        .into_iter()
        .map(|s| (s.user_id, s.window()))
        .collect())
}

fn classify_row(
    row: &AttendanceJoinRow,
    windows: &HashMap<u64, ScheduleWindow>,
    offset_minutes: i32,
) -> AttendanceReportRow {
    let window = windows.get(&row.user_id).cloned().unwrap_or_default();

    let check_in_clock = row.check_in.map(|t| policy::local_clock(t, offset_minutes));
    let check_out_clock = row.check_out.map(|t| policy::local_clock(t, offset_minutes));

    AttendanceReportRow {
        id: row.id,
        user_id: row.user_id,
        name: row.name.clone(),
        date: row.date,
        check_in: check_in_clock.map(|t| t.format("%H:%M").to_string()),
        check_out: check_out_clock.map(|t| t.format("%H:%M").to_string()),
        late: check_in_clock
            .map(|t| policy::is_late_entry(t, window.entry, window.grace_minutes))
            .unwrap_or(false),
        early: check_out_clock
            .map(|t| policy::is_early_exit(t, window.exit))
            .unwrap_or(false),
        late_reason: row.late_reason.clone(),
    }
}

async fn fetch_rows(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
    user_id: Option<u64>,
    limit_offset: Option<(u32, u32)>,
) -> Result<Vec<AttendanceJoinRow>, sqlx::Error> {
    let mut conditions = vec!["a.date >= ?", "a.date <= ?"];
    let mut bindings = vec![SqlValue::Date(from), SqlValue::Date(to)];

    if let Some(user_id) = user_id {
        conditions.push("a.user_id = ?");
        bindings.push(SqlValue::I64(user_id as i64));
    }

    let mut sql = format!(
        "SELECT a.id, a.user_id, u.name, a.date, a.check_in, a.check_out, a.late_reason \
         FROM attendance a \
         JOIN users u ON u.id = a.user_id \
         WHERE {} \
         ORDER BY a.date DESC, u.name",
        conditions.join(" AND ")
    );
    if limit_offset.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
    }

    debug!(sql = %sql, "Fetching attendance rows");

    let mut query = sqlx::query_as::<_, AttendanceJoinRow>(&sql);
    for b in bindings {
        query = match b {
            SqlValue::Date(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            _ => query,
        };
    }
    if let Some((per_page, offset)) = limit_offset {
        query = query.bind(per_page as i64).bind(offset as i64);
    }

    query.fetch_all(pool).await
}

/// Attendance report
#[utoipa::path(
    get,
    path = "/api/v1/reports/attendance",
    params(ReportQuery),
    responses(
        (status = 200, description = "Classified attendance rows", body = AttendanceReportResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn attendance_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let offset_minutes = config.local_offset_minutes;
    let (from, to) = range(&query, offset_minutes);

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut count_sql =
        "SELECT COUNT(*) FROM attendance a WHERE a.date >= ? AND a.date <= ?".to_string();
    if query.user_id.is_some() {
        count_sql.push_str(" AND a.user_id = ?");
    }

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind(from)
        .bind(to);
    if let Some(user_id) = query.user_id {
        count_query = count_query.bind(user_id);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count attendance rows");
        ErrorInternalServerError("Database error")
    })?;

    let rows = fetch_rows(
        pool.get_ref(),
        from,
        to,
        query.user_id,
        Some((per_page, offset)),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance rows");
        ErrorInternalServerError("Database error")
    })?;

    let windows = window_map(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch schedules");
        ErrorInternalServerError("Database error")
    })?;

    let data = rows
        .iter()
        .map(|r| classify_row(r, &windows, offset_minutes))
        .collect();

    Ok(HttpResponse::Ok().json(AttendanceReportResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Per-employee summary
#[utoipa::path(
    get,
    path = "/api/v1/reports/summary",
    params(ReportQuery),
    responses(
        (status = 200, description = "Aggregate counts per employee over the range", body = SummaryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let offset_minutes = config.local_offset_minutes;
    let (from, to) = range(&query, offset_minutes);

    let rows = fetch_rows(pool.get_ref(), from, to, query.user_id, None)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance rows");
            ErrorInternalServerError("Database error")
        })?;

    let windows = window_map(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch schedules");
        ErrorInternalServerError("Database error")
    })?;

    let mut by_employee: HashMap<u64, EmployeeSummary> = HashMap::new();

    for row in &rows {
        let classified = classify_row(row, &windows, offset_minutes);
        let entry = by_employee
            .entry(row.user_id)
            .or_insert_with(|| EmployeeSummary {
                user_id: row.user_id,
                name: row.name.clone(),
                days: 0,
                late: 0,
                early: 0,
                complete: 0,
            });

        entry.days += 1;
        if classified.late {
            entry.late += 1;
        }
        if classified.early {
            entry.early += 1;
        }
        if row.check_in.is_some() && row.check_out.is_some() {
            entry.complete += 1;
        }
    }

    let mut data: Vec<EmployeeSummary> = by_employee.into_values().collect();
    data.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(HttpResponse::Ok().json(SummaryResponse { data, from, to }))
}
