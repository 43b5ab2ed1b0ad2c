use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// SQL bindable value enum
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

impl SqlValue {
    /// Maps a JSON payload value onto a bindable SQL value. ISO date and
    /// datetime strings become typed values so MySQL compares them natively.
    pub fn from_json(value: &Value) -> Result<Self, actix_web::Error> {
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    Ok(SqlValue::Date(d))
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    Ok(SqlValue::DateTime(dt))
                } else {
                    Ok(SqlValue::String(s.clone()))
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SqlValue::I64(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(SqlValue::F64(f))
                } else {
                    Err(ErrorBadRequest("Unsupported numeric value"))
                }
            }
            Value::Bool(b) => Ok(SqlValue::Bool(*b)),
            Value::Null => Ok(SqlValue::Null),
            _ => Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }
}

/// SQL update container
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Builds a dynamic UPDATE from a JSON payload. Only columns named in
/// `allowed` may appear; anything else is rejected before it reaches SQL.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ErrorBadRequest(format!("Unknown field: {}", key)));
        }
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(obj.len() + 1);
    for value in obj.values() {
        values.push(SqlValue::from_json(value)?);
    }

    // WHERE id = ?
    values.push(SqlValue::I64(id_value as i64));

    Ok(SqlUpdate { sql, values })
}

/// Execute the update
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = bind_value(query, value);
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Chains one SqlValue onto a runtime-built query.
fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    value: SqlValue,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    match value {
        SqlValue::String(v) => query.bind(v),
        SqlValue::I64(v) => query.bind(v),
        SqlValue::F64(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Date(v) => query.bind(v),
        SqlValue::DateTime(v) => query.bind(v),
        SqlValue::Null => query.bind(None::<String>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[&str] = &["name", "username", "is_active"];

    #[test]
    fn builds_update_with_placeholder_per_field() {
        let payload = json!({"name": "Ana", "is_active": false});
        let update = build_update_sql("users", &payload, ALLOWED, "id", 7).unwrap();
        assert!(update.sql.starts_with("UPDATE users SET "));
        assert!(update.sql.ends_with(" WHERE id = ?"));
        assert!(update.sql.contains("name = ?"));
        assert!(update.sql.contains("is_active = ?"));
        assert_eq!(update.values.len(), 3);
    }

    #[test]
    fn rejects_columns_outside_the_allow_list() {
        let payload = json!({"role_id": 1});
        assert!(build_update_sql("users", &payload, ALLOWED, "id", 7).is_err());
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(build_update_sql("users", &json!({}), ALLOWED, "id", 7).is_err());
    }

    #[test]
    fn iso_dates_become_typed_values() {
        match SqlValue::from_json(&json!("2025-03-10")).unwrap() {
            SqlValue::Date(d) => assert_eq!(d.to_string(), "2025-03-10"),
            other => panic!("expected date, got {:?}", other),
        }
    }
}
