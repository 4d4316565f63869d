//! The aggregation procedures the hosted backend exposes over RPC,
//! implemented in SQL for the embedded backend.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};
use tracing::debug;

use crate::core::query::key::{Report, Timeframe};
use crate::error::{DatabaseError, HerdbookError, Result};

/// Dispatch a named procedure with the hosted backend's parameter names.
///
/// Every procedure only sees farms owned by `caller`; without a farm id it
/// aggregates across all of them.
pub fn call(conn: &Connection, procedure: &str, params: &Value, caller: Option<&str>) -> Result<Value> {
    let farm_id = params.get("farm_id_param").and_then(Value::as_str);
    debug!("Procedure {} (farm {:?}, caller {:?})", procedure, farm_id, caller);

    let report = [
        Report::LivestockByCategory,
        Report::FinancialSummary,
        Report::HealthStatistics,
        Report::BreedingStatistics,
    ]
    .into_iter()
    .find(|report| report.procedure_name() == procedure)
    .ok_or_else(|| DatabaseError::UnknownProcedure(procedure.to_string()))?;

    match report {
        Report::LivestockByCategory => livestock_by_category(conn, caller, farm_id),
        Report::FinancialSummary => {
            let timeframe = match params.get("timeframe_param").and_then(Value::as_str) {
                Some(raw) => raw.parse::<Timeframe>().map_err(HerdbookError::Validation)?,
                None => Timeframe::default(),
            };
            financial_summary(conn, caller, farm_id, timeframe)
        }
        Report::HealthStatistics => health_statistics(conn, caller, farm_id),
        Report::BreedingStatistics => breeding_statistics(conn, caller, farm_id),
    }
}

/// Active animals per category; uncategorised ones count as "Uncategorized".
pub fn livestock_by_category(conn: &Connection, caller: Option<&str>, farm_id: Option<&str>) -> Result<Value> {
    let mut stmt = conn.prepare(
        r#"
        SELECT COALESCE(c.name, 'Uncategorized') AS category, COUNT(*) AS count
        FROM animals a
        LEFT JOIN animal_categories c ON c.id = a.category_id
        WHERE a.status = 'Active'
          AND (?1 IS NULL OR a.farm_id = ?1)
          AND a.farm_id IN (SELECT id FROM farms WHERE user_id = ?2)
        GROUP BY category
        ORDER BY count DESC, category ASC
        "#,
    )?;
    let rows = stmt
        .query_map(params![farm_id, caller], |row| {
            Ok(json!({
                "category": row.get::<_, String>(0)?,
                "count": row.get::<_, i64>(1)?,
            }))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Value::Array(rows))
}

fn period_format(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::Daily => "%Y-%m-%d",
        Timeframe::Weekly => "%Y-W%W",
        Timeframe::Monthly => "%Y-%m",
        Timeframe::Yearly => "%Y",
    }
}

/// Income, expenses and profit per period, oldest period first.
pub fn financial_summary(
    conn: &Connection,
    caller: Option<&str>,
    farm_id: Option<&str>,
    timeframe: Timeframe,
) -> Result<Value> {
    let mut stmt = conn.prepare(
        r#"
        SELECT strftime(?2, transaction_date) AS period,
               COALESCE(SUM(CASE WHEN transaction_type = 'Income' THEN amount END), 0) AS income,
               COALESCE(SUM(CASE WHEN transaction_type = 'Expense' THEN amount END), 0) AS expenses
        FROM financial_records
        WHERE (?1 IS NULL OR farm_id = ?1)
          AND farm_id IN (SELECT id FROM farms WHERE user_id = ?3)
        GROUP BY period
        ORDER BY period ASC
        "#,
    )?;
    let rows = stmt
        .query_map(params![farm_id, period_format(timeframe), caller], |row| {
            let income: f64 = row.get(1)?;
            let expenses: f64 = row.get(2)?;
            Ok(json!({
                "period": row.get::<_, Option<String>>(0)?,
                "income": income,
                "expenses": expenses,
                "profit": income - expenses,
            }))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Value::Array(rows))
}

/// Count and total cost of health records per record type.
pub fn health_statistics(conn: &Connection, caller: Option<&str>, farm_id: Option<&str>) -> Result<Value> {
    let mut stmt = conn.prepare(
        r#"
        SELECT h.record_type, COUNT(*) AS count, COALESCE(SUM(h.cost), 0) AS total_cost
        FROM health_records h
        JOIN animals a ON a.id = h.animal_id
        WHERE (?1 IS NULL OR a.farm_id = ?1)
          AND a.farm_id IN (SELECT id FROM farms WHERE user_id = ?2)
        GROUP BY h.record_type
        ORDER BY count DESC, h.record_type ASC
        "#,
    )?;
    let rows = stmt
        .query_map(params![farm_id, caller], |row| {
            Ok(json!({
                "record_type": row.get::<_, String>(0)?,
                "count": row.get::<_, i64>(1)?,
                "total_cost": row.get::<_, f64>(2)?,
            }))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Value::Array(rows))
}

/// Success rate over records with a known outcome, total offspring, and mean
/// days from breeding to actual delivery.
pub fn breeding_statistics(conn: &Connection, caller: Option<&str>, farm_id: Option<&str>) -> Result<Value> {
    let stats = conn
        .query_row(
            r#"
            SELECT COUNT(b.success) AS known,
                   COALESCE(SUM(b.success), 0) AS succeeded,
                   COALESCE(SUM(b.offspring_count), 0) AS offspring,
                   AVG(julianday(b.actual_delivery_date) - julianday(b.breeding_date)) AS gestation
            FROM breeding_records b
            JOIN animals a ON a.id = b.female_id
            WHERE (?1 IS NULL OR a.farm_id = ?1)
              AND a.farm_id IN (SELECT id FROM farms WHERE user_id = ?2)
            "#,
            params![farm_id, caller],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            },
        )
        .optional()?;

    let (known, succeeded, offspring, gestation) = stats.unwrap_or((0, 0, 0, None));
    let success_rate = if known > 0 {
        succeeded as f64 * 100.0 / known as f64
    } else {
        0.0
    };

    Ok(json!({
        "success_rate": success_rate,
        "total_offspring": offspring,
        "avg_gestation": gestation.unwrap_or(0.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::database::migrate;

    fn seeded() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        migrate(&mut conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO farms (id, user_id, name, created_at, updated_at)
                VALUES ('F1', 'U1', 'North', 'now', 'now'), ('F2', 'U1', 'South', 'now', 'now'),
                       ('F3', 'U2', 'Next Door', 'now', 'now');
            INSERT INTO animal_categories (id, name, created_at, updated_at)
                VALUES ('C1', 'Goats', 'now', 'now');
            INSERT INTO animals (id, farm_id, category_id, tag_id, breed, gender, status, created_at, updated_at) VALUES
                ('A1', 'F1', 'C1', 'G-1', 'Boer', 'Female', 'Active', 'now', 'now'),
                ('A2', 'F1', 'C1', 'G-2', 'Boer', 'Male', 'Active', 'now', 'now'),
                ('A3', 'F1', NULL, 'X-1', 'Mixed', 'Female', 'Active', 'now', 'now'),
                ('A4', 'F1', 'C1', 'G-3', 'Boer', 'Female', 'Sold', 'now', 'now'),
                ('A5', 'F2', 'C1', 'G-1', 'Boer', 'Female', 'Active', 'now', 'now'),
                ('A6', 'F3', NULL, 'N-1', 'Angus', 'Female', 'Active', 'now', 'now');
            INSERT INTO financial_records (id, farm_id, transaction_date, transaction_type, category, amount, created_at, updated_at) VALUES
                ('R1', 'F1', '2026-03-02', 'Income', 'Sales', 1200, 'now', 'now'),
                ('R2', 'F1', '2026-03-20', 'Expense', 'Feed', 200.5, 'now', 'now'),
                ('R3', 'F1', '2026-04-01', 'Expense', 'Vet', 50, 'now', 'now'),
                ('R4', 'F2', '2026-03-05', 'Income', 'Sales', 999, 'now', 'now'),
                ('R5', 'F3', '2026-03-07', 'Income', 'Sales', 5000, 'now', 'now');
            INSERT INTO health_records (id, animal_id, record_date, record_type, description, cost, created_at, updated_at) VALUES
                ('H1', 'A1', '2026-03-01', 'Vaccination', 'CDT', 12.5, 'now', 'now'),
                ('H2', 'A2', '2026-03-01', 'Vaccination', 'CDT', 12.5, 'now', 'now'),
                ('H3', 'A1', '2026-03-09', 'Checkup', 'Hooves', NULL, 'now', 'now'),
                ('H4', 'A6', '2026-03-09', 'Treatment', 'Foot rot', 40, 'now', 'now');
            INSERT INTO breeding_records (id, female_id, male_id, breeding_date, breeding_type, actual_delivery_date, success, offspring_count, created_at, updated_at) VALUES
                ('B1', 'A1', 'A2', '2025-10-01', 'Natural', '2026-02-28', 1, 2, 'now', 'now'),
                ('B2', 'A3', 'A2', '2025-10-01', 'Natural', NULL, 0, 0, 'now', 'now'),
                ('B3', 'A1', 'A2', '2026-03-01', 'Natural', NULL, NULL, NULL, 'now', 'now');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_livestock_by_category_counts_active_only() {
        let conn = seeded();
        let rows = livestock_by_category(&conn, Some("U1"), Some("F1")).unwrap();
        assert_eq!(
            rows,
            json!([
                {"category": "Goats", "count": 2},
                {"category": "Uncategorized", "count": 1},
            ])
        );
    }

    #[test]
    fn test_financial_summary_by_month() {
        let conn = seeded();
        let rows = financial_summary(&conn, Some("U1"), Some("F1"), Timeframe::Monthly).unwrap();
        assert_eq!(
            rows,
            json!([
                {"period": "2026-03", "income": 1200.0, "expenses": 200.5, "profit": 999.5},
                {"period": "2026-04", "income": 0.0, "expenses": 50.0, "profit": -50.0},
            ])
        );
    }

    #[test]
    fn test_financial_summary_periods() {
        let conn = seeded();
        let yearly = financial_summary(&conn, Some("U1"), None, Timeframe::Yearly).unwrap();
        assert_eq!(yearly[0]["period"], json!("2026"));
        assert_eq!(yearly[0]["income"], json!(2199.0));

        let daily = financial_summary(&conn, Some("U1"), Some("F1"), Timeframe::Daily).unwrap();
        assert_eq!(daily.as_array().unwrap().len(), 3);
        assert_eq!(daily[0]["period"], json!("2026-03-02"));

        let weekly = financial_summary(&conn, Some("U1"), Some("F1"), Timeframe::Weekly).unwrap();
        assert!(weekly[0]["period"].as_str().unwrap().starts_with("2026-W"));
    }

    #[test]
    fn test_health_statistics() {
        let conn = seeded();
        let rows = health_statistics(&conn, Some("U1"), Some("F1")).unwrap();
        assert_eq!(
            rows,
            json!([
                {"record_type": "Vaccination", "count": 2, "total_cost": 25.0},
                {"record_type": "Checkup", "count": 1, "total_cost": 0.0},
            ])
        );
        assert_eq!(health_statistics(&conn, Some("U1"), Some("F2")).unwrap(), json!([]));
    }

    #[test]
    fn test_breeding_statistics() {
        let conn = seeded();
        let stats = breeding_statistics(&conn, Some("U1"), Some("F1")).unwrap();
        assert_eq!(stats["success_rate"], json!(50.0));
        assert_eq!(stats["total_offspring"], json!(2));
        assert_eq!(stats["avg_gestation"], json!(150.0));

        let empty = breeding_statistics(&conn, Some("U1"), Some("F2")).unwrap();
        assert_eq!(empty, json!({"success_rate": 0.0, "total_offspring": 0, "avg_gestation": 0.0}));
    }

    #[test]
    fn test_call_dispatch() {
        let conn = seeded();
        let params = json!({"farm_id_param": "F1", "timeframe_param": "yearly"});
        let rows = call(&conn, "get_financial_summary", &params, Some("U1")).unwrap();
        assert_eq!(rows[0]["period"], json!("2026"));

        assert!(matches!(
            call(&conn, "drop_everything", &params, Some("U1")),
            Err(HerdbookError::Database(DatabaseError::UnknownProcedure(_)))
        ));
        let bad = json!({"timeframe_param": "hourly"});
        assert!(matches!(call(&conn, "get_financial_summary", &bad, Some("U1")), Err(HerdbookError::Validation(_))));
    }

    #[test]
    fn test_reports_only_cover_the_callers_farms() {
        let conn = seeded();

        let mine = livestock_by_category(&conn, Some("U1"), None).unwrap();
        assert_eq!(
            mine,
            json!([
                {"category": "Goats", "count": 3},
                {"category": "Uncategorized", "count": 1},
            ])
        );
        let theirs = livestock_by_category(&conn, Some("U2"), None).unwrap();
        assert_eq!(theirs, json!([{"category": "Uncategorized", "count": 1}]));

        // Naming someone else's farm does not reveal it
        assert_eq!(livestock_by_category(&conn, Some("U2"), Some("F1")).unwrap(), json!([]));
        assert_eq!(financial_summary(&conn, Some("U2"), Some("F1"), Timeframe::Yearly).unwrap(), json!([]));

        let health = health_statistics(&conn, Some("U2"), None).unwrap();
        assert_eq!(health, json!([{"record_type": "Treatment", "count": 1, "total_cost": 40.0}]));
        assert_eq!(breeding_statistics(&conn, Some("U2"), None).unwrap()["total_offspring"], json!(0));

        assert_eq!(livestock_by_category(&conn, None, None).unwrap(), json!([]));
    }
}
