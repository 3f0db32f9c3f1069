use rusqlite::{Connection, OptionalExtension, Row};

use crate::errors::CyberHuntError;
use crate::models::triage::{Subscription, SubscriptionStatus, TriageService};
use crate::utils::time;
use super::rows;
use super::Database;

const SERVICE_COLUMNS: &str = "id, company_id, service_name, service_type, pricing_model, price_per_report, monthly_price, annual_price, triage_level, max_reports_per_month, response_time_hours, auto_assign_triage, is_active, created_at";

const SUBSCRIPTION_COLUMNS: &str = "id, company_id, service_id, status, reports_processed, total_cost, billing_cycle_start, next_billing_date, created_at";

fn map_service(row: &Row<'_>) -> rusqlite::Result<TriageService> {
    Ok(TriageService {
        id: row.get("id")?,
        company_id: row.get("company_id")?,
        service_name: row.get("service_name")?,
        service_type: rows::parse(row, "service_type")?,
        pricing_model: rows::parse(row, "pricing_model")?,
        price_per_report: row.get("price_per_report")?,
        monthly_price: row.get("monthly_price")?,
        annual_price: row.get("annual_price")?,
        triage_level: rows::parse(row, "triage_level")?,
        max_reports_per_month: rows::opt_u32_col(row, "max_reports_per_month")?,
        response_time_hours: rows::u32_col(row, "response_time_hours")?,
        auto_assign_triage: row.get("auto_assign_triage")?,
        is_active: row.get("is_active")?,
        created_at: rows::timestamp(row, "created_at")?,
    })
}

fn map_subscription(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get("id")?,
        company_id: row.get("company_id")?,
        service_id: row.get("service_id")?,
        status: rows::parse(row, "status")?,
        reports_processed: rows::u32_col(row, "reports_processed")?,
        total_cost: row.get("total_cost")?,
        billing_cycle_start: rows::timestamp(row, "billing_cycle_start")?,
        next_billing_date: rows::timestamp(row, "next_billing_date")?,
        created_at: rows::timestamp(row, "created_at")?,
    })
}

pub(crate) fn insert_service(conn: &Connection, service: &TriageService) -> Result<(), CyberHuntError> {
    conn.execute(
        &format!("INSERT INTO triage_services ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)", SERVICE_COLUMNS),
        rusqlite::params![
            service.id,
            service.company_id,
            service.service_name,
            service.service_type.as_str(),
            service.pricing_model.as_str(),
            service.price_per_report,
            service.monthly_price,
            service.annual_price,
            service.triage_level.as_str(),
            service.max_reports_per_month,
            service.response_time_hours,
            service.auto_assign_triage,
            service.is_active,
            time::to_db(&service.created_at),
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to insert triage service: {}", e)))?;
    Ok(())
}

pub(crate) fn fetch_service(conn: &Connection, id: &str) -> Result<Option<TriageService>, CyberHuntError> {
    conn.query_row(
        &format!("SELECT {} FROM triage_services WHERE id = ?1", SERVICE_COLUMNS),
        rusqlite::params![id],
        map_service,
    )
    .optional()
    .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))
}

pub(crate) fn require_service(conn: &Connection, id: &str) -> Result<TriageService, CyberHuntError> {
    fetch_service(conn, id)?.ok_or_else(|| CyberHuntError::not_found("triage service", id))
}

pub(crate) fn insert_subscription(conn: &Connection, sub: &Subscription) -> Result<(), CyberHuntError> {
    conn.execute(
        &format!("INSERT INTO subscriptions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", SUBSCRIPTION_COLUMNS),
        rusqlite::params![
            sub.id,
            sub.company_id,
            sub.service_id,
            sub.status.as_str(),
            sub.reports_processed,
            sub.total_cost,
            time::to_db(&sub.billing_cycle_start),
            time::to_db(&sub.next_billing_date),
            time::to_db(&sub.created_at),
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to insert subscription: {}", e)))?;
    Ok(())
}

pub(crate) fn save_subscription(conn: &Connection, sub: &Subscription) -> Result<(), CyberHuntError> {
    conn.execute(
        "UPDATE subscriptions SET status = ?2, reports_processed = ?3, total_cost = ?4, billing_cycle_start = ?5, next_billing_date = ?6 WHERE id = ?1",
        rusqlite::params![
            sub.id,
            sub.status.as_str(),
            sub.reports_processed,
            sub.total_cost,
            time::to_db(&sub.billing_cycle_start),
            time::to_db(&sub.next_billing_date),
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to update subscription: {}", e)))?;
    Ok(())
}

pub(crate) fn fetch_subscription(conn: &Connection, id: &str) -> Result<Option<Subscription>, CyberHuntError> {
    conn.query_row(
        &format!("SELECT {} FROM subscriptions WHERE id = ?1", SUBSCRIPTION_COLUMNS),
        rusqlite::params![id],
        map_subscription,
    )
    .optional()
    .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))
}

pub(crate) fn require_subscription(conn: &Connection, id: &str) -> Result<Subscription, CyberHuntError> {
    fetch_subscription(conn, id)?.ok_or_else(|| CyberHuntError::not_found("subscription", id))
}

pub(crate) fn active_subscription_exists(
    conn: &Connection,
    company_id: &str,
    service_id: &str,
) -> Result<bool, CyberHuntError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE company_id = ?1 AND service_id = ?2 AND status = ?3",
        rusqlite::params![company_id, service_id, SubscriptionStatus::Active.as_str()],
        |row| row.get(0),
    ).map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;
    Ok(count > 0)
}

impl Database {
    pub fn get_service(&self, id: &str) -> Result<Option<TriageService>, CyberHuntError> {
        self.read(|conn| fetch_service(conn, id))
    }

    pub fn list_services(&self, company_id: Option<&str>) -> Result<Vec<TriageService>, CyberHuntError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM triage_services WHERE (?1 IS NULL OR company_id = ?1) ORDER BY created_at, id",
                SERVICE_COLUMNS
            )).map_err(|e| CyberHuntError::Database(format!("Query failed: {}", e)))?;

            let rows = stmt.query_map(rusqlite::params![company_id], map_service)
                .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;

            let mut services = Vec::new();
            for row in rows {
                services.push(row.map_err(|e| CyberHuntError::Database(format!("Row error: {}", e)))?);
            }
            Ok(services)
        })
    }

    pub fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, CyberHuntError> {
        self.read(|conn| fetch_subscription(conn, id))
    }
}
