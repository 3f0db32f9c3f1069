use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::triage::{
    active_subscription_exists, insert_service, insert_subscription, require_service,
    require_subscription, save_subscription,
};
use crate::errors::CyberHuntError;
use crate::models::review::{Audience, Review, Submission};
use crate::models::triage::{
    NewTriageService, PricingModel, Subscription, SubscriptionStatus, TriageService,
};
use crate::utils::time;
use super::reviews::{create_review_in_tx, created_event, ReviewOptions};
use super::{require_text, WorkflowService};

/// Ten years.
pub const MAX_RESPONSE_TIME_HOURS: u32 = 8760 * 10;

fn overflow(what: &str) -> CyberHuntError {
    CyberHuntError::InvariantViolation(format!("{} overflowed", what))
}

/// When a triage report received at `now` is due.
fn response_due(now: DateTime<Utc>, response_time_hours: u32) -> Result<DateTime<Utc>, CyberHuntError> {
    now.checked_add_signed(Duration::hours(i64::from(response_time_hours)))
        .ok_or_else(|| overflow("response due date"))
}

fn validate_price(field: &str, price: Option<i64>, required: bool) -> Result<(), CyberHuntError> {
    match price {
        None if required => Err(CyberHuntError::Validation(format!(
            "{} is required for this pricing model",
            field
        ))),
        Some(amount) if amount < 0 => Err(CyberHuntError::Validation(format!(
            "{} must not be negative",
            field
        ))),
        _ => Ok(()),
    }
}

fn validate_service(input: &NewTriageService) -> Result<(), CyberHuntError> {
    require_text("company id", &input.company_id)?;
    require_text("service name", &input.service_name)?;
    if input.response_time_hours == 0 {
        return Err(CyberHuntError::Validation(
            "response time must be at least one hour".into(),
        ));
    }
    if input.response_time_hours > MAX_RESPONSE_TIME_HOURS {
        return Err(CyberHuntError::Validation(format!(
            "response time must not exceed {} hours",
            MAX_RESPONSE_TIME_HOURS
        )));
    }
    if input.max_reports_per_month == Some(0) {
        return Err(CyberHuntError::Validation(
            "max reports per month must be greater than zero".into(),
        ));
    }
    validate_price("pricePerReport", input.price_per_report, input.pricing_model == PricingModel::PerReport)?;
    validate_price("monthlyPrice", input.monthly_price, input.pricing_model == PricingModel::Monthly)?;
    validate_price("annualPrice", input.annual_price, input.pricing_model == PricingModel::Annual)?;
    Ok(())
}

/// Reports allowed per billing cycle. The monthly limit scales with annual cycles.
fn cycle_quota(service: &TriageService) -> Option<u32> {
    let months = match service.pricing_model {
        PricingModel::Annual => 12,
        PricingModel::PerReport | PricingModel::Monthly => 1,
    };
    service
        .max_reports_per_month
        .map(|per_month| per_month.saturating_mul(months))
}

/// Advance `sub` past every billing boundary at or before `now`, resetting
/// the cycle counters. Returns whether a rollover happened.
pub(crate) fn roll_over(
    sub: &mut Subscription,
    service: &TriageService,
    now: DateTime<Utc>,
) -> Result<bool, CyberHuntError> {
    let mut rolled = false;
    while now >= sub.next_billing_date {
        let start = sub.next_billing_date;
        sub.next_billing_date = start
            .checked_add_months(service.pricing_model.cycle_months())
            .ok_or_else(|| overflow("next billing date"))?;
        sub.billing_cycle_start = start;
        sub.reports_processed = 0;
        sub.total_cost = service.cycle_base_price();
        rolled = true;
    }
    Ok(rolled)
}

/// Count one processed report against a subscription inside an open transaction.
fn charge_report(
    conn: &Connection,
    subscription_id: &str,
    now: DateTime<Utc>,
) -> Result<(Subscription, TriageService), CyberHuntError> {
    let mut sub = require_subscription(conn, subscription_id)?;
    if sub.status != SubscriptionStatus::Active {
        return Err(CyberHuntError::Validation(format!(
            "subscription '{}' is {}",
            sub.id,
            sub.status.as_str()
        )));
    }
    let service = require_service(conn, &sub.service_id)?;
    if !service.is_active {
        return Err(CyberHuntError::Validation(format!(
            "triage service '{}' is no longer active",
            service.service_name
        )));
    }

    if roll_over(&mut sub, &service, now)? {
        info!(subscription_id = %sub.id, cycle_start = %sub.billing_cycle_start, "Billing cycle rolled over");
    }
    if let Some(quota) = cycle_quota(&service) {
        if sub.reports_processed >= quota {
            return Err(CyberHuntError::QuotaExceeded(format!(
                "subscription '{}' has used all {} reports of this billing cycle",
                sub.id, quota
            )));
        }
    }
    sub.reports_processed = sub
        .reports_processed
        .checked_add(1)
        .ok_or_else(|| overflow("reports processed"))?;
    sub.total_cost = sub
        .total_cost
        .checked_add(service.per_report_charge())
        .ok_or_else(|| overflow("total cost"))?;

    save_subscription(conn, &sub)?;
    Ok((sub, service))
}

impl WorkflowService {
    pub fn create_service(&self, input: NewTriageService, actor_id: &str) -> Result<TriageService, CyberHuntError> {
        require_text("actor id", actor_id)?;
        validate_service(&input)?;
        let service = TriageService {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: input.company_id.trim().to_string(),
            service_name: input.service_name.trim().to_string(),
            service_type: input.service_type,
            pricing_model: input.pricing_model,
            price_per_report: input.price_per_report,
            monthly_price: input.monthly_price,
            annual_price: input.annual_price,
            triage_level: input.triage_level,
            max_reports_per_month: input.max_reports_per_month,
            response_time_hours: input.response_time_hours,
            auto_assign_triage: input.auto_assign_triage,
            is_active: true,
            created_at: time::now(),
        };
        self.db.transaction(|tx| insert_service(tx, &service))?;

        info!(service_id = %service.id, company_id = %service.company_id, pricing = service.pricing_model.as_str(), actor = actor_id, "Triage service created");
        Ok(service)
    }

    pub fn get_service(&self, service_id: &str) -> Result<TriageService, CyberHuntError> {
        self.db
            .get_service(service_id)?
            .ok_or_else(|| CyberHuntError::not_found("triage service", service_id))
    }

    pub fn list_services(&self, company_id: Option<&str>) -> Result<Vec<TriageService>, CyberHuntError> {
        self.db.list_services(company_id)
    }

    pub fn subscribe(
        &self,
        company_id: &str,
        service_id: &str,
        actor_id: &str,
    ) -> Result<Subscription, CyberHuntError> {
        require_text("company id", company_id)?;
        require_text("actor id", actor_id)?;
        let sub = self.db.transaction(|tx| {
            let service = require_service(tx, service_id)?;
            if !service.is_active {
                return Err(CyberHuntError::Validation(format!(
                    "triage service '{}' is not active",
                    service.service_name
                )));
            }
            if service.company_id != company_id {
                return Err(CyberHuntError::Validation(format!(
                    "triage service '{}' belongs to another company",
                    service.service_name
                )));
            }
            if active_subscription_exists(tx, company_id, service_id)? {
                return Err(CyberHuntError::DuplicateSubscription(format!(
                    "company '{}' already subscribes to '{}'",
                    company_id, service.service_name
                )));
            }

            let now = time::now();
            let sub = Subscription {
                id: uuid::Uuid::new_v4().to_string(),
                company_id: company_id.to_string(),
                service_id: service.id.clone(),
                status: SubscriptionStatus::Active,
                reports_processed: 0,
                total_cost: service.cycle_base_price(),
                billing_cycle_start: now,
                next_billing_date: now
                    .checked_add_months(service.pricing_model.cycle_months())
                    .ok_or_else(|| overflow("next billing date"))?,
                created_at: now,
            };
            insert_subscription(tx, &sub)?;
            Ok(sub)
        })?;

        info!(subscription_id = %sub.id, company_id, service_id, actor = actor_id, "Subscription created");
        Ok(sub)
    }

    pub fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, CyberHuntError> {
        self.db
            .get_subscription(subscription_id)?
            .ok_or_else(|| CyberHuntError::not_found("subscription", subscription_id))
    }

    pub fn record_report_processed(&self, subscription_id: &str) -> Result<Subscription, CyberHuntError> {
        let (sub, _) = self
            .db
            .transaction(|tx| charge_report(tx, subscription_id, time::now()))?;
        info!(subscription_id, reports = sub.reports_processed, total_cost = sub.total_cost, "Report counted");
        Ok(sub)
    }

    /// Bill a report against a subscription and open a triage review for
    /// it in one transaction. Services with auto-assign then try to place
    /// the review; lack of capacity leaves it pending.
    pub fn intake_submission(
        &self,
        submission: Submission,
        subscription_id: &str,
        actor_id: &str,
    ) -> Result<Review, CyberHuntError> {
        require_text("actor id", actor_id)?;
        let (review, service) = self.db.transaction(|tx| {
            let now = time::now();
            let (_, service) = charge_report(tx, subscription_id, now)?;
            let options = ReviewOptions {
                audience: Audience::Triage,
                due_date: Some(response_due(now, service.response_time_hours)?),
                service_id: Some(service.id.clone()),
                ..Default::default()
            };
            let review = create_review_in_tx(tx, &submission, &options, actor_id, now)?;
            Ok((review, service))
        })?;

        info!(review_id = %review.id, subscription_id, service_id = %service.id, "Triage report received");
        self.events.publish(created_event(&review));

        if service.auto_assign_triage {
            match self.auto_assign(&review.id, actor_id) {
                Ok(assigned) => return Ok(assigned),
                Err(CyberHuntError::CapacityExceeded(reason)) => {
                    warn!(review_id = %review.id, %reason, "Auto-assign skipped; review left pending");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(review)
    }
}
