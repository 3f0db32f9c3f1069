use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CyberHuntError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    ManagedTriage,
    Consultation,
    Remediation,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManagedTriage => "managed_triage",
            Self::Consultation => "consultation",
            Self::Remediation => "remediation",
        }
    }
}

impl std::str::FromStr for ServiceType {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "managed_triage" => Ok(Self::ManagedTriage),
            "consultation" => Ok(Self::Consultation),
            "remediation" => Ok(Self::Remediation),
            other => Err(CyberHuntError::Validation(format!("unknown service type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    PerReport,
    Monthly,
    Annual,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerReport => "per_report",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Length of one billing cycle. Per-report pricing is invoiced monthly.
    pub fn cycle_months(&self) -> Months {
        match self {
            Self::PerReport | Self::Monthly => Months::new(1),
            Self::Annual => Months::new(12),
        }
    }
}

impl std::str::FromStr for PricingModel {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_report" => Ok(Self::PerReport),
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            other => Err(CyberHuntError::Validation(format!("unknown pricing model '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageLevel {
    Basic,
    Standard,
    Premium,
}

impl TriageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

impl std::str::FromStr for TriageLevel {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(CyberHuntError::Validation(format!("unknown triage level '{}'", other))),
        }
    }
}

/// A company-configured triage offering. Prices are minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageService {
    pub id: String,
    pub company_id: String,
    pub service_name: String,
    pub service_type: ServiceType,
    pub pricing_model: PricingModel,
    pub price_per_report: Option<i64>,
    pub monthly_price: Option<i64>,
    pub annual_price: Option<i64>,
    pub triage_level: TriageLevel,
    pub max_reports_per_month: Option<u32>,
    pub response_time_hours: u32,
    pub auto_assign_triage: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TriageService {
    /// The fixed charge for a billing cycle, 0 for per-report pricing.
    pub fn cycle_base_price(&self) -> i64 {
        match self.pricing_model {
            PricingModel::PerReport => 0,
            PricingModel::Monthly => self.monthly_price.unwrap_or(0),
            PricingModel::Annual => self.annual_price.unwrap_or(0),
        }
    }

    /// Charge added for each processed report.
    pub fn per_report_charge(&self) -> i64 {
        match self.pricing_model {
            PricingModel::PerReport => self.price_per_report.unwrap_or(0),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTriageService {
    pub company_id: String,
    pub service_name: String,
    pub service_type: ServiceType,
    pub pricing_model: PricingModel,
    pub price_per_report: Option<i64>,
    pub monthly_price: Option<i64>,
    pub annual_price: Option<i64>,
    pub triage_level: TriageLevel,
    pub max_reports_per_month: Option<u32>,
    pub response_time_hours: u32,
    #[serde(default)]
    pub auto_assign_triage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CyberHuntError::Validation(format!("unknown subscription status '{}'", other))),
        }
    }
}

/// Binds a company to a triage service for billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub company_id: String,
    pub service_id: String,
    pub status: SubscriptionStatus,
    pub reports_processed: u32,
    /// Minor currency units accrued in the current cycle.
    pub total_cost: i64,
    pub billing_cycle_start: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
