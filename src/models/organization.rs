//! Organization (tenant) model
//!
//! An organization is the unit of data partitioning. Its slug is the routing
//! discriminator (subdomain label) and is immutable once assigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Organization lifecycle status
///
/// Transitions are driven by administrative flows outside this subsystem;
/// the resolver only reads the current value and fails closed on anything
/// but `Active`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrgStatus {
    #[default]
    Active,
    Suspended,
    Cancelled,
}

impl std::fmt::Display for OrgStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrgStatus::Active => write!(f, "active"),
            OrgStatus::Suspended => write!(f, "suspended"),
            OrgStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrgStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OrgStatus::Active),
            "suspended" => Ok(OrgStatus::Suspended),
            "cancelled" => Ok(OrgStatus::Cancelled),
            _ => Err(format!("Invalid organization status: {}", s)),
        }
    }
}

/// Subscription plan tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Team,
    Business,
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanTier::Free => write!(f, "free"),
            PlanTier::Team => write!(f, "team"),
            PlanTier::Business => write!(f, "business"),
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanTier::Free),
            "team" => Ok(PlanTier::Team),
            "business" => Ok(PlanTier::Business),
            _ => Err(format!("Invalid plan tier: {}", s)),
        }
    }
}

impl PlanTier {
    /// Default quotas for the tier: (max users, max projects)
    pub fn default_quotas(self) -> (i64, i64) {
        match self {
            PlanTier::Free => (5, 10),
            PlanTier::Team => (25, 100),
            PlanTier::Business => (200, 1000),
        }
    }
}

/// Organization entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Subdomain label used for routing. Globally unique, immutable.
    pub slug: String,
    pub status: OrgStatus,
    pub plan_tier: PlanTier,
    pub max_users: i64,
    pub max_projects: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provisioning request for a new organization
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub plan_tier: PlanTier,
}
