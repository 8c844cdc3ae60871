use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::profile::{Medium, PlanType, Profile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub plan: PlanType,
    pub questions_answered_this_month: u32,
    pub papers_answered_this_month: u32,
    pub last_reset_date: DateTime<Utc>,
    pub text: String,
    pub progress_percent: u32,
    pub limit_reached: bool,
    pub is_pro_plus: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub profile: Profile,
    pub usage: UsageSummary,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub medium: Medium,
}
