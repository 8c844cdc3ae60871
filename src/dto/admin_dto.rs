use serde::{Deserialize, Serialize};

use crate::models::profile::{PlanType, Role, SubjectStream};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangeResponse {
    pub id: uuid::Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
    pub free: usize,
    pub pro: usize,
    pub plus: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCount {
    pub stream: SubjectStream,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEngagement {
    pub plan: PlanType,
    pub questions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub total_users: usize,
    pub plans: PlanCounts,
    pub total_questions_this_month: u64,
    pub total_papers_this_month: u64,
    /// Most popular stream first.
    pub stream_distribution: Vec<StreamCount>,
    pub plan_engagement: Vec<PlanEngagement>,
}
