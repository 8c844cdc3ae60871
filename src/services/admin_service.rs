use crate::dto::admin_dto::{AnalyticsResponse, PlanCounts, PlanEngagement, StreamCount};
use crate::models::profile::{PlanType, Profile, SubjectStream};

/// Case-insensitive match on full name or email. A blank filter keeps everyone.
pub fn filter_profiles(profiles: Vec<Profile>, filter: Option<&str>) -> Vec<Profile> {
    let needle = filter.map(str::trim).unwrap_or_default().to_lowercase();
    if needle.is_empty() {
        return profiles;
    }
    profiles
        .into_iter()
        .filter(|p| {
            p.full_name.to_lowercase().contains(&needle) || p.email.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn analytics(profiles: &[Profile]) -> AnalyticsResponse {
    let mut plans = PlanCounts::default();
    for p in profiles {
        match p.plan {
            PlanType::Free => plans.free += 1,
            PlanType::Pro => plans.pro += 1,
            PlanType::Plus => plans.plus += 1,
        }
    }

    let mut stream_distribution: Vec<StreamCount> = SubjectStream::ALL
        .iter()
        .map(|&stream| StreamCount {
            stream,
            count: profiles.iter().filter(|p| p.subject_stream == stream).count(),
        })
        .collect();
    // stable, so equal counts keep catalog order
    stream_distribution.sort_by(|a, b| b.count.cmp(&a.count));

    let plan_engagement = PlanType::ALL
        .iter()
        .map(|&plan| PlanEngagement {
            plan,
            questions: profiles
                .iter()
                .filter(|p| p.plan == plan)
                .map(|p| u64::from(p.usage.questions_answered_this_month))
                .sum(),
        })
        .collect();

    AnalyticsResponse {
        total_users: profiles.len(),
        plans,
        total_questions_this_month: profiles
            .iter()
            .map(|p| u64::from(p.usage.questions_answered_this_month))
            .sum(),
        total_papers_this_month: profiles
            .iter()
            .map(|p| u64::from(p.usage.papers_answered_this_month))
            .sum(),
        stream_distribution,
        plan_engagement,
    }
}
