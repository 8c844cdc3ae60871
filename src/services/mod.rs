pub mod admin_service;
pub mod ai_service;
pub mod exam_session;
pub mod identity_service;
pub mod profile_service;
pub mod quota_service;
pub mod session_service;
