pub mod admin_dto;
pub mod auth_dto;
pub mod dashboard_dto;
pub mod session_dto;
