pub mod exam;
pub mod profile;
pub mod question;
