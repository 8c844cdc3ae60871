use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    /// HS256 secret the identity provider signs access tokens with.
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub gemini_api_key: String,
    pub question_model: String,
    pub explanation_model: String,
    pub public_rps: u32,
    pub generation_rps: u32,
    pub session_idle_minutes: u64,
    pub session_settle_seconds: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            supabase_url: get_env("SUPABASE_URL")?,
            supabase_anon_key: get_env("SUPABASE_ANON_KEY")?,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            question_model: get_env_or("QUESTION_MODEL", "gemini-3-pro-preview"),
            explanation_model: get_env_or("EXPLANATION_MODEL", "gemini-3-flash-preview"),
            public_rps: get_env_parse("PUBLIC_RPS")?,
            generation_rps: get_env_parse_or("GENERATION_RPS", 2)?,
            session_idle_minutes: get_env_parse_or("SESSION_IDLE_MINUTES", 120)?,
            session_settle_seconds: get_env_parse_or("SESSION_SETTLE_SECONDS", 90)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    parse_value(name, &raw)
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u32>("PUBLIC_RPS", "many").unwrap_err();
        assert!(err.to_string().contains("PUBLIC_RPS"));
        assert_eq!(parse_value::<u64>("SESSION_IDLE_MINUTES", " 45 ").unwrap(), 45);
    }
}
