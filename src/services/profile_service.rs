use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam::UsageDelta;
use crate::models::profile::{Medium, NewProfile, Profile, ProfileRow, Role};

/// Profile and usage-counter storage owned by the hosted backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, id: Uuid) -> Result<Profile>;

    async fn list(&self) -> Result<Vec<Profile>>;

    async fn create(&self, profile: NewProfile) -> Result<()>;

    /// Zeroes the monthly counters if `last_reset_date` still equals `previous`.
    /// Returns whether this call performed the reset.
    async fn reset_month(
        &self,
        id: Uuid,
        previous: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    async fn record_usage(&self, id: Uuid, usage: UsageDelta) -> Result<()>;

    async fn set_medium(&self, id: Uuid, medium: Medium) -> Result<()>;

    async fn set_role(&self, id: Uuid, role: Role) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

const PROFILE_COLUMNS: &str = r#"
    id, full_name, preferred_name, whatsapp_no, school, al_year, plan, subject_stream,
    email, role, medium, questions_answered_this_month, papers_answered_this_month,
    last_reset_date
"#;

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn fetch(&self, id: Uuid) -> Result<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => Error::NotFound("Profile not found".to_string()),
            other => other.into(),
        })?;

        Profile::try_from(row)
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles ORDER BY full_name ASC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match Profile::try_from(row) {
                Ok(profile) => profiles.push(profile),
                Err(e) => tracing::warn!(profile_id = %id, error = %e, "Skipping malformed profile row"),
            }
        }
        Ok(profiles)
    }

    async fn create(&self, profile: NewProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, full_name, preferred_name, whatsapp_no, school, al_year, plan,
                subject_stream, email, role, medium, questions_answered_this_month,
                papers_answered_this_month, last_reset_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'student', $10, 0, 0, NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(profile.id)
        .bind(profile.full_name)
        .bind(profile.preferred_name)
        .bind(profile.whatsapp_no)
        .bind(profile.school)
        .bind(profile.al_year)
        .bind(profile.plan.as_str())
        .bind(profile.subject_stream.as_str())
        .bind(profile.email)
        .bind(profile.medium.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_month(
        &self,
        id: Uuid,
        previous: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET questions_answered_this_month = 0,
                papers_answered_this_month = 0,
                last_reset_date = $3
            WHERE id = $1 AND last_reset_date = $2
            "#,
        )
        .bind(id)
        .bind(previous)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_usage(&self, id: Uuid, usage: UsageDelta) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET questions_answered_this_month = questions_answered_this_month + $2,
                papers_answered_this_month = papers_answered_this_month + $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(usage.questions as i32)
        .bind(usage.papers as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Profile not found".to_string()));
        }
        Ok(())
    }

    async fn set_medium(&self, id: Uuid, medium: Medium) -> Result<()> {
        let result = sqlx::query("UPDATE profiles SET medium = $2 WHERE id = $1")
            .bind(id)
            .bind(medium.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Profile not found".to_string()));
        }
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<()> {
        let result = sqlx::query("UPDATE profiles SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Profile not found".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Profile not found".to_string()));
        }
        Ok(())
    }
}
