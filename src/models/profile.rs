use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanType {
    Free,
    Pro,
    Plus,
}

impl PlanType {
    pub const ALL: [PlanType; 3] = [PlanType::Free, PlanType::Pro, PlanType::Plus];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "FREE",
            PlanType::Pro => "PRO",
            PlanType::Plus => "PLUS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanType::Free => "Free",
            PlanType::Pro => "Pro",
            PlanType::Plus => "Plus",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PlanType::Pro | PlanType::Plus)
    }
}

impl FromStr for PlanType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(PlanType::Free),
            "PRO" => Ok(PlanType::Pro),
            "PLUS" => Ok(PlanType::Plus),
            other => Err(Error::Internal(format!("Unknown plan '{}'", other))),
        }
    }
}

/// Language the questions and explanations are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Medium {
    Sinhala,
    English,
    Tamil,
}

impl Medium {
    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Sinhala => "Sinhala",
            Medium::English => "English",
            Medium::Tamil => "Tamil",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Medium {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sinhala" => Ok(Medium::Sinhala),
            "english" => Ok(Medium::English),
            "tamil" => Ok(Medium::Tamil),
            other => Err(Error::Internal(format!("Unknown medium '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectStream {
    #[serde(rename = "Physical Science")]
    PhysicalScience,
    #[serde(rename = "Biological Science")]
    BiologicalScience,
    #[serde(rename = "Commerce")]
    Commerce,
    #[serde(rename = "Arts")]
    Arts,
    #[serde(rename = "Engineering Technology")]
    EngineeringTech,
    #[serde(rename = "Bio-Systems Technology")]
    BioSystemsTech,
}

impl SubjectStream {
    pub const ALL: [SubjectStream; 6] = [
        SubjectStream::PhysicalScience,
        SubjectStream::BiologicalScience,
        SubjectStream::Commerce,
        SubjectStream::Arts,
        SubjectStream::EngineeringTech,
        SubjectStream::BioSystemsTech,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectStream::PhysicalScience => "Physical Science",
            SubjectStream::BiologicalScience => "Biological Science",
            SubjectStream::Commerce => "Commerce",
            SubjectStream::Arts => "Arts",
            SubjectStream::EngineeringTech => "Engineering Technology",
            SubjectStream::BioSystemsTech => "Bio-Systems Technology",
        }
    }

    /// Subjects offered on the dashboard for this stream.
    pub fn subjects(&self) -> &'static [&'static str] {
        match self {
            SubjectStream::PhysicalScience => &[
                "Combined Mathematics",
                "Physics",
                "Chemistry",
                "Information & Communication Technology",
            ],
            SubjectStream::BiologicalScience => &[
                "Biology",
                "Chemistry",
                "Physics",
                "Agricultural Science",
            ],
            SubjectStream::Commerce => &["Accounting", "Business Studies", "Economics"],
            SubjectStream::Arts => &[
                "Political Science",
                "Geography",
                "Logic & Scientific Method",
                "History",
            ],
            SubjectStream::EngineeringTech => &[
                "Engineering Technology",
                "Science for Technology",
                "Information & Communication Technology",
            ],
            SubjectStream::BioSystemsTech => &[
                "Bio-Systems Technology",
                "Science for Technology",
                "Agricultural Science",
            ],
        }
    }
}

impl FromStr for SubjectStream {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubjectStream::ALL
            .into_iter()
            .find(|stream| stream.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Internal(format!("Unknown subject stream '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    pub fn toggled(&self) -> Role {
        match self {
            Role::Student => Role::Admin,
            Role::Admin => Role::Student,
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(Error::Internal(format!("Unknown role '{}'", other))),
        }
    }
}

/// Monthly usage counters kept on the profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub questions_answered_this_month: u32,
    pub papers_answered_this_month: u32,
    pub last_reset_date: DateTime<Utc>,
}

/// Raw `profiles` row as stored by the hosted backend.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub full_name: String,
    pub preferred_name: String,
    pub whatsapp_no: Option<String>,
    pub school: Option<String>,
    pub al_year: Option<String>,
    pub plan: String,
    pub subject_stream: String,
    pub email: String,
    pub role: String,
    pub medium: String,
    pub questions_answered_this_month: i32,
    pub papers_answered_this_month: i32,
    pub last_reset_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub preferred_name: String,
    pub whatsapp_no: Option<String>,
    pub school: Option<String>,
    pub al_year: Option<String>,
    pub plan: PlanType,
    pub subject_stream: SubjectStream,
    pub email: String,
    pub role: Role,
    pub medium: Medium,
    pub usage: UsageCounters,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl TryFrom<ProfileRow> for Profile {
    type Error = Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            full_name: row.full_name,
            preferred_name: row.preferred_name,
            whatsapp_no: row.whatsapp_no,
            school: row.school,
            al_year: row.al_year,
            plan: row.plan.parse()?,
            subject_stream: row.subject_stream.parse()?,
            email: row.email,
            role: row.role.parse()?,
            medium: row.medium.parse()?,
            usage: UsageCounters {
                questions_answered_this_month: row.questions_answered_this_month.max(0) as u32,
                papers_answered_this_month: row.papers_answered_this_month.max(0) as u32,
                last_reset_date: row.last_reset_date,
            },
        })
    }
}

/// Profile created alongside a new identity.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
    pub preferred_name: String,
    pub whatsapp_no: Option<String>,
    pub school: Option<String>,
    pub al_year: Option<String>,
    pub plan: PlanType,
    pub subject_stream: SubjectStream,
    pub email: String,
    pub medium: Medium,
}
