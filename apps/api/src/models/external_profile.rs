use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Imported professional data, persisted under the `linkedInProfile` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfile {
    pub id: String,
    /// Provider payload kept as-is (headline, location, industry, ...).
    pub raw_data: Value,
    pub parsed_data: ParsedProfile,
    pub last_synced: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedProfile {
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

/// Dates are kept as the provider sends them (`YYYY` or `YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub company: String,
    pub title: String,
    pub location: String,
    pub start_date: String,
    /// `None` for the current position.
    pub end_date: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_date: String,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub name: String,
    pub organization: String,
    pub issue_date: String,
    pub expiration_date: Option<String>,
}

impl ExternalProfile {
    pub fn current_position(&self) -> Option<&WorkExperience> {
        self.parsed_data
            .work_experience
            .iter()
            .find(|w| w.end_date.is_none())
    }
}
