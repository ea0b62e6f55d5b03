use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::ExternalProfileSource;
use crate::errors::AppError;
use crate::models::external_profile::{
    Certification, Education, ExternalProfile, ParsedProfile, WorkExperience,
};
use crate::models::Identity;

const PROFILE_ID: &str = "linkedin123";

/// Returns the same demo profile for every code, personalised with the
/// identity's names and email.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockLinkedInSource;

#[async_trait]
impl ExternalProfileSource for MockLinkedInSource {
    async fn fetch_profile(
        &self,
        _code: &str,
        identity: &Identity,
    ) -> Result<ExternalProfile, AppError> {
        Ok(ExternalProfile {
            id: PROFILE_ID.to_string(),
            raw_data: json!({
                "firstName": identity.first_name,
                "lastName": identity.last_name,
                "emailAddress": identity.email,
                "headline": "Software Engineer",
                "profilePicture": "https://via.placeholder.com/150",
                "industry": "Computer Software",
                "location": {
                    "country": { "code": "us" },
                    "name": "San Francisco Bay Area"
                }
            }),
            parsed_data: demo_parsed_profile(),
            last_synced: Utc::now(),
        })
    }
}

fn demo_parsed_profile() -> ParsedProfile {
    ParsedProfile {
        work_experience: vec![
            WorkExperience {
                company: "Tech Company A".into(),
                title: "Senior Software Engineer".into(),
                location: "San Francisco, CA".into(),
                start_date: "2020-01".into(),
                end_date: None,
                description:
                    "Leading development of cloud-based solutions using React, Node.js, and AWS."
                        .into(),
            },
            WorkExperience {
                company: "Tech Company B".into(),
                title: "Software Developer".into(),
                location: "San Francisco, CA".into(),
                start_date: "2018-03".into(),
                end_date: Some("2019-12".into()),
                description: "Developed and maintained web applications using JavaScript frameworks."
                    .into(),
            },
        ],
        education: vec![Education {
            institution: "University of Technology".into(),
            degree: "Bachelor of Science in Computer Science".into(),
            field_of_study: "Computer Science".into(),
            start_date: "2014".into(),
            end_date: Some("2018".into()),
        }],
        skills: [
            "JavaScript",
            "React",
            "Node.js",
            "AWS",
            "Python",
            "Machine Learning",
            "Data Analysis",
            "SQL",
            "NoSQL",
            "Git",
            "CI/CD",
            "Agile Development",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
        certifications: vec![Certification {
            name: "AWS Certified Solutions Architect".into(),
            organization: "Amazon Web Services".into(),
            issue_date: "2021-05".into(),
            expiration_date: Some("2024-05".into()),
        }],
    }
}
