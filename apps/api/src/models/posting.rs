use serde::{Deserialize, Serialize};

/// One job advertisement as delivered by the collector, before validation.
///
/// Field aliases accept the capitalized column names the scraper exports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPosting {
    #[serde(default, alias = "Title")]
    pub title: Option<String>,
    #[serde(default, alias = "Company")]
    pub company: Option<String>,
    #[serde(default, alias = "Location")]
    pub location: Option<String>,
    #[serde(default, alias = "Experience")]
    pub experience: Option<String>,
    #[serde(default, alias = "Summary")]
    pub summary: Option<String>,
    #[serde(default, alias = "Skills")]
    pub skills: Option<String>,
    #[serde(default, alias = "JobLink")]
    pub job_link: Option<String>,
}

/// A posting that survived validation, annotated with its normalized skills
/// text and the cluster it was assigned at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub summary: Option<String>,
    pub skills: String,
    pub job_link: Option<String>,
    pub normalized_skills: String,
    pub cluster_id: usize,
}

impl Posting {
    /// A link is shown only when it is an absolute http(s) URL.
    pub fn has_direct_link(&self) -> bool {
        self.job_link
            .as_deref()
            .map(|link| link.starts_with("http"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_posting_accepts_exported_column_names() {
        let json = r#"{
            "Title": "Data Scientist",
            "Company": "Acme",
            "Location": "Pune",
            "Skills": "Python, SQL",
            "JobLink": "https://example.com/jobs/1"
        }"#;
        let raw: RawPosting = serde_json::from_str(json).unwrap();
        assert_eq!(raw.title.as_deref(), Some("Data Scientist"));
        assert_eq!(raw.skills.as_deref(), Some("Python, SQL"));
        assert!(raw.summary.is_none());
    }

    #[test]
    fn test_raw_posting_missing_fields_default_to_none() {
        let raw: RawPosting = serde_json::from_str(r#"{"title": "Analyst"}"#).unwrap();
        assert!(raw.skills.is_none());
        assert!(raw.company.is_none());
    }

    #[test]
    fn test_direct_link_requires_http_prefix() {
        let mut posting = Posting {
            title: "Engineer".to_string(),
            company: None,
            location: None,
            experience: None,
            summary: None,
            skills: "rust".to_string(),
            job_link: Some("/Find-Jobs-Details/123".to_string()),
            normalized_skills: "rust".to_string(),
            cluster_id: 0,
        };
        assert!(!posting.has_direct_link());

        posting.job_link = Some("https://www.example.com/job/123".to_string());
        assert!(posting.has_direct_link());

        posting.job_link = None;
        assert!(!posting.has_direct_link());
    }
}
