use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    pub id: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub trainer: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub sample_size: u32,
    /// Sub-assessments already reviewed. Never exceeds `sample_size`.
    #[serde(default)]
    pub sampled: u32,
    #[serde(default)]
    pub pass_rate: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub detailed_sub_assessments: Vec<SubAssessment>,
}

impl AssessmentRecord {
    /// Adds freshly sampled items to the reviewed counter, saturating at `sample_size`.
    pub fn record_sampling(&mut self, count: usize) {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.sampled = self.sampled.saturating_add(count).min(self.sample_size);
    }

    /// Pulls an over-reported `sampled` back down to `sample_size`. Returns true if it changed.
    pub fn clamp_sampled(&mut self) -> bool {
        if self.sampled <= self.sample_size {
            return false;
        }
        self.sampled = self.sample_size;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubAssessment {
    pub learner_id: String,
    #[serde(default)]
    pub learner_name: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Sample,
    Verify,
    Export,
    Comment,
    #[serde(other)]
    Other,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
            ActionType::Login => "login",
            ActionType::Logout => "logout",
            ActionType::Sample => "sample",
            ActionType::Verify => "verify",
            ActionType::Export => "export",
            ActionType::Comment => "comment",
            ActionType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub action_type: Option<ActionType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledLearner {
    pub id: String,
    pub name: String,
    pub score: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingRecord {
    pub id: Uuid,
    pub assessment_id: String,
    pub course: Option<String>,
    pub trainer: Option<String>,
    pub sample_size: u32,
    pub sampled_count: usize,
    pub sampling_percentage: u8,
    pub learners: Vec<SampledLearner>,
    pub sampled_date: DateTime<Utc>,
    pub sampled_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    #[serde(default)]
    pub learner_name: Option<String>,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub assessor: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub comments: Vec<PortfolioComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    #[serde(default)]
    pub total_assessments: Option<u64>,
    #[serde(default)]
    pub sampled_assessments: Option<u64>,
    #[serde(default)]
    pub average_pass_rate: Option<f64>,
    #[serde(default)]
    pub flagged_assessments: Option<u64>,
    #[serde(default)]
    pub pending_verifications: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct TrainerSummary {
    pub trainer: String,
    pub assessments: usize,
    pub avg_pass_rate: f64,
    pub flagged: usize,
}

#[derive(Debug, Clone)]
pub struct ActionSummary {
    pub action_type: String,
    pub count: usize,
}
