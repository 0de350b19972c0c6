use crate::db::feedback::NewFeedback;
use crate::schema::feedback;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Queryable, Identifiable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = feedback)]
pub struct Feedback {
    pub id: Uuid,
    pub username: String,
    pub feedback_type: String,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Feedback {
    /// `None` when the stored type is free text outside the known categories.
    pub fn category(&self) -> Option<FeedbackCategory> {
        self.feedback_type.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    #[default]
    General,
    Bug,
    Feature,
    Billing,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 4] = [
        FeedbackCategory::General,
        FeedbackCategory::Bug,
        FeedbackCategory::Feature,
        FeedbackCategory::Billing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Billing => "billing",
        }
    }
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedbackCategory {
    type Err = FeedbackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "general" => Ok(Self::General),
            "bug" => Ok(Self::Bug),
            "feature" => Ok(Self::Feature),
            "billing" => Ok(Self::Billing),
            other => Err(FeedbackError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    MissingUsername,
    MissingMessage,
    UnknownCategory(String),
}

impl fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUsername => write!(f, "feedback must belong to a user"),
            Self::MissingMessage => write!(f, "feedback message can not be empty"),
            Self::UnknownCategory(category) => write!(f, "unknown feedback type: {category}"),
        }
    }
}

impl std::error::Error for FeedbackError {}

/// Raw values of a submitted feedback form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackForm {
    pub username: String,
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

impl FeedbackForm {
    pub fn into_new_feedback(self) -> Result<NewFeedback, FeedbackError> {
        let username = self.username.trim().to_string();
        let message = self.message.trim().to_string();

        if username.is_empty() {
            return Err(FeedbackError::MissingUsername);
        }

        if message.is_empty() {
            return Err(FeedbackError::MissingMessage);
        }

        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.to_lowercase().parse::<FeedbackCategory>()?),
        };

        let subject = self
            .subject
            .map(|subject| subject.trim().to_string())
            .filter(|subject| !subject.is_empty());

        Ok(NewFeedback {
            username,
            feedback_type: category.map(|category| category.to_string()),
            subject,
            message,
        })
    }
}
