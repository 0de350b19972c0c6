use crate::schema::alerts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Queryable, Identifiable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = alerts)]
pub struct Alert {
    pub id: i64,
    pub username: String,
    pub symbol: String,
    pub target: f64,
    pub alert_type: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn kind(&self) -> Option<AlertKind> {
        self.alert_type.parse().ok()
    }

    /// Alerts with an unknown type never fire.
    pub fn is_triggered(&self, price: f64) -> bool {
        match self.kind() {
            Some(kind) => kind.is_crossed(price, self.target),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    #[default]
    Above,
    Below,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }

    pub fn is_crossed(&self, price: f64, target: f64) -> bool {
        match self {
            Self::Above => price >= target,
            Self::Below => price <= target,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            other => Err(format!("unknown alert type: {other}")),
        }
    }
}
