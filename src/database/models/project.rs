use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use super::money::check_amount;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ProjectStatus {
        Planning => "planning",
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<BigDecimal>,
    pub owner_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<BigDecimal>,
    pub owner_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

impl ProjectInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Project name is required".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err("Project end date cannot be before its start date".to_string());
            }
        }
        if let Some(budget) = &self.budget {
            if *budget < BigDecimal::from(0) {
                return Err("Budget cannot be negative".to_string());
            }
            check_amount("budget", budget)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub owner_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input(budget: Option<&str>) -> ProjectInput {
        ProjectInput {
            name: "Winter campaign".to_string(),
            description: None,
            status: None,
            start_date: None,
            end_date: None,
            budget: budget.map(|b| BigDecimal::from_str(b).unwrap()),
            owner_id: None,
            team_id: None,
        }
    }

    #[test]
    fn test_budget_validation() {
        assert!(input(None).validate().is_ok());
        assert!(input(Some("15000.50")).validate().is_ok());
        assert_eq!(
            input(Some("-1")).validate().unwrap_err(),
            "Budget cannot be negative"
        );
        assert_eq!(
            input(Some("1e13")).validate().unwrap_err(),
            "budget is too large"
        );
        assert!(input(Some("99.999")).validate().is_err());
    }
}
