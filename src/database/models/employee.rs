use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EmployeeStatus {
        Active => "active",
        OnLeave => "on_leave",
        Terminated => "terminated",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub date_of_joining: NaiveDate,
    pub status: EmployeeStatus,
    pub manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub user_id: Option<Uuid>,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub date_of_joining: NaiveDate,
    pub status: Option<EmployeeStatus>,
    pub manager_id: Option<Uuid>,
}

impl EmployeeInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.employee_code.trim().is_empty() {
            return Err("Employee code is required".to_string());
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("First and last name are required".to_string());
        }
        if !self.email.contains('@') {
            return Err("A valid email is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub manager_id: Option<Uuid>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> EmployeeInput {
        EmployeeInput {
            user_id: None,
            employee_code: "EMP-001".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            department: Some("Engineering".to_string()),
            designation: None,
            date_of_joining: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            status: None,
            manager_id: None,
        }
    }

    #[test]
    fn test_employee_validation() {
        assert!(input().validate().is_ok());

        let mut missing_code = input();
        missing_code.employee_code = "  ".to_string();
        assert!(missing_code.validate().is_err());

        let mut bad_email = input();
        bad_email.email = "ada".to_string();
        assert!(bad_email.validate().is_err());
    }
}
