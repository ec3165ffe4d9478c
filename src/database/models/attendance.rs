use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AttendanceStatus {
        Present => "present",
        Absent => "absent",
        Late => "late",
        HalfDay => "half_day",
        Remote => "remote",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceInput {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

impl AttendanceInput {
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(check_in), Some(check_out)) = (self.check_in, self.check_out) {
            if check_out < check_in {
                return Err("Check-out cannot be earlier than check-in".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInInput {
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_check_out_before_check_in_is_rejected() {
        let now = Utc::now();
        let mut input = AttendanceInput {
            employee_id: Uuid::new_v4(),
            date: now.date_naive(),
            check_in: Some(now),
            check_out: Some(now - Duration::hours(1)),
            status: AttendanceStatus::Present,
            notes: None,
        };
        assert!(input.validate().is_err());

        input.check_out = Some(now + Duration::hours(8));
        assert!(input.validate().is_ok());

        input.check_in = None;
        assert!(input.validate().is_ok());
    }
}
