use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LeaveType {
        Annual => "annual",
        Sick => "sick",
        Personal => "personal",
        Unpaid => "unpaid",
        Maternity => "maternity",
        Paternity => "paternity",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl LeaveStatus {
    pub fn can_transition_to(&self, next: LeaveStatus) -> bool {
        matches!(
            (self, next),
            (LeaveStatus::Pending, LeaveStatus::Approved)
                | (LeaveStatus::Pending, LeaveStatus::Rejected)
                | (LeaveStatus::Pending, LeaveStatus::Cancelled)
                | (LeaveStatus::Approved, LeaveStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Leave {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Leave {
    /// Calendar days covered, both ends inclusive.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveInput {
    /// Defaults to the caller's own employee record.
    pub employee_id: Option<Uuid>,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

impl LeaveInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err("End date cannot be before start date".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLeaveInput {
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_status_transitions() {
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Approved));
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Rejected));
        assert!(LeaveStatus::Approved.can_transition_to(LeaveStatus::Cancelled));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Approved));
        assert!(!LeaveStatus::Cancelled.can_transition_to(LeaveStatus::Pending));
        assert!(!LeaveStatus::Approved.can_transition_to(LeaveStatus::Rejected));
    }

    #[test]
    fn test_leave_date_range() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let input = LeaveInput {
            employee_id: None,
            leave_type: LeaveType::Annual,
            start_date: start,
            end_date: start.pred_opt().unwrap(),
            reason: None,
        };
        assert!(input.validate().is_err());

        let input = LeaveInput {
            end_date: start,
            ..input
        };
        assert!(input.validate().is_ok());
    }
}
