use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use super::money::check_amount;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayrollStatus {
        Draft => "draft",
        Processed => "processed",
        Paid => "paid",
    }
}

impl PayrollStatus {
    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        matches!(
            (self, next),
            (PayrollStatus::Draft, PayrollStatus::Processed)
                | (PayrollStatus::Processed, PayrollStatus::Draft)
                | (PayrollStatus::Processed, PayrollStatus::Paid)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub basic_salary: BigDecimal,
    pub allowances: BigDecimal,
    pub deductions: BigDecimal,
    pub net_salary: BigDecimal,
    pub status: PayrollStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Amounts are stored as submitted; the server does not derive `net_salary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollInput {
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub basic_salary: BigDecimal,
    pub allowances: BigDecimal,
    pub deductions: BigDecimal,
    pub net_salary: BigDecimal,
    pub notes: Option<String>,
}

impl PayrollInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.period_end < self.period_start {
            return Err("Pay period end cannot be before its start".to_string());
        }

        let zero = BigDecimal::from(0);
        let amounts = [
            ("basicSalary", &self.basic_salary),
            ("allowances", &self.allowances),
            ("deductions", &self.deductions),
            ("netSalary", &self.net_salary),
        ];
        for (field, amount) in amounts {
            if *amount < zero {
                return Err(format!("{} cannot be negative", field));
            }
            check_amount(field, amount)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollStatusInput {
    pub status: PayrollStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<PayrollStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PayrollInput {
        let start = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        PayrollInput {
            employee_id: Uuid::new_v4(),
            period_start: start,
            period_end: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
            basic_salary: BigDecimal::from(5000),
            allowances: BigDecimal::from(250),
            deductions: BigDecimal::from(400),
            net_salary: BigDecimal::from(4850),
            notes: None,
        }
    }

    #[test]
    fn test_valid_payroll() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let mut payroll = input();
        payroll.deductions = BigDecimal::from(-1);
        assert_eq!(
            payroll.validate().unwrap_err(),
            "deductions cannot be negative"
        );
    }

    #[test]
    fn test_amounts_must_fit_money_column() {
        use std::str::FromStr;

        let mut payroll = input();
        payroll.basic_salary = BigDecimal::from_str("2500000000000").unwrap();
        assert_eq!(payroll.validate().unwrap_err(), "basicSalary is too large");

        let mut payroll = input();
        payroll.allowances = BigDecimal::from_str("12.345").unwrap();
        assert_eq!(
            payroll.validate().unwrap_err(),
            "allowances cannot have more than 2 decimal places"
        );
    }

    #[test]
    fn test_inverted_period_is_rejected() {
        let mut payroll = input();
        payroll.period_end = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert!(payroll.validate().is_err());
    }

    #[test]
    fn test_payroll_status_transitions() {
        assert!(PayrollStatus::Draft.can_transition_to(PayrollStatus::Processed));
        assert!(PayrollStatus::Processed.can_transition_to(PayrollStatus::Paid));
        assert!(!PayrollStatus::Draft.can_transition_to(PayrollStatus::Paid));
        assert!(!PayrollStatus::Paid.can_transition_to(PayrollStatus::Draft));
    }
}
