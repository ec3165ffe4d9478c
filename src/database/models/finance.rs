use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use super::money::check_amount;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income => "income",
        Expense => "expense",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinanceTransaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub transaction_date: NaiveDate,
    pub project_id: Option<Uuid>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub kind: TransactionKind,
    pub category: String,
    pub amount: BigDecimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub transaction_date: NaiveDate,
    pub project_id: Option<Uuid>,
}

impl TransactionInput {
    pub const DEFAULT_CURRENCY: &'static str = "USD";

    pub fn currency(&self) -> String {
        self.currency
            .as_deref()
            .unwrap_or(Self::DEFAULT_CURRENCY)
            .to_uppercase()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("Category is required".to_string());
        }
        if self.amount <= BigDecimal::from(0) {
            return Err("Amount must be greater than zero".to_string());
        }
        check_amount("amount", &self.amount)?;
        let currency = self.currency();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err("Currency must be a 3-letter code".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub project_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummaryRow {
    pub currency: String,
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub transaction_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub currency: String,
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub balance: BigDecimal,
    pub transaction_count: i64,
}

impl From<FinanceSummaryRow> for FinanceSummary {
    fn from(row: FinanceSummaryRow) -> Self {
        let balance = &row.total_income - &row.total_expense;
        Self {
            currency: row.currency,
            total_income: row.total_income,
            total_expense: row.total_expense,
            balance,
            transaction_count: row.transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;

    fn input(amount: i32, currency: Option<&str>) -> TransactionInput {
        TransactionInput {
            kind: TransactionKind::Expense,
            category: "equipment".to_string(),
            amount: BigDecimal::from(amount),
            currency: currency.map(str::to_string),
            description: None,
            reference: None,
            transaction_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            project_id: None,
        }
    }

    #[test]
    fn test_transaction_validation() {
        assert!(input(120, None).validate().is_ok());
        assert!(input(0, None).validate().is_err());
        assert!(input(10, Some("EURO")).validate().is_err());
        assert_eq!(input(10, Some("eur")).currency(), "EUR");
    }

    #[test]
    fn test_amount_must_fit_money_column() {
        let mut overflowing = input(1, None);
        overflowing.amount = BigDecimal::from_str("1e15").unwrap();
        assert_eq!(overflowing.validate().unwrap_err(), "amount is too large");

        let mut fractional = input(1, None);
        fractional.amount = BigDecimal::from_str("10.005").unwrap();
        assert!(fractional.validate().is_err());
    }

    #[test]
    fn test_summary_balance() {
        let summary = FinanceSummary::from(FinanceSummaryRow {
            currency: "USD".to_string(),
            total_income: BigDecimal::from(1000),
            total_expense: BigDecimal::from(1250),
            transaction_count: 4,
        });
        assert_eq!(summary.balance, BigDecimal::from(-250));
    }
}
