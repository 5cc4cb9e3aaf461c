use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::api::{self, ApiClient};

/// Report channel this dashboard works with.
pub const REPORT_TYPE: &str = "square_sales";

/// Upper bound on the cached summary list.
pub const RECENT_LIMIT: usize = 30;

#[derive(Debug)]
pub enum ReportsError {
    Transport(reqwest::Error),
    Rejected { detail: Option<String> },
}

impl ReportsError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail } => detail.as_deref(),
            Self::Transport(_) => None,
        }
    }
}

impl fmt::Display for ReportsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "report request failed: {err}"),
            Self::Rejected { detail: Some(d) } => write!(f, "{d}"),
            Self::Rejected { detail: None } => write!(f, "report request rejected"),
        }
    }
}

impl From<reqwest::Error> for ReportsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Completed,
    Other,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Other => "other",
        }
    }
}

fn status_from_str<'de, D>(deserializer: D) -> Result<TransactionStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(match raw.as_str() {
        "completed" => TransactionStatus::Completed,
        _ => TransactionStatus::Other,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub order_id: String,
    pub amount: Decimal,
    #[serde(deserialize_with = "status_from_str")]
    pub status: TransactionStatus,
    pub user_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub pickup_code: Option<String>,
}

/// Backend-computed daily aggregate. This layer renders and exports it,
/// never recomputes it.
#[derive(Debug, Clone, Deserialize)]
pub struct Report {
    pub report_id: String,
    pub report_date: String,
    pub total_amount: Decimal,
    pub total_transactions: u64,
    pub average_transaction: Decimal,
    pub successful_payments: u64,
    pub failed_payments: u64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    pub generated_at: Option<String>,
    pub generated_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSummary {
    pub report_id: String,
    pub report_date: String,
    pub total_amount: Decimal,
    pub total_transactions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickStats {
    pub total_square_sales: Decimal,
    pub total_transactions: u64,
    pub average_transaction: Decimal,
}

#[derive(Deserialize)]
struct ReportList {
    reports: Vec<ReportSummary>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    report_date: &'a str,
    report_type: &'static str,
}

async fn ok_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ReportsError> {
    if !response.status().is_success() {
        let detail = api::error_detail(response).await;
        return Err(ReportsError::Rejected { detail });
    }
    Ok(response.json().await?)
}

/// Most recent report summaries, newest first, capped at [`RECENT_LIMIT`].
pub async fn recent(api: &ApiClient, limit: usize) -> Result<Vec<ReportSummary>, ReportsError> {
    let limit = limit.min(RECENT_LIMIT);
    let response = api
        .get(&format!(
            "/api/admin/reports?report_type={REPORT_TYPE}&limit={limit}"
        ))
        .await?;
    ok_json::<ReportList>(response).await.map(|list| list.reports)
}

pub async fn quick_stats_today(api: &ApiClient) -> Result<QuickStats, ReportsError> {
    let response = api.get("/api/admin/reports/quick-stats/today").await?;
    ok_json(response).await
}

pub async fn generate(api: &ApiClient, report_date: &str) -> Result<Report, ReportsError> {
    let response = api
        .post_json(
            "/api/admin/reports/generate",
            &GenerateRequest {
                report_date,
                report_type: REPORT_TYPE,
            },
        )
        .await?;
    ok_json(response).await
}

pub async fn fetch(api: &ApiClient, report_id: &str) -> Result<Report, ReportsError> {
    let response = api.get(&format!("/api/admin/reports/{report_id}")).await?;
    ok_json(response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_normalizes_to_other() {
        let json = r#"{
            "transaction_id": "t1",
            "order_id": "o1",
            "amount": 12.5,
            "status": "refund_pending",
            "user_email": "a@example.com",
            "created_at": "2024-01-15T10:30:00Z"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.status, TransactionStatus::Other);
        assert!(tx.pickup_code.is_none());
    }

    #[test]
    fn report_without_transactions_parses() {
        let json = r#"{
            "report_id": "r1",
            "report_date": "2024-01-15",
            "total_amount": 0,
            "total_transactions": 0,
            "average_transaction": 0,
            "successful_payments": 0,
            "failed_payments": 0
        }"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert!(report.transactions.is_empty());
        assert!(report.generated_by.is_none());
    }
}
