//! Outbound HTTP ports: spreadsheet backup and asset storage
//!
//! Both services are optional. Without a configured URL the sheet backup
//! runs in dev mode (logs the payload and reports success) while the asset
//! store refuses uploads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DailySummary;

/// Port errors
#[derive(Error, Debug)]
pub enum PortError {
    #[error("Asset store is not configured")]
    AssetStoreUnavailable,

    #[error("Upstream request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),
}

impl From<reqwest::Error> for PortError {
    fn from(e: reqwest::Error) -> Self {
        PortError::RequestFailed(e.to_string())
    }
}

impl From<PortError> for crate::error::ApiError {
    fn from(e: PortError) -> Self {
        use crate::error::ApiError;
        match e {
            PortError::AssetStoreUnavailable => ApiError::ServiceUnavailable(e.to_string()),
            PortError::RequestFailed(_) | PortError::UpstreamStatus(_) => {
                ApiError::ExternalServiceError(e.to_string())
            }
        }
    }
}

/// Result of a daily-summary backup attempt
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupOutcome {
    pub date: String,
    pub backed_up: bool,
    pub dev_mode: bool,
}

/// Backup status for a given date, as reported by the upstream sheet
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupStatus {
    pub date: String,
    pub exists: bool,
}

/// Pushes daily collection summaries to an external spreadsheet webhook
#[derive(Clone)]
pub struct SheetBackupService {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl SheetBackupService {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Whether a real upstream is configured
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Push one day's summary upstream. In dev mode the summary is logged
    /// and the call reports success without a network round trip.
    pub async fn backup_daily_summary(
        &self,
        summary: &DailySummary,
    ) -> Result<BackupOutcome, PortError> {
        let Some(base_url) = &self.base_url else {
            tracing::info!(
                date = %summary.date,
                total_collected = summary.total_collected,
                total_payments = summary.total_payments,
                "Sheet backup not configured, logging summary instead"
            );
            return Ok(BackupOutcome {
                date: summary.date.clone(),
                backed_up: false,
                dev_mode: true,
            });
        };

        let response = self
            .client
            .post(format!("{}/backup", base_url))
            .json(summary)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PortError::UpstreamStatus(response.status().as_u16()));
        }

        tracing::info!(date = %summary.date, "Daily summary backed up");
        Ok(BackupOutcome {
            date: summary.date.clone(),
            backed_up: true,
            dev_mode: false,
        })
    }

    /// Ask the upstream whether a backup exists for the given date
    pub async fn status(&self, date: &str) -> Result<BackupStatus, PortError> {
        let Some(base_url) = &self.base_url else {
            return Ok(BackupStatus {
                date: date.to_string(),
                exists: false,
            });
        };

        let response = self
            .client
            .get(format!("{}/backup/{}", base_url, date))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PortError::UpstreamStatus(response.status().as_u16()));
        }

        let status = response.json::<BackupStatus>().await?;
        Ok(status)
    }
}

#[derive(Serialize)]
struct StoreAssetRequest<'a> {
    kind: &'a str,
    filename: &'a str,
    data_base64: &'a str,
}

#[derive(Deserialize)]
struct StoreAssetResponse {
    url: String,
}

/// Stores borrower photos and ID proofs with an external asset service
#[derive(Clone)]
pub struct AssetStoreService {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl AssetStoreService {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Upload a base64-encoded asset and return its public URL
    pub async fn store(
        &self,
        kind: &str,
        filename: &str,
        data_base64: &str,
    ) -> Result<String, PortError> {
        let base_url = self
            .base_url
            .as_ref()
            .ok_or(PortError::AssetStoreUnavailable)?;

        let response = self
            .client
            .post(format!("{}/assets", base_url))
            .json(&StoreAssetRequest {
                kind,
                filename,
                data_base64,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PortError::UpstreamStatus(response.status().as_u16()));
        }

        let stored = response.json::<StoreAssetResponse>().await?;
        Ok(stored.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_backup_reports_dev_mode() {
        let service = SheetBackupService::new(None);
        let summary = DailySummary {
            date: "2024-01-08".to_string(),
            total_collected: 1500,
            total_payments: 2,
            total_outstanding: 8500,
            collectors: vec![],
            payments: vec![],
        };

        let outcome = service.backup_daily_summary(&summary).await.unwrap();
        assert!(outcome.dev_mode);
        assert!(!outcome.backed_up);
        assert_eq!(outcome.date, "2024-01-08");
    }

    #[tokio::test]
    async fn test_unconfigured_status_reports_missing() {
        let service = SheetBackupService::new(None);
        let status = service.status("2024-01-08").await.unwrap();
        assert!(!status.exists);
    }

    #[tokio::test]
    async fn test_unconfigured_asset_store_refuses_upload() {
        let service = AssetStoreService::new(None);
        let result = service.store("photo", "asha.jpg", "aGVsbG8=").await;
        assert!(matches!(result, Err(PortError::AssetStoreUnavailable)));
    }
}
