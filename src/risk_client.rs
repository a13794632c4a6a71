// Standard library imports
use std::time::Duration;

// Third party imports
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

// Internal imports
use crate::config::Config;
use crate::error::QueryError;
use crate::types::{ProtocolInfo, ProtocolList, RiskSnapshot};

/// Seam between the poller / command layer and the risk-scoring backend.
///
/// Holds no mutable state, so one instance is safely shared between the
/// timer-driven poller and ad hoc `/risk` command requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RiskSource: Send + Sync + 'static {
    /// One bounded round-trip to `GET /api/predict_risk` for one protocol.
    async fn query_risk(&self, protocol: &str) -> Result<RiskSnapshot, QueryError>;

    /// Fetch the backend's supported-protocol roster.
    async fn list_protocols(&self) -> Result<Vec<ProtocolInfo>, QueryError>;
}

/// HTTP client for the risk-scoring service.
#[derive(Debug, Clone)]
pub struct HttpRiskClient {
    client: reqwest::Client,
    api_base: String,
}

impl HttpRiskClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_base.clone(), config.query_timeout)
    }
}

#[async_trait]
impl RiskSource for HttpRiskClient {
    async fn query_risk(&self, protocol: &str) -> Result<RiskSnapshot, QueryError> {
        let url = format!("{}/api/predict_risk", self.api_base);
        debug!(protocol, "querying risk backend");

        let response = self
            .client
            .get(&url)
            .query(&[("protocol", protocol)])
            .send()
            .await
            .map_err(|e| QueryError::from_reqwest(protocol, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Backend {
                protocol: protocol.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<RiskSnapshot>()
            .await
            .map_err(|e| QueryError::Malformed {
                protocol: protocol.to_string(),
                message: e.to_string(),
            })
    }

    async fn list_protocols(&self) -> Result<Vec<ProtocolInfo>, QueryError> {
        let url = format!("{}/api/protocols", self.api_base);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QueryError::from_reqwest("protocols", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Backend {
                protocol: "protocols".to_string(),
                status: status.as_u16(),
            });
        }

        let list = response
            .json::<ProtocolList>()
            .await
            .map_err(|e| QueryError::Malformed {
                protocol: "protocols".to_string(),
                message: e.to_string(),
            })?;

        Ok(list.protocols)
    }
}
