//! HTTP client for the accrual authority

use super::error::AccrualError;
use super::gateway::{AccrualGateway, AccrualStatus, Decision};
use crate::config::AccrualConfig;
use crate::money::json_number_to_minor_units;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Response body of `GET /api/orders/{number}`
#[derive(Debug, Deserialize)]
struct OrderResponse {
    order: String,
    status: String,
    #[serde(default)]
    accrual: Option<serde_json::Number>,
}

pub struct HttpAccrualClient {
    client: reqwest::Client,
    base_url: String,
    default_retry_after: Duration,
}

impl HttpAccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self, AccrualError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AccrualError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        })
    }

    fn order_url(&self, order_number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, order_number)
    }
}

#[async_trait]
impl AccrualGateway for HttpAccrualClient {
    async fn process(&self, order_number: &str) -> Result<Decision, AccrualError> {
        let url = self.order_url(order_number);
        debug!(order = %order_number, %url, "Querying accrual authority");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                AccrualError::Transport(format!("request timed out: {}", e))
            } else {
                AccrualError::Transport(format!("HTTP request failed: {}", e))
            }
        })?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| AccrualError::Transport(format!("Failed to read body: {}", e)))?;
                decode_decision(order_number, &body)
            }
            StatusCode::NO_CONTENT => Ok(Decision::pending(AccrualStatus::Registered)),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = retry_after(response.headers(), self.default_retry_after);
                warn!(
                    order = %order_number,
                    retry_after_secs = retry_after.as_secs(),
                    "Accrual authority rate limit"
                );
                Err(AccrualError::RateLimited { retry_after })
            }
            other => Err(AccrualError::UnexpectedStatus(other.as_u16())),
        }
    }
}

/// Upper bound on a Retry-After hint
const MAX_RETRY_AFTER_SECS: u64 = 24 * 60 * 60;

/// Parse the Retry-After header as whole seconds, falling back to `default`.
/// Values above [`MAX_RETRY_AFTER_SECS`] are clamped.
fn retry_after(headers: &HeaderMap, default: Duration) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
        .unwrap_or(default)
}

fn decode_decision(order_number: &str, body: &[u8]) -> Result<Decision, AccrualError> {
    let parsed: OrderResponse = serde_json::from_slice(body)
        .map_err(|e| AccrualError::Protocol(format!("malformed body: {}", e)))?;

    if parsed.order != order_number {
        return Err(AccrualError::Protocol(format!(
            "response for order {} while asking for {}",
            parsed.order, order_number
        )));
    }

    let status = AccrualStatus::from_str(&parsed.status).map_err(AccrualError::Protocol)?;
    if status != AccrualStatus::Processed {
        return Ok(Decision::pending(status));
    }

    let accrual = match parsed.accrual {
        Some(number) => json_number_to_minor_units(&number)
            .map_err(|e| AccrualError::Protocol(format!("accrual: {}", e)))?,
        None => 0,
    };
    if accrual < 0 {
        return Err(AccrualError::Protocol(format!(
            "negative accrual {} for order {}",
            accrual, order_number
        )));
    }

    Ok(Decision::processed(accrual))
}
