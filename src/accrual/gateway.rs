use super::error::AccrualError;
use crate::core_types::MinorUnits;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Status reported by the accrual authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl AccrualStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccrualStatus::Registered => "REGISTERED",
            AccrualStatus::Processing => "PROCESSING",
            AccrualStatus::Invalid => "INVALID",
            AccrualStatus::Processed => "PROCESSED",
        }
    }

    /// Whether the authority has reached a final verdict
    pub fn is_final(&self) -> bool {
        matches!(self, AccrualStatus::Invalid | AccrualStatus::Processed)
    }
}

impl fmt::Display for AccrualStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccrualStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTERED" => Ok(AccrualStatus::Registered),
            "PROCESSING" => Ok(AccrualStatus::Processing),
            "INVALID" => Ok(AccrualStatus::Invalid),
            "PROCESSED" => Ok(AccrualStatus::Processed),
            other => Err(format!("unknown accrual status: {}", other)),
        }
    }
}

/// Decision of the authority for one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub status: AccrualStatus,
    /// Minor units; meaningful only for `Processed`
    pub accrual: MinorUnits,
}

impl Decision {
    pub fn processed(accrual: MinorUnits) -> Self {
        Self {
            status: AccrualStatus::Processed,
            accrual,
        }
    }

    pub fn pending(status: AccrualStatus) -> Self {
        Self { status, accrual: 0 }
    }
}

#[async_trait]
pub trait AccrualGateway: Send + Sync {
    /// Ask the authority for the decision on `order_number`.
    ///
    /// A rate limit is reported as [`AccrualError::RateLimited`].
    async fn process(&self, order_number: &str) -> Result<Decision, AccrualError>;
}


#[cfg(test)]
mod tests {
    use super::mock::{MockAccrualGateway, Reply};
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "PROCESSED".parse::<AccrualStatus>().unwrap(),
            AccrualStatus::Processed
        );
        assert_eq!(
            "REGISTERED".parse::<AccrualStatus>().unwrap(),
            AccrualStatus::Registered
        );
        assert!("processed".parse::<AccrualStatus>().is_err());
        assert!("NEW".parse::<AccrualStatus>().is_err());
    }

    #[test]
    fn test_final_statuses() {
        assert!(AccrualStatus::Processed.is_final());
        assert!(AccrualStatus::Invalid.is_final());
        assert!(!AccrualStatus::Registered.is_final());
        assert!(!AccrualStatus::Processing.is_final());
    }

    #[tokio::test]
    async fn test_mock_replays_script() {
        let gateway = MockAccrualGateway::new();
        gateway.script(
            "79927398713",
            vec![
                Reply::Error(AccrualError::RateLimited {
                    retry_after: Duration::from_secs(30),
                }),
                Reply::Decision(Decision::processed(50_000)),
            ],
        );

        assert!(gateway.process("79927398713").await.unwrap_err().is_retryable());
        assert_eq!(
            gateway.process("79927398713").await.unwrap(),
            Decision::processed(50_000)
        );
        // Last reply repeats
        assert_eq!(
            gateway.process("79927398713").await.unwrap(),
            Decision::processed(50_000)
        );
        assert_eq!(gateway.calls("79927398713"), 3);
    }

    #[tokio::test]
    async fn test_mock_default_is_registered() {
        let gateway = MockAccrualGateway::new();
        let decision = gateway.process("12345678903").await.unwrap();
        assert_eq!(decision.status, AccrualStatus::Registered);
    }
}
