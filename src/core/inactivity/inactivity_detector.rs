use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InactivityError {
    #[error("membership service error: {0}")]
    Service(String),
}

/// Port over the external membership capability: how many members have not
/// been active within the last `days` days. `None` means the service could
/// not produce an estimate.
#[async_trait]
pub trait MembershipGauge: Send + Sync {
    async fn estimate_inactive(&self, days: u8) -> Result<Option<u64>, InactivityError>;
}

/// Thin typed facade over a [`MembershipGauge`]. Holds no state beyond the
/// gauge and does no local computation.
pub struct InactivityDetector<G: MembershipGauge> {
    gauge: G,
}

impl<G: MembershipGauge> InactivityDetector<G> {
    pub fn new(gauge: G) -> Self {
        Self { gauge }
    }

    pub async fn detect(&self, days: u8) -> Result<Option<u64>, InactivityError> {
        tracing::info!(days, "detecting inactive members");
        let estimated = self.gauge.estimate_inactive(days).await?;
        tracing::info!(?estimated, "inactive member estimate");
        Ok(estimated)
    }
}

/// The user-facing report line. Callers rely on both numbers appearing.
pub fn format_inactive_report(days: u8, count: u64) -> String {
    format!("{count} members have not been active in the last {days} days.")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGauge(Option<u64>);

    #[async_trait]
    impl MembershipGauge for FixedGauge {
        async fn estimate_inactive(&self, _days: u8) -> Result<Option<u64>, InactivityError> {
            Ok(self.0)
        }
    }

    struct BrokenGauge;

    #[async_trait]
    impl MembershipGauge for BrokenGauge {
        async fn estimate_inactive(&self, _days: u8) -> Result<Option<u64>, InactivityError> {
            Err(InactivityError::Service("gateway unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn passes_the_estimate_through() {
        let detector = InactivityDetector::new(FixedGauge(Some(3)));
        assert_eq!(detector.detect(7).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn missing_estimate_stays_absent() {
        let detector = InactivityDetector::new(FixedGauge(None));
        assert_eq!(detector.detect(7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn gauge_errors_propagate() {
        let detector = InactivityDetector::new(BrokenGauge);
        let err = detector.detect(7).await.unwrap_err();
        assert!(err.to_string().contains("gateway unreachable"));
    }

    #[test]
    fn report_line_contains_both_numbers() {
        let report = format_inactive_report(7, 3);
        assert!(report.contains('7'));
        assert!(report.contains('3'));
    }
}
