use dashmap::DashMap;

pub const DOWNLOAD_REQUESTS: &str = "features/download-video/requests";
pub const DOWNLOAD_RESPONSES: &str = "features/download-video/responses";
pub const DOWNLOAD_ERRORS: &str = "features/download-video/errors";
pub const INLINE_PLACEHOLDERS: &str = "features/inline/placeholders";
pub const INLINE_DELIVERED: &str = "features/inline/delivered";
pub const INLINE_FAILED: &str = "features/inline/failed";

/// Counter and error reporting sink. Implementations must never fail the caller.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, value: u64);

    fn report_error(&self, context: &str, error: &dyn std::fmt::Display);
}

/// Keeps counters in memory and mirrors every update to the log.
#[derive(Debug, Default)]
pub struct LogMetrics {
    counters: DashMap<String, u64>,
}

impl LogMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).map(|v| *v.value()).unwrap_or(0)
    }
}

impl MetricsSink for LogMetrics {
    fn increment(&self, name: &str, value: u64) {
        let total = {
            let mut counter = self.counters.entry(name.to_string()).or_insert(0);
            *counter += value;
            *counter
        };
        debug!("metric {} += {} (total {})", name, value, total);
    }

    fn report_error(&self, context: &str, error: &dyn std::fmt::Display) {
        error!("{}: {}", context, error);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_counters_accumulate_per_name() {
        let metrics = LogMetrics::new();

        metrics.increment(DOWNLOAD_REQUESTS, 1);
        metrics.increment(DOWNLOAD_REQUESTS, 2);
        metrics.increment(DOWNLOAD_ERRORS, 1);

        assert_eq!(metrics.get(DOWNLOAD_REQUESTS), 3);
        assert_eq!(metrics.get(DOWNLOAD_ERRORS), 1);
        assert_eq!(metrics.get(INLINE_DELIVERED), 0);
    }

    #[tokio::test]
    async fn test_concurrent_increments() {
        let metrics = Arc::new(LogMetrics::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        metrics.increment(INLINE_PLACEHOLDERS, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(metrics.get(INLINE_PLACEHOLDERS), 800);
    }
}
