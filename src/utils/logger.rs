use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "recruitment-stats-backend";
pub const DEFAULT_SLOW_QUERY_MS: u64 = 1000;

#[derive(Debug)]
pub struct StructuredLogger {
    slow_query_ms: AtomicU64,
}

impl StructuredLogger {
    pub const fn new() -> Self {
        Self {
            slow_query_ms: AtomicU64::new(DEFAULT_SLOW_QUERY_MS),
        }
    }

    /// Queries taking longer than this are logged at warn level.
    pub fn set_slow_query_threshold(&self, threshold_ms: u64) {
        self.slow_query_ms.store(threshold_ms, Ordering::Relaxed);
    }

    fn is_slow(&self, duration_ms: u128) -> bool {
        duration_ms > u128::from(self.slow_query_ms.load(Ordering::Relaxed))
    }

    pub fn log_request(&self, method: &str, path: &str, status: u16) {
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "http_request",
            "method": method,
            "path": path,
            "status_code": status,
            "service": SERVICE_NAME
        });

        info!("{}", log_entry);
    }

    pub fn log_database_query(&self, query: &str, duration_ms: u128, result_count: Option<usize>) {
        let preview: String = query.chars().take(100).collect();
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "database_query",
            "query_hash": format!("{:x}", md5::compute(query)),
            "query_preview": if preview.len() < query.len() {
                format!("{}...", preview)
            } else {
                preview
            },
            "duration_ms": duration_ms,
            "result_count": result_count,
            "service": SERVICE_NAME
        });

        if self.is_slow(duration_ms) {
            warn!("Slow query detected: {}", log_entry);
        } else {
            info!("{}", log_entry);
        }
    }

    pub fn log_error(&self, error: &str, context: HashMap<String, serde_json::Value>) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "error",
            "error_message": error,
            "service": SERVICE_NAME
        });

        for (key, value) in context {
            log_entry[key] = value;
        }

        error!("{}", log_entry);
    }

    pub fn log_performance_metric(
        &self,
        metric_name: &str,
        value: f64,
        tags: HashMap<String, String>,
    ) {
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "performance_metric",
            "metric_name": metric_name,
            "value": value,
            "tags": tags,
            "service": SERVICE_NAME
        });

        info!("{}", log_entry);
    }

    pub fn log_business_event(&self, event_name: &str, metadata: HashMap<String, serde_json::Value>) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "business_event",
            "event_name": event_name,
            "service": SERVICE_NAME
        });

        for (key, value) in metadata {
            log_entry[key] = value;
        }

        info!("{}", log_entry);
    }
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new()
    }
}

pub static LOGGER: StructuredLogger = StructuredLogger::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_query_threshold_is_adjustable() {
        let logger = StructuredLogger::new();
        assert!(!logger.is_slow(1000));
        assert!(logger.is_slow(1001));

        logger.set_slow_query_threshold(250);
        assert!(logger.is_slow(251));
        assert!(!logger.is_slow(250));
    }
}
