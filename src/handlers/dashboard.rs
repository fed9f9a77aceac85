use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::{
    services::{
        dashboard::{aggregate, MetricBundle},
        requisitions::{DashboardFilter, FilterOptions, RequisitionService},
    },
    utils::{errors::AppError, logger::LOGGER},
    AppState,
};

/// Raw query string of `/api/dashboard`. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub opened_from: Option<String>,
    pub opened_to: Option<String>,
    pub department: Option<String>,
    pub collar_type: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(name: &str, value: Option<String>) -> Result<Option<NaiveDate>, AppError> {
    non_empty(value)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                AppError::BadRequest(format!("{} must be a date in YYYY-MM-DD format", name))
            })
        })
        .transpose()
}

impl TryFrom<DashboardQuery> for DashboardFilter {
    type Error = AppError;

    fn try_from(query: DashboardQuery) -> Result<Self, Self::Error> {
        let opened_from = parse_date("opened_from", query.opened_from)?;
        let opened_to = parse_date("opened_to", query.opened_to)?;

        if let (Some(from), Some(to)) = (opened_from, opened_to) {
            if from > to {
                return Err(AppError::BadRequest(
                    "opened_from must not be later than opened_to".to_string(),
                ));
            }
        }

        Ok(DashboardFilter {
            opened_from,
            opened_to,
            department: non_empty(query.department),
            collar_type: non_empty(query.collar_type),
        })
    }
}

fn delivery_metadata(bundle: &MetricBundle) -> HashMap<String, serde_json::Value> {
    let mut metadata = HashMap::new();
    metadata.insert(
        "record_count".to_string(),
        serde_json::Value::from(bundle.total_count()),
    );
    metadata.insert(
        "has_data".to_string(),
        serde_json::Value::Bool(bundle.metrics().is_some()),
    );
    if let Some(metrics) = bundle.metrics() {
        metadata.insert(
            "hired_count".to_string(),
            serde_json::Value::from(metrics.hired_count),
        );
    }
    metadata
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<MetricBundle>, AppError> {
    let filter = DashboardFilter::try_from(query)?;

    let records = RequisitionService::new(state.db.clone())
        .fetch_filtered(&filter)
        .await?;

    let start_time = Instant::now();
    let bundle = aggregate(&records);
    LOGGER.log_performance_metric(
        "dashboard_aggregation_duration",
        start_time.elapsed().as_secs_f64() * 1000.0,
        HashMap::new(),
    );
    LOGGER.log_business_event("dashboard_delivered", delivery_metadata(&bundle));

    LOGGER.log_request("GET", "/api/dashboard", 200);
    Ok(Json(bundle))
}

pub async fn get_filter_options(
    State(state): State<AppState>,
) -> Result<Json<FilterOptions>, AppError> {
    let options = RequisitionService::new(state.db.clone())
        .filter_options()
        .await?;
    Ok(Json(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requisition::fixtures::{date, requisition};

    fn query(from: &str, to: &str) -> DashboardQuery {
        DashboardQuery {
            opened_from: Some(from.to_string()),
            opened_to: Some(to.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn blank_parameters_are_treated_as_absent() {
        let filter = DashboardFilter::try_from(DashboardQuery {
            opened_from: Some(String::new()),
            opened_to: None,
            department: Some("  ".to_string()),
            collar_type: Some("White".to_string()),
        })
        .unwrap();

        assert_eq!(
            filter,
            DashboardFilter {
                collar_type: Some("White".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn date_bounds_are_parsed_inclusively() {
        let filter = DashboardFilter::try_from(query("2024-01-01", "2024-01-01")).unwrap();
        assert_eq!(filter.opened_from, Some(date("2024-01-01")));
        assert_eq!(filter.opened_to, Some(date("2024-01-01")));
    }

    #[test]
    fn delivery_log_reports_whether_data_was_found() {
        let empty = delivery_metadata(&aggregate(&[]));
        assert_eq!(empty["record_count"], 0);
        assert_eq!(empty["has_data"], false);
        assert!(!empty.contains_key("hired_count"));

        let mut hired = requisition("D-1");
        hired.hired_on = Some(date("2024-02-01"));
        let populated = delivery_metadata(&aggregate(&[hired, requisition("D-2")]));
        assert_eq!(populated["record_count"], 2);
        assert_eq!(populated["has_data"], true);
        assert_eq!(populated["hired_count"], 1);
    }

    #[test]
    fn malformed_or_inverted_dates_are_rejected() {
        assert!(matches!(
            DashboardFilter::try_from(query("01/02/2024", "2024-03-01")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            DashboardFilter::try_from(query("2024-03-01", "2024-02-01")),
            Err(AppError::BadRequest(_))
        ));
    }
}
