use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::services::derived::DerivedMetrics;

/// Reason value counted towards the rotation rate.
pub const REASON_REPLACEMENT: &str = "Replacement";
pub const COLLAR_WHITE: &str = "White";
pub const COLLAR_BLUE: &str = "Blue";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Requisition {
    pub id: i32,
    pub reference_code: String,
    pub reason: String,
    pub replacement_for: Option<String>,
    pub collar_type: String,
    pub is_manager: bool,
    pub department: String,
    pub unit: String,
    pub position: String,
    pub work_location: String,
    pub hiring_manager: String,
    pub opened_on: NaiveDate,
    pub cvs_received: i32,
    pub cvs_rejected_by_recruiter: i32,
    pub recruiter_interviews: i32,
    pub hiring_manager_interviews: i32,
    pub offers_extended: i32,
    pub hires: i32,
    pub offers_declined_by_candidate: i32,
    pub closed_on: Option<NaiveDate>,
    pub hired_on: Option<NaiveDate>,
    pub employment_source: Option<String>,
    pub comment: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Requisition {
    pub fn total_interviews(&self) -> i64 {
        self.recruiter_interviews as i64 + self.hiring_manager_interviews as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisitionStatus {
    Open,
    Closed,
    Hired,
}

/// Payload for manual entry and for each item of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRequisitionRequest {
    #[validate(length(min = 1))]
    pub reference_code: String,
    #[validate(length(min = 1))]
    pub reason: String,
    pub replacement_for: Option<String>,
    #[validate(length(min = 1))]
    pub collar_type: String,
    pub is_manager: bool,
    #[validate(length(min = 1))]
    pub department: String,
    #[validate(length(min = 1))]
    pub unit: String,
    #[validate(length(min = 1))]
    pub position: String,
    #[validate(length(min = 1))]
    pub work_location: String,
    #[validate(length(min = 1))]
    pub hiring_manager: String,
    pub opened_on: NaiveDate,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub cvs_received: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub cvs_rejected_by_recruiter: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub recruiter_interviews: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub hiring_manager_interviews: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub offers_extended: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub hires: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub offers_declined_by_candidate: i32,
    pub closed_on: Option<NaiveDate>,
    pub hired_on: Option<NaiveDate>,
    pub employment_source: Option<String>,
    pub comment: Option<String>,
    pub gender: Option<String>,
}

impl From<Requisition> for CreateRequisitionRequest {
    fn from(r: Requisition) -> Self {
        Self {
            reference_code: r.reference_code,
            reason: r.reason,
            replacement_for: r.replacement_for,
            collar_type: r.collar_type,
            is_manager: r.is_manager,
            department: r.department,
            unit: r.unit,
            position: r.position,
            work_location: r.work_location,
            hiring_manager: r.hiring_manager,
            opened_on: r.opened_on,
            cvs_received: r.cvs_received,
            cvs_rejected_by_recruiter: r.cvs_rejected_by_recruiter,
            recruiter_interviews: r.recruiter_interviews,
            hiring_manager_interviews: r.hiring_manager_interviews,
            offers_extended: r.offers_extended,
            hires: r.hires,
            offers_declined_by_candidate: r.offers_declined_by_candidate,
            closed_on: r.closed_on,
            hired_on: r.hired_on,
            employment_source: r.employment_source,
            comment: r.comment,
            gender: r.gender,
        }
    }
}

/// Keeps an explicit `null` apart from an omitted field: omitted stays `None`
/// through `#[serde(default)]`, `null` becomes `Some(None)`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update. Omitted fields keep their stored value; the nullable
/// fields are cleared when sent as `null`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRequisitionRequest {
    #[validate(length(min = 1))]
    pub reference_code: Option<String>,
    #[validate(length(min = 1))]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub replacement_for: Option<Option<String>>,
    #[validate(length(min = 1))]
    pub collar_type: Option<String>,
    pub is_manager: Option<bool>,
    #[validate(length(min = 1))]
    pub department: Option<String>,
    #[validate(length(min = 1))]
    pub unit: Option<String>,
    #[validate(length(min = 1))]
    pub position: Option<String>,
    #[validate(length(min = 1))]
    pub work_location: Option<String>,
    #[validate(length(min = 1))]
    pub hiring_manager: Option<String>,
    pub opened_on: Option<NaiveDate>,
    #[validate(range(min = 0))]
    pub cvs_received: Option<i32>,
    #[validate(range(min = 0))]
    pub cvs_rejected_by_recruiter: Option<i32>,
    #[validate(range(min = 0))]
    pub recruiter_interviews: Option<i32>,
    #[validate(range(min = 0))]
    pub hiring_manager_interviews: Option<i32>,
    #[validate(range(min = 0))]
    pub offers_extended: Option<i32>,
    #[validate(range(min = 0))]
    pub hires: Option<i32>,
    #[validate(range(min = 0))]
    pub offers_declined_by_candidate: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub closed_on: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub hired_on: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub employment_source: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub comment: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<String>>,
}

/// A stored record together with its recomputed per-record metrics.
#[derive(Debug, Serialize)]
pub struct RequisitionResponse {
    #[serde(flatten)]
    pub requisition: Requisition,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
}

impl From<Requisition> for RequisitionResponse {
    fn from(requisition: Requisition) -> Self {
        let metrics = DerivedMetrics::of(&requisition);
        Self {
            requisition,
            metrics,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// An open requisition with zeroed counters.
    pub fn requisition(reference_code: &str) -> Requisition {
        let now = Utc::now();
        Requisition {
            id: 1,
            reference_code: reference_code.to_string(),
            reason: "New Position".to_string(),
            replacement_for: None,
            collar_type: COLLAR_WHITE.to_string(),
            is_manager: false,
            department: "Finance".to_string(),
            unit: "Controlling".to_string(),
            position: "Analyst".to_string(),
            work_location: "Warsaw".to_string(),
            hiring_manager: "A. Nowak".to_string(),
            opened_on: date("2024-01-01"),
            cvs_received: 0,
            cvs_rejected_by_recruiter: 0,
            recruiter_interviews: 0,
            hiring_manager_interviews: 0,
            offers_extended: 0,
            hires: 0,
            offers_declined_by_candidate: 0,
            closed_on: None,
            hired_on: None,
            employment_source: None,
            comment: None,
            gender: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn create_request_defaults_missing_counters_to_zero() {
        let payload = serde_json::json!({
            "reference_code": "REQ-1",
            "reason": "Replacement",
            "collar_type": "Blue",
            "is_manager": false,
            "department": "Operations",
            "unit": "Warehouse",
            "position": "Forklift operator",
            "work_location": "Poznan",
            "hiring_manager": "J. Kowalski",
            "opened_on": "2024-03-01"
        });

        let req: CreateRequisitionRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(req.cvs_received, 0);
        assert_eq!(req.offers_extended, 0);
        assert!(req.closed_on.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_request_rejects_negative_counters_and_blank_codes() {
        let mut req = CreateRequisitionRequest::from(requisition("REQ-2"));
        req.reference_code = String::new();
        req.hires = -1;

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("reference_code"));
        assert!(fields.contains_key("hires"));
    }

    #[test]
    fn response_flattens_record_and_derived_metrics() {
        let mut r = requisition("REQ-3");
        r.hired_on = Some(date("2024-01-31"));
        r.offers_extended = 2;
        r.hires = 1;

        let value = serde_json::to_value(RequisitionResponse::from(r)).unwrap();
        assert_eq!(value["reference_code"], "REQ-3");
        assert_eq!(value["status"], "hired");
        assert_eq!(value["time_to_fill"], 30);
        assert_eq!(value["offer_acceptance_rate"], 50.0);
        assert!(value["time_to_offer"].is_null());
    }

    #[test]
    fn update_request_tells_null_apart_from_omitted() {
        let req: UpdateRequisitionRequest = serde_json::from_value(serde_json::json!({
            "closed_on": null,
            "hired_on": "2024-02-15",
            "comment": null,
            "hires": 1
        }))
        .unwrap();

        assert_eq!(req.closed_on, Some(None));
        assert_eq!(req.hired_on, Some(Some(date("2024-02-15"))));
        assert_eq!(req.comment, Some(None));
        assert_eq!(req.gender, None);
        assert_eq!(req.replacement_for, None);
        assert_eq!(req.hires, Some(1));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_update_changes_nothing() {
        let req: UpdateRequisitionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.closed_on.is_none());
        assert!(req.employment_source.is_none());
        assert!(req.reference_code.is_none());
    }
}
