//! Per-record metrics recomputed from a single requisition's fields.
//!
//! Every function here is total: when its inputs are missing the result is
//! `None`, never zero and never an error. Dates out of order produce negative
//! day counts, which are passed through as-is.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::requisition::{Requisition, RequisitionStatus};
use crate::services::stats::round_to;

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// `Hired` wins over `Closed` when both dates are present.
pub fn status(r: &Requisition) -> RequisitionStatus {
    if r.hired_on.is_some() {
        RequisitionStatus::Hired
    } else if r.closed_on.is_some() {
        RequisitionStatus::Closed
    } else {
        RequisitionStatus::Open
    }
}

/// Days from opening to hire.
pub fn time_to_fill(r: &Requisition) -> Option<i64> {
    r.hired_on.map(|hired| days_between(r.opened_on, hired))
}

/// Days from opening to the first offer.
///
/// The first-offer date is not tracked, so the closing date stands in for it.
/// Treat the value as an approximation.
pub fn time_to_offer(r: &Requisition) -> Option<i64> {
    if r.offers_extended <= 0 {
        return None;
    }
    r.closed_on.map(|closed| days_between(r.opened_on, closed))
}

/// Days from opening to closing, regardless of offers.
pub fn open_duration(r: &Requisition) -> Option<i64> {
    r.closed_on.map(|closed| days_between(r.opened_on, closed))
}

pub fn offer_acceptance_rate(r: &Requisition) -> Option<f64> {
    if r.offers_extended <= 0 {
        return None;
    }
    Some(round_to(
        r.hires as f64 / r.offers_extended as f64 * 100.0,
        2,
    ))
}

pub fn cv_to_interview_rate(r: &Requisition) -> Option<f64> {
    if r.cvs_received <= 0 {
        return None;
    }
    Some(round_to(
        r.total_interviews() as f64 / r.cvs_received as f64 * 100.0,
        2,
    ))
}

/// All derived values of one record, computed in one go.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub status: RequisitionStatus,
    pub time_to_fill: Option<i64>,
    pub time_to_offer: Option<i64>,
    pub open_duration: Option<i64>,
    pub offer_acceptance_rate: Option<f64>,
    pub cv_to_interview_rate: Option<f64>,
}

impl DerivedMetrics {
    pub fn of(r: &Requisition) -> Self {
        Self {
            status: status(r),
            time_to_fill: time_to_fill(r),
            time_to_offer: time_to_offer(r),
            open_duration: open_duration(r),
            offer_acceptance_rate: offer_acceptance_rate(r),
            cv_to_interview_rate: cv_to_interview_rate(r),
        }
    }
}
