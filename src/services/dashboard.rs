use serde::Serialize;

use crate::models::requisition::{
    Requisition, RequisitionStatus, COLLAR_BLUE, COLLAR_WHITE, REASON_REPLACEMENT,
};
use crate::services::breakdown::Breakdown;
use crate::services::derived::DerivedMetrics;
use crate::services::stats::{mean, percentage, ratio, round_to, upper_median};

pub const NO_DATA_MESSAGE: &str = "No data for the selected filters";

/// Dashboard output. Check `total_count()` before reading any rate: an empty
/// input yields `NoData`, which carries nothing else.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MetricBundle {
    NoData { message: String, total_count: usize },
    Populated(Box<DashboardMetrics>),
}

impl MetricBundle {
    pub fn total_count(&self) -> usize {
        match self {
            MetricBundle::NoData { total_count, .. } => *total_count,
            MetricBundle::Populated(metrics) => metrics.total_count,
        }
    }

    pub fn metrics(&self) -> Option<&DashboardMetrics> {
        match self {
            MetricBundle::NoData { .. } => None,
            MetricBundle::Populated(metrics) => Some(&**metrics),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepartmentStats {
    pub total: usize,
    pub open: usize,
    pub closed: usize,
    pub hired: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_count: usize,
    pub open_count: usize,
    /// Records with a closing or a hire date.
    pub closed_count: usize,
    pub hired_count: usize,

    pub avg_time_to_fill: Option<f64>,
    pub median_time_to_fill: Option<i64>,
    /// Approximated: closing date stands in for the first-offer date.
    pub avg_time_to_offer: Option<f64>,
    pub median_time_to_offer: Option<i64>,
    pub avg_open_duration: Option<f64>,
    pub median_open_duration: Option<i64>,

    pub total_cvs_received: i64,
    pub total_cvs_rejected: i64,
    pub total_recruiter_interviews: i64,
    pub total_hiring_manager_interviews: i64,
    pub total_interviews: i64,
    pub total_offers_extended: i64,
    pub total_offers_accepted: i64,
    pub total_offers_declined: i64,

    pub offer_acceptance_rate: f64,
    pub cv_to_interview_rate: f64,
    pub interview_to_offer_rate: f64,
    pub success_rate: f64,
    pub rotation_rate: f64,
    pub avg_interviews_per_hire: f64,

    pub white_collar_count: usize,
    pub blue_collar_count: usize,
    pub manager_count: usize,
    pub non_manager_count: usize,

    pub departments: Breakdown<DepartmentStats>,
    pub reasons: Breakdown<usize>,
    pub employment_sources: Breakdown<usize>,
}

#[derive(Debug, Default)]
struct FunnelTotals {
    cvs_received: i64,
    cvs_rejected: i64,
    recruiter_interviews: i64,
    hiring_manager_interviews: i64,
    offers_extended: i64,
    hires: i64,
    offers_declined: i64,
}

impl FunnelTotals {
    fn add(&mut self, r: &Requisition) {
        self.cvs_received += r.cvs_received as i64;
        self.cvs_rejected += r.cvs_rejected_by_recruiter as i64;
        self.recruiter_interviews += r.recruiter_interviews as i64;
        self.hiring_manager_interviews += r.hiring_manager_interviews as i64;
        self.offers_extended += r.offers_extended as i64;
        self.hires += r.hires as i64;
        self.offers_declined += r.offers_declined_by_candidate as i64;
    }

    fn interviews(&self) -> i64 {
        self.recruiter_interviews + self.hiring_manager_interviews
    }
}

fn average(values: &[i64]) -> Option<f64> {
    mean(values).map(|m| round_to(m, 1))
}

/// Folds an already-filtered record set into the dashboard metrics.
///
/// Pure: no I/O, no shared state. Input order does not affect the numbers,
/// only the key order of the breakdowns.
pub fn aggregate(records: &[Requisition]) -> MetricBundle {
    if records.is_empty() {
        return MetricBundle::NoData {
            message: NO_DATA_MESSAGE.to_string(),
            total_count: 0,
        };
    }

    let total = records.len();
    let mut open_count = 0usize;
    let mut closed_count = 0usize;
    let mut hired_count = 0usize;
    let mut fill_times = Vec::new();
    let mut offer_times = Vec::new();
    let mut open_durations = Vec::new();
    let mut totals = FunnelTotals::default();
    let mut replacement_count = 0i64;
    let mut white_collar_count = 0usize;
    let mut blue_collar_count = 0usize;
    let mut manager_count = 0usize;
    let mut departments = Breakdown::<DepartmentStats>::new();
    let mut reasons = Breakdown::<usize>::new();
    let mut employment_sources = Breakdown::<usize>::new();

    for r in records {
        let derived = DerivedMetrics::of(r);
        fill_times.extend(derived.time_to_fill);
        offer_times.extend(derived.time_to_offer);
        open_durations.extend(derived.open_duration);
        totals.add(r);

        let department = departments.entry(&r.department);
        department.total += 1;
        match derived.status {
            RequisitionStatus::Open => {
                open_count += 1;
                department.open += 1;
            }
            RequisitionStatus::Closed => {
                closed_count += 1;
                department.closed += 1;
            }
            RequisitionStatus::Hired => {
                closed_count += 1;
                hired_count += 1;
                department.closed += 1;
                department.hired += 1;
            }
        }

        reasons.increment(&r.reason);
        if r.reason == REASON_REPLACEMENT {
            replacement_count += 1;
        }

        if let Some(source) = r.employment_source.as_deref().filter(|s| !s.is_empty()) {
            employment_sources.increment(source);
        }

        match r.collar_type.as_str() {
            COLLAR_WHITE => white_collar_count += 1,
            COLLAR_BLUE => blue_collar_count += 1,
            _ => {}
        }

        if r.is_manager {
            manager_count += 1;
        }
    }

    let interviews = totals.interviews();

    MetricBundle::Populated(Box::new(DashboardMetrics {
        total_count: total,
        open_count,
        closed_count,
        hired_count,

        avg_time_to_fill: average(&fill_times),
        median_time_to_fill: upper_median(&fill_times),
        avg_time_to_offer: average(&offer_times),
        median_time_to_offer: upper_median(&offer_times),
        avg_open_duration: average(&open_durations),
        median_open_duration: upper_median(&open_durations),

        total_cvs_received: totals.cvs_received,
        total_cvs_rejected: totals.cvs_rejected,
        total_recruiter_interviews: totals.recruiter_interviews,
        total_hiring_manager_interviews: totals.hiring_manager_interviews,
        total_interviews: interviews,
        total_offers_extended: totals.offers_extended,
        total_offers_accepted: totals.hires,
        total_offers_declined: totals.offers_declined,

        offer_acceptance_rate: percentage(totals.hires, totals.offers_extended),
        cv_to_interview_rate: percentage(interviews, totals.cvs_received),
        interview_to_offer_rate: percentage(totals.offers_extended, interviews),
        success_rate: percentage(hired_count as i64, closed_count as i64),
        rotation_rate: percentage(replacement_count, total as i64),
        avg_interviews_per_hire: ratio(interviews, totals.hires),

        white_collar_count,
        blue_collar_count,
        manager_count,
        non_manager_count: total - manager_count,

        departments,
        reasons,
        employment_sources,
    }))
}
