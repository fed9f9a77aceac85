use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::time::Instant;

use crate::models::requisition::{
    CreateRequisitionRequest, Requisition, UpdateRequisitionRequest,
};
use crate::utils::{errors::AppError, logger::LOGGER};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Narrowing applied before aggregation. Every bound is optional and the
/// date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardFilter {
    pub opened_from: Option<NaiveDate>,
    pub opened_to: Option<NaiveDate>,
    pub department: Option<String>,
    pub collar_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryCounts {
    pub total: i64,
    pub open: i64,
    pub closed: i64,
}

#[derive(Debug, Serialize)]
pub struct FilterOptions {
    pub departments: Vec<String>,
    pub units: Vec<String>,
    pub collar_types: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RequisitionError {
    #[error("Requisition with id {0} was not found")]
    NotFound(i32),
    #[error("Requisition with reference code {0} already exists")]
    DuplicateReference(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<RequisitionError> for AppError {
    fn from(error: RequisitionError) -> Self {
        let message = error.to_string();
        match error {
            RequisitionError::NotFound(_) => AppError::NotFound(message),
            RequisitionError::DuplicateReference(_) => AppError::Conflict(message),
            RequisitionError::Database(db_err) => {
                let mut context = HashMap::new();
                context.insert(
                    "error_type".to_string(),
                    serde_json::Value::String("database".to_string()),
                );
                LOGGER.log_error(&db_err.to_string(), context);
                AppError::from(db_err)
            }
        }
    }
}

const INSERT_SQL: &str = r#"
    INSERT INTO requisitions (
        reference_code, reason, replacement_for, collar_type, is_manager,
        department, unit, position, work_location, hiring_manager, opened_on,
        cvs_received, cvs_rejected_by_recruiter, recruiter_interviews,
        hiring_manager_interviews, offers_extended, hires, offers_declined_by_candidate,
        closed_on, hired_on, employment_source, comment, gender
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
            $17, $18, $19, $20, $21, $22, $23)
    RETURNING *
"#;

// Nullable columns take a set flag ($25..$30) so an explicit null clears them.
const UPDATE_SQL: &str = r#"
    UPDATE requisitions
    SET reference_code = COALESCE($1, reference_code),
        reason = COALESCE($2, reason),
        replacement_for = CASE WHEN $25 THEN $3 ELSE replacement_for END,
        collar_type = COALESCE($4, collar_type),
        is_manager = COALESCE($5, is_manager),
        department = COALESCE($6, department),
        unit = COALESCE($7, unit),
        position = COALESCE($8, position),
        work_location = COALESCE($9, work_location),
        hiring_manager = COALESCE($10, hiring_manager),
        opened_on = COALESCE($11, opened_on),
        cvs_received = COALESCE($12, cvs_received),
        cvs_rejected_by_recruiter = COALESCE($13, cvs_rejected_by_recruiter),
        recruiter_interviews = COALESCE($14, recruiter_interviews),
        hiring_manager_interviews = COALESCE($15, hiring_manager_interviews),
        offers_extended = COALESCE($16, offers_extended),
        hires = COALESCE($17, hires),
        offers_declined_by_candidate = COALESCE($18, offers_declined_by_candidate),
        closed_on = CASE WHEN $26 THEN $19 ELSE closed_on END,
        hired_on = CASE WHEN $27 THEN $20 ELSE hired_on END,
        employment_source = CASE WHEN $28 THEN $21 ELSE employment_source END,
        comment = CASE WHEN $29 THEN $22 ELSE comment END,
        gender = CASE WHEN $30 THEN $23 ELSE gender END,
        updated_at = NOW()
    WHERE id = $24
    RETURNING *
"#;

/// Inserts one record. Shared by manual entry and the import transaction.
pub async fn insert_requisition<'e, E>(
    executor: E,
    req: &CreateRequisitionRequest,
) -> Result<Requisition, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Requisition>(INSERT_SQL)
        .bind(&req.reference_code)
        .bind(&req.reason)
        .bind(&req.replacement_for)
        .bind(&req.collar_type)
        .bind(req.is_manager)
        .bind(&req.department)
        .bind(&req.unit)
        .bind(&req.position)
        .bind(&req.work_location)
        .bind(&req.hiring_manager)
        .bind(req.opened_on)
        .bind(req.cvs_received)
        .bind(req.cvs_rejected_by_recruiter)
        .bind(req.recruiter_interviews)
        .bind(req.hiring_manager_interviews)
        .bind(req.offers_extended)
        .bind(req.hires)
        .bind(req.offers_declined_by_candidate)
        .bind(req.closed_on)
        .bind(req.hired_on)
        .bind(&req.employment_source)
        .bind(&req.comment)
        .bind(&req.gender)
        .fetch_one(executor)
        .await
}

/// Splits a nullable update field into its set flag and new value.
fn nullable_param<T: Clone>(field: &Option<Option<T>>) -> (bool, Option<T>) {
    match field {
        Some(value) => (true, value.clone()),
        None => (false, None),
    }
}

pub async fn reference_exists<'e, E>(executor: E, reference_code: &str) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<Postgres, bool>(
        "SELECT EXISTS(SELECT 1 FROM requisitions WHERE reference_code = $1)",
    )
    .bind(reference_code)
    .fetch_one(executor)
    .await
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &DashboardFilter) {
    if let Some(from) = filter.opened_from {
        builder.push(" AND opened_on >= ").push_bind(from);
    }
    if let Some(to) = filter.opened_to {
        builder.push(" AND opened_on <= ").push_bind(to);
    }
    if let Some(department) = &filter.department {
        builder.push(" AND department = ").push_bind(department.clone());
    }
    if let Some(collar_type) = &filter.collar_type {
        builder.push(" AND collar_type = ").push_bind(collar_type.clone());
    }
}

/// PostgreSQL-backed record store for requisitions.
#[derive(Debug)]
pub struct RequisitionService {
    pool: PgPool,
}

impl RequisitionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_filtered(
        &self,
        filter: &DashboardFilter,
    ) -> Result<Vec<Requisition>, RequisitionError> {
        let start_time = Instant::now();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM requisitions WHERE TRUE");
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY id");

        let rows = builder
            .build_query_as::<Requisition>()
            .fetch_all(&self.pool)
            .await?;

        LOGGER.log_database_query(
            builder.sql(),
            start_time.elapsed().as_millis(),
            Some(rows.len()),
        );

        Ok(rows)
    }

    pub async fn fetch_all(&self) -> Result<Vec<Requisition>, RequisitionError> {
        self.fetch_filtered(&DashboardFilter::default()).await
    }

    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Requisition>, RequisitionError> {
        let rows = sqlx::query_as::<_, Requisition>(
            "SELECT * FROM requisitions ORDER BY id OFFSET $1 LIMIT $2",
        )
        .bind(skip.max(0))
        .bind(limit.clamp(0, MAX_PAGE_SIZE))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get(&self, id: i32) -> Result<Requisition, RequisitionError> {
        sqlx::query_as::<_, Requisition>("SELECT * FROM requisitions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RequisitionError::NotFound(id))
    }

    pub async fn create(
        &self,
        req: &CreateRequisitionRequest,
    ) -> Result<Requisition, RequisitionError> {
        if reference_exists(&self.pool, &req.reference_code).await? {
            return Err(RequisitionError::DuplicateReference(
                req.reference_code.clone(),
            ));
        }

        let requisition = insert_requisition(&self.pool, req).await?;

        LOGGER.log_business_event(
            "requisition_created",
            [(
                "reference_code".to_string(),
                serde_json::Value::String(requisition.reference_code.clone()),
            )]
            .iter()
            .cloned()
            .collect(),
        );

        Ok(requisition)
    }

    pub async fn update(
        &self,
        id: i32,
        req: &UpdateRequisitionRequest,
    ) -> Result<Requisition, RequisitionError> {
        if let Some(reference_code) = &req.reference_code {
            let taken = sqlx::query_scalar::<Postgres, bool>(
                "SELECT EXISTS(SELECT 1 FROM requisitions WHERE reference_code = $1 AND id <> $2)",
            )
            .bind(reference_code)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

            if taken {
                return Err(RequisitionError::DuplicateReference(reference_code.clone()));
            }
        }

        let (replacement_for_set, replacement_for) = nullable_param(&req.replacement_for);
        let (closed_on_set, closed_on) = nullable_param(&req.closed_on);
        let (hired_on_set, hired_on) = nullable_param(&req.hired_on);
        let (employment_source_set, employment_source) = nullable_param(&req.employment_source);
        let (comment_set, comment) = nullable_param(&req.comment);
        let (gender_set, gender) = nullable_param(&req.gender);

        let requisition = sqlx::query_as::<_, Requisition>(UPDATE_SQL)
            .bind(&req.reference_code)
            .bind(&req.reason)
            .bind(replacement_for)
            .bind(&req.collar_type)
            .bind(req.is_manager)
            .bind(&req.department)
            .bind(&req.unit)
            .bind(&req.position)
            .bind(&req.work_location)
            .bind(&req.hiring_manager)
            .bind(req.opened_on)
            .bind(req.cvs_received)
            .bind(req.cvs_rejected_by_recruiter)
            .bind(req.recruiter_interviews)
            .bind(req.hiring_manager_interviews)
            .bind(req.offers_extended)
            .bind(req.hires)
            .bind(req.offers_declined_by_candidate)
            .bind(closed_on)
            .bind(hired_on)
            .bind(employment_source)
            .bind(comment)
            .bind(gender)
            .bind(id)
            .bind(replacement_for_set)
            .bind(closed_on_set)
            .bind(hired_on_set)
            .bind(employment_source_set)
            .bind(comment_set)
            .bind(gender_set)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RequisitionError::NotFound(id))?;

        Ok(requisition)
    }

    pub async fn delete(&self, id: i32) -> Result<(), RequisitionError> {
        let result = sqlx::query("DELETE FROM requisitions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RequisitionError::NotFound(id));
        }

        LOGGER.log_business_event(
            "requisition_deleted",
            [(
                "id".to_string(),
                serde_json::Value::Number(serde_json::Number::from(id)),
            )]
            .iter()
            .cloned()
            .collect(),
        );

        Ok(())
    }

    /// Quick counts where "closed" means a closing date is set.
    pub async fn summary_counts(&self) -> Result<SummaryCounts, RequisitionError> {
        let row = sqlx::query(
            "SELECT
                COUNT(*)::bigint AS total,
                COUNT(*) FILTER (WHERE closed_on IS NULL)::bigint AS open,
                COUNT(*) FILTER (WHERE closed_on IS NOT NULL)::bigint AS closed
             FROM requisitions",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(SummaryCounts {
            total: row.get(0),
            open: row.get(1),
            closed: row.get(2),
        })
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, RequisitionError> {
        let (departments, units, collar_types) = tokio::try_join!(
            self.distinct_values("department"),
            self.distinct_values("unit"),
            self.distinct_values("collar_type"),
        )?;

        Ok(FilterOptions {
            departments,
            units,
            collar_types,
        })
    }

    /// `column` must be one of the fixed column names above, never user input.
    async fn distinct_values(&self, column: &'static str) -> Result<Vec<String>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT {column} FROM requisitions WHERE {column} <> '' ORDER BY {column}"
        );
        sqlx::query_scalar::<_, String>(&query)
            .fetch_all(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requisition::fixtures::date;

    fn filter_sql(filter: &DashboardFilter) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM requisitions WHERE TRUE");
        push_filter(&mut builder, filter);
        builder.sql().to_string()
    }

    #[test]
    fn empty_filter_adds_no_conditions() {
        assert_eq!(
            filter_sql(&DashboardFilter::default()),
            "SELECT * FROM requisitions WHERE TRUE"
        );
    }

    #[test]
    fn filter_binds_each_present_bound() {
        let filter = DashboardFilter {
            opened_from: Some(date("2024-01-01")),
            opened_to: Some(date("2024-06-30")),
            department: Some("IT".to_string()),
            collar_type: None,
        };

        assert_eq!(
            filter_sql(&filter),
            "SELECT * FROM requisitions WHERE TRUE AND opened_on >= $1 AND opened_on <= $2 AND department = $3"
        );
    }

    #[test]
    fn nullable_fields_distinguish_clear_from_keep() {
        assert_eq!(nullable_param::<String>(&None), (false, None));
        assert_eq!(nullable_param::<String>(&Some(None)), (true, None));
        assert_eq!(
            nullable_param(&Some(Some(date("2024-05-01")))),
            (true, Some(date("2024-05-01")))
        );
    }

    #[test]
    fn update_sql_guards_every_nullable_column_with_a_flag() {
        for column in [
            "replacement_for",
            "closed_on",
            "hired_on",
            "employment_source",
            "comment",
            "gender",
        ] {
            assert!(
                UPDATE_SQL.contains(&format!("{column} = CASE WHEN $")),
                "{column} should be clearable"
            );
        }
        assert!(UPDATE_SQL.contains("reason = COALESCE($2, reason)"));
    }

    #[test]
    fn service_errors_map_to_http_errors() {
        use axum::http::StatusCode;

        let not_found = AppError::from(RequisitionError::NotFound(7));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let duplicate = AppError::from(RequisitionError::DuplicateReference("REQ-1".into()));
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
        match duplicate {
            AppError::Conflict(msg) => assert!(msg.contains("REQ-1")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
