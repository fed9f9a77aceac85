use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    models::requisition::{
        CreateRequisitionRequest, RequisitionResponse, UpdateRequisitionRequest,
    },
    services::requisitions::{RequisitionService, SummaryCounts, DEFAULT_PAGE_SIZE},
    utils::{errors::AppError, logger::LOGGER},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn create_requisition(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequisitionRequest>,
) -> Result<(StatusCode, Json<RequisitionResponse>), AppError> {
    payload.validate()?;

    let requisition = RequisitionService::new(state.db.clone())
        .create(&payload)
        .await?;

    LOGGER.log_request("POST", "/api/requisitions", StatusCode::CREATED.as_u16());
    Ok((StatusCode::CREATED, Json(RequisitionResponse::from(requisition))))
}

pub async fn list_requisitions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RequisitionResponse>>, AppError> {
    let requisitions = RequisitionService::new(state.db.clone())
        .list(query.skip.unwrap_or(0), query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;

    LOGGER.log_request("GET", "/api/requisitions", 200);
    Ok(Json(
        requisitions
            .into_iter()
            .map(RequisitionResponse::from)
            .collect(),
    ))
}

pub async fn get_requisition(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RequisitionResponse>, AppError> {
    let requisition = RequisitionService::new(state.db.clone()).get(id).await?;
    Ok(Json(RequisitionResponse::from(requisition)))
}

pub async fn update_requisition(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRequisitionRequest>,
) -> Result<Json<RequisitionResponse>, AppError> {
    payload.validate()?;

    let requisition = RequisitionService::new(state.db.clone())
        .update(id, &payload)
        .await?;

    LOGGER.log_request("PUT", "/api/requisitions/:id", 200);
    Ok(Json(RequisitionResponse::from(requisition)))
}

pub async fn delete_requisition(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    RequisitionService::new(state.db.clone()).delete(id).await?;

    LOGGER.log_request("DELETE", "/api/requisitions/:id", 204);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_summary_stats(
    State(state): State<AppState>,
) -> Result<Json<SummaryCounts>, AppError> {
    let counts = RequisitionService::new(state.db.clone())
        .summary_counts()
        .await?;
    Ok(Json(counts))
}
