use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;

use crate::{
    services::{
        requisitions::RequisitionService,
        transfer::{decode_items, parse_import_document, ExportDocument, ImportSummary, TransferService},
    },
    utils::{errors::AppError, logger::LOGGER},
    AppState,
};

const IMPORT_FIELD: &str = "file";

pub async fn export_requisitions(State(state): State<AppState>) -> Result<Response, AppError> {
    let records = RequisitionService::new(state.db.clone()).fetch_all().await?;
    let document = ExportDocument::new(records, Utc::now());
    let disposition = format!("attachment; filename={}", document.filename());

    LOGGER.log_request("GET", "/api/export", 200);
    Ok((
        [
            (header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Json(document),
    )
        .into_response())
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

pub async fn import_requisitions(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(IMPORT_FIELD) {
            upload = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }

    let bytes = upload.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field '{}'", IMPORT_FIELD))
    })?;

    let items = parse_import_document(&bytes)?;
    let decoded = decode_items(items);
    let summary = TransferService::new(state.db.clone())
        .import(decoded)
        .await?;

    LOGGER.log_request("POST", "/api/import", 200);
    Ok(Json(summary))
}
