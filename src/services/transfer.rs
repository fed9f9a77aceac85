use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::models::requisition::{CreateRequisitionRequest, Requisition};
use crate::services::requisitions::{insert_requisition, reference_exists};
use crate::utils::{errors::AppError, logger::LOGGER};

pub const EXPORT_KEY: &str = "requisitions";

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub requisitions: Vec<CreateRequisitionRequest>,
    pub exported_at: DateTime<Utc>,
}

impl ExportDocument {
    pub fn new(records: Vec<Requisition>, exported_at: DateTime<Utc>) -> Self {
        Self {
            requisitions: records.into_iter().map(CreateRequisitionRequest::from).collect(),
            exported_at,
        }
    }

    pub fn filename(&self) -> String {
        format!(
            "requisitions_export_{}.json",
            self.exported_at.format("%Y%m%d_%H%M%S")
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub success: bool,
    pub import_id: Uuid,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid JSON format")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Invalid file format. Expected structure: {{\"requisitions\": [...]}}")]
    MissingRequisitions,
    #[error("Import failed: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<TransferError> for AppError {
    fn from(error: TransferError) -> Self {
        let message = error.to_string();
        match error {
            TransferError::InvalidJson(_) | TransferError::MissingRequisitions => {
                AppError::BadRequest(message)
            }
            TransferError::Database(_) => {
                LOGGER.log_error(&message, HashMap::new());
                AppError::InternalServerError(message)
            }
        }
    }
}

/// Items of an import file that passed decoding and validation.
#[derive(Debug, Default)]
pub struct DecodedImport {
    pub valid: Vec<CreateRequisitionRequest>,
    /// Items repeating a reference code seen earlier in the same file.
    pub duplicates_in_file: usize,
    pub errors: Vec<String>,
}

/// Extracts the item list from an uploaded export document.
pub fn parse_import_document(bytes: &[u8]) -> Result<Vec<serde_json::Value>, TransferError> {
    let document: serde_json::Value = serde_json::from_slice(bytes)?;
    match document.get(EXPORT_KEY) {
        Some(serde_json::Value::Array(items)) => Ok(items.clone()),
        _ => Err(TransferError::MissingRequisitions),
    }
}

/// Decodes and validates each item independently; one bad item never stops
/// the others.
pub fn decode_items(items: Vec<serde_json::Value>) -> DecodedImport {
    let mut decoded = DecodedImport::default();
    let mut seen = HashSet::new();

    for item in items {
        let reference = item
            .get("reference_code")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let req = match serde_json::from_value::<CreateRequisitionRequest>(item) {
            Ok(req) => req,
            Err(e) => {
                decoded
                    .errors
                    .push(format!("Error for reference {}: {}", reference, e));
                continue;
            }
        };

        if let Err(e) = req.validate() {
            decoded
                .errors
                .push(format!("Error for reference {}: {}", reference, e));
            continue;
        }

        if !seen.insert(req.reference_code.clone()) {
            decoded.duplicates_in_file += 1;
            continue;
        }

        decoded.valid.push(req);
    }

    decoded
}

#[derive(Debug)]
pub struct TransferService {
    pool: PgPool,
}

impl TransferService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts every decoded item whose reference code is not stored yet,
    /// all in one transaction.
    pub async fn import(&self, decoded: DecodedImport) -> Result<ImportSummary, TransferError> {
        let start_time = Instant::now();
        let import_id = Uuid::new_v4();
        let mut imported = 0usize;
        let mut skipped = decoded.duplicates_in_file;

        let mut tx = self.pool.begin().await?;
        for req in &decoded.valid {
            if reference_exists(&mut *tx, &req.reference_code).await? {
                skipped += 1;
                continue;
            }
            insert_requisition(&mut *tx, req).await?;
            imported += 1;
        }
        tx.commit().await?;

        LOGGER.log_business_event(
            "requisitions_imported",
            [
                (
                    "import_id".to_string(),
                    serde_json::Value::String(import_id.to_string()),
                ),
                (
                    "imported".to_string(),
                    serde_json::Value::Number(serde_json::Number::from(imported)),
                ),
                (
                    "skipped".to_string(),
                    serde_json::Value::Number(serde_json::Number::from(skipped)),
                ),
                (
                    "errors".to_string(),
                    serde_json::Value::Number(serde_json::Number::from(decoded.errors.len())),
                ),
            ]
            .iter()
            .cloned()
            .collect(),
        );
        LOGGER.log_performance_metric(
            "requisitions_import_duration",
            start_time.elapsed().as_millis() as f64,
            HashMap::new(),
        );

        Ok(ImportSummary {
            success: true,
            import_id,
            imported,
            skipped,
            errors: decoded.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requisition::fixtures::requisition;
    use chrono::TimeZone;

    fn item(reference: &str) -> serde_json::Value {
        serde_json::to_value(CreateRequisitionRequest::from(requisition(reference))).unwrap()
    }

    #[test]
    fn export_document_round_trips_through_import_parsing() {
        let exported_at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let doc = ExportDocument::new(vec![requisition("A-1"), requisition("A-2")], exported_at);
        assert_eq!(doc.filename(), "requisitions_export_20240506_070809.json");

        let bytes = serde_json::to_vec(&doc).unwrap();
        let items = parse_import_document(&bytes).unwrap();
        let decoded = decode_items(items);

        assert!(decoded.errors.is_empty());
        assert_eq!(
            decoded
                .valid
                .iter()
                .map(|r| r.reference_code.as_str())
                .collect::<Vec<_>>(),
            vec!["A-1", "A-2"]
        );
    }

    #[test]
    fn import_document_requires_requisitions_array() {
        assert!(matches!(
            parse_import_document(br#"{"records": []}"#),
            Err(TransferError::MissingRequisitions)
        ));
        assert!(matches!(
            parse_import_document(br#"{"requisitions": {}}"#),
            Err(TransferError::MissingRequisitions)
        ));
        assert!(matches!(
            parse_import_document(b"not json"),
            Err(TransferError::InvalidJson(_))
        ));
    }

    #[test]
    fn bad_items_are_reported_without_stopping_the_rest() {
        let mut missing_date = item("B-1");
        missing_date
            .as_object_mut()
            .unwrap()
            .remove("opened_on");
        let mut negative = item("B-2");
        negative["hires"] = serde_json::json!(-3);

        let decoded = decode_items(vec![missing_date, item("B-3"), negative, serde_json::json!(42)]);

        assert_eq!(decoded.valid.len(), 1);
        assert_eq!(decoded.valid[0].reference_code, "B-3");
        assert_eq!(decoded.errors.len(), 3);
        assert!(decoded.errors[0].starts_with("Error for reference B-1:"));
        assert!(decoded.errors[1].starts_with("Error for reference B-2:"));
        assert!(decoded.errors[2].starts_with("Error for reference unknown:"));
    }

    #[test]
    fn repeated_reference_codes_in_one_file_are_skipped() {
        let decoded = decode_items(vec![item("C-1"), item("C-2"), item("C-1")]);
        assert_eq!(decoded.valid.len(), 2);
        assert_eq!(decoded.duplicates_in_file, 1);
    }

    #[test]
    fn client_errors_map_to_bad_request() {
        use axum::http::StatusCode;
        let err = AppError::from(TransferError::MissingRequisitions);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
