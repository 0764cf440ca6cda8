//! Import, template and export endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ApiResult;
use crate::import::{export_csv, template_csv, ImportPipeline, ImportReport};
use crate::AppState;

fn csv_download(file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

/// POST /api/import
///
/// Body is the raw delimited file.
pub async fn import_file(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ImportReport>> {
    let pipeline = ImportPipeline::new(state.engine.clone());
    let report = pipeline.run(&body).await?;
    Ok(Json(report))
}

/// GET /api/template
pub async fn download_template() -> ApiResult<Response> {
    Ok(csv_download("ipam_import_template.csv", template_csv()?))
}

/// GET /api/export
pub async fn download_export(State(state): State<AppState>) -> ApiResult<Response> {
    let body = export_csv(&state.engine).await?;
    Ok(csv_download("ipam_export.csv", body))
}
