use crate::server::ServerState;
use crate::server::errors::{AppError, AppResult};
use crate::server::store::{extract_version, has_package_extension};
use crate::update::client::RemoteVersionInfo;
use axum::{
    Json,
    body::Body,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use tracing::{info, warn};

/// `GET /`: service information.
pub async fn index(State(state): State<ServerState>) -> Json<Value> {
    let (version, _) = state.store.current();

    Json(json!({
        "message": "PERPLAN Media Player update service",
        "version": version,
        "endpoints": {
            "check_update": "/api/update",
            "get_version": "/api/version",
            "download": "/api/download",
            "upload": "/api/upload",
        },
        "update_files_dir": state.store.updates_dir().display().to_string(),
        "files_available": state.store.available_packages(),
    }))
}

/// `GET /api/version`
pub async fn version(State(state): State<ServerState>) -> Json<Value> {
    let (version, _) = state.store.current();
    Json(json!({ "version": version }))
}

/// `GET /api/update`: the descriptor clients check against.
pub async fn update(State(state): State<ServerState>) -> Json<RemoteVersionInfo> {
    let (version, changelog) = state.store.current();
    let sha256 = state.store.checksum(&version);

    Json(RemoteVersionInfo {
        download_url: format!("{}/api/download", state.public_url),
        version,
        changelog,
        sha256,
    })
}

/// `GET /api/download`: the package of the current version.
pub async fn download(State(state): State<ServerState>) -> AppResult<Response> {
    let store = state.store.clone();
    let package = tokio::task::spawn_blocking(move || store.current_package())
        .await
        .map_err(|e| AppError::internal(format!("Internal error: {e}")))?
        .map_err(|e| {
            let (version, _) = state.store.current();
            warn!("No package available for version {version}: {e:#}");
            AppError::not_found("Update file not found").with_message(format!(
                "Place {} in {}",
                crate::constants::package_file_name(&version),
                state.store.updates_dir().display()
            ))
        })?;
    info!("Serving {} ({} bytes)", package.file_name, package.bytes.len());
    let disposition = format!("attachment; filename=\"{}\"", package.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(package.bytes),
    )
        .into_response())
}

/// Body of a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub version: String,
    pub changelog: Option<String>,
    pub filename: String,
}

/// `POST /api/upload`: publish a new package.
///
/// Multipart fields: `file` (required) and `changelog` (optional).
pub async fn upload(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut changelog: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some((name, bytes.to_vec()));
            }
            Some("changelog") => {
                let text = field.text().await?;
                changelog = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(AppError::bad_request("No file provided"));
    };
    let file_name = file_name
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if file_name.is_empty() {
        return Err(AppError::bad_request("No file selected"));
    }
    if !has_package_extension(&file_name) {
        return Err(AppError::bad_request("Invalid file type")
            .with_message("Only .zip packages are accepted"));
    }
    let Some(version) = extract_version(&file_name) else {
        return Err(AppError::bad_request("Could not determine version from filename")
            .with_message("Name the package like update_v4.2.zip"));
    };
    if zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice())).is_err() {
        return Err(AppError::bad_request("File is not a valid zip archive"));
    }

    info!("Received {file_name} for version {version}");
    let store = state.store.clone();
    let published = tokio::task::spawn_blocking(move || {
        store.publish(&version, &bytes, changelog.as_deref())
    })
    .await
    .map_err(|e| AppError::internal(format!("Internal error: {e}")))??;

    Ok(Json(UploadResponse {
        success: true,
        version: published.version,
        changelog: published.changelog,
        filename: published.file_name,
    }))
}
