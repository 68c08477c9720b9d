use axum::Json;
use axum::extract::{Multipart, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::AppState;
use super::error::ApiError;
use crate::core::{NfseError, OutcomeRecord};
use crate::pipeline;
use crate::session::{SessionId, export_session};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const ALLOWED_EXTENSION: &str = "xlsx";

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session: SessionId,
    pub outcomes: Vec<OutcomeRecord>,
}

/// Accept only a non-empty `.xlsx` file name; returns its final path component.
pub fn validate_upload_name(name: &str) -> Result<String, NfseError> {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    if base.is_empty() {
        return Err(NfseError::Upload("no file selected".into()));
    }
    let allowed = Path::new(&base)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ALLOWED_EXTENSION));
    if !allowed {
        return Err(NfseError::Upload(format!("file type not allowed: {base}")));
    }
    Ok(base)
}

fn parse_session(query: &SessionQuery) -> Result<Option<SessionId>, NfseError> {
    query.session.as_deref().map(str::parse).transpose()
}

pub(super) async fn upload(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let id = parse_session(&query)?.unwrap_or_default();

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| NfseError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            tracing::debug!(field = ?field.name(), "ignoring multipart field");
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| NfseError::Upload(e.to_string()))?;
        upload = Some((name, bytes.to_vec()));
        break;
    }
    let (name, bytes) = upload.ok_or_else(|| NfseError::Upload("no file part".into()))?;
    let file_name = validate_upload_name(&name)?;
    tracing::info!(session = %id, file = %file_name, bytes = bytes.len(), "upload received");

    state.sessions.reset(id);

    let path: PathBuf = state.settings.upload_dir.join(format!("{id}_{file_name}"));
    let staged = state.settings.upload_dir.join(format!(".{id}_{file_name}"));
    let settings = state.settings.clone();
    let transport = state.transport.clone();
    let stored = path.clone();
    let outcomes = tokio::task::spawn_blocking(move || -> Result<Vec<OutcomeRecord>, NfseError> {
        std::fs::create_dir_all(&settings.upload_dir)?;
        std::fs::write(&staged, &bytes)?;
        match pipeline::process_file(&staged, &settings, transport.as_ref()) {
            Ok(outcomes) => {
                std::fs::rename(&staged, &stored)?;
                Ok(outcomes)
            }
            Err(e) => {
                if let Err(io) = std::fs::remove_file(&staged) {
                    tracing::warn!(path = %staged.display(), error = %io, "cannot remove staged upload");
                }
                Err(e)
            }
        }
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    state
        .sessions
        .record(id, path, file_name, outcomes.clone());
    Ok(Json(UploadResponse {
        session: id,
        outcomes,
    }))
}

pub(super) async fn export(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_session(&query)?.ok_or(NfseError::NoUpload)?;
    let sessions = state.sessions.clone();
    let (file_name, bytes) = tokio::task::spawn_blocking(move || export_session(&sessions, id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let disposition = format!("attachment; filename=\"{file_name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

pub(super) async fn status_data(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<OutcomeRecord>>, ApiError> {
    let outcomes = match parse_session(&query)? {
        Some(id) => state.sessions.outcomes(id).unwrap_or_default(),
        None => Vec::new(),
    };
    Ok(Json(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_xlsx_names_are_accepted() {
        assert_eq!(validate_upload_name("notas.xlsx").unwrap(), "notas.xlsx");
        assert_eq!(validate_upload_name("NOTAS.XLSX").unwrap(), "NOTAS.XLSX");
        assert_eq!(validate_upload_name("../../etc/notas.xlsx").unwrap(), "notas.xlsx");
        for bad in ["", "  ", "notas.xls", "notas.csv", "xlsx"] {
            assert!(
                matches!(validate_upload_name(bad), Err(NfseError::Upload(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn session_query_parsing() {
        let none = SessionQuery { session: None };
        assert_eq!(parse_session(&none).unwrap(), None);
        let bad = SessionQuery {
            session: Some("nope".into()),
        };
        assert!(parse_session(&bad).is_err());
        let id = SessionId::new();
        let good = SessionQuery {
            session: Some(id.to_string()),
        };
        assert_eq!(parse_session(&good).unwrap(), Some(id));
    }
}
