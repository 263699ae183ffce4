// src/middleware/submission.rs

use axum::{
    Json,
    extract::{
        FromRef, FromRequest, Request,
        multipart::{Field, Multipart, MultipartError},
    },
    http::{StatusCode, header},
};
use serde::de::DeserializeOwned;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::custom_field::{FieldId, UploadedFile},
};

const PAYLOAD_PART: &str = "payload";
const FILE_PART_PREFIX: &str = "file:";

/// Corpo de create/update de registro.
///
/// Aceita `application/json` puro ou `multipart/form-data` com uma parte
/// `payload` (o mesmo JSON) e partes `file:<fieldId>` para campos de arquivo.
pub struct RecordSubmission<T> {
    pub payload: T,
    pub uploads: Vec<(FieldId, UploadedFile)>,
}

impl<T, S> FromRequest<S> for RecordSubmission<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(req.headers());
        let reject = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(payload) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| reject(AppError::BadRequest(e.body_text())))?;
            return Ok(Self { payload, uploads: Vec::new() });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| reject(AppError::BadRequest(e.body_text())))?;

        let max_bytes = app_state.config.max_upload_bytes;
        let mut payload = None;
        let mut uploads = Vec::new();

        while let Some(field) = multipart.next_field().await.map_err(|e| reject(multipart_error(e)))? {
            let name = field.name().unwrap_or_default().to_string();

            if name == PAYLOAD_PART {
                let bytes = field.bytes().await.map_err(|e| reject(multipart_error(e)))?;
                let parsed = serde_json::from_slice::<T>(&bytes)
                    .map_err(|e| reject(AppError::BadRequest(format!("payload: {e}"))))?;
                payload = Some(parsed);
            } else if let Some(raw_id) = name.strip_prefix(FILE_PART_PREFIX) {
                let field_id = raw_id
                    .parse::<FieldId>()
                    .map_err(|_| reject(AppError::BadRequest(format!("parte inválida: {name}"))))?;
                let file = read_file_part(field, max_bytes).await.map_err(&reject)?;
                uploads.push((field_id, file));
            } else {
                return Err(reject(AppError::BadRequest(format!("parte desconhecida: {name}"))));
            }
        }

        let payload = payload.ok_or_else(|| reject(AppError::BadRequest("parte 'payload' ausente".into())))?;
        Ok(Self { payload, uploads })
    }
}

/// Lê uma parte de arquivo respeitando o limite de tamanho.
pub async fn read_file_part(mut field: Field<'_>, max_bytes: usize) -> Result<UploadedFile, AppError> {
    let original_name = sanitize_file_name(field.file_name().unwrap_or("arquivo"));
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(AppError::PayloadTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(UploadedFile { original_name, mime_type, bytes })
}

/// Primeira parte `file` de um multipart (substituição de anexo).
pub async fn read_single_file(multipart: &mut Multipart, max_bytes: usize) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            return read_file_part(field, max_bytes).await;
        }
    }
    Err(AppError::BadRequest("parte 'file' ausente".into()))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(e.body_text())
    }
}

// Só o último componente; navegadores antigos mandam o caminho inteiro
fn sanitize_file_name(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        "arquivo".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_their_directories() {
        assert_eq!(sanitize_file_name("C:\\Users\\ana\\proposta.pdf"), "proposta.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(".."), "arquivo");
        assert_eq!(sanitize_file_name(""), "arquivo");
    }
}
