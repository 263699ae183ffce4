// src/handlers/records.rs
//
// Corpo comum dos handlers de empresas, contatos, leads e negócios.
// Cada módulo por tipo só declara a rota e a documentação.

use axum::{Json, http::StatusCode};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    db::CrmRecord,
    middleware::{i18n::Locale, submission::RecordSubmission},
    models::{
        auth::User,
        crm::{ListQuery, RecordView},
    },
};

pub(crate) async fn create<T: CrmRecord>(
    app_state: &AppState,
    locale: &Locale,
    user: &User,
    submission: RecordSubmission<T::Payload>,
) -> Result<(StatusCode, Json<RecordView<T>>), ApiError> {
    let RecordSubmission { payload, uploads } = submission;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(locale, &app_state.i18n_store))?;

    let view = app_state
        .record_service
        .create::<T>(&app_state.db_pool, user, payload, uploads)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub(crate) async fn update<T: CrmRecord>(
    app_state: &AppState,
    locale: &Locale,
    user: &User,
    id: i64,
    submission: RecordSubmission<T::Payload>,
) -> Result<Json<RecordView<T>>, ApiError> {
    let RecordSubmission { payload, uploads } = submission;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(locale, &app_state.i18n_store))?;

    let view = app_state
        .record_service
        .update::<T>(&app_state.db_pool, user, id, payload, uploads)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

pub(crate) async fn get<T: CrmRecord>(
    app_state: &AppState,
    locale: &Locale,
    user: &User,
    id: i64,
) -> Result<Json<RecordView<T>>, ApiError> {
    let view = app_state
        .record_service
        .get::<T>(&app_state.db_pool, user, id)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

pub(crate) async fn list<T: CrmRecord>(
    app_state: &AppState,
    locale: &Locale,
    user: &User,
    query: &ListQuery,
) -> Result<Json<Vec<RecordView<T>>>, ApiError> {
    let views = app_state
        .record_service
        .list::<T>(&app_state.db_pool, user, query)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok(Json(views))
}

pub(crate) async fn delete<T: CrmRecord>(
    app_state: &AppState,
    locale: &Locale,
    user: &User,
    id: i64,
) -> Result<StatusCode, ApiError> {
    app_state
        .record_service
        .delete::<T>(&app_state.db_pool, user, id)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
