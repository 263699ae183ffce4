//src/main.rs

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod engine;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

// Folga para a parte JSON e os cabeçalhos do multipart
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new().await.context("Falha ao inicializar o estado da aplicação")?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some((email, password)) = &app_state.config.bootstrap_admin {
        app_state
            .auth_service
            .ensure_bootstrap_admin(&app_state.db_pool, email, password)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao criar o administrador inicial: {e}"))?;
    }

    let app = router(app_state.clone());

    let listener = TcpListener::bind(&app_state.config.bind_addr)
        .await
        .with_context(|| format!("Falha ao escutar em {}", app_state.config.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}

fn router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/me", get(handlers::users::get_me))
        .route("/assignable", get(handlers::users::list_assignable));

    let field_routes = Router::new()
        .route(
            "/{objectType}",
            get(handlers::custom_fields::list_fields).post(handlers::custom_fields::create_field),
        )
        .route("/{objectType}/reorder", post(handlers::custom_fields::reorder_fields))
        .route(
            "/{objectType}/{fieldId}",
            put(handlers::custom_fields::update_field).delete(handlers::custom_fields::delete_field),
        )
        .route(
            "/{objectType}/{fieldId}/options",
            get(handlers::custom_fields::list_options).post(handlers::custom_fields::add_option),
        )
        .route(
            "/{objectType}/{fieldId}/options/{optionId}",
            axum::routing::delete(handlers::custom_fields::delete_option),
        );

    let company_routes = Router::new()
        .route("/", get(handlers::companies::list_companies).post(handlers::companies::create_company))
        .route(
            "/{id}",
            get(handlers::companies::get_company)
                .put(handlers::companies::update_company)
                .delete(handlers::companies::delete_company),
        );

    let contact_routes = Router::new()
        .route("/", get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact))
        .route(
            "/{id}",
            get(handlers::contacts::get_contact)
                .put(handlers::contacts::update_contact)
                .delete(handlers::contacts::delete_contact),
        );

    let lead_routes = Router::new()
        .route("/", get(handlers::leads::list_leads).post(handlers::leads::create_lead))
        .route(
            "/{id}",
            get(handlers::leads::get_lead)
                .put(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        );

    let deal_routes = Router::new()
        .route("/", get(handlers::deals::list_deals).post(handlers::deals::create_deal))
        .route(
            "/{id}",
            get(handlers::deals::get_deal)
                .put(handlers::deals::update_deal)
                .delete(handlers::deals::delete_deal),
        );

    let file_routes = Router::new()
        .route("/{id}", put(handlers::files::replace_file).delete(handlers::files::delete_file))
        .route("/{id}/download", get(handlers::files::download_file))
        .route("/{id}/versions", get(handlers::files::list_versions));

    let pipeline_routes = Router::new()
        .route("/", get(handlers::pipelines::list_pipelines).post(handlers::pipelines::create_pipeline))
        .route("/{id}/stages", post(handlers::pipelines::add_stage));

    // Tudo que exige token passa pelo auth_guard
    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/fields", field_routes)
        .nest("/companies", company_routes)
        .nest("/contacts", contact_routes)
        .nest("/leads", lead_routes)
        .nest("/deals", deal_routes)
        .nest("/files", file_routes)
        .nest("/pipelines", pipeline_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let api = Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/auth", auth_routes)
        .merge(protected);

    let body_limit = app_state.config.max_upload_bytes + BODY_LIMIT_SLACK;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}
