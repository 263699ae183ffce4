// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    common::i18n::I18nStore,
    db::{AuditRepository, CrmRepository, CustomFieldRepository, FieldValueRepository, PipelineRepository, UserRepository},
    services::{
        access_policy::AccessPolicy,
        audit::AuditService,
        auth::AuthService,
        crm_service::RecordService,
        custom_field_service::CustomFieldService,
        field_values::FieldValueService,
        files::FileService,
        pipeline_service::PipelineService,
        storage::{FileStorage, LocalFileStorage},
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_STORAGE_DIR: &str = "./storage";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_JWT_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub jwt_ttl_days: i64,
    // Primeiro administrador, criado só quando a tabela de usuários está vazia
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} deve ser definida"));

        fn parsed<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
            match value {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("{key} tem um valor inválido: {raw}")),
                None => Ok(default),
            }
        }

        let bootstrap_admin = match (lookup("BOOTSTRAP_ADMIN_EMAIL"), lookup("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_connections: parsed(lookup("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            storage_dir: lookup("STORAGE_DIR").unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string()).into(),
            max_upload_bytes: parsed(lookup("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            jwt_ttl_days: parsed(lookup("JWT_TTL_DAYS"), "JWT_TTL_DAYS", DEFAULT_JWT_TTL_DAYS)?,
            bootstrap_admin,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub access_policy: AccessPolicy,
    pub custom_field_service: CustomFieldService,
    pub record_service: RecordService,
    pub file_service: FileService,
    pub pipeline_service: PipelineService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Config::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(config.storage_dir.clone()));
        Ok(Self::assemble(db_pool, config, storage))
    }

    // --- Monta o grafo de dependências ---
    fn assemble(db_pool: PgPool, config: Config, storage: Arc<dyn FileStorage>) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let field_repo = CustomFieldRepository::new();
        let value_repo = FieldValueRepository::new();
        let crm_repo = CrmRepository::new();
        let audit_service = AuditService::new(AuditRepository::new());

        let access_policy = AccessPolicy::new(user_repo.clone());
        let auth_service = AuthService::new(user_repo, config.jwt_secret.clone(), config.jwt_ttl_days);

        let field_values = FieldValueService::new(
            field_repo.clone(),
            value_repo.clone(),
            access_policy.clone(),
            storage.clone(),
        );
        let record_service = RecordService::new(
            crm_repo.clone(),
            field_values,
            access_policy.clone(),
            audit_service.clone(),
        );
        let file_service = FileService::new(
            value_repo,
            field_repo.clone(),
            crm_repo,
            access_policy.clone(),
            audit_service,
            storage,
        );
        let custom_field_service = CustomFieldService::new(field_repo);
        let pipeline_service = PipelineService::new(PipelineRepository::new());

        Self {
            db_pool,
            config: Arc::new(config),
            i18n_store: Arc::new(I18nStore::new()),
            auth_service,
            access_policy,
            custom_field_service,
            record_service,
            file_service,
            pipeline_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.storage_dir, PathBuf::from("./storage"));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.jwt_ttl_days, 7);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn requires_database_and_secret() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "s")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).is_err());
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let vars = [("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "s"), ("MAX_UPLOAD_BYTES", "dez")];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }
}
