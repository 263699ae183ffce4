// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health_check,

        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::users::get_me,
        handlers::users::list_assignable,

        // --- Campos customizados ---
        handlers::custom_fields::list_fields,
        handlers::custom_fields::create_field,
        handlers::custom_fields::update_field,
        handlers::custom_fields::delete_field,
        handlers::custom_fields::reorder_fields,
        handlers::custom_fields::list_options,
        handlers::custom_fields::add_option,
        handlers::custom_fields::delete_option,

        // --- Registros ---
        handlers::companies::list_companies,
        handlers::companies::create_company,
        handlers::companies::get_company,
        handlers::companies::update_company,
        handlers::companies::delete_company,
        handlers::contacts::list_contacts,
        handlers::contacts::create_contact,
        handlers::contacts::get_contact,
        handlers::contacts::update_contact,
        handlers::contacts::delete_contact,
        handlers::leads::list_leads,
        handlers::leads::create_lead,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::delete_lead,
        handlers::deals::list_deals,
        handlers::deals::create_deal,
        handlers::deals::get_deal,
        handlers::deals::update_deal,
        handlers::deals::delete_deal,

        // --- Arquivos ---
        handlers::files::download_file,
        handlers::files::list_versions,
        handlers::files::replace_file,
        handlers::files::delete_file,

        // --- Pipelines ---
        handlers::pipelines::list_pipelines,
        handlers::pipelines::create_pipeline,
        handlers::pipelines::add_stage,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::UserSummary,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Campos customizados ---
            models::custom_field::ObjectType,
            models::custom_field::FieldKind,
            models::custom_field::CustomField,
            models::custom_field::CustomFieldOption,
            models::custom_field::FieldDefinition,
            models::custom_field::FieldInput,
            models::custom_field::FieldValueRow,
            models::custom_field::OptionValueRow,
            models::custom_field::UserValueRow,
            models::custom_field::FileAttachment,
            models::custom_field::RecordFieldData,
            models::custom_field::CreateFieldPayload,
            models::custom_field::UpdateFieldPayload,
            models::custom_field::ReorderFieldsPayload,
            models::custom_field::CreateOptionPayload,

            // --- Registros ---
            models::crm::LeadStatus,
            models::crm::Company,
            models::crm::Contact,
            models::crm::Lead,
            models::crm::Deal,
            models::crm::CompanyPayload,
            models::crm::ContactPayload,
            models::crm::LeadPayload,
            models::crm::DealPayload,

            // --- Pipelines ---
            models::pipeline::Pipeline,
            models::pipeline::PipelineStage,
            models::pipeline::PipelineWithStages,
            models::pipeline::CreatePipelinePayload,
            models::pipeline::AddStagePayload,
        )
    ),
    tags(
        (name = "Health", description = "Disponibilidade da API"),
        (name = "Auth", description = "Autenticação"),
        (name = "Usuários", description = "Usuário atual e atribuição"),
        (name = "Campos customizados", description = "Definições, ordem e opções por tipo de registro"),
        (name = "Empresas", description = "Empresas e seus campos customizados"),
        (name = "Contatos", description = "Contatos e seus campos customizados"),
        (name = "Leads", description = "Leads e seus campos customizados"),
        (name = "Negócios", description = "Negócios no funil de vendas"),
        (name = "Arquivos", description = "Anexos versionados dos campos de arquivo"),
        (name = "Pipelines", description = "Funis de venda e etapas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_record_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/api/deals", "/api/deals/{id}", "/api/fields/{objectType}", "/api/files/{id}/download"] {
            assert!(doc.paths.paths.contains_key(path), "{path} ausente");
        }
    }
}
