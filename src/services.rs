// src/services.rs

pub mod access_policy;
pub mod audit;
pub mod auth;
pub mod crm_service;
pub mod custom_field_service;
pub mod field_values;
pub mod files;
pub mod pipeline_service;
pub mod storage;
