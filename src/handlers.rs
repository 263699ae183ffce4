// src/handlers.rs

pub mod auth;
pub mod companies;
pub mod contacts;
pub mod custom_fields;
pub mod deals;
pub mod files;
pub mod health;
pub mod leads;
pub mod pipelines;
pub mod records;
pub mod users;
