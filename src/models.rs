// src/models.rs

pub mod audit;
pub mod auth;
pub mod crm;
pub mod custom_field;
pub mod pipeline;
