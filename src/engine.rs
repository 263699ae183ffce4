// src/engine.rs

// Motor de campos customizados: regras puras, sem banco nem HTTP.
pub mod calculation;
pub mod codec;
pub mod completeness;
pub mod error;
pub mod files;
pub mod formula;
pub mod masking;
pub mod validator;
