pub mod config;
pub mod dump;
pub mod export;
pub mod json_schema;
pub mod metadata;
pub mod validate;
