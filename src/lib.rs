pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod practice;
pub mod srs;
pub mod store;
