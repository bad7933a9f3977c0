//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Variables merge error: {message}")]
    ValuesMerge { message: String },

    #[error("Invalid variable '{key}': {message}")]
    InvalidVariable { key: String, message: String },

    #[error("Invalid manifest filename: {name}")]
    InvalidFilename { name: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
