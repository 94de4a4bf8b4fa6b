use thiserror::Error;

use crate::api::FetchError;
use crate::archive::ArchiveError;
use crate::catalog::CatalogError;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    #[error("Failed to generate archive: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("UI error: {0}")]
    Ui(String),
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<ArchiveError> for AppError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Malformed(_) | ArchiveError::Corrupt { .. } => {
                AppError::MalformedArchive(e.to_string())
            }
            _ => AppError::Serialization(e.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        AppError::Catalog(e.to_string())
    }
}

impl From<iced::Error> for AppError {
    fn from(e: iced::Error) -> Self {
        AppError::Ui(e.to_string())
    }
}
