use std::path::PathBuf;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("failed to read symbol table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid symbol table: {0}")]
    Table(#[from] toml::de::Error),
    #[error("failed to serialize symbol table: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = result::Result<T, CoreError>;
