use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
