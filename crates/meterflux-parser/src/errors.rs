use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("file did not contain a header row")]
    MissingHeader,

    #[error("failed to build reading frame: {0}")]
    Frame(#[from] polars::error::PolarsError),
}
