use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to write output records")]
    IOError(#[from] std::io::Error),
}
