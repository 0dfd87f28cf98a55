use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Pump error: {0}")]
    Pump(#[from] pump_engine::PumpError),

    #[error("Backend error: {0}")]
    Backend(#[from] pump_backends::BackendError),

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
