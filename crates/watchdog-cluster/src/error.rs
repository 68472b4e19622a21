use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown peer token")]
    UnknownToken,

    #[error("wire error: {0}")]
    Wire(#[from] watchdog_wire::WireError),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
