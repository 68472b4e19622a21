use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("authentication failed")]
    AuthFailed,

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown ipc command byte {0:#x}")]
    UnknownCommand(u8),

    #[error("wire error: {0}")]
    Wire(#[from] watchdog_wire::WireError),
}

pub type IpcResult<T> = std::result::Result<T, IpcError>;
