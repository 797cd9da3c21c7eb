use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("work buffer of {0} bytes holds no 64-bit words")]
    BufferTooSmall(usize),

    #[error("nonce space exhausted at difficulty {0}")]
    Exhausted(u32),

    #[error("work generation cancelled")]
    Cancelled,
}
