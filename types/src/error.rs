//! Errors raised when decoding primitive values.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("unknown transaction type code: {0}")]
    UnknownTransactionType(u8),

    #[error("unknown approval status code: {0}")]
    UnknownApprovalStatus(u8),

    #[error("unknown approval threshold code: {0}")]
    UnknownApprovalThreshold(u8),

    #[error("unknown validation result code: {0}")]
    UnknownValidationResult(u16),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
