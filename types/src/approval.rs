//! Group-approval status carried by every transaction.

use serde::{Deserialize, Serialize};

use crate::TypesError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    #[default]
    NotRequired,
    Pending,
    Approved,
    Rejected,
    Expired,
    Invalid,
}

impl ApprovalStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::NotRequired => 0,
            Self::Pending => 1,
            Self::Approved => 2,
            Self::Rejected => 3,
            Self::Expired => 4,
            Self::Invalid => 5,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, TypesError> {
        Ok(match code {
            0 => Self::NotRequired,
            1 => Self::Pending,
            2 => Self::Approved,
            3 => Self::Rejected,
            4 => Self::Expired,
            5 => Self::Invalid,
            other => return Err(TypesError::UnknownApprovalStatus(other)),
        })
    }

    /// True once a pending transaction has reached a final outcome.
    pub fn is_decided(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Expired | Self::Invalid
        )
    }
}
