//! Group identifiers and approval thresholds.

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// Identifier of a group. `NO_GROUP` means "public, ungated".
pub type GroupId = u32;

pub const NO_GROUP: GroupId = 0;

/// How many of a group's admins must agree before a pending transaction is decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalThreshold {
    /// No approvals needed.
    None,
    /// Any single admin.
    One,
    Pct20,
    Pct40,
    Pct60,
    Pct80,
    /// Every admin.
    Pct100,
    /// Strictly more than half of the admins.
    Majority,
}

impl ApprovalThreshold {
    pub fn code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::One => 1,
            Self::Pct20 => 2,
            Self::Pct40 => 3,
            Self::Pct60 => 4,
            Self::Pct80 => 5,
            Self::Pct100 => 6,
            Self::Majority => 7,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, TypesError> {
        Ok(match code {
            0 => Self::None,
            1 => Self::One,
            2 => Self::Pct20,
            3 => Self::Pct40,
            4 => Self::Pct60,
            5 => Self::Pct80,
            6 => Self::Pct100,
            7 => Self::Majority,
            other => return Err(TypesError::UnknownApprovalThreshold(other)),
        })
    }

    /// Whether `count` decisions out of `total_admins` satisfy this threshold.
    pub fn meets(&self, count: usize, total_admins: usize) -> bool {
        let count = count as u64;
        let total = total_admins as u64;
        match self {
            Self::None => true,
            Self::One => count >= 1,
            Self::Pct20 => Self::meets_pct(count, total, 20),
            Self::Pct40 => Self::meets_pct(count, total, 40),
            Self::Pct60 => Self::meets_pct(count, total, 60),
            Self::Pct80 => Self::meets_pct(count, total, 80),
            Self::Pct100 => Self::meets_pct(count, total, 100),
            Self::Majority => count * 2 > total,
        }
    }

    fn meets_pct(count: u64, total: u64, pct: u64) -> bool {
        count > 0 && count * 100 >= total * pct
    }
}
