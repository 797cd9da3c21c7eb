//! The closed registry of transaction type codes.
//!
//! Codes are consensus-visible and must never be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

macro_rules! transaction_types {
    ($($variant:ident = $code:literal, $name:literal, approval: $approval:literal;)+) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum TransactionType {
            $($variant,)+
        }

        impl TransactionType {
            pub const ALL: &'static [TransactionType] = &[$(Self::$variant,)+];

            pub fn code(&self) -> u8 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            pub fn from_code(code: u8) -> Result<Self, TypesError> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(TypesError::UnknownTransactionType(other)),
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Whether transactions of this type go through group approval.
            pub fn needs_approval(&self) -> bool {
                match self {
                    $(Self::$variant => $approval,)+
                }
            }
        }
    };
}

transaction_types! {
    Genesis = 1, "GENESIS", approval: false;
    Payment = 2, "PAYMENT", approval: false;
    RegisterName = 3, "REGISTER_NAME", approval: true;
    UpdateName = 4, "UPDATE_NAME", approval: true;
    SellName = 5, "SELL_NAME", approval: false;
    CancelSellName = 6, "CANCEL_SELL_NAME", approval: false;
    BuyName = 7, "BUY_NAME", approval: false;
    CreatePoll = 8, "CREATE_POLL", approval: true;
    VoteOnPoll = 9, "VOTE_ON_POLL", approval: false;
    Arbitrary = 10, "ARBITRARY", approval: true;
    IssueAsset = 11, "ISSUE_ASSET", approval: true;
    TransferAsset = 12, "TRANSFER_ASSET", approval: false;
    CreateAssetOrder = 13, "CREATE_ASSET_ORDER", approval: false;
    CancelAssetOrder = 14, "CANCEL_ASSET_ORDER", approval: false;
    MultiPayment = 15, "MULTI_PAYMENT", approval: false;
    DeployAt = 16, "DEPLOY_AT", approval: true;
    Message = 17, "MESSAGE", approval: true;
    Chat = 18, "CHAT", approval: false;
    Publicize = 19, "PUBLICIZE", approval: false;
    Airdrop = 20, "AIRDROP", approval: false;
    At = 21, "AT", approval: false;
    CreateGroup = 22, "CREATE_GROUP", approval: true;
    UpdateGroup = 23, "UPDATE_GROUP", approval: true;
    AddGroupAdmin = 24, "ADD_GROUP_ADMIN", approval: false;
    RemoveGroupAdmin = 25, "REMOVE_GROUP_ADMIN", approval: false;
    GroupBan = 26, "GROUP_BAN", approval: false;
    CancelGroupBan = 27, "CANCEL_GROUP_BAN", approval: false;
    GroupKick = 28, "GROUP_KICK", approval: false;
    GroupInvite = 29, "GROUP_INVITE", approval: false;
    CancelGroupInvite = 30, "CANCEL_GROUP_INVITE", approval: false;
    JoinGroup = 31, "JOIN_GROUP", approval: false;
    LeaveGroup = 32, "LEAVE_GROUP", approval: false;
    GroupApproval = 33, "GROUP_APPROVAL", approval: false;
    SetGroup = 34, "SET_GROUP", approval: false;
    UpdateAsset = 35, "UPDATE_ASSET", approval: true;
    AccountFlags = 36, "ACCOUNT_FLAGS", approval: false;
    EnableForging = 37, "ENABLE_FORGING", approval: false;
    RewardShare = 38, "REWARD_SHARE", approval: false;
    AccountLevel = 39, "ACCOUNT_LEVEL", approval: false;
    TransferPrivs = 40, "TRANSFER_PRIVS", approval: false;
    Presence = 41, "PRESENCE", approval: false;
}

impl TransactionType {
    /// Registered codes with no released behaviour.
    pub fn is_released(&self) -> bool {
        !matches!(
            self,
            Self::Airdrop | Self::EnableForging | Self::TransferPrivs
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(TransactionType::Genesis.code(), 1);
        assert_eq!(TransactionType::Chat.code(), 18);
        assert_eq!(TransactionType::At.code(), 21);
        assert_eq!(TransactionType::GroupApproval.code(), 33);
        assert_eq!(TransactionType::Presence.code(), 41);
    }

    #[test]
    fn every_code_roundtrips() {
        for ty in TransactionType::ALL {
            assert_eq!(TransactionType::from_code(ty.code()), Ok(*ty));
        }
        assert_eq!(TransactionType::ALL.len(), 41);
        assert!(TransactionType::from_code(0).is_err());
        assert!(TransactionType::from_code(42).is_err());
    }

    #[test]
    fn approval_flags() {
        assert!(TransactionType::RegisterName.needs_approval());
        assert!(TransactionType::Message.needs_approval());
        assert!(!TransactionType::Chat.needs_approval());
        assert!(!TransactionType::Payment.needs_approval());
    }
}
