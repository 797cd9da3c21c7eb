//! Validation-result codes.
//!
//! A closed, stable enumeration returned by every admission and validity check.
//! The numeric codes are part of the consensus-visible contract.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

macro_rules! validation_results {
    ($($variant:ident = $code:literal, $name:literal;)+) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ValidationResult {
            $($variant,)+
        }

        impl ValidationResult {
            pub fn code(&self) -> u16 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            pub fn from_code(code: u16) -> Result<Self, TypesError> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(TypesError::UnknownValidationResult(other)),
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

validation_results! {
    Ok = 1, "OK";
    InvalidAddress = 2, "INVALID_ADDRESS";
    NegativeAmount = 3, "NEGATIVE_AMOUNT";
    NegativeFee = 4, "NEGATIVE_FEE";
    NoBalance = 5, "NO_BALANCE";
    InvalidReference = 6, "INVALID_REFERENCE";
    InvalidNameLength = 7, "INVALID_NAME_LENGTH";
    InvalidValueLength = 8, "INVALID_VALUE_LENGTH";
    NameAlreadyRegistered = 9, "NAME_ALREADY_REGISTERED";
    NameDoesNotExist = 10, "NAME_DOES_NOT_EXIST";
    InvalidNameOwner = 11, "INVALID_NAME_OWNER";
    NameAlreadyForSale = 12, "NAME_ALREADY_FOR_SALE";
    NameNotForSale = 13, "NAME_NOT_FOR_SALE";
    BuyerAlreadyOwner = 14, "BUYER_ALREADY_OWNER";
    InvalidAmount = 15, "INVALID_AMOUNT";
    InvalidSeller = 16, "INVALID_SELLER";
    NameNotNormalized = 17, "NAME_NOT_NORMALIZED";
    InvalidDescriptionLength = 18, "INVALID_DESCRIPTION_LENGTH";
    InvalidOptionsCount = 19, "INVALID_OPTIONS_COUNT";
    InvalidOptionLength = 20, "INVALID_OPTION_LENGTH";
    DuplicateOption = 21, "DUPLICATE_OPTION";
    PollAlreadyExists = 22, "POLL_ALREADY_EXISTS";
    PollDoesNotExist = 24, "POLL_DOES_NOT_EXIST";
    PollOptionDoesNotExist = 25, "POLL_OPTION_DOES_NOT_EXIST";
    AlreadyVotedForThatOption = 26, "ALREADY_VOTED_FOR_THAT_OPTION";
    InvalidDataLength = 27, "INVALID_DATA_LENGTH";
    InvalidQuantity = 28, "INVALID_QUANTITY";
    AssetDoesNotExist = 29, "ASSET_DOES_NOT_EXIST";
    InvalidReturn = 30, "INVALID_RETURN";
    HaveEqualsWant = 31, "HAVE_EQUALS_WANT";
    OrderDoesNotExist = 32, "ORDER_DOES_NOT_EXIST";
    InvalidOrderCreator = 33, "INVALID_ORDER_CREATOR";
    InvalidPaymentsCount = 34, "INVALID_PAYMENTS_COUNT";
    NegativePrice = 35, "NEGATIVE_PRICE";
    InvalidCreationBytes = 36, "INVALID_CREATION_BYTES";
    InvalidTagsLength = 37, "INVALID_TAGS_LENGTH";
    InvalidAtTypeLength = 38, "INVALID_AT_TYPE_LENGTH";
    InvalidAtTransaction = 39, "INVALID_AT_TRANSACTION";
    InsufficientFee = 40, "INSUFFICIENT_FEE";
    AssetDoesNotMatchAt = 41, "ASSET_DOES_NOT_MATCH_AT";
    AssetAlreadyExists = 43, "ASSET_ALREADY_EXISTS";
    MissingCreator = 44, "MISSING_CREATOR";
    TimestampTooOld = 45, "TIMESTAMP_TOO_OLD";
    TimestampTooNew = 46, "TIMESTAMP_TOO_NEW";
    TooManyUnconfirmed = 47, "TOO_MANY_UNCONFIRMED";
    GroupAlreadyExists = 48, "GROUP_ALREADY_EXISTS";
    GroupDoesNotExist = 49, "GROUP_DOES_NOT_EXIST";
    InvalidGroupOwner = 50, "INVALID_GROUP_OWNER";
    AlreadyGroupMember = 51, "ALREADY_GROUP_MEMBER";
    GroupOwnerCannotLeave = 52, "GROUP_OWNER_CANNOT_LEAVE";
    NotGroupMember = 53, "NOT_GROUP_MEMBER";
    AlreadyGroupAdmin = 54, "ALREADY_GROUP_ADMIN";
    NotGroupAdmin = 55, "NOT_GROUP_ADMIN";
    InvalidLifetime = 56, "INVALID_LIFETIME";
    InviteUnknown = 57, "INVITE_UNKNOWN";
    BanExists = 58, "BAN_EXISTS";
    BanUnknown = 59, "BAN_UNKNOWN";
    BannedFromGroup = 60, "BANNED_FROM_GROUP";
    JoinRequestExists = 61, "JOIN_REQUEST_EXISTS";
    InvalidGroupApprovalThreshold = 62, "INVALID_GROUP_APPROVAL_THRESHOLD";
    GroupIdMismatch = 63, "GROUP_ID_MISMATCH";
    InvalidGroupId = 64, "INVALID_GROUP_ID";
    TransactionUnknown = 65, "TRANSACTION_UNKNOWN";
    TransactionAlreadyConfirmed = 66, "TRANSACTION_ALREADY_CONFIRMED";
    InvalidTxGroupId = 67, "INVALID_TX_GROUP_ID";
    TxGroupIdMismatch = 68, "TX_GROUP_ID_MISMATCH";
    MultipleNamesForbidden = 69, "MULTIPLE_NAMES_FORBIDDEN";
    InvalidAssetOwner = 70, "INVALID_ASSET_OWNER";
    AtIsFinished = 71, "AT_IS_FINISHED";
    NoFlagPermission = 72, "NO_FLAG_PERMISSION";
    NotMintingAccount = 73, "NOT_MINTING_ACCOUNT";
    RewardShareUnknown = 76, "REWARD_SHARE_UNKNOWN";
    InvalidRewardSharePercent = 77, "INVALID_REWARD_SHARE_PERCENT";
    PublicKeyUnknown = 78, "PUBLIC_KEY_UNKNOWN";
    InvalidPublicKey = 79, "INVALID_PUBLIC_KEY";
    AtUnknown = 80, "AT_UNKNOWN";
    AtAlreadyExists = 81, "AT_ALREADY_EXISTS";
    GroupApprovalNotRequired = 82, "GROUP_APPROVAL_NOT_REQUIRED";
    GroupApprovalDecided = 83, "GROUP_APPROVAL_DECIDED";
    MaximumRewardShares = 84, "MAXIMUM_REWARD_SHARES";
    TransactionAlreadyExists = 85, "TRANSACTION_ALREADY_EXISTS";
    NoBlockchainLock = 86, "NO_BLOCKCHAIN_LOCK";
    OrderAlreadyClosed = 87, "ORDER_ALREADY_CLOSED";
    ClockNotSynced = 88, "CLOCK_NOT_SYNCED";
    AssetNotSpendable = 89, "ASSET_NOT_SPENDABLE";
    AccountCannotRewardShare = 90, "ACCOUNT_CANNOT_REWARD_SHARE";
    SelfShareExists = 91, "SELF_SHARE_EXISTS";
    AccountAlreadyExists = 92, "ACCOUNT_ALREADY_EXISTS";
    InvalidGroupBlockDelay = 93, "INVALID_GROUP_BLOCK_DELAY";
    IncorrectNonce = 94, "INCORRECT_NONCE";
    InvalidTimestampSignature = 95, "INVALID_TIMESTAMP_SIGNATURE";
    InvalidButOk = 999, "INVALID_BUT_OK";
    NotYetReleased = 1000, "NOT_YET_RELEASED";
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
