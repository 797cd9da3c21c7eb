//! Automated-transaction accounts: DEPLOY_AT and the AT transactions an AT
//! emits while executing.
//!
//! The AT machine itself is external. Deployment only checks that the
//! creation bytes are structurally sound, records the code and funds the new
//! account; AT transactions are produced by the machine and only ever arrive
//! inside blocks.

use cairn_crypto::{at_address, sha256};
use cairn_store::AtData;
use cairn_types::{Address, Amount, AssetId, ValidationResult, BASE_ASSET};
use serde::{Deserialize, Serialize};

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::naming::utf8_len_within;
use crate::{FeePolicy, ReferencePolicy, Transaction, TransactionError, TxContext, UndoState};

pub const MAX_NAME_SIZE: usize = 200;
pub const MAX_DESCRIPTION_SIZE: usize = 2000;
pub const MAX_AT_TYPE_SIZE: usize = 200;
pub const MAX_TAGS_SIZE: usize = 200;
pub const MAX_CREATION_BYTES_SIZE: usize = 4096;
pub const MAX_CODE_BYTES_LENGTH: usize = 1024;
pub const MAX_AT_STATE_LENGTH: usize = 1024;
/// Largest message an AT may send.
pub const MAX_DATA_SIZE: usize = 256;

const MIN_VERSION: u16 = 2;
const DATA_PAGE_SIZE: usize = 8;
const CALL_STACK_PAGE_SIZE: usize = 4;
const USER_STACK_PAGE_SIZE: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployAtBody {
    pub name: String,
    pub description: String,
    pub at_type: String,
    pub tags: String,
    pub creation_bytes: Vec<u8>,
    pub amount: Amount,
    pub asset_id: AssetId,
}

/// Emitted by an AT: either a payment or a message, never both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtBody {
    pub at_address: Address,
    pub recipient: Address,
    pub amount: Option<Amount>,
    pub asset_id: Option<AssetId>,
    pub message: Option<Vec<u8>>,
}

// ── Creation bytes ─────────────────────────────────────────────────────

/// Decoded creation bytes.
///
/// Layout, big-endian: version, reserved, code pages, data pages, call-stack
/// pages, user-stack pages (six `u16`s), then a length-prefixed code segment
/// and a length-prefixed data segment. Each length prefix is one, two or four
/// bytes wide depending on the capacity of its segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreationBytes {
    pub version: u16,
    pub code_pages: u16,
    pub data_pages: u16,
    pub call_stack_pages: u16,
    pub user_stack_pages: u16,
    pub code: Vec<u8>,
    pub data: Vec<u8>,
}

struct Reader<'a>(&'a [u8]);

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        if self.0.len() < n {
            return None;
        }
        let (head, tail) = self.0.split_at(n);
        self.0 = tail;
        Some(head)
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// Length prefix sized to fit `capacity`.
    fn length(&mut self, capacity: usize) -> Option<usize> {
        if capacity <= 0xff {
            self.take(1).map(|b| b[0] as usize)
        } else if capacity <= 0xffff {
            self.u16().map(usize::from)
        } else {
            self.take(4)
                .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize)
        }
    }
}

impl CreationBytes {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > MAX_CREATION_BYTES_SIZE {
            return None;
        }
        let mut reader = Reader(bytes);
        let version = reader.u16()?;
        let _reserved = reader.u16()?;
        let code_pages = reader.u16()?;
        let data_pages = reader.u16()?;
        let call_stack_pages = reader.u16()?;
        let user_stack_pages = reader.u16()?;

        let code_capacity = usize::from(code_pages);
        let code_len = reader.length(code_capacity)?;
        if code_len == 0 || code_len > code_capacity {
            return None;
        }
        let code = reader.take(code_len)?.to_vec();

        let data_capacity = usize::from(data_pages) * DATA_PAGE_SIZE;
        let data_len = reader.length(data_capacity)?;
        if data_len > data_capacity {
            return None;
        }
        let data = reader.take(data_len)?.to_vec();

        if !reader.0.is_empty() {
            return None;
        }
        Some(Self {
            version,
            code_pages,
            data_pages,
            call_stack_pages,
            user_stack_pages,
            code,
            data,
        })
    }

    /// Bytes of machine state the AT will carry between executions.
    pub fn state_len(&self) -> usize {
        usize::from(self.data_pages) * DATA_PAGE_SIZE
            + usize::from(self.call_stack_pages) * CALL_STACK_PAGE_SIZE
            + usize::from(self.user_stack_pages) * USER_STACK_PAGE_SIZE
    }

    fn is_deployable(&self) -> bool {
        self.version >= MIN_VERSION
            && self.code.len() <= MAX_CODE_BYTES_LENGTH
            && self.state_len() <= MAX_AT_STATE_LENGTH
    }
}

// ── DEPLOY_AT ──────────────────────────────────────────────────────────

impl DeployAtBody {
    fn has_funds(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<bool, TransactionError> {
        let creator = tx.creator_address();
        if self.asset_id == BASE_ASSET {
            let Some(total) = self.amount.checked_add(tx.header.fee) else {
                return Ok(false);
            };
            return checks::holds(ctx, &creator, BASE_ASSET, total);
        }
        Ok(checks::covers_fee(tx, ctx)?
            && checks::holds(ctx, &creator, self.asset_id, self.amount)?)
    }
}

impl Behaviour for DeployAtBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            utf8_len_within(&self.name, 1, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(
            utf8_len_within(&self.description, 1, MAX_DESCRIPTION_SIZE),
            ValidationResult::InvalidDescriptionLength
        );
        ensure!(
            utf8_len_within(&self.at_type, 1, MAX_AT_TYPE_SIZE),
            ValidationResult::InvalidAtTypeLength
        );
        ensure!(
            utf8_len_within(&self.tags, 1, MAX_TAGS_SIZE),
            ValidationResult::InvalidTagsLength
        );
        ensure!(self.amount.is_positive(), ValidationResult::NegativeAmount);

        let Some(asset) = ctx.repo.get_asset(self.asset_id)? else {
            return Ok(ValidationResult::AssetDoesNotExist);
        };
        ensure!(!asset.is_unspendable, ValidationResult::AssetNotSpendable);
        ensure!(
            asset.is_divisible || self.amount.is_whole(),
            ValidationResult::InvalidAmount
        );
        ensure!(self.has_funds(tx, ctx)?, ValidationResult::NoBalance);
        ensure!(
            CreationBytes::parse(&self.creation_bytes).is_some_and(|c| c.is_deployable()),
            ValidationResult::InvalidCreationBytes
        );
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(self.has_funds(tx, ctx)?, ValidationResult::NoBalance);
        ensure!(
            ctx.repo.get_at(&at_address(&tx.signature))?.is_none(),
            ValidationResult::AtAlreadyExists
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let creation = CreationBytes::parse(&self.creation_bytes)
            .ok_or_else(|| TransactionError::Malformed("AT creation bytes".into()))?;
        let address = at_address(&tx.signature);

        ctx.repo.save_at(&AtData {
            address: address.clone(),
            creator: tx.header.creator,
            creation: tx.header.timestamp,
            version: creation.version,
            asset_id: self.asset_id,
            code_hash: sha256(&creation.code),
            code_bytes: creation.code,
            is_sleeping: false,
            sleep_until_height: None,
            is_finished: false,
            had_fatal_error: false,
            is_frozen: false,
            frozen_balance: None,
        })?;

        checks::debit(ctx, tx, &tx.creator_address(), self.asset_id, self.amount)?;
        ctx.repo.set_last_reference(&address, Some(tx.signature))?;
        ctx.repo.set_balance(&address, self.asset_id, self.amount)?;
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let address = at_address(&tx.signature);
        ctx.repo.delete_at(&address)?;
        checks::credit(ctx, &tx.creator_address(), self.asset_id, self.amount)?;
        ctx.repo.delete_account(&address)?;
        Ok(())
    }
}

// ── AT ─────────────────────────────────────────────────────────────────

impl AtBody {
    fn payment(&self) -> Option<(AssetId, Amount)> {
        self.asset_id.zip(self.amount)
    }
}

impl Behaviour for AtBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.recipient.clone()]
    }

    fn fee_policy(&self, _tx: &Transaction) -> FeePolicy {
        FeePolicy::NonNegative
    }

    fn reference_policy(&self) -> ReferencePolicy {
        ReferencePolicy::Waived
    }

    fn is_valid(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            checks::is_valid_address(&self.recipient),
            ValidationResult::InvalidAddress
        );
        let payment = self.payment();
        ensure!(
            payment.is_some() != self.message.is_some(),
            ValidationResult::InvalidAtTransaction
        );
        let Some((asset_id, amount)) = payment else {
            let len = self.message.as_ref().map_or(0, Vec::len);
            ensure!(len <= MAX_DATA_SIZE, ValidationResult::InvalidDataLength);
            return Ok(ValidationResult::Ok);
        };

        ensure!(!amount.is_negative(), ValidationResult::NegativeAmount);
        let Some(asset) = ctx.repo.get_asset(asset_id)? else {
            return Ok(ValidationResult::AssetDoesNotExist);
        };
        ensure!(
            asset.is_divisible || amount.is_whole(),
            ValidationResult::InvalidAmount
        );
        ensure!(
            checks::holds(ctx, &self.at_address, asset_id, amount)?,
            ValidationResult::NoBalance
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        if let Some((asset_id, amount)) = self.payment() {
            checks::debit(ctx, tx, &self.at_address, asset_id, amount)?;
            checks::credit(ctx, &self.recipient, asset_id, amount)?;
        }
        Ok(None)
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        if let Some((asset_id, amount)) = self.payment() {
            checks::debit(ctx, tx, &self.recipient, asset_id, amount)?;
            checks::credit(ctx, &self.at_address, asset_id, amount)?;
        }
        Ok(())
    }

    fn process_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        ctx.repo
            .set_last_reference(&self.at_address, Some(tx.signature))?;
        if matches!(self.payment(), Some((BASE_ASSET, _))) {
            checks::init_reference(tx, ctx, &self.recipient)?;
        }
        Ok(())
    }

    fn orphan_references_and_fees(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        ctx.repo
            .set_last_reference(&self.at_address, tx.previous_reference()?)?;
        if matches!(self.payment(), Some((BASE_ASSET, _))) {
            checks::uninit_reference(tx, ctx, &self.recipient)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creation_bytes(version: u16, code: &[u8], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for field in [version, 0, code.len() as u16, (data.len() / 8) as u16, 1, 1] {
            out.extend_from_slice(&field.to_be_bytes());
        }
        out.push(code.len() as u8);
        out.extend_from_slice(code);
        out.push(data.len() as u8);
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn parses_well_formed_creation_bytes() {
        let bytes = creation_bytes(2, &[0x01, 0x02, 0x03], &[0; 16]);
        let parsed = CreationBytes::parse(&bytes).unwrap();
        assert_eq!(parsed.version, 2);
        assert_eq!(parsed.code, vec![0x01, 0x02, 0x03]);
        assert_eq!(parsed.data.len(), 16);
        assert!(parsed.is_deployable());
    }

    #[test]
    fn version_one_is_not_deployable() {
        let bytes = creation_bytes(1, &[0x01], &[]);
        assert!(!CreationBytes::parse(&bytes).unwrap().is_deployable());
    }

    #[test]
    fn rejects_trailing_and_truncated_bytes() {
        let mut bytes = creation_bytes(2, &[0x01, 0x02], &[0; 8]);
        bytes.push(0);
        assert!(CreationBytes::parse(&bytes).is_none());

        let bytes = creation_bytes(2, &[0x01, 0x02], &[0; 8]);
        assert!(CreationBytes::parse(&bytes[..bytes.len() - 1]).is_none());
    }

    #[test]
    fn rejects_empty_code() {
        let bytes = creation_bytes(2, &[], &[]);
        assert!(CreationBytes::parse(&bytes).is_none());
    }
}
