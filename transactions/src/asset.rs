//! ISSUE_ASSET and UPDATE_ASSET.

use cairn_store::AssetData;
use cairn_types::{Address, Amount, AssetId, ValidationResult};
use serde::{Deserialize, Serialize};

use crate::behaviour::Behaviour;
use crate::checks::{self, ensure};
use crate::naming::{is_normalized, reduce, utf8_len_within};
use crate::{Transaction, TransactionError, TxContext, UndoState};

pub const MIN_NAME_SIZE: usize = 1;
pub const MAX_NAME_SIZE: usize = 40;
pub const MAX_DESCRIPTION_SIZE: usize = 4000;
pub const MAX_DATA_SIZE: usize = 400_000;
pub const MAX_QUANTITY: Amount = Amount::whole(10_000_000_000);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueAssetBody {
    pub asset_name: String,
    pub description: String,
    pub quantity: Amount,
    pub is_divisible: bool,
    pub data: String,
    pub is_unspendable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAssetBody {
    pub asset_id: AssetId,
    pub new_owner: Address,
    /// Empty to keep the current description.
    pub new_description: String,
    /// Empty to keep the current data.
    pub new_data: String,
}

impl Behaviour for IssueAssetBody {
    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            utf8_len_within(&self.asset_name, MIN_NAME_SIZE, MAX_NAME_SIZE),
            ValidationResult::InvalidNameLength
        );
        ensure!(
            is_normalized(&self.asset_name),
            ValidationResult::NameNotNormalized
        );
        ensure!(
            utf8_len_within(&self.description, 1, MAX_DESCRIPTION_SIZE),
            ValidationResult::InvalidDescriptionLength
        );
        ensure!(
            utf8_len_within(&self.data, 1, MAX_DATA_SIZE),
            ValidationResult::InvalidDataLength
        );
        ensure!(
            self.quantity >= Amount::new(1) && self.quantity <= MAX_QUANTITY,
            ValidationResult::InvalidQuantity
        );
        ensure!(
            self.is_divisible || self.quantity.is_whole(),
            ValidationResult::InvalidQuantity
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        _tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        ensure!(
            ctx.repo
                .get_asset_by_reduced_name(&reduce(&self.asset_name))?
                .is_none(),
            ValidationResult::AssetAlreadyExists
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let asset_id = ctx.repo.next_asset_id()?;
        let issuer = tx.creator_address();
        ctx.repo.save_asset(&AssetData {
            asset_id,
            owner: issuer.clone(),
            name: self.asset_name.clone(),
            reduced_name: reduce(&self.asset_name),
            description: self.description.clone(),
            quantity: self.quantity,
            is_divisible: self.is_divisible,
            data: self.data.clone(),
            is_unspendable: self.is_unspendable,
            creation_group_id: tx.header.tx_group_id,
            reference: tx.signature,
        })?;
        ctx.repo.set_balance(&issuer, asset_id, self.quantity)?;
        Ok(Some(UndoState::IssuedAsset(asset_id)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::IssuedAsset(asset_id)) = tx.undo else {
            return Err(tx.missing_undo());
        };
        ctx.repo
            .set_balance(&tx.creator_address(), asset_id, Amount::ZERO)?;
        ctx.repo.delete_asset(asset_id)?;
        Ok(())
    }
}

impl Behaviour for UpdateAssetBody {
    fn recipients(&self) -> Vec<Address> {
        vec![self.new_owner.clone()]
    }

    fn is_valid(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let Some(asset) = ctx.repo.get_asset(self.asset_id)? else {
            return Ok(ValidationResult::AssetDoesNotExist);
        };
        ensure!(
            checks::is_valid_address(&self.new_owner),
            ValidationResult::InvalidAddress
        );
        ensure!(
            self.new_description.len() <= MAX_DESCRIPTION_SIZE,
            ValidationResult::InvalidDataLength
        );
        ensure!(
            self.new_data.len() <= MAX_DATA_SIZE,
            ValidationResult::InvalidDataLength
        );
        ensure!(
            asset.creation_group_id == tx.header.tx_group_id,
            ValidationResult::TxGroupIdMismatch
        );
        ensure!(checks::covers_fee(tx, ctx)?, ValidationResult::NoBalance);
        Ok(ValidationResult::Ok)
    }

    fn is_processable(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<ValidationResult, TransactionError> {
        let Some(asset) = ctx.repo.get_asset(self.asset_id)? else {
            return Ok(ValidationResult::AssetDoesNotExist);
        };
        ensure!(
            asset.owner == tx.creator_address(),
            ValidationResult::InvalidAssetOwner
        );
        Ok(ValidationResult::Ok)
    }

    fn process(
        &self,
        tx: &Transaction,
        ctx: &TxContext<'_>,
    ) -> Result<Option<UndoState>, TransactionError> {
        let previous = ctx
            .repo
            .get_asset(self.asset_id)?
            .ok_or_else(|| tx.missing("asset"))?;
        let mut updated = previous.clone();
        updated.owner = self.new_owner.clone();
        if !self.new_description.is_empty() {
            updated.description = self.new_description.clone();
        }
        if !self.new_data.is_empty() {
            updated.data = self.new_data.clone();
        }
        updated.reference = tx.signature;
        ctx.repo.save_asset(&updated)?;
        Ok(Some(UndoState::Asset(previous)))
    }

    fn orphan(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), TransactionError> {
        let Some(UndoState::Asset(previous)) = &tx.undo else {
            return Err(tx.missing_undo());
        };
        ctx.repo.save_asset(previous)?;
        Ok(())
    }
}
