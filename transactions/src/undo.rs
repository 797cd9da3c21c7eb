//! State captured by `process` so that `orphan` can restore it exactly.

use cairn_store::{
    AccountData, AdminData, AssetData, BanData, GroupData, InviteData, JoinRequestData,
    MemberData, NameData, OrderData, Repository, RewardShareData, StoreError, TradeData,
};
use cairn_types::{Address, Amount, AssetId, GroupId, Signature};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoState {
    /// Genesis credit: the account and balance it overwrote.
    GenesisCredit {
        previous: Option<AccountData>,
        previous_balance: Amount,
    },
    /// Whole account record before a flags, level or publicize change.
    Account(Option<AccountData>),
    /// Name record before the change; `None` when the name was just created.
    Name(Option<NameData>),
    /// Option index of the voter's earlier vote, if any.
    Vote(Option<u32>),
    IssuedAsset(AssetId),
    Asset(AssetData),
    /// Trades executed while matching a new order, in execution order.
    Trades(Vec<TradeData>),
    Order(OrderData),
    CreatedGroup(GroupId),
    GroupUpdate {
        previous: GroupData,
        new_owner: MembershipSnapshot,
    },
    Membership(MembershipSnapshot),
    DefaultGroup(GroupId),
    RewardShare(Option<RewardShareData>),
}

/// The creator's last reference before `process_references_and_fees`
/// advanced it. Orphaning puts this value back, which need not equal the
/// transaction's own `reference` when the chain check was waived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceUndo {
    pub previous: Option<Signature>,
}

/// Every membership-related row for one (group, address) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub group_id: GroupId,
    pub address: Address,
    pub member: Option<MemberData>,
    pub admin: Option<AdminData>,
    pub invite: Option<InviteData>,
    pub join_request: Option<JoinRequestData>,
    pub ban: Option<BanData>,
}

impl MembershipSnapshot {
    pub fn capture(
        repo: &dyn Repository,
        group_id: GroupId,
        address: &Address,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            group_id,
            address: address.clone(),
            member: repo.get_member(group_id, address)?,
            admin: repo.get_admin(group_id, address)?,
            invite: repo.get_invite(group_id, address)?,
            join_request: repo.get_join_request(group_id, address)?,
            ban: repo.get_ban(group_id, address)?,
        })
    }

    /// Put every row back the way it was captured.
    pub fn restore(&self, repo: &dyn Repository) -> Result<(), StoreError> {
        let (group_id, address) = (self.group_id, &self.address);

        match &self.member {
            Some(member) => repo.save_member(member)?,
            None => repo.delete_member(group_id, address)?,
        }
        match &self.admin {
            Some(admin) => repo.save_admin(admin)?,
            None => repo.delete_admin(group_id, address)?,
        }
        match &self.invite {
            Some(invite) => repo.save_invite(invite)?,
            None => repo.delete_invite(group_id, address)?,
        }
        match &self.join_request {
            Some(request) => repo.save_join_request(request)?,
            None => repo.delete_join_request(group_id, address)?,
        }
        match &self.ban {
            Some(ban) => repo.save_ban(ban)?,
            None => repo.delete_ban(group_id, address)?,
        }
        Ok(())
    }
}
