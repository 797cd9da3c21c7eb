//! Group, membership, invite, join-request and ban storage.

use crate::StoreError;
use cairn_types::{Address, ApprovalThreshold, GroupId, Signature, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupData {
    pub group_id: GroupId,
    pub owner: Address,
    pub name: String,
    pub reduced_name: String,
    pub description: String,
    pub created: Timestamp,
    pub updated: Option<Timestamp>,
    pub is_open: bool,
    pub approval_threshold: ApprovalThreshold,
    pub min_block_delay: u32,
    pub max_block_delay: u32,
    /// Signature of the transaction that last changed this record.
    pub reference: Signature,
    pub creation_group_id: GroupId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberData {
    pub group_id: GroupId,
    pub member: Address,
    pub joined: Timestamp,
    pub reference: Signature,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminData {
    pub group_id: GroupId,
    pub admin: Address,
    pub reference: Signature,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteData {
    pub group_id: GroupId,
    pub inviter: Address,
    pub invitee: Address,
    /// `None` means the invite never expires.
    pub expiry: Option<Timestamp>,
    pub reference: Signature,
}

impl InviteData {
    pub fn is_live_at(&self, at: Timestamp) -> bool {
        self.expiry.map_or(true, |expiry| at < expiry)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestData {
    pub group_id: GroupId,
    pub joiner: Address,
    pub reference: Signature,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanData {
    pub group_id: GroupId,
    pub offender: Address,
    pub admin: Address,
    pub banned: Timestamp,
    pub reason: String,
    /// `None` means the ban is permanent.
    pub expiry: Option<Timestamp>,
    pub reference: Signature,
}

impl BanData {
    pub fn is_live_at(&self, at: Timestamp) -> bool {
        self.expiry.map_or(true, |expiry| at < expiry)
    }
}

pub trait GroupStore {
    fn get_group(&self, group_id: GroupId) -> Result<Option<GroupData>, StoreError>;
    fn get_group_by_reduced_name(&self, reduced_name: &str)
        -> Result<Option<GroupData>, StoreError>;
    fn next_group_id(&self) -> Result<GroupId, StoreError>;
    fn save_group(&self, group: &GroupData) -> Result<(), StoreError>;

    /// Remove the group together with its members, admins, invites, requests and bans.
    fn delete_group(&self, group_id: GroupId) -> Result<(), StoreError>;

    fn get_member(&self, group_id: GroupId, member: &Address)
        -> Result<Option<MemberData>, StoreError>;
    fn save_member(&self, member: &MemberData) -> Result<(), StoreError>;
    fn delete_member(&self, group_id: GroupId, member: &Address) -> Result<(), StoreError>;

    fn get_admin(&self, group_id: GroupId, admin: &Address) -> Result<Option<AdminData>, StoreError>;
    fn save_admin(&self, admin: &AdminData) -> Result<(), StoreError>;
    fn delete_admin(&self, group_id: GroupId, admin: &Address) -> Result<(), StoreError>;
    fn count_admins(&self, group_id: GroupId) -> Result<usize, StoreError>;

    fn get_invite(&self, group_id: GroupId, invitee: &Address)
        -> Result<Option<InviteData>, StoreError>;
    fn save_invite(&self, invite: &InviteData) -> Result<(), StoreError>;
    fn delete_invite(&self, group_id: GroupId, invitee: &Address) -> Result<(), StoreError>;

    fn get_join_request(
        &self,
        group_id: GroupId,
        joiner: &Address,
    ) -> Result<Option<JoinRequestData>, StoreError>;
    fn save_join_request(&self, request: &JoinRequestData) -> Result<(), StoreError>;
    fn delete_join_request(&self, group_id: GroupId, joiner: &Address) -> Result<(), StoreError>;

    fn get_ban(&self, group_id: GroupId, offender: &Address) -> Result<Option<BanData>, StoreError>;
    fn save_ban(&self, ban: &BanData) -> Result<(), StoreError>;
    fn delete_ban(&self, group_id: GroupId, offender: &Address) -> Result<(), StoreError>;

    fn is_member(&self, group_id: GroupId, address: &Address) -> Result<bool, StoreError> {
        Ok(self.get_member(group_id, address)?.is_some())
    }

    fn is_admin(&self, group_id: GroupId, address: &Address) -> Result<bool, StoreError> {
        Ok(self.get_admin(group_id, address)?.is_some())
    }
}
