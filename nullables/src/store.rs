//! Nullable repository: thread-safe in-memory storage for testing.
//!
//! Two copies of the state are kept: the working copy every call reads and
//! writes, and the committed copy. `save_changes` promotes the working copy,
//! `discard_changes` throws it away.

use cairn_store::{
    AccountData, AccountStore, AdminData, ApprovalRecord, AssetData, AssetStore, AtData, AtStore,
    BanData, BlockSummary, ChainStore, GroupData, GroupStore, InviteData, JoinRequestData,
    MemberData, NameData, NameStore, OrderData, PollData, PollStore, Repository,
    RewardShareData, StoreError, StoredTransaction, TradeData, TransactionStore, VoteData,
};
use cairn_types::{
    Address, Amount, ApprovalStatus, AssetId, GroupId, PublicKey, Signature, TransactionType,
    BASE_ASSET, NO_GROUP,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Ledger-visible tables, without transaction bookkeeping.
///
/// Used by tests to assert that orphaning restores state exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub accounts: BTreeMap<Address, AccountData>,
    pub balances: BTreeMap<(Address, AssetId), Amount>,
    pub reward_shares: BTreeMap<(PublicKey, Address), RewardShareData>,
    pub assets: BTreeMap<AssetId, AssetData>,
    pub orders: BTreeMap<Signature, OrderData>,
    pub trades: Vec<TradeData>,
    pub names: BTreeMap<String, NameData>,
    pub polls: BTreeMap<String, PollData>,
    pub votes: BTreeMap<(String, PublicKey), VoteData>,
    pub ats: BTreeMap<Address, AtData>,
    pub groups: BTreeMap<GroupId, GroupData>,
    pub members: BTreeMap<(GroupId, Address), MemberData>,
    pub admins: BTreeMap<(GroupId, Address), AdminData>,
    pub invites: BTreeMap<(GroupId, Address), InviteData>,
    pub join_requests: BTreeMap<(GroupId, Address), JoinRequestData>,
    pub bans: BTreeMap<(GroupId, Address), BanData>,
    pub approvals: Vec<ApprovalRecord>,
}

#[derive(Clone, Debug, Default)]
struct State {
    ledger: LedgerSnapshot,
    blocks: Vec<BlockSummary>,
    transactions: BTreeMap<Signature, StoredTransaction>,
    unconfirmed: BTreeSet<Signature>,
}

/// An in-memory [`Repository`] for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullRepository {
    working: Mutex<State>,
    committed: Mutex<State>,
}

impl NullRepository {
    /// An empty ledger holding only the base asset record.
    pub fn new() -> Self {
        let mut state = State::default();
        state.ledger.assets.insert(BASE_ASSET, base_asset());
        Self {
            working: Mutex::new(state.clone()),
            committed: Mutex::new(state),
        }
    }

    /// Credit a balance and commit it immediately. Test setup only.
    pub fn seed_balance(&self, address: &Address, asset: AssetId, amount: Amount) {
        {
            let mut state = self.working.lock().unwrap();
            state
                .ledger
                .accounts
                .entry(address.clone())
                .or_insert_with(|| AccountData::new(address.clone()));
            if amount.is_zero() {
                state.ledger.balances.remove(&(address.clone(), asset));
            } else {
                state.ledger.balances.insert((address.clone(), asset), amount);
            }
        }
        self.commit();
    }

    /// Copy of the ledger tables in the working state.
    ///
    /// Blank account records (no key, reference, flags or counters) are left
    /// out: crediting creates one implicitly and orphaning leaves it behind,
    /// which is not an observable difference.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut ledger = self.working.lock().unwrap().ledger.clone();
        ledger
            .accounts
            .retain(|address, account| *account != AccountData::new(address.clone()));
        ledger
    }

    /// True when the working state has changes not yet saved.
    pub fn has_uncommitted_changes(&self) -> bool {
        let working = self.working.lock().unwrap();
        let committed = self.committed.lock().unwrap();
        working.ledger != committed.ledger
            || working.blocks != committed.blocks
            || working.transactions != committed.transactions
            || working.unconfirmed != committed.unconfirmed
    }

    fn commit(&self) {
        let working = self.working.lock().unwrap().clone();
        *self.committed.lock().unwrap() = working;
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.working.lock().unwrap())
    }
}

impl Default for NullRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn base_asset() -> AssetData {
    AssetData {
        asset_id: BASE_ASSET,
        owner: Address::new(format!("{}genesis", Address::PREFIX)),
        name: "CAIRN".to_string(),
        reduced_name: "cairn".to_string(),
        description: "Base asset".to_string(),
        quantity: Amount::new(i64::MAX),
        is_divisible: true,
        data: String::new(),
        is_unspendable: false,
        creation_group_id: NO_GROUP,
        reference: Signature::ZERO,
    }
}

impl Repository for NullRepository {
    fn save_changes(&self) -> Result<(), StoreError> {
        self.commit();
        Ok(())
    }

    fn discard_changes(&self) -> Result<(), StoreError> {
        let committed = self.committed.lock().unwrap().clone();
        *self.working.lock().unwrap() = committed;
        Ok(())
    }
}

impl AccountStore for NullRepository {
    fn get_account(&self, address: &Address) -> Result<Option<AccountData>, StoreError> {
        Ok(self.with(|s| s.ledger.accounts.get(address).cloned()))
    }

    fn save_account(&self, account: &AccountData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .accounts
                .insert(account.address.clone(), account.clone())
        });
        Ok(())
    }

    fn delete_account(&self, address: &Address) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger.accounts.remove(address);
            s.ledger.balances.retain(|(owner, _), _| owner != address);
        });
        Ok(())
    }

    fn ensure_account(
        &self,
        address: &Address,
        public_key: Option<&PublicKey>,
    ) -> Result<(), StoreError> {
        self.with(|s| {
            let account = s
                .ledger
                .accounts
                .entry(address.clone())
                .or_insert_with(|| AccountData::new(address.clone()));
            if account.public_key.is_none() {
                account.public_key = public_key.copied();
            }
        });
        Ok(())
    }

    fn get_last_reference(&self, address: &Address) -> Result<Option<Signature>, StoreError> {
        Ok(self.with(|s| s.ledger.accounts.get(address).and_then(|a| a.reference)))
    }

    fn set_last_reference(
        &self,
        address: &Address,
        reference: Option<Signature>,
    ) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .accounts
                .entry(address.clone())
                .or_insert_with(|| AccountData::new(address.clone()))
                .reference = reference;
        });
        Ok(())
    }

    fn get_balance(&self, address: &Address, asset: AssetId) -> Result<Amount, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .balances
                .get(&(address.clone(), asset))
                .copied()
                .unwrap_or(Amount::ZERO)
        }))
    }

    fn set_balance(
        &self,
        address: &Address,
        asset: AssetId,
        balance: Amount,
    ) -> Result<(), StoreError> {
        if balance.is_negative() {
            return Err(StoreError::NegativeBalance {
                address: address.clone(),
                asset,
                balance: Amount::ZERO,
                delta: balance,
            });
        }
        self.with(|s| {
            s.ledger
                .accounts
                .entry(address.clone())
                .or_insert_with(|| AccountData::new(address.clone()));
            if balance.is_zero() {
                s.ledger.balances.remove(&(address.clone(), asset));
            } else {
                s.ledger.balances.insert((address.clone(), asset), balance);
            }
        });
        Ok(())
    }

    fn modify_balance(
        &self,
        address: &Address,
        asset: AssetId,
        delta: Amount,
    ) -> Result<Amount, StoreError> {
        self.with(|s| {
            let key = (address.clone(), asset);
            let balance = s.ledger.balances.get(&key).copied().unwrap_or(Amount::ZERO);
            let updated = balance
                .checked_add(delta)
                .filter(|b| !b.is_negative())
                .ok_or_else(|| StoreError::NegativeBalance {
                    address: address.clone(),
                    asset,
                    balance,
                    delta,
                })?;
            s.ledger
                .accounts
                .entry(address.clone())
                .or_insert_with(|| AccountData::new(address.clone()));
            if updated.is_zero() {
                s.ledger.balances.remove(&key);
            } else {
                s.ledger.balances.insert(key, updated);
            }
            Ok(updated)
        })
    }

    fn get_reward_share(
        &self,
        minter: &PublicKey,
        recipient: &Address,
    ) -> Result<Option<RewardShareData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .reward_shares
                .get(&(*minter, recipient.clone()))
                .cloned()
        }))
    }

    fn get_reward_share_by_key(
        &self,
        reward_share_public_key: &PublicKey,
    ) -> Result<Option<RewardShareData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .reward_shares
                .values()
                .find(|r| r.reward_share_public_key == *reward_share_public_key)
                .cloned()
        }))
    }

    fn save_reward_share(&self, share: &RewardShareData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger.reward_shares.insert(
                (share.minter_public_key, share.recipient.clone()),
                share.clone(),
            )
        });
        Ok(())
    }

    fn delete_reward_share(
        &self,
        minter: &PublicKey,
        recipient: &Address,
    ) -> Result<(), StoreError> {
        self.with(|s| s.ledger.reward_shares.remove(&(*minter, recipient.clone())));
        Ok(())
    }

    fn count_reward_shares(&self, minter: &PublicKey) -> Result<usize, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .reward_shares
                .keys()
                .filter(|(key, _)| key == minter)
                .count()
        }))
    }
}

impl AssetStore for NullRepository {
    fn get_asset(&self, asset_id: AssetId) -> Result<Option<AssetData>, StoreError> {
        Ok(self.with(|s| s.ledger.assets.get(&asset_id).cloned()))
    }

    fn get_asset_by_reduced_name(
        &self,
        reduced_name: &str,
    ) -> Result<Option<AssetData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .assets
                .values()
                .find(|a| a.reduced_name == reduced_name)
                .cloned()
        }))
    }

    fn next_asset_id(&self) -> Result<AssetId, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .assets
                .keys()
                .next_back()
                .map_or(BASE_ASSET, |id| id + 1)
        }))
    }

    fn save_asset(&self, asset: &AssetData) -> Result<(), StoreError> {
        self.with(|s| s.ledger.assets.insert(asset.asset_id, asset.clone()));
        Ok(())
    }

    fn delete_asset(&self, asset_id: AssetId) -> Result<(), StoreError> {
        self.with(|s| s.ledger.assets.remove(&asset_id));
        Ok(())
    }

    fn get_order(&self, order_id: &Signature) -> Result<Option<OrderData>, StoreError> {
        Ok(self.with(|s| s.ledger.orders.get(order_id).cloned()))
    }

    fn save_order(&self, order: &OrderData) -> Result<(), StoreError> {
        self.with(|s| s.ledger.orders.insert(order.order_id, order.clone()));
        Ok(())
    }

    fn delete_order(&self, order_id: &Signature) -> Result<(), StoreError> {
        self.with(|s| s.ledger.orders.remove(order_id));
        Ok(())
    }

    fn open_orders(&self, have: AssetId, want: AssetId) -> Result<Vec<OrderData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .orders
                .values()
                .filter(|o| o.have_asset_id == have && o.want_asset_id == want && !o.is_closed)
                .cloned()
                .collect()
        }))
    }

    fn save_trade(&self, trade: &TradeData) -> Result<(), StoreError> {
        self.with(|s| s.ledger.trades.push(trade.clone()));
        Ok(())
    }

    fn delete_trade(&self, trade: &TradeData) -> Result<(), StoreError> {
        self.with(|s| {
            if let Some(pos) = s.ledger.trades.iter().rposition(|t| t == trade) {
                s.ledger.trades.remove(pos);
            }
        });
        Ok(())
    }

    fn trades_for_order(&self, order_id: &Signature) -> Result<Vec<TradeData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .trades
                .iter()
                .filter(|t| t.initiator == *order_id || t.target == *order_id)
                .cloned()
                .collect()
        }))
    }
}

impl NameStore for NullRepository {
    fn get_name(&self, name: &str) -> Result<Option<NameData>, StoreError> {
        Ok(self.with(|s| s.ledger.names.get(name).cloned()))
    }

    fn get_name_by_reduced(&self, reduced_name: &str) -> Result<Option<NameData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .names
                .values()
                .find(|n| n.reduced_name == reduced_name)
                .cloned()
        }))
    }

    fn save_name(&self, name: &NameData) -> Result<(), StoreError> {
        self.with(|s| s.ledger.names.insert(name.name.clone(), name.clone()));
        Ok(())
    }

    fn delete_name(&self, name: &str) -> Result<(), StoreError> {
        self.with(|s| s.ledger.names.remove(name));
        Ok(())
    }

    fn count_names_owned(&self, owner: &Address) -> Result<usize, StoreError> {
        Ok(self.with(|s| s.ledger.names.values().filter(|n| n.owner == *owner).count()))
    }
}

impl PollStore for NullRepository {
    fn get_poll(&self, name: &str) -> Result<Option<PollData>, StoreError> {
        Ok(self.with(|s| s.ledger.polls.get(name).cloned()))
    }

    fn save_poll(&self, poll: &PollData) -> Result<(), StoreError> {
        self.with(|s| s.ledger.polls.insert(poll.name.clone(), poll.clone()));
        Ok(())
    }

    fn delete_poll(&self, name: &str) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger.polls.remove(name);
            s.ledger.votes.retain(|(poll, _), _| poll != name);
        });
        Ok(())
    }

    fn get_vote(&self, poll_name: &str, voter: &PublicKey) -> Result<Option<VoteData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .votes
                .get(&(poll_name.to_string(), *voter))
                .cloned()
        }))
    }

    fn save_vote(&self, vote: &VoteData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .votes
                .insert((vote.poll_name.clone(), vote.voter), vote.clone())
        });
        Ok(())
    }

    fn delete_vote(&self, poll_name: &str, voter: &PublicKey) -> Result<(), StoreError> {
        self.with(|s| s.ledger.votes.remove(&(poll_name.to_string(), *voter)));
        Ok(())
    }
}

impl AtStore for NullRepository {
    fn get_at(&self, address: &Address) -> Result<Option<AtData>, StoreError> {
        Ok(self.with(|s| s.ledger.ats.get(address).cloned()))
    }

    fn save_at(&self, at: &AtData) -> Result<(), StoreError> {
        self.with(|s| s.ledger.ats.insert(at.address.clone(), at.clone()));
        Ok(())
    }

    fn delete_at(&self, address: &Address) -> Result<(), StoreError> {
        self.with(|s| s.ledger.ats.remove(address));
        Ok(())
    }
}

impl ChainStore for NullRepository {
    fn chain_height(&self) -> Result<u32, StoreError> {
        Ok(self.with(|s| s.blocks.last().map_or(0, |b| b.height)))
    }

    fn last_block(&self) -> Result<Option<BlockSummary>, StoreError> {
        Ok(self.with(|s| s.blocks.last().cloned()))
    }

    fn push_block(&self, block: &BlockSummary) -> Result<(), StoreError> {
        self.with(|s| {
            let expected = s.blocks.last().map_or(1, |b| b.height + 1);
            if block.height != expected {
                return Err(StoreError::Corruption(format!(
                    "block height {} does not follow tip (expected {expected})",
                    block.height
                )));
            }
            s.blocks.push(block.clone());
            Ok(())
        })
    }

    fn pop_block(&self) -> Result<Option<BlockSummary>, StoreError> {
        Ok(self.with(|s| s.blocks.pop()))
    }
}

impl GroupStore for NullRepository {
    fn get_group(&self, group_id: GroupId) -> Result<Option<GroupData>, StoreError> {
        Ok(self.with(|s| s.ledger.groups.get(&group_id).cloned()))
    }

    fn get_group_by_reduced_name(
        &self,
        reduced_name: &str,
    ) -> Result<Option<GroupData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .groups
                .values()
                .find(|g| g.reduced_name == reduced_name)
                .cloned()
        }))
    }

    fn next_group_id(&self) -> Result<GroupId, StoreError> {
        Ok(self.with(|s| s.ledger.groups.keys().next_back().map_or(1, |id| id + 1)))
    }

    fn save_group(&self, group: &GroupData) -> Result<(), StoreError> {
        self.with(|s| s.ledger.groups.insert(group.group_id, group.clone()));
        Ok(())
    }

    fn delete_group(&self, group_id: GroupId) -> Result<(), StoreError> {
        self.with(|s| {
            let l = &mut s.ledger;
            l.groups.remove(&group_id);
            l.members.retain(|(g, _), _| *g != group_id);
            l.admins.retain(|(g, _), _| *g != group_id);
            l.invites.retain(|(g, _), _| *g != group_id);
            l.join_requests.retain(|(g, _), _| *g != group_id);
            l.bans.retain(|(g, _), _| *g != group_id);
        });
        Ok(())
    }

    fn get_member(
        &self,
        group_id: GroupId,
        member: &Address,
    ) -> Result<Option<MemberData>, StoreError> {
        Ok(self.with(|s| s.ledger.members.get(&(group_id, member.clone())).cloned()))
    }

    fn save_member(&self, member: &MemberData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .members
                .insert((member.group_id, member.member.clone()), member.clone())
        });
        Ok(())
    }

    fn delete_member(&self, group_id: GroupId, member: &Address) -> Result<(), StoreError> {
        self.with(|s| s.ledger.members.remove(&(group_id, member.clone())));
        Ok(())
    }

    fn get_admin(&self, group_id: GroupId, admin: &Address) -> Result<Option<AdminData>, StoreError> {
        Ok(self.with(|s| s.ledger.admins.get(&(group_id, admin.clone())).cloned()))
    }

    fn save_admin(&self, admin: &AdminData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .admins
                .insert((admin.group_id, admin.admin.clone()), admin.clone())
        });
        Ok(())
    }

    fn delete_admin(&self, group_id: GroupId, admin: &Address) -> Result<(), StoreError> {
        self.with(|s| s.ledger.admins.remove(&(group_id, admin.clone())));
        Ok(())
    }

    fn count_admins(&self, group_id: GroupId) -> Result<usize, StoreError> {
        Ok(self.with(|s| s.ledger.admins.keys().filter(|(g, _)| *g == group_id).count()))
    }

    fn get_invite(
        &self,
        group_id: GroupId,
        invitee: &Address,
    ) -> Result<Option<InviteData>, StoreError> {
        Ok(self.with(|s| s.ledger.invites.get(&(group_id, invitee.clone())).cloned()))
    }

    fn save_invite(&self, invite: &InviteData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .invites
                .insert((invite.group_id, invite.invitee.clone()), invite.clone())
        });
        Ok(())
    }

    fn delete_invite(&self, group_id: GroupId, invitee: &Address) -> Result<(), StoreError> {
        self.with(|s| s.ledger.invites.remove(&(group_id, invitee.clone())));
        Ok(())
    }

    fn get_join_request(
        &self,
        group_id: GroupId,
        joiner: &Address,
    ) -> Result<Option<JoinRequestData>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .join_requests
                .get(&(group_id, joiner.clone()))
                .cloned()
        }))
    }

    fn save_join_request(&self, request: &JoinRequestData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .join_requests
                .insert((request.group_id, request.joiner.clone()), request.clone())
        });
        Ok(())
    }

    fn delete_join_request(&self, group_id: GroupId, joiner: &Address) -> Result<(), StoreError> {
        self.with(|s| s.ledger.join_requests.remove(&(group_id, joiner.clone())));
        Ok(())
    }

    fn get_ban(&self, group_id: GroupId, offender: &Address) -> Result<Option<BanData>, StoreError> {
        Ok(self.with(|s| s.ledger.bans.get(&(group_id, offender.clone())).cloned()))
    }

    fn save_ban(&self, ban: &BanData) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .bans
                .insert((ban.group_id, ban.offender.clone()), ban.clone())
        });
        Ok(())
    }

    fn delete_ban(&self, group_id: GroupId, offender: &Address) -> Result<(), StoreError> {
        self.with(|s| s.ledger.bans.remove(&(group_id, offender.clone())));
        Ok(())
    }
}

impl TransactionStore for NullRepository {
    fn transaction_exists(&self, signature: &Signature) -> Result<bool, StoreError> {
        Ok(self.with(|s| s.transactions.contains_key(signature)))
    }

    fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<StoredTransaction>, StoreError> {
        Ok(self.with(|s| s.transactions.get(signature).cloned()))
    }

    fn save_transaction(&self, tx: &StoredTransaction) -> Result<(), StoreError> {
        self.with(|s| s.transactions.insert(tx.signature, tx.clone()));
        Ok(())
    }

    fn delete_transaction(&self, signature: &Signature) -> Result<(), StoreError> {
        self.with(|s| {
            s.transactions.remove(signature);
            s.unconfirmed.remove(signature);
        });
        Ok(())
    }

    fn add_unconfirmed(&self, signature: &Signature) -> Result<(), StoreError> {
        self.with(|s| {
            if !s.transactions.contains_key(signature) {
                return Err(StoreError::NotFound(signature.to_string()));
            }
            s.unconfirmed.insert(*signature);
            Ok(())
        })
    }

    fn remove_unconfirmed(&self, signature: &Signature) -> Result<(), StoreError> {
        self.with(|s| s.unconfirmed.remove(signature));
        Ok(())
    }

    fn is_unconfirmed(&self, signature: &Signature) -> Result<bool, StoreError> {
        Ok(self.with(|s| s.unconfirmed.contains(signature)))
    }

    fn unconfirmed_transactions(&self) -> Result<Vec<StoredTransaction>, StoreError> {
        Ok(self.with(|s| {
            s.unconfirmed
                .iter()
                .filter_map(|sig| s.transactions.get(sig).cloned())
                .collect()
        }))
    }

    fn transactions_in_block(&self, height: u32) -> Result<Vec<StoredTransaction>, StoreError> {
        Ok(self.with(|s| {
            let mut txs: Vec<StoredTransaction> = s
                .transactions
                .values()
                .filter(|t| t.block_height == Some(height))
                .cloned()
                .collect();
            txs.sort_by_key(|t| t.block_sequence);
            txs
        }))
    }

    fn pending_approvals(&self) -> Result<Vec<StoredTransaction>, StoreError> {
        Ok(self.with(|s| {
            let mut txs: Vec<StoredTransaction> = s
                .transactions
                .values()
                .filter(|t| t.is_confirmed() && t.approval_status == ApprovalStatus::Pending)
                .cloned()
                .collect();
            txs.sort_by_key(StoredTransaction::chain_position);
            txs
        }))
    }

    fn approvals_decided_at(&self, height: u32) -> Result<Vec<StoredTransaction>, StoreError> {
        Ok(self.with(|s| {
            let mut txs: Vec<StoredTransaction> = s
                .transactions
                .values()
                .filter(|t| t.approval_height == Some(height))
                .cloned()
                .collect();
            txs.sort_by_key(StoredTransaction::chain_position);
            txs
        }))
    }

    fn find_transactions(
        &self,
        creator: &PublicKey,
        tx_type: TransactionType,
    ) -> Result<Vec<StoredTransaction>, StoreError> {
        Ok(self.with(|s| {
            s.transactions
                .values()
                .filter(|t| t.creator == *creator && t.tx_type == tx_type)
                .cloned()
                .collect()
        }))
    }

    fn save_approval(&self, record: &ApprovalRecord) -> Result<(), StoreError> {
        self.with(|s| s.ledger.approvals.push(record.clone()));
        Ok(())
    }

    fn delete_approval(&self, decision_signature: &Signature) -> Result<(), StoreError> {
        self.with(|s| {
            s.ledger
                .approvals
                .retain(|r| r.decision_signature != *decision_signature)
        });
        Ok(())
    }

    fn latest_approval(
        &self,
        pending: &Signature,
        admin: &PublicKey,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        Ok(self.with(|s| {
            s.ledger
                .approvals
                .iter()
                .rev()
                .find(|r| r.pending_signature == *pending && r.admin == *admin)
                .cloned()
        }))
    }

    fn latest_approvals(&self, pending: &Signature) -> Result<Vec<ApprovalRecord>, StoreError> {
        Ok(self.with(|s| {
            let mut latest: BTreeMap<PublicKey, ApprovalRecord> = BTreeMap::new();
            for record in s
                .ledger
                .approvals
                .iter()
                .filter(|r| r.pending_signature == *pending)
            {
                latest.insert(record.admin, record.clone());
            }
            latest.into_values().collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_types::Timestamp;

    fn addr(s: &str) -> Address {
        Address::new(format!("cairn_{s}"))
    }

    #[test]
    fn discard_restores_committed_state() {
        let repo = NullRepository::new();
        let alice = addr("alice");
        repo.seed_balance(&alice, BASE_ASSET, Amount::whole(10));

        repo.modify_balance(&alice, BASE_ASSET, Amount::whole(-3)).unwrap();
        assert_eq!(repo.get_balance(&alice, BASE_ASSET).unwrap(), Amount::whole(7));
        assert!(repo.has_uncommitted_changes());

        repo.discard_changes().unwrap();
        assert_eq!(repo.get_balance(&alice, BASE_ASSET).unwrap(), Amount::whole(10));
        assert!(!repo.has_uncommitted_changes());
    }

    #[test]
    fn negative_balance_rejected_without_mutation() {
        let repo = NullRepository::new();
        let bob = addr("bob");
        repo.seed_balance(&bob, BASE_ASSET, Amount::whole(1));

        let err = repo
            .modify_balance(&bob, BASE_ASSET, Amount::whole(-2))
            .unwrap_err();
        assert!(matches!(err, StoreError::NegativeBalance { .. }));
        assert_eq!(repo.get_balance(&bob, BASE_ASSET).unwrap(), Amount::whole(1));
    }

    #[test]
    fn zero_balances_are_pruned() {
        let repo = NullRepository::new();
        let carol = addr("carol");
        repo.seed_balance(&carol, BASE_ASSET, Amount::whole(2));
        repo.modify_balance(&carol, BASE_ASSET, Amount::whole(-2)).unwrap();
        assert!(!repo
            .snapshot()
            .balances
            .contains_key(&(carol.clone(), BASE_ASSET)));
    }

    #[test]
    fn latest_approval_wins_per_admin() {
        let repo = NullRepository::new();
        let pending = Signature([1u8; 64]);
        let admin = PublicKey([2u8; 32]);
        repo.save_approval(&ApprovalRecord {
            decision_signature: Signature([3u8; 64]),
            pending_signature: pending,
            admin,
            approval: true,
            prior_reference: None,
        })
        .unwrap();
        repo.save_approval(&ApprovalRecord {
            decision_signature: Signature([4u8; 64]),
            pending_signature: pending,
            admin,
            approval: false,
            prior_reference: Some(Signature([3u8; 64])),
        })
        .unwrap();

        let latest = repo.latest_approvals(&pending).unwrap();
        assert_eq!(latest.len(), 1);
        assert!(!latest[0].approval);

        repo.delete_approval(&Signature([4u8; 64])).unwrap();
        assert!(repo.latest_approval(&pending, &admin).unwrap().unwrap().approval);
    }

    #[test]
    fn approval_queues_come_back_in_chain_order() {
        let repo = NullRepository::new();
        // signature order deliberately disagrees with chain order
        for (byte, height, sequence) in [(9u8, 2, 0), (1, 2, 1), (5, 1, 3)] {
            repo.save_transaction(&StoredTransaction {
                signature: Signature([byte; 64]),
                tx_type: TransactionType::UpdateAsset,
                creator: PublicKey([0u8; 32]),
                timestamp: Timestamp::from_millis(1_000),
                tx_group_id: 7,
                approval_status: ApprovalStatus::Pending,
                block_height: Some(height),
                block_sequence: Some(sequence),
                approval_height: Some(3),
                record: Vec::new(),
            })
            .unwrap();
        }
        let order = |txs: Vec<StoredTransaction>| -> Vec<u8> {
            txs.iter().map(|t| t.signature.0[0]).collect()
        };

        assert_eq!(order(repo.pending_approvals().unwrap()), vec![5, 9, 1]);
        assert_eq!(order(repo.approvals_decided_at(3).unwrap()), vec![5, 9, 1]);
    }

    #[test]
    fn base_asset_is_present_and_ids_follow_it() {
        let repo = NullRepository::new();
        assert!(repo.get_asset(BASE_ASSET).unwrap().is_some());
        assert_eq!(repo.next_asset_id().unwrap(), 1);
        assert_eq!(repo.next_group_id().unwrap(), 1);
    }

    #[test]
    fn blocks_must_be_contiguous() {
        let repo = NullRepository::new();
        let block = |height| BlockSummary {
            height,
            timestamp: Timestamp::from_millis(height as u64),
            transaction_count: 0,
        };
        repo.push_block(&block(1)).unwrap();
        assert!(repo.push_block(&block(3)).is_err());
        assert_eq!(repo.chain_height().unwrap(), 1);
        assert_eq!(repo.pop_block().unwrap(), Some(block(1)));
        assert_eq!(repo.chain_height().unwrap(), 0);
    }
}
