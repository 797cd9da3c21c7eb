//! Ledger parameters.
//!
//! Everything a node must agree on to reach identical admission and validity
//! decisions. Loaded from the `[ledger]` table of the node config; every field has
//! a default so partial tables are accepted.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// All parameters consulted by the lifecycle engine and transaction variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerParams {
    // ── Fees ─────────────────────────────────────────────────────────────
    /// Minimum fee, charged per started `max_bytes_per_unit_fee` bytes.
    #[serde(default = "default_unit_fee")]
    pub unit_fee: Amount,

    #[serde(default = "default_max_bytes_per_unit_fee")]
    pub max_bytes_per_unit_fee: u32,

    // ── Admission window ─────────────────────────────────────────────────
    /// A transaction must be included within this long after its timestamp.
    #[serde(default = "default_transaction_expiry_ms")]
    pub transaction_expiry_ms: u64,

    /// How far ahead of the local clock a timestamp may be.
    #[serde(default = "default_max_future_ms")]
    pub max_future_ms: u64,

    /// Per-creator cap on non-CHAT unconfirmed transactions.
    #[serde(default = "default_max_unconfirmed_per_account")]
    pub max_unconfirmed_per_account: usize,

    // ── Groups and names ─────────────────────────────────────────────────
    /// When set, approval-requiring types may not use `NO_GROUP`.
    #[serde(default)]
    pub require_group_for_approval: bool,

    #[serde(default = "default_true")]
    pub one_name_per_account: bool,

    // ── Minting ──────────────────────────────────────────────────────────
    #[serde(default = "default_max_reward_shares")]
    pub max_reward_shares: usize,

    #[serde(default = "default_min_level_to_mint")]
    pub min_account_level_to_mint: u8,

    #[serde(default = "default_min_level_to_reward_share")]
    pub min_account_level_to_reward_share: u8,

    /// Minted-block adjustment applied when an account is set to level `i`.
    #[serde(default = "default_cumulative_blocks_by_level")]
    pub cumulative_blocks_by_level: Vec<u32>,

    // ── Proof of work ────────────────────────────────────────────────────
    #[serde(default)]
    pub pow: PowSettings,

    /// PUBLICIZE nonces older than this are not re-verified.
    #[serde(default = "default_publicize_historic_threshold_ms")]
    pub publicize_historic_threshold_ms: u64,

    /// Lifetime of a trade-bot PRESENCE transaction.
    #[serde(default = "default_presence_lifetime_ms")]
    pub presence_lifetime_ms: u64,
}

/// Memory-hard proof-of-work settings for fee-exempt variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowSettings {
    /// Work buffer size in bytes; a multiple of 8.
    #[serde(default = "default_pow_buffer_bytes")]
    pub buffer_bytes: usize,

    /// CHAT difficulty when the sender holds some base asset.
    #[serde(default = "default_chat_funded_difficulty")]
    pub chat_funded_difficulty: u32,

    /// CHAT difficulty for unfunded senders.
    #[serde(default = "default_chat_unfunded_difficulty")]
    pub chat_unfunded_difficulty: u32,

    #[serde(default = "default_message_difficulty")]
    pub message_difficulty: u32,

    #[serde(default = "default_presence_difficulty")]
    pub presence_difficulty: u32,

    #[serde(default = "default_publicize_difficulty")]
    pub publicize_difficulty: u32,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_unit_fee() -> Amount {
    Amount::new(100_000) // 0.001
}

fn default_max_bytes_per_unit_fee() -> u32 {
    1024
}

fn default_transaction_expiry_ms() -> u64 {
    24 * 60 * 60 * 1000
}

fn default_max_future_ms() -> u64 {
    30 * 60 * 1000
}

fn default_max_unconfirmed_per_account() -> usize {
    25
}

fn default_true() -> bool {
    true
}

fn default_max_reward_shares() -> usize {
    6
}

fn default_min_level_to_mint() -> u8 {
    1
}

fn default_min_level_to_reward_share() -> u8 {
    5
}

fn default_cumulative_blocks_by_level() -> Vec<u32> {
    vec![
        0, 7_200, 72_000, 201_600, 374_400, 618_400, 964_000, 1_482_400, 2_173_600, 3_037_600,
        4_074_400,
    ]
}

fn default_publicize_historic_threshold_ms() -> u64 {
    14 * 24 * 60 * 60 * 1000
}

fn default_presence_lifetime_ms() -> u64 {
    30 * 60 * 1000
}

fn default_pow_buffer_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_chat_funded_difficulty() -> u32 {
    8
}

fn default_chat_unfunded_difficulty() -> u32 {
    14
}

fn default_message_difficulty() -> u32 {
    14
}

fn default_presence_difficulty() -> u32 {
    8
}

fn default_publicize_difficulty() -> u32 {
    15
}

// ── Impl ───────────────────────────────────────────────────────────────

impl LedgerParams {
    /// Minimum fee for a transaction of `byte_len` bytes:
    /// `ceil(byte_len / max_bytes_per_unit_fee) * unit_fee`.
    pub fn recommended_fee(&self, byte_len: usize) -> Amount {
        let per_unit = self.max_bytes_per_unit_fee.max(1) as i64;
        let len = byte_len.max(1) as i64;
        let units = (len - 1) / per_unit + 1;
        Amount::new(self.unit_fee.raw().saturating_mul(units))
    }

    /// Minted-block adjustment for `level`, or the top entry when out of range.
    pub fn blocks_for_level(&self, level: u8) -> u32 {
        self.cumulative_blocks_by_level
            .get(level as usize)
            .or_else(|| self.cumulative_blocks_by_level.last())
            .copied()
            .unwrap_or(0)
    }
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            unit_fee: default_unit_fee(),
            max_bytes_per_unit_fee: default_max_bytes_per_unit_fee(),
            transaction_expiry_ms: default_transaction_expiry_ms(),
            max_future_ms: default_max_future_ms(),
            max_unconfirmed_per_account: default_max_unconfirmed_per_account(),
            require_group_for_approval: false,
            one_name_per_account: default_true(),
            max_reward_shares: default_max_reward_shares(),
            min_account_level_to_mint: default_min_level_to_mint(),
            min_account_level_to_reward_share: default_min_level_to_reward_share(),
            cumulative_blocks_by_level: default_cumulative_blocks_by_level(),
            pow: PowSettings::default(),
            publicize_historic_threshold_ms: default_publicize_historic_threshold_ms(),
            presence_lifetime_ms: default_presence_lifetime_ms(),
        }
    }
}

impl Default for PowSettings {
    fn default() -> Self {
        Self {
            buffer_bytes: default_pow_buffer_bytes(),
            chat_funded_difficulty: default_chat_funded_difficulty(),
            chat_unfunded_difficulty: default_chat_unfunded_difficulty(),
            message_difficulty: default_message_difficulty(),
            presence_difficulty: default_presence_difficulty(),
            publicize_difficulty: default_publicize_difficulty(),
        }
    }
}
