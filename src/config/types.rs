use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use solana_commitment_config::CommitmentConfig;

use super::{
    default_airdrop_sol, default_commitment, default_confirm_max_attempts,
    default_confirm_poll_interval_ms, default_decimals, default_initial_supply,
    default_logging_level, default_rpc_url, default_signature_fee_lamports,
    default_transfer_amount,
};

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct MintflowConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dry_run: DryRunConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl CommitmentLevel {
    pub fn to_commitment_config(self) -> CommitmentConfig {
        match self {
            CommitmentLevel::Processed => CommitmentConfig::processed(),
            CommitmentLevel::Confirmed => CommitmentConfig::confirmed(),
            CommitmentLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_commitment")]
    pub commitment: CommitmentLevel,
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,
    #[serde(default = "default_confirm_max_attempts")]
    pub confirm_max_attempts: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            confirm_max_attempts: default_confirm_max_attempts(),
        }
    }
}

impl NetworkConfig {
    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }
}

/// 代币参数。数量字段为人类可读单位，支持字符串或数字写法。
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenConfig {
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default = "default_initial_supply")]
    pub initial_supply: Decimal,
    #[serde(default = "default_transfer_amount")]
    pub transfer_amount: Decimal,
    #[serde(default = "default_airdrop_sol")]
    pub airdrop_sol: Decimal,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            initial_supply: default_initial_supply(),
            transfer_amount: default_transfer_amount(),
            airdrop_sol: default_airdrop_sol(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
        }
    }
}

/// 仅作用于 `mintflow dry-run` 的模拟账本参数。
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DryRunConfig {
    #[serde(default = "default_signature_fee_lamports")]
    pub signature_fee_lamports: u64,
    /// 水龙头可发放的 SOL 总量，缺省为不限。
    #[serde(default)]
    pub faucet_budget_sol: Option<Decimal>,
}

impl Default for DryRunConfig {
    fn default() -> Self {
        Self {
            signature_fee_lamports: default_signature_fee_lamports(),
            faucet_budget_sol: None,
        }
    }
}
