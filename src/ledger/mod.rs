//! 账本抽象：工作流只依赖 `LedgerClient`，具体实现可以是远端 RPC 节点或进程内模拟账本。

pub mod ata;
mod error;
mod memory;
mod rpc;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};

pub use error::{LedgerError, LedgerResult};
pub use memory::{DEFAULT_SIGNATURE_FEE_LAMPORTS, MemoryLedger};
pub use rpc::{RpcLedger, RpcLedgerSettings};

/// Mint 账户的链上状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
}

/// 代币生命周期所需的账本操作，每个写操作返回交易签名。
///
/// 所有数量均为最小单位（base units / lamports）。余额、权限与精度的校验交由账本自身执行。
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// 通过水龙头为地址申请 SOL，并阻塞至交易确认。
    async fn fund_account(&self, address: &Pubkey, lamports: u64) -> LedgerResult<Signature>;

    /// 创建并初始化新的 Mint，返回 Mint 地址。
    async fn create_token_type(
        &self,
        payer: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> LedgerResult<Pubkey>;

    /// 关联账户不存在时创建；重复调用返回同一地址。
    async fn ensure_token_account(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> LedgerResult<Pubkey>;

    async fn issue_supply(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        account: &Pubkey,
        authority: &Keypair,
        amount: u64,
    ) -> LedgerResult<Signature>;

    async fn move_tokens(
        &self,
        payer: &Keypair,
        source: &Pubkey,
        destination: &Pubkey,
        owner: &Keypair,
        amount: u64,
    ) -> LedgerResult<Signature>;

    async fn read_balance(&self, account: &Pubkey) -> LedgerResult<u64>;

    async fn native_balance(&self, address: &Pubkey) -> LedgerResult<u64>;

    async fn mint_info(&self, mint: &Pubkey) -> LedgerResult<MintInfo>;
}
