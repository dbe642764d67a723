use solana_client::client_error::ClientError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("RPC 请求失败: {0}")]
    Rpc(#[from] ClientError),
    #[error("水龙头请求失败: {0}")]
    Faucet(String),
    #[error("交易 {signature} 轮询 {attempts} 次后仍未确认")]
    ConfirmationTimeout { signature: Signature, attempts: u32 },
    #[error("代币余额不足: 账户 {account} 可用 {available}，需要 {requested}")]
    InsufficientFunds {
        account: Pubkey,
        available: u64,
        requested: u64,
    },
    #[error("SOL 余额不足: 账户 {address} 可用 {available} lamports，需要 {required}")]
    InsufficientLamports {
        address: Pubkey,
        available: u64,
        required: u64,
    },
    #[error("{signer} 无权操作账户 {account}")]
    Unauthorized { account: Pubkey, signer: Pubkey },
    #[error("账户不存在: {0}")]
    AccountNotFound(Pubkey),
    #[error("账户数据非法 {account}: {reason}")]
    InvalidAccountData { account: Pubkey, reason: String },
    #[error("账户 {account} 属于 Mint {actual}，预期 {expected}")]
    MintMismatch {
        account: Pubkey,
        expected: Pubkey,
        actual: Pubkey,
    },
    #[error("数值溢出: {0}")]
    Overflow(&'static str),
    #[error("指令构建失败: {0}")]
    InvalidInstruction(String),
}

impl LedgerError {
    pub fn invalid_data(account: &Pubkey, reason: impl ToString) -> Self {
        Self::InvalidAccountData {
            account: *account,
            reason: reason.to_string(),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
