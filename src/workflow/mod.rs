//! 代币生命周期工作流：空投 → 创建 Mint → 关联账户 → 发行 → 转账 → 读取余额。
//!
//! 每一步都顺序 await，后续步骤依赖前一步产出的地址。账本通过参数显式注入，
//! 失败时返回带步骤标注的 [`WorkflowError`]，不做重试。

mod error;

use std::fmt;

use rust_decimal::Decimal;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::info;

use crate::amount::{AmountError, from_base_units, lamports_to_sol, sol_to_lamports, to_base_units};
use crate::config::TokenConfig;
use crate::ledger::LedgerClient;

pub use error::{WorkflowError, WorkflowResult};
use error::AtStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fund,
    CreateMint,
    PayerAccount,
    IssueSupply,
    ReceiverAccount,
    Transfer,
    ReadBalances,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Fund => "水龙头空投",
            Step::CreateMint => "创建 Mint",
            Step::PayerAccount => "付款人关联账户",
            Step::IssueSupply => "发行代币",
            Step::ReceiverAccount => "收款人关联账户",
            Step::Transfer => "代币转账",
            Step::ReadBalances => "读取余额",
        };
        f.write_str(label)
    }
}

/// 工作流参数，代币数量均为人类可读单位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    pub airdrop_lamports: u64,
    pub decimals: u8,
    pub initial_supply: Decimal,
    pub transfer_amount: Decimal,
}

impl Default for WorkflowPlan {
    fn default() -> Self {
        Self {
            airdrop_lamports: 2 * LAMPORTS_PER_SOL,
            decimals: 9,
            initial_supply: Decimal::from(1000),
            transfer_amount: Decimal::from(100),
        }
    }
}

impl WorkflowPlan {
    pub fn from_config(token: &TokenConfig) -> Result<Self, AmountError> {
        Ok(Self {
            airdrop_lamports: sol_to_lamports(token.airdrop_sol)?,
            decimals: token.decimals,
            initial_supply: token.initial_supply,
            transfer_amount: token.transfer_amount,
        })
    }
}

/// 本次运行生成的临时密钥，进程结束即丢弃。
pub struct Participants {
    pub payer: Keypair,
    pub mint_authority: Keypair,
    pub freeze_authority: Keypair,
    pub receiver: Keypair,
}

impl Participants {
    pub fn generate() -> Self {
        Self {
            payer: Keypair::new(),
            mint_authority: Keypair::new(),
            freeze_authority: Keypair::new(),
            receiver: Keypair::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub payer: Pubkey,
    pub receiver: Pubkey,
    pub mint: Pubkey,
    pub mint_authority: Pubkey,
    pub freeze_authority: Pubkey,
    pub decimals: u8,
    pub payer_token_account: Pubkey,
    pub receiver_token_account: Pubkey,
    pub airdrop_signature: Signature,
    pub issue_signature: Signature,
    pub transfer_signature: Signature,
    pub payer_lamports_after_airdrop: u64,
    pub payer_lamports_final: u64,
    pub payer_token_balance_after_issue: u64,
    pub payer_token_balance: u64,
    pub receiver_token_balance: u64,
}

impl WorkflowReport {
    /// 按 Mint 精度换算代币数量。
    pub fn human(&self, base_units: u64) -> Decimal {
        from_base_units(base_units, self.decimals)
    }
}

pub async fn run_workflow<L>(ledger: &L, plan: &WorkflowPlan) -> WorkflowResult<WorkflowReport>
where
    L: LedgerClient + ?Sized,
{
    run_with_participants(ledger, plan, &Participants::generate()).await
}

pub async fn run_with_participants<L>(
    ledger: &L,
    plan: &WorkflowPlan,
    participants: &Participants,
) -> WorkflowResult<WorkflowReport>
where
    L: LedgerClient + ?Sized,
{
    let supply_units = to_base_units(plan.initial_supply, plan.decimals)?;
    let transfer_units = to_base_units(plan.transfer_amount, plan.decimals)?;
    let Participants {
        payer,
        mint_authority,
        freeze_authority,
        receiver,
    } = participants;
    let payer_key = payer.pubkey();

    info!(target: "workflow", payer = %payer_key, "付款人钱包已生成");

    info!(
        target: "workflow",
        lamports = plan.airdrop_lamports,
        "请求水龙头空投"
    );
    let airdrop_signature = ledger
        .fund_account(&payer_key, plan.airdrop_lamports)
        .await
        .at(Step::Fund)?;
    let payer_lamports_after_airdrop = ledger.native_balance(&payer_key).await.at(Step::Fund)?;
    info!(
        target: "workflow",
        signature = %airdrop_signature,
        sol = %lamports_to_sol(payer_lamports_after_airdrop),
        "空投已到账"
    );

    let mint = ledger
        .create_token_type(
            payer,
            &mint_authority.pubkey(),
            Some(&freeze_authority.pubkey()),
            plan.decimals,
        )
        .await
        .at(Step::CreateMint)?;
    let mint_info = ledger.mint_info(&mint).await.at(Step::CreateMint)?;
    info!(
        target: "workflow",
        %mint,
        decimals = mint_info.decimals,
        "SPL 代币 Mint 已创建"
    );

    let payer_token_account = ledger
        .ensure_token_account(payer, &mint, &payer_key)
        .await
        .at(Step::PayerAccount)?;
    info!(
        target: "workflow",
        account = %payer_token_account,
        "付款人关联账户就绪"
    );

    let issue_signature = ledger
        .issue_supply(
            payer,
            &mint,
            &payer_token_account,
            mint_authority,
            supply_units,
        )
        .await
        .at(Step::IssueSupply)?;
    let payer_token_balance_after_issue = ledger
        .read_balance(&payer_token_account)
        .await
        .at(Step::IssueSupply)?;
    info!(
        target: "workflow",
        signature = %issue_signature,
        balance = %from_base_units(payer_token_balance_after_issue, mint_info.decimals),
        "代币已发行至付款人"
    );

    let receiver_key = receiver.pubkey();
    let receiver_token_account = ledger
        .ensure_token_account(payer, &mint, &receiver_key)
        .await
        .at(Step::ReceiverAccount)?;
    info!(
        target: "workflow",
        receiver = %receiver_key,
        account = %receiver_token_account,
        "收款人关联账户就绪"
    );

    let transfer_signature = ledger
        .move_tokens(
            payer,
            &payer_token_account,
            &receiver_token_account,
            payer,
            transfer_units,
        )
        .await
        .at(Step::Transfer)?;
    info!(
        target: "workflow",
        signature = %transfer_signature,
        amount = %plan.transfer_amount,
        "代币已转账"
    );

    let receiver_token_balance = ledger
        .read_balance(&receiver_token_account)
        .await
        .at(Step::ReadBalances)?;
    let payer_token_balance = ledger
        .read_balance(&payer_token_account)
        .await
        .at(Step::ReadBalances)?;
    let payer_lamports_final = ledger
        .native_balance(&payer_key)
        .await
        .at(Step::ReadBalances)?;

    Ok(WorkflowReport {
        payer: payer_key,
        receiver: receiver_key,
        mint,
        mint_authority: mint_authority.pubkey(),
        freeze_authority: freeze_authority.pubkey(),
        decimals: mint_info.decimals,
        payer_token_account,
        receiver_token_account,
        airdrop_signature,
        issue_signature,
        transfer_signature,
        payer_lamports_after_airdrop,
        payer_lamports_final,
        payer_token_balance_after_issue,
        payer_token_balance,
        receiver_token_balance,
    })
}
