use std::env;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info};

use crate::amount::lamports_to_sol;
use crate::cli::args::{Cli, Command};
use crate::cli::context::{build_memory_ledger, build_rpc_ledger, init_configs, init_tracing};
use crate::config::{MintflowConfig, RPC_URL_ENV, load_config, resolve_rpc_url};
use crate::ledger::LedgerClient;
use crate::workflow::{WorkflowError, WorkflowPlan, WorkflowReport, run_workflow};

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init(args) => init_configs(args),
        Command::Run => {
            let (config, plan) = prepare(cli.config)?;
            let rpc_url = resolve_rpc_url(
                &config.network,
                cli.rpc_url.as_deref(),
                env::var(RPC_URL_ENV).ok(),
            );
            let ledger = build_rpc_ledger(rpc_url, &config.network);
            info!(
                target: "mintflow",
                endpoint = %ledger.endpoint(),
                commitment = ?config.network.commitment,
                "连接 RPC 节点"
            );
            execute(&ledger, &plan).await
        }
        Command::DryRun => {
            let (config, plan) = prepare(cli.config)?;
            let ledger = build_memory_ledger(&config.dry_run)?;
            info!(
                target: "mintflow",
                signature_fee = config.dry_run.signature_fee_lamports,
                "dry-run 模式：使用进程内模拟账本"
            );
            execute(&ledger, &plan).await
        }
    }
}

fn prepare(config_path: Option<PathBuf>) -> Result<(MintflowConfig, WorkflowPlan)> {
    let config = load_config(config_path)?;
    init_tracing(&config.logging)?;
    let plan = WorkflowPlan::from_config(&config.token)?;
    Ok((config, plan))
}

async fn execute<L>(ledger: &L, plan: &WorkflowPlan) -> Result<()>
where
    L: LedgerClient + ?Sized,
{
    match run_workflow(ledger, plan).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(err) => {
            log_failure(&err);
            Err(err.into())
        }
    }
}

fn log_failure(err: &WorkflowError) {
    match (err.step(), err.ledger_error()) {
        (Some(step), Some(source)) => {
            error!(target: "mintflow", %step, error = %source, "代币流程中止")
        }
        _ => error!(target: "mintflow", error = %err, "代币流程未启动"),
    }
}

fn print_report(report: &WorkflowReport) {
    println!("付款人地址: {}", report.payer);
    println!("空投签名: {}", report.airdrop_signature);
    println!(
        "空投后 SOL 余额: {} SOL",
        lamports_to_sol(report.payer_lamports_after_airdrop)
    );
    println!("Mint 地址: {}", report.mint);
    println!("  精度: {}", report.decimals);
    println!("  铸币权限: {}", report.mint_authority);
    println!("  冻结权限: {}", report.freeze_authority);
    println!("付款人代币账户: {}", report.payer_token_account);
    println!("发行签名: {}", report.issue_signature);
    println!(
        "  发行后余额: {}",
        report.human(report.payer_token_balance_after_issue)
    );
    println!("收款人地址: {}", report.receiver);
    println!("收款人代币账户: {}", report.receiver_token_account);
    println!("转账签名: {}", report.transfer_signature);
    println!(
        "收款人代币余额: {}",
        report.human(report.receiver_token_balance)
    );
    println!(
        "付款人代币余额: {}",
        report.human(report.payer_token_balance)
    );
    println!(
        "付款人剩余 SOL: {} SOL",
        lamports_to_sol(report.payer_lamports_final)
    );
}
