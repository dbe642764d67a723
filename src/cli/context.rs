use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use solana_client::nonblocking::rpc_client::RpcClient;
use tracing_subscriber::{EnvFilter, fmt};

use crate::amount::sol_to_lamports;
use crate::cli::args::InitCmd;
use crate::config::{DryRunConfig, LoggingConfig, NetworkConfig};
use crate::ledger::{MemoryLedger, RpcLedger, RpcLedgerSettings};

const CONFIG_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/mintflow.toml"));
const CONFIG_FILENAME: &str = "mintflow.toml";

/// 初始化 tracing，兼顾 JSON 与文本输出模式。
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let base = fmt()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .with_level(true);

    if config.json {
        base.json()
            .with_current_span(false)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    } else {
        base.with_env_filter(filter)
            .event_format(fmt::format().compact())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }
    Ok(())
}

pub fn build_rpc_ledger(rpc_url: String, network: &NetworkConfig) -> RpcLedger {
    let client = RpcClient::new_with_commitment(
        rpc_url,
        network.commitment.to_commitment_config(),
    );
    RpcLedger::new(
        Arc::new(client),
        RpcLedgerSettings {
            confirm_poll_interval: network.confirm_poll_interval(),
            confirm_max_attempts: network.confirm_max_attempts,
        },
    )
}

pub fn build_memory_ledger(dry_run: &DryRunConfig) -> Result<MemoryLedger> {
    let ledger = MemoryLedger::new().with_signature_fee(dry_run.signature_fee_lamports);
    let ledger = match dry_run.faucet_budget_sol {
        Some(budget) if budget.is_zero() => ledger.with_faucet_budget(0),
        Some(budget) => ledger.with_faucet_budget(sol_to_lamports(budget)?),
        None => ledger,
    };
    Ok(ledger)
}

pub fn init_configs(args: InitCmd) -> Result<()> {
    let output_dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match write_template(&output_dir, args.force)? {
        TemplateOutcome::Written(path) => println!("已写入 {}", path.display()),
        TemplateOutcome::Skipped(path) => println!(
            "跳过 {}（文件已存在，如需覆盖请加 --force）",
            path.display()
        ),
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum TemplateOutcome {
    Written(PathBuf),
    Skipped(PathBuf),
}

fn write_template(output_dir: &Path, force: bool) -> Result<TemplateOutcome> {
    fs::create_dir_all(output_dir)?;
    let target_path = output_dir.join(CONFIG_FILENAME);
    if target_path.exists() && !force {
        return Ok(TemplateOutcome::Skipped(target_path));
    }
    fs::write(&target_path, CONFIG_TEMPLATE)?;
    Ok(TemplateOutcome::Written(target_path))
}
