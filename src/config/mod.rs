use rust_decimal::Decimal;

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

/// 覆盖配置文件中 RPC 地址的环境变量。
pub const RPC_URL_ENV: &str = "MINTFLOW_RPC_URL";

pub(crate) fn default_rpc_url() -> String {
    "https://api.devnet.solana.com".to_string()
}

pub(crate) fn default_commitment() -> CommitmentLevel {
    CommitmentLevel::Confirmed
}

pub(crate) fn default_confirm_poll_interval_ms() -> u64 {
    500
}

pub(crate) fn default_confirm_max_attempts() -> u32 {
    60
}

pub(crate) fn default_decimals() -> u8 {
    9
}

pub(crate) fn default_initial_supply() -> Decimal {
    Decimal::from(1000)
}

pub(crate) fn default_transfer_amount() -> Decimal {
    Decimal::from(100)
}

pub(crate) fn default_airdrop_sol() -> Decimal {
    Decimal::from(2)
}

pub(crate) fn default_signature_fee_lamports() -> u64 {
    crate::ledger::DEFAULT_SIGNATURE_FEE_LAMPORTS
}

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

/// RPC 地址优先级：命令行 > 环境变量 > 配置文件。空白值视为未设置。
pub fn resolve_rpc_url(
    network: &NetworkConfig,
    cli_override: Option<&str>,
    env_value: Option<String>,
) -> String {
    cli_override
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| {
            env_value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .unwrap_or_else(|| network.rpc_url.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_url_prefers_cli_then_env() {
        let network = NetworkConfig::default();
        assert_eq!(
            resolve_rpc_url(
                &network,
                Some("http://127.0.0.1:8899"),
                Some("https://env.example".into())
            ),
            "http://127.0.0.1:8899"
        );
        assert_eq!(
            resolve_rpc_url(&network, None, Some(" https://env.example ".into())),
            "https://env.example"
        );
        assert_eq!(
            resolve_rpc_url(&network, None, None),
            "https://api.devnet.solana.com"
        );
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let network = NetworkConfig {
            rpc_url: "http://localhost:8899".to_string(),
            ..NetworkConfig::default()
        };
        assert_eq!(
            resolve_rpc_url(&network, Some("  "), Some(String::new())),
            "http://localhost:8899"
        );
    }
}
