use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mintflow", version, about = "SPL 代币全流程演示：空投、发行、转账")]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "配置文件路径（默认查找 mintflow.toml 或 config/mintflow.toml）"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "覆盖 RPC 节点地址（优先于 MINTFLOW_RPC_URL 与配置文件）"
    )]
    pub rpc_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 在配置的 RPC 节点上执行完整流程
    Run,
    /// 在进程内模拟账本上执行完整流程
    #[command(name = "dry-run")]
    DryRun,
    /// 初始化配置模版文件
    Init(InitCmd),
}

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, value_name = "DIR", help = "可选输出目录（默认当前目录）")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "若文件存在则覆盖")]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mintflow",
            "run",
            "--rpc-url",
            "http://127.0.0.1:8899",
            "-c",
            "custom.toml",
        ])
        .expect("parse args");
        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.rpc_url.as_deref(), Some("http://127.0.0.1:8899"));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn parses_init_options() {
        let cli = Cli::try_parse_from(["mintflow", "init", "--output", "out", "--force"])
            .expect("parse args");
        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.output, Some(PathBuf::from("out")));
                assert!(args.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["mintflow"]).is_err());
    }
}
