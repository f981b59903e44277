use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use fprot_core::{update_definitions, PluginConfig, Scanner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

mod pipeline;
mod web;

use pipeline::{scan_all, Sinks};

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(
    name = "fprot",
    version,
    about = "Malice F-PROT AntiVirus Plugin",
    disable_version_flag = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 待扫描的文件
    paths: Vec<PathBuf>,

    /// 输出调试日志
    #[arg(short = 'V', long, global = true)]
    verbose: bool,

    #[arg(long, action = ArgAction::Version, help = "Print version")]
    version: Option<bool>,

    /// 以 Markdown 表格输出
    #[arg(short, long)]
    table: bool,

    /// 把结果 POST 到回调端点
    #[arg(short, long)]
    callback: bool,

    /// 回调端点
    #[arg(long, env = "MALICE_ENDPOINT")]
    endpoint: Option<String>,

    /// 回调请求使用的代理
    #[arg(short = 'x', long, env = "MALICE_PROXY")]
    proxy: Option<String>,

    /// 结果落库的 elasticsearch 地址（未设置则不落库）
    #[arg(long, env = "MALICE_ELASTICSEARCH")]
    elasticsearch: Option<String>,

    /// 扫描/更新超时（秒），默认取配置文件或 10
    #[arg(long, env = "MALICE_TIMEOUT", global = true)]
    timeout: Option<u64>,

    /// 指定扫描 ID（默认为文件 SHA-256）
    #[arg(long, env = "MALICE_SCANID")]
    scan_id: Option<String>,

    /// 配置文件路径（TOML）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 并行扫描线程数（"auto"=CPU 核心数）
    #[arg(long, default_value = "auto")]
    threads: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 更新病毒库
    #[command(alias = "u")]
    Update,
    /// 启动上传扫描 Web 服务
    Web {
        /// 监听地址，默认取配置文件（0.0.0.0:3993）
        #[arg(long)]
        listen: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // 初始化日志（支持通过 RUST_LOG 控制等级；--verbose 强制 debug）
    init_tracing(cli.verbose);

    let mut cfg = match &cli.config {
        Some(path) => PluginConfig::load(path)?,
        None => PluginConfig::default(),
    };
    if let Some(timeout) = cli.timeout {
        cfg.engine.timeout_secs = timeout;
    }
    let timeout = Duration::from_secs(cfg.engine.timeout_secs);

    match cli.command {
        Some(Commands::Update) => {
            println!("Updating F-PROT...");
            let out = update_definitions(&cfg.engine, &cfg.signatures, timeout).context("update failed")?;
            print!("{out}");
        }
        Some(Commands::Web { listen }) => {
            let listen = listen.unwrap_or_else(|| cfg.web.listen.clone());
            web::serve(&cfg, &listen)?;
        }
        None => {
            if cli.paths.is_empty() {
                bail!("Please supply a file to scan with malice/fprot");
            }
            let scanner = Scanner::from_config(&cfg, timeout)?;
            let endpoint = if cli.callback {
                Some(cli.endpoint.as_deref().filter(|e| !e.trim().is_empty()).context("--callback requires MALICE_ENDPOINT")?)
            } else {
                None
            };
            let sinks = Sinks::new(
                cli.elasticsearch.as_deref(),
                endpoint,
                cli.proxy.as_deref(),
                cli.table,
                cli.scan_id.clone(),
            )?;

            info!(files = cli.paths.len(), timeout_secs = cfg.engine.timeout_secs, "starting scan");
            let outcomes = scan_all(&scanner, &sinks, &cli.paths, parse_threads(&cli.threads))?;

            let mut failed = 0usize;
            for (path, outcome) in cli.paths.iter().zip(outcomes) {
                match outcome {
                    Ok(Some(text)) => println!("{text}"),
                    Ok(None) => {}
                    Err(e) => {
                        failed += 1;
                        error!(path = %path.display(), "{e:#}");
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} scans failed", cli.paths.len());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // 日志写 stderr，stdout 只保留 JSON/表格输出
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") { return None; }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
