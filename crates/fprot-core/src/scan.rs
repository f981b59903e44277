//! 扫描编排：调用外部引擎（带超时）并把输出交给 Normalizer
use anyhow::Result;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, PluginConfig};
use crate::error::ScanError;
use crate::normalize::Normalizer;
use crate::types::ScanRecord;
use crate::updated::resolve_fallback_date;

/// 轮询子进程状态的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// 一次引擎调用的产出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub stdout: String,
    /// 退出码；被信号终止时为 None
    pub exit_code: Option<i32>,
}

/// 外部扫描引擎的调用接口
pub trait EngineRunner: Send + Sync {
    fn run(&self, target: &Path, timeout: Duration) -> Result<EngineOutput, ScanError>;
}

/// 子进程运行结果（内部使用，更新命令同样走这里）
pub(crate) struct Finished {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// 启动命令并等待其退出；超过 `timeout` 则强制 kill 并回收
///
/// stdout/stderr 由独立线程读取，避免管道写满导致子进程阻塞。
/// 进程退出后等待读线程同样受 deadline 约束：残留的子孙进程可能仍持有管道。
/// 返回的错误为可读的失败原因。
pub(crate) fn run_with_deadline(mut cmd: Command, timeout: Duration) -> Result<Finished, String> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("spawn failed: {e}"))?;

    let stdout = child.stdout.take().ok_or("stdout was not captured")?;
    let stderr = child.stderr.take().ok_or("stderr was not captured")?;
    let out_rx = spawn_reader(stdout);
    let err_rx = spawn_reader(stderr);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                terminate(&mut child);
                return Err(format!("wait failed: {e}"));
            }
        }
        if Instant::now() >= deadline {
            terminate(&mut child);
            return Err(format!("timed out after {}s", timeout.as_secs_f32()));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = recv_before(&out_rx, deadline, timeout)?.map_err(|e| format!("read stdout: {e}"))?;
    let stderr = recv_before(&err_rx, deadline, timeout)?.unwrap_or_default();
    Ok(Finished { status, stdout, stderr })
}

/// 后台读取整个流，结果经 channel 交回
fn spawn_reader(r: impl Read + Send + 'static) -> Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_lossy(r));
    });
    rx
}

fn recv_before(
    rx: &Receiver<std::io::Result<String>>,
    deadline: Instant,
    timeout: Duration,
) -> Result<std::io::Result<String>, String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(res) => Ok(res),
        Err(RecvTimeoutError::Timeout) => {
            Err(format!("timed out after {}s waiting for engine output", timeout.as_secs_f32()))
        }
        Err(RecvTimeoutError::Disconnected) => Err("output reader panicked".to_string()),
    }
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(error = %e, "kill failed (process already exited?)");
    }
    let _ = child.wait();
}

fn read_lossy(mut r: impl Read) -> std::io::Result<String> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 基于 `std::process` 的引擎调用：`<program> <args..> <target>`
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    pub fn from_config(engine: &EngineConfig) -> Self {
        Self::new(engine.scanner.clone(), engine.scan_args.clone())
    }
}

impl EngineRunner for ProcessRunner {
    fn run(&self, target: &Path, timeout: Duration) -> Result<EngineOutput, ScanError> {
        let program = self.program.display().to_string();
        let invocation = |reason: String| ScanError::EngineInvocation { program: program.clone(), reason };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(target);
        let done = run_with_deadline(cmd, timeout).map_err(invocation)?;

        let exit_code = done.status.code();
        debug!(?exit_code, stdout_len = done.stdout.len(), "scan engine exited");
        match exit_code {
            None => return Err(invocation(format!("terminated by signal ({})", done.status))),
            // 引擎以非零退出码表示“发现病毒”，只有无输出时才视为失败
            Some(code) if code != 0 && done.stdout.trim().is_empty() => {
                return Err(invocation(format!("exit code {code}: {}", done.stderr.trim())));
            }
            Some(_) => {}
        }
        Ok(EngineOutput { stdout: done.stdout, exit_code })
    }
}

/// 扫描编排器：引擎调用 + 归一化 + 日期回退
pub struct Scanner<R = ProcessRunner> {
    runner: R,
    normalizer: Normalizer,
    timeout: Duration,
    fallback_date: Option<String>,
}

impl Scanner<ProcessRunner> {
    /// 按配置组装；回退日期在此解析一次
    pub fn from_config(cfg: &PluginConfig, timeout: Duration) -> Result<Self> {
        let runner = ProcessRunner::from_config(&cfg.engine);
        let normalizer = Normalizer::new(&cfg.report)?;
        let fallback = resolve_fallback_date(&cfg.signatures);
        Ok(Scanner::new(runner, normalizer, timeout).with_fallback_date(fallback))
    }
}

impl<R: EngineRunner> Scanner<R> {
    pub fn new(runner: R, normalizer: Normalizer, timeout: Duration) -> Self {
        Self { runner, normalizer, timeout, fallback_date: None }
    }

    /// 报告中没有病毒库日期时使用的 YYYYMMDD
    pub fn with_fallback_date(mut self, date: Option<String>) -> Self {
        self.fallback_date = date;
        self
    }

    pub fn timeout(&self) -> Duration { self.timeout }

    pub fn scan(&self, target: &Path) -> Result<ScanRecord, ScanError> {
        if !target.exists() {
            return Err(ScanError::TargetNotFound(target.to_path_buf()));
        }
        info!(target = %target.display(), timeout_secs = self.timeout.as_secs(), "scanning");
        let output = self.runner.run(target, self.timeout)?;
        let record = self.normalizer.normalize(&output.stdout).map_err(|e| {
            warn!(target = %target.display(), error = %e, "scan report rejected");
            e
        })?;
        Ok(record.with_fallback_date(self.fallback_date.as_deref()))
    }
}

/// 以默认引擎与默认报告格式扫描单个文件
pub fn scan(file_path: &Path, timeout_secs: u64) -> Result<ScanRecord, ScanError> {
    let runner = ProcessRunner::from_config(&EngineConfig::default());
    let normalizer = crate::normalize::default_normalizer().clone();
    Scanner::new(runner, normalizer, Duration::from_secs(timeout_secs)).scan(file_path)
}
