//! 病毒库更新与更新日期记录
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{EngineConfig, SignatureConfig};
use crate::scan::run_with_deadline;

fn is_yyyymmdd(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit())
}

/// 读取更新记录文件；文件不存在返回 None，内容不是 YYYYMMDD 时记一条告警并返回 None
pub fn read_update_stamp(path: &Path) -> Result<Option<String>> {
    let txt = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read update stamp {}", path.display())),
    };
    let date = txt.trim();
    if !is_yyyymmdd(date) {
        warn!(path = %path.display(), content = date, "update stamp is not YYYYMMDD");
        return Ok(None);
    }
    Ok(Some(date.to_string()))
}

pub fn write_update_stamp(path: &Path, date: &str) -> Result<()> {
    if !is_yyyymmdd(date) {
        bail!("refusing to write malformed update stamp {date:?}");
    }
    std::fs::write(path, date).with_context(|| format!("write update stamp {}", path.display()))
}

/// 解析回退日期：优先读取更新记录文件，其次使用配置中的 fallback_date
///
/// 启动时调用一次，结果交给 `Scanner`。
pub fn resolve_fallback_date(cfg: &SignatureConfig) -> Option<String> {
    match read_update_stamp(&cfg.stamp_path) {
        Ok(Some(date)) => return Some(date),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "ignoring unreadable update stamp"),
    }
    cfg.fallback_date
        .as_deref()
        .map(str::trim)
        .filter(|d| {
            let ok = is_yyyymmdd(d);
            if !ok && !d.is_empty() {
                warn!(fallback_date = d, "configured fallback date is not YYYYMMDD");
            }
            ok
        })
        .map(str::to_string)
}

/// 运行厂商更新程序，成功后把当天日期写入更新记录文件
///
/// 返回更新程序的标准输出。
pub fn update_definitions(engine: &EngineConfig, signatures: &SignatureConfig, timeout: Duration) -> Result<String> {
    info!(updater = %engine.updater.display(), "updating virus definitions");
    let done = run_with_deadline(Command::new(&engine.updater), timeout)
        .map_err(|reason| anyhow::anyhow!("run {}: {reason}", engine.updater.display()))?;
    if !done.status.success() {
        bail!("{} failed ({}): {}", engine.updater.display(), done.status, done.stderr.trim());
    }
    let today = chrono::Local::now().format("%Y%m%d").to_string();
    write_update_stamp(&signatures.stamp_path, &today)?;
    info!(date = %today, stamp = %signatures.stamp_path.display(), "virus definitions updated");
    Ok(done.stdout)
}
