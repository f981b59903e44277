//! 扫描 ID：环境变量 MALICE_SCANID 优先，否则取文件内容的 SHA-256
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// 文件内容的 SHA-256（小写十六进制）
pub fn file_sha256(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 { break; }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// 解析扫描 ID；`override_id` 为空字符串时视为未设置
pub fn scan_id(path: &Path, override_id: Option<&str>) -> Result<String> {
    match override_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => Ok(id.to_string()),
        None => file_sha256(path),
    }
}
