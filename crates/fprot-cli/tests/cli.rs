use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fprot_cmd() -> Command {
    let mut cmd = Command::cargo_bin("fprot").expect("fprot binary");
    for var in ["MALICE_ENDPOINT", "MALICE_PROXY", "MALICE_ELASTICSEARCH", "MALICE_TIMEOUT", "MALICE_SCANID", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// 写配置文件：扫描程序与更新程序指向测试脚本，更新记录放在临时目录
fn write_config(dir: &Path, scanner: &Path, updater: &Path) -> PathBuf {
    let path = dir.join("fprot.toml");
    let contents = format!(
        "[engine]\nscanner = {:?}\nupdater = {:?}\n\n[signatures]\nstamp_path = {:?}\n",
        scanner.display().to_string(),
        updater.display().to_string(),
        dir.join("UPDATED").display().to_string(),
    );
    std::fs::write(&path, contents).expect("write config");
    path
}

fn sample(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("sample.bin");
    std::fs::write(&path, b"abc").expect("write sample");
    path
}

#[test]
fn no_file_argument_fails() {
    fprot_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please supply a file to scan"));
}

#[test]
fn missing_file_fails_without_output() {
    fprot_cmd()
        .arg("/definitely/not/a/file.exe")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn callback_requires_endpoint() {
    let dir = TempDir::new().unwrap();
    let file = sample(&dir);
    fprot_cmd()
        .arg("--callback")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MALICE_ENDPOINT"));
}

#[cfg(unix)]
const INFECTED_ENGINE: &str = "echo 'Engine version: 4.6.2'\necho 'Virus signatures: 202401151230'\necho \"$2: <Eicar-Test-Signature> [Found virus]\"\nexit 1";

#[cfg(unix)]
#[test]
fn scan_prints_json() {
    let dir = TempDir::new().unwrap();
    let scanner = write_script(dir.path(), "fpscan", INFECTED_ENGINE);
    let config = write_config(dir.path(), &scanner, &scanner);
    let file = sample(&dir);

    let out = fprot_cmd().arg("--config").arg(&config).arg(&file).assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).expect("json output");
    assert_eq!(
        v,
        serde_json::json!({"f-prot": {
            "infected": true,
            "result": "Eicar-Test-Signature",
            "engine": "4.6.2",
            "updated": "20240115"
        }})
    );
}

#[cfg(unix)]
#[test]
fn scan_prints_markdown_table() {
    let dir = TempDir::new().unwrap();
    let scanner = write_script(dir.path(), "fpscan", INFECTED_ENGINE);
    let config = write_config(dir.path(), &scanner, &scanner);
    let file = sample(&dir);

    fprot_cmd()
        .arg("--config")
        .arg(&config)
        .arg("-t")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("#### F-PROT"))
        .stdout(predicate::str::contains("| Infected | Result | Engine | Updated |"))
        .stdout(predicate::str::contains("| true | Eicar-Test-Signature | 4.6.2 | 20240115 |"));
}

#[cfg(unix)]
#[test]
fn garbled_report_aborts_pipeline() {
    let dir = TempDir::new().unwrap();
    let scanner = write_script(dir.path(), "fpscan", "echo 'Engine version: 4.6.2'\necho \"$2 [Found virus]\"");
    let config = write_config(dir.path(), &scanner, &scanner);
    let file = sample(&dir);

    fprot_cmd()
        .arg("--config")
        .arg(&config)
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no virus name"));
}

#[cfg(unix)]
#[test]
fn timeout_flag_is_enforced() {
    let dir = TempDir::new().unwrap();
    let scanner = write_script(dir.path(), "fpscan", "exec sleep 30");
    let config = write_config(dir.path(), &scanner, &scanner);
    let file = sample(&dir);

    fprot_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--timeout", "1"])
        .arg(&file)
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .failure()
        .stderr(predicate::str::contains("timed out"));
}

#[cfg(unix)]
#[test]
fn update_runs_updater_and_writes_stamp() {
    let dir = TempDir::new().unwrap();
    let updater = write_script(dir.path(), "fpupdate", "echo 'antivir.def updated'");
    let config = write_config(dir.path(), &updater, &updater);

    fprot_cmd()
        .arg("--config")
        .arg(&config)
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updating F-PROT..."))
        .stdout(predicate::str::contains("antivir.def updated"));

    let stamp = std::fs::read_to_string(dir.path().join("UPDATED")).unwrap();
    assert_eq!(stamp.len(), 8);
}

#[cfg(unix)]
#[test]
fn update_stamp_fills_missing_report_date() {
    let dir = TempDir::new().unwrap();
    let scanner = write_script(dir.path(), "fpscan", "echo 'Engine version: 4.6.2'");
    let config = write_config(dir.path(), &scanner, &scanner);
    std::fs::write(dir.path().join("UPDATED"), "20230704").unwrap();
    let file = sample(&dir);

    let out = fprot_cmd().arg("--config").arg(&config).arg(&file).assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["f-prot"]["updated"], "20230704");
    assert_eq!(v["f-prot"]["infected"], false);
}
