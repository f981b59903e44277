use fprot_core::{normalize, render_json, NormalizationError, Normalizer, ReportLayout};

const EICAR_REPORT: &str = "Engine version: 4.6.2\nVirus signatures: 202401151230\n/tmp/evil.exe: <Eicar-Test-Signature> [Found virus]\n";

/// 接近真实 fpscan 输出的完整报告
const FPSCAN_REPORT: &str = r#"
F-PROT Antivirus CLS version 6.7.10.6267, 64bit (built: 2012-03-27T12-34-14)


FRISK Software International (C) Copyright 1989-2011


Engine version:   4.6.5.141
Arguments:        -r /malware/EICAR
Virus signatures: 201705231515
                  (/opt/f-prot/antivir.def)

[Found virus] <EICAR_Test_File (exact)>  /malware/EICAR
Scanning:
Results:

Files: 1
Skipped files: 0
MBR/boot sectors checked: 0
Objects scanned: 1
Infected objects: 1
Infected files: 1
Files with errors: 0
Disinfected: 0

Running time: 00:01
"#;

#[test]
fn eicar_report_normalizes_end_to_end() {
    let rec = normalize(EICAR_REPORT).unwrap();
    assert!(rec.infected());
    assert_eq!(rec.signature_name(), "Eicar-Test-Signature");
    assert_eq!(rec.engine_version(), "4.6.2");
    assert_eq!(rec.signature_date(), "20240115");
}

#[test]
fn realistic_fpscan_report() {
    let rec = normalize(FPSCAN_REPORT).unwrap();
    assert!(rec.infected());
    assert_eq!(rec.signature_name(), "EICAR_Test_File (exact)");
    assert_eq!(rec.engine_version(), "4.6.5.141");
    assert_eq!(rec.signature_date(), "20170523");

    let js: serde_json::Value = serde_json::from_str(&render_json(&rec).unwrap()).unwrap();
    assert_eq!(
        js,
        serde_json::json!({"f-prot": {
            "infected": true,
            "result": "EICAR_Test_File (exact)",
            "engine": "4.6.5.141",
            "updated": "20170523"
        }})
    );
}

#[test]
fn clean_fpscan_report() {
    let clean = FPSCAN_REPORT.replace("[Found virus] <EICAR_Test_File (exact)>  /malware/EICAR\n", "");
    let rec = normalize(&clean).unwrap();
    assert!(!rec.infected());
    assert_eq!(rec.signature_name(), "");
    assert_eq!(rec.engine_version(), "4.6.5.141");
}

#[test]
fn normalization_is_idempotent() {
    assert_eq!(normalize(FPSCAN_REPORT).unwrap(), normalize(FPSCAN_REPORT).unwrap());
    let n = Normalizer::new(&ReportLayout::default()).unwrap();
    assert_eq!(n.normalize(EICAR_REPORT).unwrap(), normalize(EICAR_REPORT).unwrap());
}

#[test]
fn garbled_verdict_is_never_reported_clean() {
    let broken = FPSCAN_REPORT.replace("<EICAR_Test_File (exact)>", "EICAR_Test_File");
    assert!(matches!(normalize(&broken), Err(NormalizationError::EmptyVerdictName { .. })));
}

#[test]
fn unstructured_output_is_rejected() {
    let err = normalize("sh fpscan not found\nSegmentation fault\n").unwrap_err();
    assert_eq!(err, NormalizationError::UnrecognizedOutputFormat);
}

#[test]
fn normalizer_is_shareable_across_threads() {
    let n = std::sync::Arc::new(Normalizer::new(&ReportLayout::default()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let n = std::sync::Arc::clone(&n);
            std::thread::spawn(move || {
                let raw = format!("Engine version: 4.6.{i}\nf: <Virus-{i}> [Found virus]");
                n.normalize(&raw).unwrap()
            })
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        let rec = h.join().unwrap();
        assert_eq!(rec.signature_name(), format!("Virus-{i}"));
        assert_eq!(rec.engine_version(), format!("4.6.{i}"));
    }
}
