use std::io::{Cursor, Write};
use std::process::Command;
use zip::write::{FileOptions, ZipWriter};

fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::<()>::default();
    for (name, data) in files {
        zw.start_file(*name, opts).unwrap();
        zw.write_all(data).unwrap();
    }
    zw.finish().unwrap().into_inner()
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pass_validator"))
}

#[test]
fn unsigned_pass_reports_fail() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("unsigned.pkpass");
    let pass = br#"{"formatVersion":1,"passTypeIdentifier":"pass.com.example","teamIdentifier":"ABCDE12345"}"#;
    std::fs::write(&path, zip_of(&[("pass.json", pass), ("manifest.json", b"{}")])).unwrap();

    let out = bin().arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["overall"], "FAIL");
    assert_eq!(report["checklistVersion"], "passkit_checklist_v1");
    assert_eq!(report["result"]["hasPass"], true);
    assert_eq!(report["result"]["hasSignature"], false);
    assert_eq!(report["result"]["signatureVerification"]["status"], "notAttempted");
}

#[test]
fn malformed_archive_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.pkpass");
    std::fs::write(&path, b"not a zip").unwrap();

    let out = bin().arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("archive malformed"));
}

#[test]
fn invalid_trust_config_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let pass = tmp.path().join("p.pkpass");
    std::fs::write(&pass, zip_of(&[("pass.json", b"{}")])).unwrap();
    let cfg = tmp.path().join("trust.json");
    std::fs::write(&cfg, br#"{"passTypeExtensionOid": "nope"}"#).unwrap();

    let out = bin()
        .arg("--trust-config")
        .arg(&cfg)
        .arg(&pass)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid trust anchor config"));
}

#[test]
fn missing_argument_is_usage_error() {
    let out = bin().output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}
