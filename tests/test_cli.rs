mod fixtures;

use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

const COUNTED_LONGS: &[(&str, &str)] = &[("WCNT", "Count"), ("DVDR", "-----"), ("DLNG", "Value")];

fn sample(d: &TempDir) -> (PathBuf, PathBuf) {
    let template = write_template(d.path(), "counted.tmpl", COUNTED_LONGS);
    let record = write_record(
        d.path(),
        "128.bin",
        &[0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x09],
    );
    (template, record)
}

fn tmpl_dump() -> Command {
    Command::new(assert_cmd::cargo_bin!("tmpl_dump"))
}

#[test]
fn test_it_decodes_to_text() {
    let d = tempdir().unwrap();
    let (template, record) = sample(&d);

    let mut cmd = tmpl_dump();
    cmd.args(["decode", "-t", template.to_str().unwrap(), record.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Count 'WCNT' (2 entries)"))
        .stdout(predicate::str::contains("Value 'DLNG' = 9"));
}

#[test]
fn test_it_decodes_to_json() {
    let d = tempdir().unwrap();
    let (template, record) = sample(&d);

    let output = tmpl_dump()
        .args([
            "decode",
            "-o",
            "json",
            "-t",
            template.to_str().unwrap(),
            record.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["Count"][0]["Value"], 5);
    assert_eq!(doc["Count"][1]["Value"], 9);
}

#[test]
fn test_it_expands_globs() {
    let d = tempdir().unwrap();
    let (template, _) = sample(&d);
    write_record(d.path(), "129.bin", &[0x00, 0x00]);
    let pattern = d.path().join("*.bin");

    let mut cmd = tmpl_dump();
    cmd.args([
        "decode",
        "-t",
        template.to_str().unwrap(),
        "--glob",
        pattern.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("128.bin <=="))
        .stdout(predicate::str::contains("Count 'WCNT' (0 entries)"));
}

#[test]
fn test_it_reports_truncated_records() {
    let d = tempdir().unwrap();
    let (template, _) = sample(&d);
    let broken = write_record(d.path(), "broken.bin", &[0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x00]);

    let mut cmd = tmpl_dump();
    cmd.args(["decode", "-t", template.to_str().unwrap(), broken.to_str().unwrap()]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("/Count[1]/Value"));
}

#[test]
fn test_it_describes_templates() {
    let d = tempdir().unwrap();
    let (template, _) = sample(&d);

    let mut cmd = tmpl_dump();
    cmd.args(["describe", "-t", template.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("'WCNT' Count"))
        .stdout(predicate::str::contains("'DLNG' Value <signed integer>"));
}

#[test]
fn test_it_checks_round_trips() {
    let d = tempdir().unwrap();
    let (template, record) = sample(&d);

    let mut cmd = tmpl_dump();
    cmd.args(["check", "-t", template.to_str().unwrap(), record.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("ok   "));

    let broken = write_record(d.path(), "broken.bin", &[0x00, 0x01, 0x00]);
    let mut cmd = tmpl_dump();
    cmd.args([
        "check",
        "-t",
        template.to_str().unwrap(),
        record.to_str().unwrap(),
        broken.to_str().unwrap(),
    ]);
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_it_respects_file_output() {
    let d = tempdir().unwrap();
    let (template, record) = sample(&d);
    let f = d.path().join("out").join("dump.txt");

    let mut cmd = tmpl_dump();
    cmd.args([
        "decode",
        "-t",
        template.to_str().unwrap(),
        "-f",
        &f.to_string_lossy(),
        record.to_str().unwrap(),
    ]);

    assert!(
        cmd.output().unwrap().stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );
    assert!(fs::read_to_string(&f).unwrap().contains("Value 'DLNG' = 5"));
}

#[test]
fn test_it_refuses_to_overwrite_directory() {
    let d = tempdir().unwrap();
    let (template, record) = sample(&d);

    let mut cmd = tmpl_dump();
    cmd.args([
        "decode",
        "-t",
        template.to_str().unwrap(),
        "-f",
        &d.path().to_string_lossy(),
        record.to_str().unwrap(),
    ]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_it_overwrites_file_anyways_if_passed_flag() {
    let d = tempdir().unwrap();
    let (template, record) = sample(&d);
    let f = d.path().join("test.out");
    fs::write(&f, b"I'm a file!").unwrap();

    let mut cmd = tmpl_dump();
    cmd.args([
        "decode",
        "-t",
        template.to_str().unwrap(),
        "-f",
        &f.to_string_lossy(),
        "--no-confirm-overwrite",
        record.to_str().unwrap(),
    ]);

    cmd.assert().success();
    assert!(fs::read_to_string(&f).unwrap().contains("Count 'WCNT'"));
}
