use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn typeshell() -> Command {
    Command::cargo_bin("typeshell").unwrap()
}

#[test]
fn test_compile_writes_sibling_script() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hello.ts");
    fs::write(&input, "console.log(\"hi\");\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .arg("compile")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("✅ Compiled").and(predicate::str::contains("hello.sh")));

    let script = fs::read_to_string(dir.path().join("hello.sh")).unwrap();
    assert_eq!(script, "#!/bin/bash\n\necho \"hi\"\n");
}

#[test]
fn test_compile_to_stdout_with_shebang() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.ts");
    fs::write(&input, "let x: number = 1 + 2;\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .args(["compile", "--stdout", "--shebang", "#!/usr/bin/env bash"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::eq("#!/usr/bin/env bash\n\nx=$((1 + 2))\n"));
}

#[test]
fn test_compile_parse_error_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.ts");
    fs::write(&input, "const x = 1;\nx = 2;\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .arg("compile")
        .arg(&input)
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with("❌ Parse error at line 2"));
}

#[test]
fn test_missing_file_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    typeshell()
        .current_dir(dir.path())
        .args(["compile", "missing.ts"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot read missing.ts"));
}

#[test]
fn test_strict_flag_rejects_heuristic_shell() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shell.ts");
    fs::write(&input, "ls -la | grep foo\n").unwrap();

    typeshell().current_dir(dir.path()).args(["compile", "--stdout"]).arg(&input).assert().success();
    typeshell()
        .current_dir(dir.path())
        .args(["compile", "--stdout", "--strict"])
        .arg(&input)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bash {"));
}

#[test]
fn test_emit_ast_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.ts");
    fs::write(&input, "let n: number = 1;\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .args(["compile", "--emit-ast", "json"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{").and(predicate::str::contains("\"statements\"")));
}

#[test]
fn test_config_file_applies() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("typeshell.toml"), "[compile]\nexit_on_error = true\nheader_comment = true\n").unwrap();
    fs::write(dir.path().join("a.ts"), "console.log(\"x\");\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .args(["compile", "--stdout", "a.ts"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "#!/bin/bash\n# Generated by typeshell. Do not edit by hand.\nset -e\n",
        ));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("custom.toml"), "[compile]\ncolour = true\n").unwrap();
    fs::write(dir.path().join("a.ts"), "console.log(\"x\");\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .args(["--config", "custom.toml", "compile", "--stdout", "a.ts"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_format_check_reports_diff() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.ts");
    fs::write(&input, "if(true){\nconsole.log(\"x\");\n}\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .args(["format", "--check"])
        .arg(&input)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("+  console.log(\"x\");"));
}

#[test]
fn test_format_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.ts");
    fs::write(&input, "if(true){\nconsole.log(\"x\");\n}\n").unwrap();

    typeshell().current_dir(dir.path()).args(["format", "--in-place"]).arg(&input).assert().success();
    assert_eq!(fs::read_to_string(&input).unwrap(), "if (true) {\n  console.log(\"x\");\n}\n");

    typeshell().current_dir(dir.path()).args(["format", "--check"]).arg(&input).assert().success();
}

#[test]
fn test_run_forwards_exit_status() {
    if std::process::Command::new("bash").arg("--version").output().is_err() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.ts");
    fs::write(&input, "console.log(\"running\");\nexit 3;\n").unwrap();

    typeshell()
        .current_dir(dir.path())
        .arg("run")
        .arg(&input)
        .assert()
        .code(3)
        .stdout(predicate::eq("running\n"));
}
