use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn calc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_calc_lang"))
}

fn script(name: &str, contents: &str) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    std::fs::write(&path, contents).expect("Failed to write script");
    path
}

#[test]
fn test_version_flag() {
    let output = calc().arg("--version").output().expect("Failed to execute calc_lang");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_piped_stdin_is_evaluated() {
    let mut child = calc()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute calc_lang");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"a = 3+4*8\na\nx\n(2+3)*4\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "35\n0\n20\n");
    assert_eq!(
        String::from_utf8(output.stderr).unwrap(),
        "Undefined variable 'x' found!\n"
    );
}

#[test]
fn test_run_file() {
    let path = script(
        "run.calc",
        "// greeting\ns = \"hello\"\ns\nn = 10 - 3 - 2\nn / 2\n",
    );
    let output = calc().arg("run").arg(&path).output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "\"hello\"\n2.5\n"
    );
    assert!(output.stderr.is_empty());
}

#[test]
fn test_run_missing_file() {
    let output = calc()
        .arg("run")
        .arg("definitely/not/here.calc")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("not/here.calc"), "{stderr}");
}

#[test]
fn test_tokenize() {
    let path = script("tokenize.calc", "a = (1 + 22) // trailing\nb\n");
    let output = calc().arg("tokenize").arg(&path).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "IDENTIFIER a null",
            "EQUAL = null",
            "LEFT_PAREN ( null",
            "NUMBER 1 1",
            "PLUS + null",
            "NUMBER 22 22",
            "RIGHT_PAREN ) null",
            "IDENTIFIER b null",
            "EOF  null",
        ]
    );
}

#[test]
fn test_tokenize_reports_bad_characters() {
    let path = script("tokenize_bad.calc", "1\n2 # 3\n");
    let output = calc().arg("tokenize").arg(&path).output().unwrap();

    assert_eq!(output.status.code(), Some(65));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("NUMBER 3 3"));
    assert!(stdout.ends_with("EOF  null\n"));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("[line 2] Error: Illegal character '#'"), "{stderr}");
}

#[test]
fn test_parse() {
    let path = script("parse.calc", "a = 3+4*8\n\n-a + b\n10-3-2\n");
    let output = calc().arg("parse").arg(&path).output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "(= a (+ 3 (* 4 8)))\n(+ (- a) b)\n(- (- 10 3) 2)\n"
    );
}

#[test]
fn test_parse_reports_syntax_errors() {
    let path = script("parse_bad.calc", "1 +\n2\n");
    let output = calc().arg("parse").arg(&path).output().unwrap();

    assert_eq!(output.status.code(), Some(65));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "2\n");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Syntax error at end of input"), "{stderr}");
}
