//! End-to-end scenarios (spec §8 "Scenarios (literal end-to-end)")
//!
//! Each case compiles a literal source string, assembles it with the
//! system `cc`/`gcc`, runs the result, and checks stdout and exit
//! code. Gracefully skipped (printing a note to stderr) when no
//! system assembler is available, mirroring the teacher's own
//! `check_clang_version` guard.

use lotus::{compile_file_with_config, CompilerConfig, OutputMode};
use std::io::Write;
use std::process::Command;

fn assembler_available() -> bool {
    let cc = std::env::var("CC").unwrap_or_else(|_| "gcc".to_string());
    Command::new(&cc).arg("--version").output().map(|o| o.status.success()).unwrap_or(false)
}

/// Compiles `source` to a temp executable and returns (stdout, exit code).
fn run_scenario(source: &str) -> Option<(String, i32)> {
    if !assembler_available() {
        eprintln!("skipping end-to-end scenario: no system assembler available");
        return None;
    }

    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("input.lts");
    let out_path = dir.path().join("a.out");
    std::fs::File::create(&src_path).unwrap().write_all(source.as_bytes()).unwrap();

    let config = CompilerConfig::new().with_output_mode(OutputMode::Binary);
    compile_file_with_config(&src_path, &out_path, &config).expect("compilation should succeed");

    let output = Command::new(&out_path).output().expect("compiled binary should run");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let code = output.status.code().expect("process should exit normally");
    Some((stdout, code))
}

#[test]
fn scenario_1_bare_return() {
    if let Some((stdout, code)) = run_scenario("fn int main(){ ret 0; }") {
        assert_eq!(stdout, "");
        assert_eq!(code, 0);
    }
}

#[test]
fn scenario_2_printf_string_verb() {
    let src = r#"use "io"; fn int main(){ printf("Hello, %s\n","Lotus"); ret 0; }"#;
    if let Some((stdout, code)) = run_scenario(src) {
        assert_eq!(stdout, "Hello, Lotus\n");
        assert_eq!(code, 0);
    }
}

#[test]
fn scenario_3_bitwise_and() {
    let src = r#"use "io"; fn int main(){ int a=12; int b=10; printf("%d\n", a&b); ret 0; }"#;
    if let Some((stdout, code)) = run_scenario(src) {
        assert_eq!(stdout, "8\n");
        assert_eq!(code, 0);
    }
}

#[test]
fn scenario_4_gcd_intrinsic() {
    let src = r#"use "math"; fn int main(){ ret gcd(48,18); }"#;
    if let Some((_, code)) = run_scenario(src) {
        assert_eq!(code, 6);
    }
}

#[test]
fn scenario_5_for_loop_and_const() {
    let src = r#"const int N=5; use "io"; fn int main(){ int s=0; for(int i=0;i<N;i=i+1){ s=s+i; } printf("%d\n", s); ret 0; }"#;
    if let Some((stdout, code)) = run_scenario(src) {
        assert_eq!(stdout, "10\n");
        assert_eq!(code, 0);
    }
}

#[test]
fn scenario_6_shift_or_precedence() {
    let src = "fn int main(){ ret (1<<3) | 1; }";
    if let Some((_, code)) = run_scenario(src) {
        assert_eq!(code, 9);
    }
}
