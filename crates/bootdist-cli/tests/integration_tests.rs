//! Integration tests for the `bootdist` CLI binary.

use bootdist_core::ArchiveWriter;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test context with a project directory holding a minimal dist spec
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let root = temp_dir.path();
        std::fs::write(root.join("logic.py"), "def bootstrap():\n    pass\n").unwrap();
        std::fs::write(root.join("example.py"), "print('example')\n").unwrap();
        std::fs::write(
            root.join("bootdist.toml"),
            r#"
[dist]
name = "example"
version = "1.0"
bootstrap-logic = "logic.py"

[[executable]]
name = "example"
script = "example.py"
"#,
        )
        .unwrap();
        Self { temp_dir }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn bootdist_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_bootdist");
        let mut cmd = Command::new(bin_path);
        cmd.current_dir(self.root());
        cmd.env_remove("BOOTDIST_FREEZER");
        cmd.env_remove("BOOTDIST_FREEZER_ARGS");
        cmd.env_remove("BOOTDIST_COMPILER");
        cmd.env_remove("BOOTDIST_COMPILER_ARGS");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.bootdist_cmd()
            .args(args)
            .output()
            .expect("failed to run bootdist")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("bootdist"));
}

#[test]
fn test_normalize_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["normalize", "target-dir", "optimize", "a--b"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("target-dir -> targetDir"));
    assert!(out.contains("optimize -> optimize"));
    assert!(out.contains("a--b -> aB"));
}

#[test]
fn test_classify_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["classify", "libpython3.11.so", "app", "fcntl.so"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("libpython3.11.so\tbootstrap"));
    assert!(out.contains("app\tfull"));
    assert!(out.contains("fcntl.so\tbootstrap"));

    let output = ctx.run(&["classify", "--builtin", "fcntl", "fcntl.so"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("fcntl.so\tfull"));
}

#[test]
fn test_inspect_command() {
    let ctx = TestContext::new();
    let archive = ctx.root().join("lib.zip");
    let mut writer = ArchiveWriter::create(&archive).unwrap();
    writer.write_as("bootstrap_module", b"code").unwrap();
    writer.finish().unwrap();

    let output = ctx.run(&["inspect", "--json", "lib.zip"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["name"], "bootstrap_module");
    assert_eq!(rows[0]["size"], 4);
    assert_eq!(rows[0]["modified"], "2000-01-01 00:00:00");

    let output = ctx.run(&["inspect", "missing.zip"]);
    assert!(!output.status.success());
}

#[test]
fn test_build_dry_run_writes_nothing() {
    let ctx = TestContext::new();
    let output = ctx.run(&["build", "--dry-run", "--platform", "linux-x86_64"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("example-1.0.linux-x86_64"));
    assert!(out.contains("Loader for 'example'"));
    assert!(!ctx.root().join("dist").exists());
}

#[test]
fn test_build_requires_freezer() {
    let ctx = TestContext::new();
    let output = ctx.run(&["build"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No freezer configured"));
}

#[test]
fn test_build_rejects_invalid_spec() {
    let ctx = TestContext::new();
    std::fs::write(ctx.root().join("bad.toml"), "[dist]\nname = \"x\"\n").unwrap();
    let output = ctx.run(&["build", "bad.toml", "--dry-run"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("bad.toml"));
}

#[test]
fn test_chainload_without_identity_runs_in_process() {
    let ctx = TestContext::new();
    let target = ctx.root().join("version");
    std::fs::create_dir_all(&target).unwrap();
    let output = ctx.run(&[
        "chainload",
        "--target",
        target.to_str().unwrap(),
        "--identity",
        "python-3.11-linux-x86_64",
        "example",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("in-process"));
}

#[test]
fn test_chainload_mismatch_requires_opt_in() {
    let ctx = TestContext::new();
    let target = ctx.root().join("version");
    std::fs::create_dir_all(target.join("bootdist-files")).unwrap();
    std::fs::write(
        target.join("bootdist-files/runtime-identity.txt"),
        "python-3.12-linux-x86_64",
    )
    .unwrap();
    std::fs::write(target.join("example"), "binary").unwrap();
    let target_arg = target.to_str().unwrap();

    let output = ctx.run(&[
        "chainload",
        "--target",
        target_arg,
        "--identity",
        "python-3.11-linux-x86_64",
        "example",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("chainloading is disabled"));

    let output = ctx.run(&[
        "chainload",
        "--dry-run",
        "--enable",
        "--target",
        target_arg,
        "--identity",
        "python-3.11-linux-x86_64",
        "example",
        "--flag",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let expected = format!("reexec {} --flag", target.join("example").display());
    assert!(stdout(&output).contains(&expected));
}

#[cfg(unix)]
#[test]
fn test_build_with_command_collaborators() {
    let ctx = TestContext::new();
    let freezer: PathBuf = ctx.root().join("freezer.sh");
    std::fs::write(
        &freezer,
        "cat > /dev/null\nprintf frozen > example\nprintf runtime > libpython3.11.so\n",
    )
    .unwrap();

    let output = ctx
        .bootdist_cmd()
        .args(["build", "--platform", "linux-x86_64"])
        .env("BOOTDIST_FREEZER", "sh")
        .env("BOOTDIST_FREEZER_ARGS", freezer.to_str().unwrap())
        .env("BOOTDIST_COMPILER", "sh")
        .env("BOOTDIST_COMPILER_ARGS", "-c cat compiler")
        .output()
        .expect("failed to run bootdist");
    assert!(output.status.success(), "{}", stderr(&output));

    let dist = ctx.root().join("dist");
    let bootstrap = dist.join("bootstrap");
    assert_eq!(
        std::fs::read_to_string(bootstrap.join("example")).unwrap(),
        "frozen"
    );
    assert!(bootstrap.join("libpython3.11.so").is_file());

    let version_dir = dist.join("example-1.0.linux-x86_64");
    assert!(version_dir.join("bootdist-files/complete").is_file());
    assert_eq!(
        std::fs::read_to_string(version_dir.join("bootdist-files/bootstrap-manifest.txt"))
            .unwrap(),
        "example\nlibpython3.11.so\npython311.zip\n"
    );

    let output = ctx.run(&["inspect", "--json", "dist/bootstrap/python311.zip"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["bootstrap_module", "example_main"]);
}
