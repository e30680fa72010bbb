#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

struct Env {
    home: TempDir,
    project: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            project: TempDir::new().unwrap(),
        }
    }

    fn forge(&self) -> Command {
        let mut cmd = Command::cargo_bin("forge").unwrap();
        cmd.current_dir(self.project.path())
            .env("FORGE_HOME", self.home.path())
            .env("FORGE_ROOT", self.project.path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn init(&self) {
        self.forge().arg("init").assert().success();
    }

    fn home(&self) -> &Path {
        self.home.path()
    }

    fn project(&self) -> &Path {
        self.project.path()
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// forge init / vault
// ---------------------------------------------------------------------------

#[test]
fn init_creates_vault_and_dirs() {
    let env = Env::new();
    env.forge()
        .args(["init", "--default-provider", "anthropic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized vault"));

    let vault = read_json(&env.home().join(".nebula-forge/vault.json"));
    assert_eq!(vault["initialized"], true);
    assert_eq!(vault["default_provider"], "anthropic");
    assert!(env.home().join(".config/opencode/skills").is_dir());
    assert!(env.home().join(".nebula-forge/blueprints").is_dir());

    env.forge()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn init_rejects_unknown_provider() {
    let env = Env::new();
    env.forge()
        .args(["init", "--default-provider", "openai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn keys_are_masked_and_exported() {
    let env = Env::new();
    env.init();
    env.forge()
        .args(["vault", "set-key", "anthropic", "sk-ant-1234567890abcdef"])
        .assert()
        .success();

    env.forge()
        .args(["vault", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sk-ant-1••••••••"))
        .stdout(predicate::str::contains("1234567890abcdef").not());

    env.forge()
        .args(["vault", "export"])
        .assert()
        .success()
        .stdout(predicate::str::contains("export ANTHROPIC_API_KEY=sk-ant-1234567890abcdef"));
}

#[test]
fn profiles_switch_key_sets() {
    let env = Env::new();
    env.init();
    env.forge().args(["vault", "profile", "create", "work"]).assert().success();
    env.forge().args(["vault", "profile", "switch", "work"]).assert().success();
    env.forge()
        .args(["--json", "vault", "profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""active": "work""#));
    env.forge()
        .args(["vault", "profile", "delete", "work"])
        .assert()
        .failure();
}

#[test]
fn unknown_theme_is_rejected() {
    let env = Env::new();
    env.init();
    env.forge()
        .args(["vault", "set", "--theme", "solarized"])
        .assert()
        .failure();
    env.forge().args(["vault", "set", "--theme", "nord"]).assert().success();
}

// ---------------------------------------------------------------------------
// forge skill
// ---------------------------------------------------------------------------

#[test]
fn skill_create_list_score_delete() {
    let env = Env::new();
    env.init();
    env.forge()
        .args([
            "skill", "create", "--name", "API Helper", "--description", "Design REST endpoints",
            "--tags", "api,rest",
        ])
        .assert()
        .success();
    let skill_md = env.home().join(".config/opencode/skills/api-helper/SKILL.md");
    assert!(skill_md.is_file());

    env.forge()
        .args(["skill", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api-helper"));

    env.forge()
        .args(["skill", "score", "api-helper"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quality:"));

    env.forge()
        .args(["skill", "create", "--name", "api-helper", "--description", "again"])
        .assert()
        .failure();

    env.forge().args(["skill", "delete", "api-helper"]).assert().success();
    assert!(!skill_md.exists());
}

#[test]
fn skill_create_dry_run_writes_nothing() {
    let env = Env::new();
    env.init();
    env.forge()
        .args(["skill", "create", "--name", "ghost", "--description", "d", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+++ b/"));
    assert!(!env.home().join(".config/opencode/skills/ghost").exists());
}

#[test]
fn compose_prints_markdown_and_score() {
    let env = Env::new();
    env.forge()
        .args(["skill", "compose", "--name", "reviewer", "--description", "Review code"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Skill: reviewer"))
        .stdout(predicate::str::contains("Quality:"));
}

// ---------------------------------------------------------------------------
// forge project
// ---------------------------------------------------------------------------

#[test]
fn bootstrap_requires_yes() {
    let env = Env::new();
    env.init();
    env.forge()
        .args(["project", "bootstrap"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing written"));
    assert!(!env.project().join("AGENTS.md").exists());
}

#[test]
fn bootstrap_writes_agent_files_once() {
    let env = Env::new();
    env.init();
    std::fs::write(env.project().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();

    env.forge().args(["project", "bootstrap", "--yes"]).assert().success();
    let agents = std::fs::read_to_string(env.project().join("AGENTS.md")).unwrap();
    assert!(agents.contains("<!-- forge:start -->"));
    let config = read_json(&env.project().join("opencode.json"));
    assert!(config["instructions"].to_string().contains("AGENTS.md"));
    assert!(env.home().join(".nebula-forge/logs/provision.log").is_file());

    env.forge()
        .args(["project", "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already provisioned"));
}

// ---------------------------------------------------------------------------
// plugins, cookbook, blueprints
// ---------------------------------------------------------------------------

#[test]
fn plugin_install_and_remove() {
    let env = Env::new();
    env.forge().args(["plugin", "install", "opencode-notify"]).assert().success();
    let config = read_json(&env.project().join("opencode.json"));
    assert_eq!(config["mcp"]["opencode-notify"]["command"][2], "opencode-notify");

    env.forge().args(["plugin", "install", "opencode-notify"]).assert().failure();
    env.forge().args(["plugin", "install", "not-a-plugin"]).assert().failure();
    env.forge().args(["plugin", "remove", "opencode-notify"]).assert().success();
}

#[test]
fn cookbook_install_locally() {
    let env = Env::new();
    env.init();
    env.forge()
        .args(["cookbook", "list", "git"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git-workflow"));
    env.forge()
        .args(["cookbook", "install", "test-guardian", "--local"])
        .assert()
        .success();
    assert!(env.project().join(".opencode/skills/test-guardian/SKILL.md").is_file());
}

#[test]
fn blueprint_generate_and_save() {
    let env = Env::new();
    env.init();
    env.forge()
        .args(["blueprint", "generate", "refactor", "--var", "module=src/auth/", "--project", "Shop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("project: Shop"))
        .stdout(predicate::str::contains("src/auth/"))
        .stderr(predicate::str::contains("_TBD_"));

    env.forge()
        .args(["blueprint", "generate", "migration", "--save"])
        .assert()
        .success();
    env.forge()
        .args(["blueprint", "saved"])
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy-migration-"));

    env.forge().args(["blueprint", "show", "nope"]).assert().failure();
}

// ---------------------------------------------------------------------------
// market, radar, sessions, mcp
// ---------------------------------------------------------------------------

#[test]
fn market_offline_uses_builtins() {
    let env = Env::new();
    env.forge()
        .args(["market", "list", "postgres", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db-migrator"))
        .stderr(predicate::str::contains("built-in"));
}

#[test]
fn radar_reports_missing_files() {
    let env = Env::new();
    env.forge()
        .args(["radar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AGENTS_MD_MISSING"));

    env.forge()
        .args(["--json", "radar"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""git_status": "no_git""#));
}

#[test]
fn session_list_and_show() {
    let env = Env::new();
    let dir = env.home().join(".opencode/sessions");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("abc.jsonl"),
        "{\"timestamp\": \"2026-02-01T08:00:00\", \"tool\": \"edit\", \"path\": \"lib.rs\"}\n",
    )
    .unwrap();

    env.forge()
        .args(["session", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abc"));
    env.forge()
        .args(["session", "show", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edit: lib.rs"));
    env.forge().args(["session", "show", "zzz"]).assert().failure();
}

#[test]
fn mcp_generate_registers_server() {
    let env = Env::new();
    env.forge()
        .args(["mcp", "generate", "tickets", "--description", "list and create tickets"])
        .assert()
        .success();
    assert!(env.project().join(".opencode/mcp-servers/tickets/src/server.ts").is_file());
    let config = read_json(&env.project().join("opencode.json"));
    assert_eq!(config["mcp"]["tickets"]["command"][4], ".opencode/mcp-servers/tickets");
}
