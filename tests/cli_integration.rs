#[allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

// ─── helpers ───────────────────────────────────────────────────────

struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let dir = TempDir::new().expect("create tempdir");
        Self { dir }
    }

    fn initialized() -> Self {
        let env = Self::new();
        env.run_ok(&["init"]);
        env
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskrank").expect("binary");
        cmd.current_dir(self.dir.path())
            .env_remove("TASKRANK_USER")
            .env_remove("TASKRANK_LOG")
            .arg("--home")
            .arg(self.dir.path().join("data"));
        cmd
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let mut a: Vec<&str> = args.to_vec();
        a.push("--json");
        let output = self.cmd().args(&a).output().expect("run");
        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("parse JSON failed: {e}\nstdout: {stdout}"))
    }

    fn run_ok(&self, args: &[&str]) -> Value {
        let v = self.run_json(args);
        assert_eq!(v["success"], true, "expected success=true: {v}");
        v
    }

    fn run_err(&self, args: &[&str]) -> Value {
        let v = self.run_json(args);
        assert_eq!(v["success"], false, "expected success=false: {v}");
        v
    }

    fn add(&self, args: &[&str]) -> String {
        let mut a = vec!["task", "add"];
        a.extend_from_slice(args);
        let v = self.run_ok(&a);
        v["data"]["task"]["id"].as_str().expect("task id").to_string()
    }

    fn add_subtask(&self, parent: &str, title: &str) -> String {
        let v = self.run_ok(&["subtask", "add", parent, title]);
        v["data"]["task"]["id"].as_str().expect("subtask id").to_string()
    }
}

fn error_code(v: &Value) -> &str {
    v["error"]["code"].as_str().unwrap_or_default()
}

// ─── init ──────────────────────────────────────────────────────────

#[test]
fn init_creates_database_and_config() {
    let env = TestEnv::new();
    let v = env.run_ok(&["init"]);
    assert_eq!(v["data"]["config_created"], true);
    assert!(env.dir.path().join("data/taskrank.db").exists());
    assert!(env.dir.path().join("data/config.json").exists());

    // Second init keeps the existing config.
    let v = env.run_ok(&["init"]);
    assert_eq!(v["data"]["config_created"], false);
}

#[test]
fn commands_before_init_fail() {
    let env = TestEnv::new();
    let v = env.run_err(&["task", "list"]);
    assert_eq!(error_code(&v), "NOT_INITIALIZED");
    assert_eq!(v["error"]["kind"], "not_found");
}

#[test]
fn text_errors_go_to_stderr_with_exit_1() {
    let env = TestEnv::new();
    env.cmd()
        .args(["task", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not initialized"));
}

// ─── tasks ─────────────────────────────────────────────────────────

#[test]
fn add_list_show_flow() {
    let env = TestEnv::initialized();
    let id = env.add(&[
        "Write report",
        "--category",
        "Work",
        "-p",
        "8",
        "--effort",
        "small",
        "--person",
        "ana",
        "--due",
        "2099-01-10",
    ]);

    let list = env.run_ok(&["task", "list"]);
    assert_eq!(list["data"]["count"], 1);
    let row = &list["data"]["tasks"][0];
    assert_eq!(row["id"], id.as_str());
    assert_eq!(row["category"], "Work");
    assert_eq!(row["status"], "todo");
    assert_eq!(row["due_date"], "2099-01-10T23:59:59Z");

    let show = env.run_ok(&["task", "show", &id]);
    assert_eq!(show["data"]["task"]["title"], "Write report");
    assert_eq!(show["data"]["at_risk"], false);
    assert!(show["data"]["breakdown"]["user_priority"].is_number());
}

#[test]
fn prefix_references_resolve() {
    let env = TestEnv::initialized();
    let id = env.add(&["Only task"]);
    let v = env.run_ok(&["task", "show", &id[..20].to_lowercase()]);
    assert_eq!(v["data"]["task"]["id"], id.as_str());
}

#[test]
fn invalid_input_is_a_validation_error() {
    let env = TestEnv::initialized();
    let v = env.run_err(&["task", "add", "   "]);
    assert_eq!(error_code(&v), "VALIDATION_ERROR");
    assert_eq!(v["error"]["kind"], "validation");

    let v = env.run_err(&["task", "add", "too important", "-p", "11"]);
    assert_eq!(error_code(&v), "VALIDATION_ERROR");
}

#[test]
fn unknown_task_is_not_found() {
    let env = TestEnv::initialized();
    let v = env.run_err(&["task", "show", "01ZZZZZZZZZZZZZZZZZZZZZZZZ"]);
    assert_eq!(error_code(&v), "TASK_NOT_FOUND");
}

#[test]
fn other_users_tasks_are_forbidden() {
    let env = TestEnv::initialized();
    let id = env.add(&["Private"]);
    let v = env.run_err(&["--user", "mallory", "task", "show", &id]);
    assert_eq!(error_code(&v), "FORBIDDEN");
    assert_eq!(v["error"]["kind"], "forbidden");

    let list = env.run_ok(&["--user", "mallory", "task", "list"]);
    assert_eq!(list["data"]["count"], 0);
}

#[test]
fn start_bump_and_history() {
    let env = TestEnv::initialized();
    let id = env.add(&["Call plumber"]);

    let v = env.run_ok(&["task", "start", &id]);
    assert_eq!(v["data"]["task"]["status"], "in_progress");
    let v = env.run_err(&["task", "start", &id]);
    assert_eq!(error_code(&v), "INVALID_STATUS_TRANSITION");

    let mut score = 0;
    for n in 1..=3 {
        let v = env.run_ok(&["task", "bump", &id]);
        assert_eq!(v["data"]["bump_count"], n);
        let new_score = v["data"]["task"]["priority_score"].as_i64().unwrap();
        assert!(new_score >= score);
        score = new_score;
    }
    let at_risk = env.run_ok(&["at-risk"]);
    assert_eq!(at_risk["data"]["tasks"][0]["id"], id.as_str());

    let history = env.run_ok(&["task", "history", &id]);
    let kinds: Vec<&str> = history["data"]["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["created", "status_changed", "bumped", "bumped", "bumped"]);
}

#[test]
fn update_rescores_and_clears_fields() {
    let env = TestEnv::initialized();
    let id = env.add(&["Tidy desk", "-p", "2", "--context", "office"]);
    let before = env.run_ok(&["task", "show", &id])["data"]["task"]["priority_score"]
        .as_i64()
        .unwrap();

    let v = env.run_ok(&["task", "update", &id, "-p", "9", "--clear-context"]);
    let after = v["data"]["task"]["priority_score"].as_i64().unwrap();
    assert!(after > before);
    assert!(v["data"]["task"]["context"].is_null());

    let v = env.run_err(&["task", "update", &id]);
    assert_eq!(error_code(&v), "VALIDATION_ERROR");
}

#[test]
fn next_ranks_by_score_and_hides_blocked() {
    let env = TestEnv::initialized();
    let low = env.add(&["low", "-p", "2"]);
    let high = env.add(&["high", "-p", "9"]);
    let gated = env.add(&["gated", "-p", "10"]);
    env.run_ok(&["dep", "add", &gated, &low]);

    let v = env.run_ok(&["next"]);
    let ids: Vec<&str> = v["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [high.as_str(), low.as_str()]);

    let v = env.run_ok(&["next", "--all", "-n", "1"]);
    assert_eq!(v["data"]["tasks"][0]["id"], gated.as_str());
    assert_eq!(v["data"]["tasks"][0]["actionable"], false);
    assert_eq!(v["data"]["tasks"][0]["incomplete_blockers"], 1);
}

// ─── dependencies ──────────────────────────────────────────────────

#[test]
fn dependency_gate_blocks_until_blocker_done() {
    let env = TestEnv::initialized();
    let a = env.add(&["deploy"]);
    let b = env.add(&["review"]);
    env.run_ok(&["dep", "add", &a, &b]);

    let v = env.run_err(&["task", "done", &a]);
    assert_eq!(error_code(&v), "TASK_BLOCKED");
    assert_eq!(v["error"]["kind"], "state_gated");

    let v = env.run_ok(&["task", "done", &b]);
    assert_eq!(v["data"]["unblocked"][0]["id"], a.as_str());

    let v = env.run_ok(&["task", "done", &a]);
    assert_eq!(v["data"]["task"]["status"], "done");
}

#[test]
fn dependency_cycles_and_duplicates_are_rejected() {
    let env = TestEnv::initialized();
    let a = env.add(&["a"]);
    let b = env.add(&["b"]);
    let c = env.add(&["c"]);
    env.run_ok(&["dep", "add", &a, &b]);
    env.run_ok(&["dep", "add", &b, &c]);

    let v = env.run_err(&["dep", "add", &c, &a]);
    assert_eq!(error_code(&v), "CYCLE_DETECTED");
    assert_eq!(v["error"]["kind"], "conflict");

    let v = env.run_err(&["dep", "add", &a, &b]);
    assert_eq!(error_code(&v), "DUPLICATE_DEPENDENCY");

    let v = env.run_ok(&["dep", "list", &a, "--all"]);
    assert_eq!(v["data"]["dependencies"].as_array().unwrap().len(), 2);

    let v = env.run_ok(&["dep", "check"]);
    assert_eq!(v["data"]["has_cycle"], false);

    env.run_ok(&["dep", "remove", &a, &b]);
    let v = env.run_err(&["dep", "remove", &a, &b]);
    assert_eq!(error_code(&v), "DEPENDENCY_NOT_FOUND");
}

// ─── subtasks ──────────────────────────────────────────────────────

#[test]
fn subtask_gate_and_parent_ready() {
    let env = TestEnv::initialized();
    let parent = env.add(&["plan trip", "--category", "travel"]);
    let s1 = env.add_subtask(&parent, "book flights");
    let s2 = env.add_subtask(&parent, "book hotel");

    let show = env.run_ok(&["task", "show", &s1]);
    assert_eq!(show["data"]["task"]["category"], "travel");
    assert_eq!(show["data"]["task"]["task_type"], "subtask");

    let v = env.run_err(&["task", "done", &parent]);
    assert_eq!(error_code(&v), "OPEN_SUBTASKS");

    let v = env.run_ok(&["subtask", "done", &s1]);
    assert_eq!(v["data"]["all_subtasks_complete"], false);
    assert_eq!(v["data"]["open_subtasks"], 1);

    let v = env.run_ok(&["task", "done", &s2]);
    assert_eq!(v["data"]["parent_ready"]["id"], parent.as_str());

    env.run_ok(&["task", "done", &parent]);
}

#[test]
fn subtasks_cannot_nest_or_be_deleted_under() {
    let env = TestEnv::initialized();
    let parent = env.add(&["parent"]);
    let sub = env.add_subtask(&parent, "child");

    let v = env.run_err(&["subtask", "add", &sub, "grandchild"]);
    assert_eq!(error_code(&v), "INVALID_TASK_TYPE");

    let v = env.run_err(&["task", "delete", &parent]);
    assert_eq!(error_code(&v), "VALIDATION_ERROR");

    env.run_ok(&["task", "delete", &sub]);
    env.run_ok(&["task", "delete", &parent]);
    let v = env.run_err(&["task", "show", &parent]);
    assert_eq!(error_code(&v), "TASK_NOT_FOUND");
}

// ─── recurrence ────────────────────────────────────────────────────

#[test]
fn completing_recurring_task_creates_next_occurrence() {
    let env = TestEnv::initialized();
    let v = env.run_ok(&[
        "task",
        "add",
        "water plants",
        "--due",
        "2030-01-10",
        "--repeat",
        "weekly",
        "--calc",
        "from_original",
    ]);
    let id = v["data"]["task"]["id"].as_str().unwrap().to_string();
    let series = v["data"]["series"]["id"].as_str().unwrap().to_string();
    assert_eq!(v["data"]["series"]["pattern"], "weekly");

    let v = env.run_ok(&["task", "done", &id]);
    let next = &v["data"]["next_instance"];
    assert_eq!(next["due_date"], "2030-01-17T23:59:59Z");
    assert_eq!(next["series_id"], series.as_str());
    assert_eq!(next["status"], "todo");

    let v = env.run_ok(&["series", "show", &series]);
    assert_eq!(v["data"]["instances"].as_array().unwrap().len(), 2);
}

#[test]
fn skip_next_and_stop_recurrence() {
    let env = TestEnv::initialized();
    let v = env.run_ok(&["task", "add", "standup", "--due", "2030-03-01", "--repeat", "daily"]);
    let first = v["data"]["task"]["id"].as_str().unwrap().to_string();
    let series = v["data"]["series"]["id"].as_str().unwrap().to_string();

    let v = env.run_ok(&["task", "done", &first, "--skip-next"]);
    assert!(v["data"]["next_instance"].is_null());
    let v = env.run_ok(&["series", "list"]);
    assert_eq!(v["data"]["series"][0]["is_active"], true);

    env.run_ok(&["series", "stop", &series]);
    let v = env.run_ok(&["series", "list"]);
    assert_eq!(v["data"]["series"].as_array().unwrap().len(), 0);
    let v = env.run_ok(&["series", "list", "--all"]);
    assert_eq!(v["data"]["series"][0]["is_active"], false);
}

#[test]
fn invalid_recurrence_interval_creates_nothing() {
    let env = TestEnv::initialized();
    let v = env.run_err(&["task", "add", "bad", "--repeat", "daily", "--every", "0"]);
    assert_eq!(error_code(&v), "VALIDATION_ERROR");
    let list = env.run_ok(&["task", "list", "--all"]);
    assert_eq!(list["data"]["count"], 0);
}

#[test]
fn preferences_round_trip_through_cli() {
    let env = TestEnv::initialized();
    env.run_ok(&["pref", "set-default", "from-completion"]);
    env.run_ok(&["pref", "set-category", "home", "from_original"]);

    let v = env.run_ok(&["pref", "show"]);
    assert_eq!(v["data"]["effective_default"], "from_completion");
    assert_eq!(v["data"]["categories"][0]["category"], "home");

    let v = env.run_ok(&["pref", "unset-category", "home"]);
    assert_eq!(v["data"]["removed"], true);
    let v = env.run_ok(&["pref", "unset-category", "home"]);
    assert_eq!(v["data"]["removed"], false);
}

#[test]
fn rescore_reports_updated_count() {
    let env = TestEnv::initialized();
    env.add(&["one"]);
    env.add(&["two"]);
    let v = env.run_ok(&["rescore"]);
    assert!(v["data"]["updated"].as_u64().is_some());
}
