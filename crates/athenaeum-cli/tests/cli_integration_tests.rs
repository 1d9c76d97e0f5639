//! CLI integration tests for athenaeum
//!
//! Tests the athenaeum CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ADMIN_CODE: &str = "correct horse battery staple";

/// Isolated database and configuration directory for one test
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("athenaeum").unwrap();
        cmd.current_dir(self.dir.path())
            .env("ATHENAEUM_CONFIG_DIR", self.dir.path().join("config"))
            .env("ATHENAEUM_ADMIN_CODE", ADMIN_CODE)
            .env_remove("ATHENAEUM_DATABASE")
            .env_remove("RUST_LOG")
            .arg("--database")
            .arg(self.dir.path().join("library.db"));
        cmd
    }

    fn run(&self, args: &[&str]) {
        self.cmd().args(args).assert().success();
    }

    /// One active member (id 1) and one item (id 1)
    fn seeded() -> Self {
        let sandbox = Self::new();
        sandbox.run(&["provision", "member", "Ada", "Lovelace"]);
        sandbox.run(&[
            "provision", "item", "Dune", "--type", "Print Book", "--isbn", "9780441013593",
        ]);
        sandbox
    }
}

#[test]
fn test_init_creates_database() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema version"));

    assert!(sandbox.dir.path().join("library.db").exists());
}

#[test]
fn test_borrow_twice_is_an_input_error() {
    let sandbox = Sandbox::seeded();
    sandbox.run(&["provision", "member", "Alan", "Turing"]);

    sandbox
        .cmd()
        .args(["borrow", "--member", "1", "--item", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Borrowing ID: 1"));

    sandbox
        .cmd()
        .args(["borrow", "--member", "2", "--item", "1"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("INPUT ERROR")
                .and(predicate::str::contains("already borrowed")),
        );

    sandbox
        .cmd()
        .args(["find-item", "dune"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: Borrowed"));
}

#[test]
fn test_json_output_reports_outcome() {
    let sandbox = Sandbox::seeded();

    sandbox
        .cmd()
        .args(["--format", "json", "borrow", "--member", "9", "--item", "1"])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("\"outcome\": \"input_error\"")
                .and(predicate::str::contains("\"code\": \"E001\"")),
        );

    sandbox
        .cmd()
        .args(["--format", "json", "find-item", "dune"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"outcome\": \"success\"")
                .and(predicate::str::contains("\"title\": \"Dune\"")),
        );
}

#[test]
fn test_duplicate_isbn_donation_needs_confirmation() {
    let sandbox = Sandbox::seeded();
    let donate = [
        "donate", "--member", "1", "--title", "Dune (Paperback)", "--type", "Print Book", "--isbn",
        "9780441013593",
    ];

    sandbox
        .cmd()
        .args(donate)
        .write_stdin("no\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("already exists")
                .and(predicate::str::contains("Donation cancelled")),
        );

    sandbox
        .cmd()
        .args(donate)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("Thank you for your donation"));

    sandbox
        .cmd()
        .args(["find-item", "paperback"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dune (Paperback)"));
}

#[test]
fn test_invalid_item_type_is_rejected_by_parser() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["donate", "--member", "1", "--title", "Scroll", "--type", "Papyrus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid item type"));
}

#[test]
fn test_pay_fine_requires_admin_code() {
    let sandbox = Sandbox::seeded();
    sandbox.run(&["borrow", "--member", "1", "--item", "1"]);
    sandbox.run(&["provision", "assess-fine", "--borrowing", "1", "--amount", "2.5"]);
    sandbox.run(&["return", "1"]);

    sandbox
        .cmd()
        .args(["borrow", "--member", "1", "--item", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("outstanding fine"));

    sandbox
        .cmd()
        .args(["pay-fine", "--member", "1", "--yes"])
        .write_stdin("wrong\ncancel\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Payment cancelled"));

    sandbox
        .cmd()
        .args(["pay-fine", "--member", "1", "--yes"])
        .write_stdin(format!("wrong\n{}\n", ADMIN_CODE))
        .assert()
        .success()
        .stdout(predicate::str::contains("Payment of $2.50 processed"));

    sandbox
        .cmd()
        .args(["fines", "--member", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no outstanding fines"));
}

#[test]
fn test_admin_dump_fails_closed() {
    let sandbox = Sandbox::seeded();

    sandbox
        .cmd()
        .args(["admin", "dump"])
        .write_stdin("a\nb\nc\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too many failed attempts"));

    sandbox
        .cmd()
        .args(["admin", "dump"])
        .write_stdin(format!("{}\n", ADMIN_CODE))
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Records in members")
                .and(predicate::str::contains("Lovelace")),
        );
}

#[test]
fn test_admin_table_rejects_unknown_table() {
    let sandbox = Sandbox::seeded();

    sandbox
        .cmd()
        .args(["admin", "table", "members; DROP TABLE items"])
        .write_stdin(format!("{}\n", ADMIN_CODE))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_event_registration_cycle() {
    let sandbox = Sandbox::seeded();
    sandbox.run(&["provision", "room", "Reading Room", "--capacity", "20"]);
    sandbox.run(&[
        "provision", "event", "Poetry Night", "--date", "2999-01-01", "--room", "1", "--capacity",
        "1", "--time", "19:00",
    ]);
    sandbox.run(&["provision", "member", "Grace", "Hopper"]);

    sandbox
        .cmd()
        .args(["register", "--member", "1", "--event", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current attendance: 1/1"));

    sandbox
        .cmd()
        .args(["register", "--member", "2", "--event", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("full capacity"));

    sandbox
        .cmd()
        .args(["registrations", "--member", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Poetry Night on 2999-01-01 at 19:00"));

    sandbox
        .cmd()
        .args(["cancel", "--member", "1", "--event", "1"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["find-event", "poetry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available spots: 1 of 1"));
}

#[test]
fn test_ask_without_librarian() {
    let sandbox = Sandbox::seeded();

    sandbox
        .cmd()
        .args(["ask", "--member", "1", "Where are the maps?"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No librarian"));

    sandbox.run(&["provision", "staff", "Rupert", "Giles", "--position", "Head Librarian"]);

    sandbox
        .cmd()
        .args(["ask", "--member", "1", "Where are the maps?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rupert Giles, Head Librarian"));
}

#[test]
fn test_interactive_menu_session() {
    let sandbox = Sandbox::seeded();

    sandbox
        .cmd()
        .write_stdin("1\n1\n1\ndune\n2\n1\n12\n3\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Welcome, Ada Lovelace!")
                .and(predicate::str::contains("Title: Dune"))
                .and(predicate::str::contains("Item borrowed successfully"))
                .and(predicate::str::contains("Goodbye")),
        );
}

#[test]
fn test_menu_reprompts_after_input_error() {
    let sandbox = Sandbox::seeded();

    sandbox
        .cmd()
        .write_stdin("7\n1\n42\n3\n")
        .assert()
        .success()
        .stderr(
            predicate::str::contains("Invalid choice")
                .and(predicate::str::contains("Member with ID 42 not found")),
        )
        .stdout(predicate::str::contains("Goodbye"));
}

#[test]
fn test_config_round_trip() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "set", "access.max_attempts", "5"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["config", "get", "access.max_attempts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));

    sandbox
        .cmd()
        .args(["config", "set", "access.admin_code", "hunter2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("environment variable"));

    sandbox
        .cmd()
        .args(["config", "get", "access.admin_code"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set via ATHENAEUM_ADMIN_CODE"));
}
