//! End-to-end tests that really detach the `racecar` binary.
//!
//! Each test starts a daemon in a scratch directory, then stops it with
//! `SIGTERM` and waits for the pidfile to disappear.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::cargo::cargo_bin_cmd;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Scratch {
    dir: TempDir,
}

impl Scratch {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    fn pidfile(&self) -> PathBuf {
        self.dir.path().join("tmp/pids/racecar.pid")
    }

    fn logfile(&self) -> PathBuf {
        self.dir.path().join("log/racecar.log")
    }

    fn racecar(&self) -> assert_cmd::Command {
        let mut command = cargo_bin_cmd!("racecar");
        command
            .current_dir(self.dir.path())
            .env_remove("RACECAR_PIDFILE")
            .env_remove("RACECAR_CONFIG_PATH")
            .env("RACECAR_LOG_FILTER", "info");
        command
    }

    fn start_daemon(&self) {
        fs::create_dir_all(self.dir.path().join("log")).expect("log dir");
        self.racecar()
            .args(["--daemonize", "--log", "log/racecar.log", "EchoConsumer"])
            .assert()
            .success()
            .stderr(contains("=> Starting background process"));
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Some(pid) = read_pid(&self.pidfile()) {
            let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
            let _ = wait_until(|| !self.pidfile().exists());
        }
    }
}

fn read_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    condition()
}

fn wait_for_pid(scratch: &Scratch) -> i32 {
    assert!(
        wait_until(|| read_pid(&scratch.pidfile()).is_some()),
        "daemon never wrote {}",
        scratch.pidfile().display()
    );
    read_pid(&scratch.pidfile()).expect("pid recorded")
}

fn log_contains(scratch: &Scratch, needle: &str) -> bool {
    fs::read_to_string(scratch.logfile()).is_ok_and(|log| log.contains(needle))
}

#[test]
fn daemon_records_its_own_pid_and_logs_to_file() {
    let scratch = Scratch::new();
    scratch.start_daemon();

    let pid = wait_for_pid(&scratch);
    assert_ne!(
        u32::try_from(pid).expect("positive pid"),
        std::process::id(),
        "the detached child must record itself"
    );
    assert!(kill(Pid::from_raw(pid), None).is_ok(), "daemon should be alive");
    assert!(
        wait_until(|| log_contains(&scratch, "consumer running")),
        "daemon output should reach the log file"
    );

    kill(Pid::from_raw(pid), Signal::SIGTERM).expect("signal daemon");
    assert!(
        wait_until(|| !scratch.pidfile().exists()),
        "daemon should remove its pidfile on clean exit"
    );
    assert!(wait_until(|| log_contains(&scratch, "=> Shut down")));
}

#[test]
fn second_start_is_refused_while_running() {
    let scratch = Scratch::new();
    scratch.start_daemon();
    let pid = wait_for_pid(&scratch);

    scratch
        .racecar()
        .args(["--daemonize", "EchoConsumer"])
        .assert()
        .code(1)
        .stderr(contains("already running"));

    assert_eq!(read_pid(&scratch.pidfile()), Some(pid));
}

#[test]
fn stale_pidfile_is_replaced() {
    let scratch = Scratch::new();
    fs::create_dir_all(scratch.pidfile().parent().expect("pid dir")).expect("create pid dir");
    fs::write(scratch.pidfile(), "not-a-pid\n").expect("seed stale pidfile");

    scratch.start_daemon();

    let pid = wait_for_pid(&scratch);
    assert!(kill(Pid::from_raw(pid), None).is_ok());
}

#[test]
fn unopenable_log_fails_while_attached() {
    let scratch = Scratch::new();

    scratch
        .racecar()
        .args(["--daemonize", "--log", "missing/racecar.log", "EchoConsumer"])
        .assert()
        .code(1)
        .stderr(contains("failed to open output destination"))
        .stderr(contains("=> Starting background process").not());

    assert!(!scratch.pidfile().exists());
}
