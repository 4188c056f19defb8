//! Behavioural tests covering launch sequencing and pidfile ownership.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::process;

use racecar_config::{ConsumerSpec, OutputRedirectionTarget};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use super::support::{
    Journal, RecordingDaemonizer, RecordingRedirector, RecordingRuntime, Step, read_pid,
};
use crate::cli::Cli;
use crate::consumer::{Consumer, ConsumerRegistry};
use crate::errors::LaunchError;
use crate::launch::Launcher;

struct Silent;

impl Consumer for Silent {}

fn silent() -> Box<dyn Consumer> {
    Box::new(Silent)
}

struct LauncherWorld {
    dir: TempDir,
    registry: ConsumerRegistry,
    cli: Cli,
    journal: Journal,
    resumed: bool,
    banner: Vec<u8>,
    result: Option<Result<(), LaunchError>>,
}

impl LauncherWorld {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let cli = Cli {
            pidfile: Some(dir.path().join("pids/racecar.pid")),
            ..Cli::default()
        };
        Self {
            dir,
            registry: ConsumerRegistry::builtin(),
            cli,
            journal: Journal::default(),
            resumed: false,
            banner: Vec::new(),
            result: None,
        }
    }

    fn pidfile(&self) -> PathBuf {
        self.dir.path().join("pids/racecar.pid")
    }

    fn logfile(&self) -> PathBuf {
        self.dir.path().join("racecar.log")
    }

    fn seed_pidfile(&self, content: &str) {
        let path = self.pidfile();
        fs::create_dir_all(path.parent().expect("pidfile parent")).expect("create pid dir");
        fs::write(path, content).expect("seed pidfile");
    }

    fn launch(&mut self) {
        let launcher = Launcher::new(
            self.registry.clone(),
            RecordingDaemonizer {
                journal: self.journal.clone(),
                resumed: self.resumed,
            },
            RecordingRedirector(self.journal.clone()),
            RecordingRuntime {
                journal: self.journal.clone(),
                pidfile: self.pidfile(),
            },
        );
        let result = launcher.launch(&self.cli, &mut self.banner);
        self.result = Some(result);
    }

    fn banner_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.banner)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn error(&self) -> &LaunchError {
        match &self.result {
            Some(Err(error)) => error,
            other => panic!("expected a launch error, got {other:?}"),
        }
    }
}

#[fixture]
fn world() -> RefCell<LauncherWorld> {
    RefCell::new(LauncherWorld::new())
}

#[given("a launcher with recording collaborators")]
fn given_launcher(world: &RefCell<LauncherWorld>) {
    let _ = world;
}

#[given("the consumer \"{name}\" is requested")]
fn given_consumer(world: &RefCell<LauncherWorld>, name: String) {
    world.borrow_mut().cli.consumer = Some(name);
}

#[given("a registered consumer \"{name}\" without subscriptions")]
fn given_silent_consumer(world: &RefCell<LauncherWorld>, name: String) {
    world
        .borrow_mut()
        .registry
        .register(ConsumerSpec::new(name), silent);
}

#[given("the daemonize flag is set")]
fn given_daemonize(world: &RefCell<LauncherWorld>) {
    world.borrow_mut().cli.daemonize = true;
}

#[given("a log file is configured")]
fn given_logfile(world: &RefCell<LauncherWorld>) {
    let logfile = world.borrow().logfile();
    world.borrow_mut().cli.log = Some(logfile);
}

#[given("a log file in a missing directory is configured")]
fn given_unopenable_logfile(world: &RefCell<LauncherWorld>) {
    let logfile = world.borrow().dir.path().join("missing/racecar.log");
    world.borrow_mut().cli.log = Some(logfile);
}

#[given("the launch resumes in a spawned child")]
fn given_resumed_child(world: &RefCell<LauncherWorld>) {
    world.borrow_mut().resumed = true;
}

#[given("the pidfile records a live process")]
fn given_live_pidfile(world: &RefCell<LauncherWorld>) {
    world.borrow().seed_pidfile(&process::id().to_string());
}

#[given("the pidfile holds stale content")]
fn given_stale_pidfile(world: &RefCell<LauncherWorld>) {
    world.borrow().seed_pidfile("not-a-pid\n");
}

#[when("the launcher runs")]
fn when_launcher_runs(world: &RefCell<LauncherWorld>) {
    world.borrow_mut().launch();
}

#[then("the launch succeeds")]
fn then_launch_succeeds(world: &RefCell<LauncherWorld>) {
    let binding = world.borrow();
    let result = binding.result.as_ref().expect("launch should have run");
    assert!(result.is_ok(), "launch should succeed: {result:?}");
}

#[then("the launch fails with \"{message}\"")]
fn then_launch_fails(world: &RefCell<LauncherWorld>, message: String) {
    let binding = world.borrow();
    let rendered = binding.error().to_string();
    assert!(
        rendered.contains(&message),
        "error '{rendered}' should mention '{message}'"
    );
}

#[then("nothing was detached")]
fn then_nothing_detached(world: &RefCell<LauncherWorld>) {
    let steps = world.borrow().journal.steps();
    assert!(
        !steps.contains(&Step::Detach),
        "unexpected detach in {steps:?}"
    );
}

#[then("the runtime never ran")]
fn then_runtime_idle(world: &RefCell<LauncherWorld>) {
    let steps = world.borrow().journal.steps();
    assert!(steps.is_empty(), "unexpected steps {steps:?}");
}

#[then("the pidfile still records the live process")]
fn then_pidfile_untouched(world: &RefCell<LauncherWorld>) {
    assert_eq!(read_pid(&world.borrow().pidfile()), Some(process::id()));
}

#[then("no pidfile was written")]
fn then_no_pidfile(world: &RefCell<LauncherWorld>) {
    assert!(!world.borrow().pidfile().exists());
}

#[then("the banner shows the foreground startup")]
fn then_foreground_banner(world: &RefCell<LauncherWorld>) {
    assert_eq!(
        world.borrow().banner_lines(),
        [
            "=> Starting Racecar consumer EchoConsumer...",
            "=> Wrooooom!",
            "=> Ctrl-C to shutdown consumer",
            "=> Shut down",
        ]
    );
}

#[then("the banner shows the background startup")]
fn then_background_banner(world: &RefCell<LauncherWorld>) {
    let binding = world.borrow();
    let expected = vec![
        "=> Starting Racecar consumer EchoConsumer...".to_owned(),
        format!("=> Logging to {}", binding.logfile().display()),
        "=> Wrooooom!".to_owned(),
        "=> Starting background process".to_owned(),
        format!("=> Writing PID to {}", binding.pidfile().display()),
        "=> Shut down".to_owned(),
    ];
    assert_eq!(binding.banner_lines(), expected);
}

#[then("the banner shows only the lines after detaching")]
fn then_resumed_banner(world: &RefCell<LauncherWorld>) {
    assert_eq!(world.borrow().banner_lines(), ["=> Shut down"]);
}

#[then("the banner stops before the background startup")]
fn then_banner_before_background(world: &RefCell<LauncherWorld>) {
    let lines = world.borrow().banner_lines();
    assert_eq!(lines.last().map(String::as_str), Some("=> Wrooooom!"));
}

#[then("the launch steps ran in daemon order")]
fn then_daemon_order(world: &RefCell<LauncherWorld>) {
    let binding = world.borrow();
    let kinds: Vec<&str> = binding
        .journal
        .steps()
        .iter()
        .map(|step| match step {
            Step::Detach => "detach",
            Step::Redirect(_) => "redirect",
            Step::Run { .. } => "run",
        })
        .collect();
    assert_eq!(kinds, ["detach", "redirect", "run"]);
}

#[then("output was redirected to the log file")]
fn then_redirected_to_log(world: &RefCell<LauncherWorld>) {
    let binding = world.borrow();
    let target = OutputRedirectionTarget::RedirectedTo(binding.logfile());
    assert!(binding.journal.steps().contains(&Step::Redirect(target)));
}

#[then("the runtime saw this process in the pidfile")]
fn then_runtime_saw_pid(world: &RefCell<LauncherWorld>) {
    let steps = world.borrow().journal.steps();
    assert!(
        steps.contains(&Step::Run {
            recorded_pid: Some(process::id())
        }),
        "runtime should observe its own pid, saw {steps:?}"
    );
}

#[then("the pidfile is removed after shutdown")]
fn then_pidfile_removed(world: &RefCell<LauncherWorld>) {
    assert!(!world.borrow().pidfile().exists());
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "Launching without a consumer name fails"
)]
fn missing_consumer(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "Launching an unknown consumer fails before detaching"
)]
fn unknown_consumer(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "Invalid consumer configuration is reported"
)]
fn invalid_configuration(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "A live recorded process blocks a daemonized launch"
)]
fn already_running(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "Foreground launch runs the consumer attached"
)]
fn foreground_launch(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "Daemonized launch detaches before recording its pid"
)]
fn daemonized_launch(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "A stale pidfile does not block a daemonized launch"
)]
fn stale_pidfile(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "An unopenable log destination fails before detaching"
)]
fn unopenable_log_destination(world: RefCell<LauncherWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/launcher.feature",
    name = "A resumed child skips the banner its parent printed"
)]
fn resumed_child(world: RefCell<LauncherWorld>) {
    drop(world);
}
