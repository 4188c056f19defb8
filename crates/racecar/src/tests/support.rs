//! Recording doubles for the launcher's process collaborators.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use racecar_config::{ConsumerConfig, LifecycleConfig, OutputRedirectionTarget};
use racecar_process::{DaemonizeError, Daemonizer, OutputRedirector, RedirectError};

use crate::consumer::Consumer;
use crate::errors::LaunchError;
use crate::runtime::ConsumerRuntime;

/// A collaborator call observed during a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Detach,
    Redirect(OutputRedirectionTarget),
    Run { recorded_pid: Option<u32> },
}

/// Ordered log shared by all doubles of one launch.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Rc<RefCell<Vec<Step>>>);

impl Journal {
    fn record(&self, step: Step) {
        self.0.borrow_mut().push(step);
    }

    pub(crate) fn steps(&self) -> Vec<Step> {
        self.0.borrow().clone()
    }
}

/// Daemoniser double; `resumed` plays the part of a spawned child.
pub(crate) struct RecordingDaemonizer {
    pub(crate) journal: Journal,
    pub(crate) resumed: bool,
}

impl Daemonizer for RecordingDaemonizer {
    fn detach(&self, _config: &LifecycleConfig) -> Result<(), DaemonizeError> {
        self.journal.record(Step::Detach);
        Ok(())
    }

    fn resumed(&self) -> bool {
        self.resumed
    }
}

pub(crate) struct RecordingRedirector(pub(crate) Journal);

impl OutputRedirector for RecordingRedirector {
    fn apply(&self, target: &OutputRedirectionTarget) -> Result<(), RedirectError> {
        self.0.record(Step::Redirect(target.clone()));
        Ok(())
    }
}

/// Runtime that returns at once, noting what the pidfile held while running.
pub(crate) struct RecordingRuntime {
    pub(crate) journal: Journal,
    pub(crate) pidfile: PathBuf,
}

impl ConsumerRuntime for RecordingRuntime {
    fn run(
        &self,
        mut consumer: Box<dyn Consumer>,
        config: &ConsumerConfig,
    ) -> Result<(), LaunchError> {
        consumer.start(config)?;
        self.journal.record(Step::Run {
            recorded_pid: read_pid(&self.pidfile),
        });
        consumer.stop();
        Ok(())
    }
}

pub(crate) fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
