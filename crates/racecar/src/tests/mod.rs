//! Test suites for the Racecar launcher.

mod launch_behaviour;
mod support;
