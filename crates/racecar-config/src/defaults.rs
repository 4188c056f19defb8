/// Broker address used when no brokers are configured.
pub const DEFAULT_BROKER: &str = "localhost:9092";

/// Client identifier reported to the broker.
pub const DEFAULT_CLIENT_ID: &str = "racecar";

/// Pidfile location, relative to the invocation directory.
pub const DEFAULT_PIDFILE: &str = "tmp/pids/racecar.pid";

/// Configuration file consulted when `--config-path` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "config/racecar.yml";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Broker list used when neither the file nor the command line name one.
#[must_use]
pub fn default_brokers() -> Vec<String> {
    vec![DEFAULT_BROKER.to_owned()]
}
