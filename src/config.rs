//! Runtime configuration for the recycler
//!
//! Everything is read once from the environment at startup and carried as an
//! immutable value through the rest of the process. Units follow the
//! deployment convention: `AGE_TO_KILL` is hours, `SLEEP_TIME` is minutes,
//! the remaining knobs are seconds.

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default label marking nodes as subject to age-based recycling
pub const DEFAULT_ELIGIBILITY_LABEL: &str = "cloud.google.com/gke-preemptible";

const DEFAULT_AGE_TO_KILL_HOURS: f64 = 12.0;
const DEFAULT_SLEEP_TIME_MINUTES: f64 = 10.0;
const DEFAULT_DRAIN_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_DRAIN_POLL_SECONDS: u64 = 10;
const DEFAULT_API_TIMEOUT_SECONDS: u64 = 30;

/// Immutable runtime configuration, constructed once in `main`
#[derive(Clone, Debug)]
pub struct Config {
    /// Nodes older than this are recycled
    pub age_to_kill: Duration,

    /// Pause between control-loop iterations
    pub sleep_time: Duration,

    /// Label identifying eligible (preemptible) nodes
    pub eligibility_label: String,

    /// Name of the pod running this controller
    pub pod_name: String,

    /// Namespace of the pod running this controller
    pub pod_namespace: String,

    /// GCE project override; resolved from the metadata server when unset
    pub gce_project: Option<String>,

    /// Upper bound on waiting for a drained node to quiesce
    pub drain_timeout: Duration,

    /// Pause between drain-confirmation polls
    pub drain_poll_interval: Duration,

    /// Timeout applied to every Kubernetes and GCE call
    pub api_timeout: Duration,

    /// Treat a failed self-lookup as "not my node" instead of aborting the
    /// cycle. Off by default: an unknown identity must block destruction.
    pub assume_not_self_on_lookup_failure: bool,
}

impl Config {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        let pod_name = require_var("POD_NAME")?;
        let pod_namespace = require_var("NAMESPACE")?;

        let age_hours = parse_float("AGE_TO_KILL", var("AGE_TO_KILL"), DEFAULT_AGE_TO_KILL_HOURS)?;
        let sleep_minutes =
            parse_float("SLEEP_TIME", var("SLEEP_TIME"), DEFAULT_SLEEP_TIME_MINUTES)?;

        Ok(Self {
            age_to_kill: Duration::from_secs_f64(age_hours * 3600.0),
            sleep_time: Duration::from_secs_f64(sleep_minutes * 60.0),
            eligibility_label: var("ELIGIBILITY_LABEL")
                .unwrap_or_else(|| DEFAULT_ELIGIBILITY_LABEL.to_string()),
            pod_name,
            pod_namespace,
            gce_project: var("GCE_PROJECT"),
            drain_timeout: Duration::from_secs(parse_seconds(
                "DRAIN_TIMEOUT_SECONDS",
                var("DRAIN_TIMEOUT_SECONDS"),
                DEFAULT_DRAIN_TIMEOUT_SECONDS,
            )?),
            drain_poll_interval: Duration::from_secs(parse_seconds(
                "DRAIN_POLL_SECONDS",
                var("DRAIN_POLL_SECONDS"),
                DEFAULT_DRAIN_POLL_SECONDS,
            )?),
            api_timeout: Duration::from_secs(parse_seconds(
                "API_TIMEOUT_SECONDS",
                var("API_TIMEOUT_SECONDS"),
                DEFAULT_API_TIMEOUT_SECONDS,
            )?),
            assume_not_self_on_lookup_failure: parse_bool(
                "ASSUME_NOT_SELF_ON_LOOKUP_FAILURE",
                var("ASSUME_NOT_SELF_ON_LOOKUP_FAILURE"),
                false,
            )?,
        })
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn require_var(name: &str) -> Result<String> {
    var(name).ok_or_else(|| Error::ConfigError(format!("{} not defined", name)))
}

fn parse_float(name: &str, raw: Option<String>, default: f64) -> Result<f64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("{} must be a number, got {:?}", name, raw)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::ConfigError(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(value)
}

fn parse_seconds(name: &str, raw: Option<String>, default: u64) -> Result<u64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    raw.trim().parse().map_err(|_| {
        Error::ConfigError(format!(
            "{} must be a whole number of seconds, got {:?}",
            name, raw
        ))
    })
}

fn parse_bool(name: &str, raw: Option<String>, default: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::ConfigError(format!(
            "{} must be true or false, got {:?}",
            name, other
        ))),
    }
}
