use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::SchedulingPolicy;

/// Knobs for one solve. Every field has a default, so `{}` is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    /// Wall-clock budget for the solver. `None` runs to optimality.
    pub time_limit_secs: Option<f64>,
    pub threads: u32,
    pub random_seed: i32,
    /// Forward the solver's own log to stdout.
    pub log_to_console: bool,
    pub allow_unscheduled: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit_secs: None,
            threads: 1,         // limit to 1 thread for reproducibility
            random_seed: 1234,  // set seed for reproducibility
            log_to_console: false,
            allow_unscheduled: false,
        }
    }
}

impl SolverConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn policy(&self) -> SchedulingPolicy {
        if self.allow_unscheduled {
            SchedulingPolicy::AllowUnscheduled
        } else {
            SchedulingPolicy::RequireAll
        }
    }
}
