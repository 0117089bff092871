use std::time::Duration;

use thiserror::Error;

use crate::data::Weekday;

/// Rows of the input tables that break the data contract.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{table} table contains an empty identifier")]
    EmptyId { table: &'static str },

    #[error("{table} table contains duplicate identifier `{id}`")]
    DuplicateId { table: &'static str, id: String },

    #[error("section `{section}` has duration {minutes} minutes, expected 90 or 180")]
    InvalidDuration { section: String, minutes: u32 },

    #[error("section `{section}` meets {frequency} times a week, expected 1 or 2")]
    InvalidFrequency { section: String, frequency: u32 },

    #[error("section `{section}` has semester span `{value}`, expected first, second or full")]
    InvalidSemester { section: String, value: String },

    #[error("section `{section}` has no instructor")]
    MissingInstructor { section: String },

    #[error("section `{section}` has no preference score for slot `{slot}`")]
    MissingPreference { section: String, slot: String },

    #[error("section `{section}` has a non-finite preference score for slot `{slot}`")]
    InvalidPreference { section: String, slot: String },
}

/// Failures of the solving engine other than infeasibility.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("solver error: {0}")]
    Resolution(String),

    #[error("solver returned an assignment violating constraint `{constraint}`")]
    InconsistentSolution { constraint: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} variable values, got {got}")]
    ValueCount { expected: usize, got: usize },

    #[error(
        "classroom `{classroom}` is double-booked on {weekday} at slot `{slot}` by `{first}` and `{second}`"
    )]
    DoubleBooked {
        classroom: String,
        weekday: Weekday,
        slot: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error("no schedule exists: the model is proven infeasible")]
    Infeasible,

    #[error("no feasible schedule found before the time limit ({}); grant more time", format_limit(.limit))]
    BudgetExhausted { limit: Option<Duration> },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("could not decode solution: {0}")]
    Decode(#[from] DecodeError),
}

fn format_limit(limit: &Option<Duration>) -> String {
    match limit {
        Some(limit) => format!("{:.2?}", limit),
        None => "unbounded".to_string(),
    }
}
