//! Weekly course timetabling as a 0/1 integer program.
//!
//! [`solver::solve`] runs the whole pipeline: the input tables are validated
//! into a [`catalog::Catalog`], [`model::TimetableModel`] formulates the
//! assignment problem, a [`engine::SolvingEngine`] solves it once and
//! [`decode::decode`] projects the result onto a slot × (classroom, weekday)
//! grid.

pub mod catalog;
pub mod config;
pub mod data;
pub mod decode;
pub mod engine;
pub mod error;
pub mod linear;
pub mod model;
pub mod server;
pub mod solver;

pub use config::SolverConfig;
pub use data::{ScheduleOutput, SchedulingInput};
pub use error::ScheduleError;
pub use solver::{solve, solve_with};
