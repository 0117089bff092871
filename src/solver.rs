use std::time::Instant;

use log::{info, trace};

use crate::catalog::Catalog;
use crate::config::SolverConfig;
use crate::data::{ScheduleOutput, SchedulingInput, SolveStatus};
use crate::decode::decode;
use crate::engine::{EngineOutcome, HighsEngine, SolvingEngine};
use crate::error::ScheduleError;
use crate::model::{SchedulingPolicy, TimetableModel};

/// Solves the timetabling problem using the HiGHS ILP solver.
pub fn solve(input: &SchedulingInput, config: &SolverConfig) -> Result<ScheduleOutput, ScheduleError> {
    solve_with(input, config, &HighsEngine::new(config))
}

/// Validates the tables, builds the model, hands it to `engine` once and
/// decodes the result.
pub fn solve_with<E: SolvingEngine>(
    input: &SchedulingInput,
    config: &SolverConfig,
    engine: &E,
) -> Result<ScheduleOutput, ScheduleError> {
    let start_time = Instant::now();
    let catalog = Catalog::from_input(input)?;

    info!(
        "Setting up ILP model with {} sections, {} classrooms, and {} timeslots...",
        catalog.sections.len(),
        catalog.classrooms.len(),
        catalog.slots.len()
    );
    let model = TimetableModel::build(&catalog, config.policy());
    for (family, count) in model.linear().family_counts() {
        trace!("{} constraints of family '{}'", count, family);
    }
    info!(
        "Model has {} variables and {} constraints (linkage coefficient {:e}).",
        model.linear().num_vars(),
        model.linear().constraints().len(),
        model.epsilon()
    );

    if catalog.sections.is_empty() {
        let decoded = decode(&model, &[])?;
        return Ok(ScheduleOutput {
            timetable: decoded.timetable,
            placements: decoded.placements,
            objective: 0.0,
            status: SolveStatus::Optimal,
            unscheduled: decoded.unscheduled,
        });
    }
    if (catalog.classrooms.is_empty() || catalog.slots.is_empty())
        && model.policy() == SchedulingPolicy::RequireAll
    {
        info!("No classroom or slot to place sections in; the model is infeasible.");
        return Err(ScheduleError::Infeasible);
    }

    let (values, status) = match engine.solve(model.linear())? {
        EngineOutcome::Solved { values, status } => (values, status),
        EngineOutcome::Infeasible => return Err(ScheduleError::Infeasible),
        EngineOutcome::BudgetExhausted => {
            return Err(ScheduleError::BudgetExhausted {
                limit: engine.time_limit(),
            });
        }
    };
    info!("Solution ({:?}) found in {:.2?}", status, start_time.elapsed());

    let decoded = decode(&model, &values)?;
    if !decoded.unscheduled.is_empty() {
        info!(
            "{} section(s) left unscheduled: {}",
            decoded.unscheduled.len(),
            decoded.unscheduled.join(", ")
        );
    }

    Ok(ScheduleOutput {
        timetable: decoded.timetable,
        placements: decoded.placements,
        objective: decoded.objective,
        status,
        unscheduled: decoded.unscheduled,
    })
}
