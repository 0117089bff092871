use std::time::{Duration, Instant};

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel, Variable,
    constraint, default_solver, variable,
};
use log::{info, warn};

use crate::config::SolverConfig;
use crate::data::SolveStatus;
use crate::error::EngineError;
use crate::linear::{LinearExpr, LinearModel, Sense};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// One value per model variable.
    Solved {
        values: Vec<f64>,
        status: SolveStatus,
    },
    Infeasible,
    /// The time budget ran out before any feasible assignment was found.
    BudgetExhausted,
}

/// Anything able to maximise a [`LinearModel`] over binary variables.
pub trait SolvingEngine {
    fn solve(&self, model: &LinearModel) -> Result<EngineOutcome, EngineError>;

    /// Wall-clock budget the engine was given, if any.
    fn time_limit(&self) -> Option<Duration> {
        None
    }
}

/// Solves with the HiGHS MILP solver through `good_lp`.
#[derive(Debug, Clone)]
pub struct HighsEngine {
    threads: u32,
    random_seed: i32,
    log_to_console: bool,
    time_limit: Option<Duration>,
}

impl HighsEngine {
    pub fn new(config: &SolverConfig) -> HighsEngine {
        HighsEngine {
            threads: config.threads.max(1),
            random_seed: config.random_seed,
            log_to_console: config.log_to_console,
            time_limit: config.time_limit(),
        }
    }
}

impl HighsEngine {
    /// Interprets what HiGHS handed back, using the status it reported.
    fn outcome(
        &self,
        model: &LinearModel,
        values: Vec<f64>,
        reported: SolutionStatus,
    ) -> Result<EngineOutcome, EngineError> {
        let stopped_early = matches!(reported, SolutionStatus::TimeLimit);

        // HiGHS hands back whatever it has when the time limit hits, even
        // without an incumbent, so the assignment has to be checked.
        if let Some(violated) = model.first_violation(&values) {
            if stopped_early || self.time_limit.is_some() {
                warn!(
                    "Solver stopped without a feasible assignment (violates `{}`).",
                    violated
                );
                return Ok(EngineOutcome::BudgetExhausted);
            }
            return Err(EngineError::InconsistentSolution {
                constraint: violated.to_string(),
            });
        }

        let status = if stopped_early {
            SolveStatus::TimeLimited
        } else {
            SolveStatus::Optimal
        };
        Ok(EngineOutcome::Solved { values, status })
    }
}

impl Default for HighsEngine {
    fn default() -> Self {
        HighsEngine::new(&SolverConfig::default())
    }
}

fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    let terms: Expression = expr
        .terms
        .iter()
        .map(|(v, c)| *c * vars[v.index()])
        .sum();
    terms + expr.constant
}

impl SolvingEngine for HighsEngine {
    fn solve(&self, model: &LinearModel) -> Result<EngineOutcome, EngineError> {
        let mut problem = ProblemVariables::new();
        let vars = problem.add_vector(variable().binary(), model.num_vars());

        let mut highs = problem
            .maximise(to_expression(model.objective(), &vars))
            .using(default_solver)
            .set_option("threads", self.threads as i32)
            .set_option("random_seed", self.random_seed)
            .set_option("log_to_console", self.log_to_console);
        if let Some(limit) = self.time_limit {
            highs = highs.set_option("time_limit", limit.as_secs_f64());
        }

        for c in model.constraints() {
            let lhs = to_expression(&c.expr, &vars);
            let rhs = c.rhs;
            match c.sense {
                Sense::Le => highs.add_constraint(constraint!(lhs <= rhs)),
                Sense::Ge => highs.add_constraint(constraint!(lhs >= rhs)),
                Sense::Eq => highs.add_constraint(constraint!(lhs == rhs)),
            };
        }

        info!(
            "Starting HiGHS on {} variables and {} constraints...",
            model.num_vars(),
            model.constraints().len()
        );
        let start_time = Instant::now();
        let solution = match highs.solve() {
            Ok(s) => s,
            // every variable is bounded, so "unbounded" can only come from
            // an unbounded-or-infeasible verdict
            Err(ResolutionError::Infeasible | ResolutionError::Unbounded) => {
                return Ok(EngineOutcome::Infeasible);
            }
            Err(e) => return Err(EngineError::Resolution(e.to_string())),
        };
        let reported = solution.status();
        info!(
            "HiGHS finished in {:.2?} ({:?}).",
            start_time.elapsed(),
            reported
        );

        let values: Vec<f64> = vars.iter().map(|v| solution.value(*v)).collect();
        self.outcome(model, values, reported)
    }

    fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::ConstraintFamily;

    fn pick_one() -> LinearModel {
        let mut model = LinearModel::new();
        let x = model.add_binary("x");
        let y = model.add_binary("y");
        let mut objective = LinearExpr::zero();
        objective.add_term(x, 1.0).add_term(y, 2.0);
        model.set_objective(objective);
        model.add_constraint(
            ConstraintFamily::SlotExclusivity,
            "one",
            LinearExpr::sum_of([x, y]),
            Sense::Le,
            1.0,
        );
        model
    }

    #[test]
    fn test_highs_maximises() {
        let outcome = HighsEngine::default().solve(&pick_one()).unwrap();
        match outcome {
            EngineOutcome::Solved { values, status } => {
                assert_eq!(status, SolveStatus::Optimal);
                assert!(values[0] < 0.5);
                assert!(values[1] > 0.5);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    fn limited(secs: f64) -> HighsEngine {
        HighsEngine::new(&SolverConfig {
            time_limit_secs: Some(secs),
            ..SolverConfig::default()
        })
    }

    #[test]
    fn test_limited_run_that_finishes_is_optimal() {
        let outcome = limited(60.0).solve(&pick_one()).unwrap();
        assert!(matches!(
            outcome,
            EngineOutcome::Solved { status: SolveStatus::Optimal, .. }
        ));
    }

    #[test]
    fn test_status_follows_the_solver_not_the_clock() {
        let model = pick_one();
        let engine = limited(5.0);

        let finished = engine
            .outcome(&model, vec![0.0, 1.0], SolutionStatus::Optimal)
            .unwrap();
        assert_eq!(
            finished,
            EngineOutcome::Solved { values: vec![0.0, 1.0], status: SolveStatus::Optimal }
        );

        let cut_short = engine
            .outcome(&model, vec![1.0, 0.0], SolutionStatus::TimeLimit)
            .unwrap();
        assert_eq!(
            cut_short,
            EngineOutcome::Solved { values: vec![1.0, 0.0], status: SolveStatus::TimeLimited }
        );

        let nothing_found = engine
            .outcome(&model, vec![1.0, 1.0], SolutionStatus::TimeLimit)
            .unwrap();
        assert_eq!(nothing_found, EngineOutcome::BudgetExhausted);
    }

    #[test]
    fn test_bad_assignment_without_limit_is_an_error() {
        let err = HighsEngine::default()
            .outcome(&pick_one(), vec![1.0, 1.0], SolutionStatus::Optimal)
            .unwrap_err();
        assert!(matches!(err, EngineError::InconsistentSolution { constraint } if constraint == "one"));
    }

    #[test]
    fn test_highs_reports_infeasibility() {
        let mut model = pick_one();
        let both = LinearExpr::sum_of(model.objective().terms.iter().map(|(v, _)| *v));
        model.add_constraint(ConstraintFamily::SlotCount, "both", both, Sense::Eq, 2.0);
        assert_eq!(
            HighsEngine::default().solve(&model).unwrap(),
            EngineOutcome::Infeasible
        );
    }
}
