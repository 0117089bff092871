//! Solver-independent 0/1 linear program: variables, tagged constraints and a
//! maximization objective.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use itertools::Itertools;
use log::debug;

/// Absolute tolerance used when checking a value vector against the model.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Sum of the given variables, each with coefficient one.
    pub fn sum_of(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) -> &mut Self {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
        self
    }

    pub fn scale(mut self, k: f64) -> Self {
        self.constant *= k;
        for (_, c) in &mut self.terms {
            *c *= k;
        }
        self
    }

    pub fn value(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(v, c)| c * values[v.index()])
                .sum::<f64>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Sense::Le => lhs <= rhs + FEASIBILITY_TOLERANCE,
            Sense::Ge => lhs >= rhs - FEASIBILITY_TOLERANCE,
            Sense::Eq => (lhs - rhs).abs() <= FEASIBILITY_TOLERANCE,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        }
    }
}

/// Which timetabling rule a constraint encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintFamily {
    IndicatorLinkage,
    SlotCount,
    DayCount,
    MeetingPattern,
    RoomUniqueness,
    SlotExclusivity,
    InstructorExclusivity,
    SemesterOverlap,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintFamily::IndicatorLinkage => "link",
            ConstraintFamily::SlotCount => "slot_count",
            ConstraintFamily::DayCount => "day_count",
            ConstraintFamily::MeetingPattern => "pattern",
            ConstraintFamily::RoomUniqueness => "one_room",
            ConstraintFamily::SlotExclusivity => "cell",
            ConstraintFamily::InstructorExclusivity => "instructor",
            ConstraintFamily::SemesterOverlap => "semester",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub family: ConstraintFamily,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied_by(&self, values: &[f64]) -> bool {
        self.sense.holds(self.expr.value(values), self.rhs)
    }
}

/// A maximization problem over binary variables.
///
/// Variable names and constraint names are each kept unique: a name that is
/// already taken gets a `~2`, `~3`, ... suffix.
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    names: Vec<String>,
    taken_vars: HashSet<String>,
    taken_constraints: HashSet<String>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl LinearModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        let name = claim(&mut self.taken_vars, name.into());
        self.names.push(name);
        VarId(self.names.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        family: ConstraintFamily,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        // constants live on the right-hand side
        let rhs = rhs - expr.constant;
        let expr = LinearExpr {
            constant: 0.0,
            ..expr
        };
        self.constraints.push(Constraint {
            name: claim(&mut self.taken_constraints, name.into()),
            family,
            expr,
            sense,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.names[var.index()]
    }

    /// Variable names in declaration order.
    pub fn var_names(&self) -> &[String] {
        &self.names
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn family_counts(&self) -> BTreeMap<ConstraintFamily, usize> {
        self.constraints
            .iter()
            .map(|c| c.family)
            .counts()
            .into_iter()
            .collect()
    }

    /// First constraint the values break, if any. Each value must be within
    /// tolerance of 0 or 1; the constraints are then checked on the rounded
    /// assignment so per-value round-off does not add up across wide rows.
    pub fn first_violation(&self, values: &[f64]) -> Option<&str> {
        if let Some(i) = values
            .iter()
            .position(|v| v.abs().min((v - 1.0).abs()) > FEASIBILITY_TOLERANCE)
        {
            return Some(&self.names[i]);
        }
        let rounded: Vec<f64> = values.iter().map(|v| v.round()).collect();
        self.constraints
            .iter()
            .find(|c| !c.is_satisfied_by(&rounded))
            .map(|c| c.name.as_str())
    }

    /// Renders the model in CPLEX LP format.
    pub fn to_lp(&self) -> String {
        let mut out = String::from("Maximize\n obj: ");
        out.push_str(&self.fmt_expr(&self.objective));
        out.push_str("\nSubject To\n");
        for c in &self.constraints {
            out.push_str(&format!(
                " {}: {} {} {}\n",
                c.name,
                self.fmt_expr(&c.expr),
                c.sense.symbol(),
                fmt_num(c.rhs)
            ));
        }
        out.push_str("Binary\n");
        for name in &self.names {
            out.push_str(&format!(" {}\n", name));
        }
        out.push_str("End\n");
        out
    }

    fn fmt_expr(&self, e: &LinearExpr) -> String {
        let mut parts: Vec<String> = e
            .terms
            .iter()
            .map(|(v, c)| {
                let name = self.var_name(*v);
                if (c - 1.0).abs() < 1e-12 {
                    format!("+ {}", name)
                } else if (c + 1.0).abs() < 1e-12 {
                    format!("- {}", name)
                } else if *c < 0.0 {
                    format!("- {} {}", fmt_num(-c), name)
                } else {
                    format!("+ {} {}", fmt_num(*c), name)
                }
            })
            .collect();
        if parts.is_empty() {
            parts.push("0".to_string());
        }
        parts.join(" ")
    }
}

fn claim(taken: &mut HashSet<String>, name: String) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}~{}", name, n);
        if taken.insert(candidate.clone()) {
            debug!("Name `{}` is taken; using `{}`.", name, candidate);
            return candidate;
        }
        n += 1;
    }
}

fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{}", v)
    }
}
