//! Translates a [`Catalog`] into a 0/1 linear program.
//!
//! The ground-truth variables are `x[section, weekday, classroom, slot]`.
//! Every other variable is an indicator tied to an OR over some axis of `x`
//! with the pair of inequalities
//!
//! ```text
//! eps * sum(x) - y <= 0
//!       sum(x) - y >= 0
//! ```
//!
//! With `eps = 1 / (F + 1)`, where `F` is the widest sum any indicator is
//! linked to, the first inequality holds with `y = 1` for every reachable
//! sum and forces `y = 1` as soon as one term is set.

use itertools::iproduct;
use log::warn;

use crate::catalog::{Catalog, Frequency};
use crate::data::{Placement, Weekday};
use crate::linear::{ConstraintFamily, LinearExpr, LinearModel, Sense, VarId};

const DAYS: usize = Weekday::ALL.len();

/// Below this, the linkage coefficient gets close to solver tolerances.
const SMALLEST_SAFE_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingPolicy {
    /// Every section must be placed; an over-full catalog is infeasible.
    #[default]
    RequireAll,
    /// Sections may be left out, which the objective then pays for.
    AllowUnscheduled,
}

/// One `x` variable's coordinates, as indices into the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub section: usize,
    pub weekday: Weekday,
    pub classroom: usize,
    pub slot: usize,
}

#[derive(Debug)]
pub struct TimetableModel<'a> {
    catalog: &'a Catalog,
    policy: SchedulingPolicy,
    linear: LinearModel,
    epsilon: f64,
    assign: Vec<VarId>,
    day_used: Vec<VarId>,
    slot_used: Vec<VarId>,
    room_used: Vec<VarId>,
    pattern: Vec<Option<VarId>>,
    scheduled: Option<Vec<VarId>>,
}

impl<'a> TimetableModel<'a> {
    pub fn build(catalog: &'a Catalog, policy: SchedulingPolicy) -> TimetableModel<'a> {
        let mut builder = TimetableModel::declare(catalog, policy);
        builder.set_objective();
        builder.link_indicators();
        builder.add_count_constraints();
        builder.add_pattern_constraints();
        builder.add_room_uniqueness();
        builder.add_slot_exclusivity();
        builder.add_instructor_exclusivity();
        builder.add_semester_overlap();
        builder
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    pub fn linear(&self) -> &LinearModel {
        &self.linear
    }

    /// Coefficient used on the `sum(x) <= y` side of every indicator link.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Widest OR any indicator is linked to.
    pub fn max_fan_in(catalog: &Catalog) -> usize {
        let rooms = catalog.classrooms.len();
        let slots = catalog.slots.len();
        (DAYS * rooms).max(rooms * slots).max(DAYS * slots)
    }

    pub fn assignment(&self, cell: Cell) -> VarId {
        self.assign[self.cell_index(cell)]
    }

    /// Every `x` variable with its coordinates.
    pub fn assignments(&self) -> impl Iterator<Item = (Cell, VarId)> + '_ {
        let c = self.catalog;
        iproduct!(
            0..c.sections.len(),
            Weekday::ALL,
            0..c.classrooms.len(),
            0..c.slots.len()
        )
        .map(move |(section, weekday, classroom, slot)| {
            let cell = Cell {
                section,
                weekday,
                classroom,
                slot,
            };
            (cell, self.assignment(cell))
        })
    }

    pub fn cell_for(&self, placement: &Placement) -> Option<Cell> {
        Some(Cell {
            section: self.catalog.section_index(&placement.section_id)?,
            weekday: placement.weekday,
            classroom: self.catalog.classroom_index(&placement.classroom_id)?,
            slot: self.catalog.slot_index(&placement.slot_id)?,
        })
    }

    /// Full variable assignment implied by a set of occupied cells: `x` is 1
    /// exactly on those cells and each indicator takes the value its linkage
    /// forces.
    pub fn values_for(&self, cells: &[Cell]) -> Vec<f64> {
        let mut values = vec![0.0; self.linear.num_vars()];
        let c = self.catalog;
        for cell in cells {
            let s = cell.section;
            let d = cell.weekday.index();
            values[self.assignment(*cell).index()] = 1.0;
            values[self.day_used[s * DAYS + d].index()] = 1.0;
            values[self.slot_used[s * c.slots.len() + cell.slot].index()] = 1.0;
            values[self.room_used[s * c.classrooms.len() + cell.classroom].index()] = 1.0;
            if let Some(scheduled) = &self.scheduled {
                values[scheduled[s].index()] = 1.0;
            }
        }
        for (s, pattern) in self.pattern.iter().enumerate() {
            if let Some(z) = pattern {
                let mon = values[self.day_used[s * DAYS + Weekday::Monday.index()].index()];
                let wed = values[self.day_used[s * DAYS + Weekday::Wednesday.index()].index()];
                if mon + wed > 0.0 {
                    values[z.index()] = 1.0;
                }
            }
        }
        values
    }

    fn cell_index(&self, cell: Cell) -> usize {
        let c = self.catalog;
        ((cell.section * DAYS + cell.weekday.index()) * c.classrooms.len() + cell.classroom)
            * c.slots.len()
            + cell.slot
    }

    fn declare(catalog: &'a Catalog, policy: SchedulingPolicy) -> TimetableModel<'a> {
        let mut linear = LinearModel::new();
        let c = catalog;

        let assign = iproduct!(
            c.sections.iter(),
            Weekday::ALL,
            c.classrooms.iter(),
            c.slots.iter()
        )
        .map(|(section, day, room, slot)| {
            linear.add_binary(format!(
                "x#{}#{}#{}#{}",
                lp_name(&section.id),
                day.short_name(),
                lp_name(room),
                lp_name(&slot.id)
            ))
        })
        .collect();

        let day_used = iproduct!(c.sections.iter(), Weekday::ALL)
            .map(|(section, day)| {
                linear.add_binary(format!("day#{}#{}", lp_name(&section.id), day.short_name()))
            })
            .collect();

        let slot_used = iproduct!(c.sections.iter(), c.slots.iter())
            .map(|(section, slot)| {
                linear.add_binary(format!("slot#{}#{}", lp_name(&section.id), lp_name(&slot.id)))
            })
            .collect();

        let room_used = iproduct!(c.sections.iter(), c.classrooms.iter())
            .map(|(section, room)| {
                linear.add_binary(format!("room#{}#{}", lp_name(&section.id), lp_name(room)))
            })
            .collect();

        let pattern = c
            .sections
            .iter()
            .map(|section| match section.frequency {
                Frequency::Twice => {
                    Some(linear.add_binary(format!("mw#{}", lp_name(&section.id))))
                }
                Frequency::Once => None,
            })
            .collect();

        let scheduled = match policy {
            SchedulingPolicy::RequireAll => None,
            SchedulingPolicy::AllowUnscheduled => Some(
                c.sections
                    .iter()
                    .map(|section| linear.add_binary(format!("on#{}", lp_name(&section.id))))
                    .collect(),
            ),
        };

        let epsilon = 1.0 / (Self::max_fan_in(catalog) as f64 + 1.0);
        if epsilon < SMALLEST_SAFE_EPSILON {
            warn!(
                "Indicator linkage coefficient {:e} is close to solver tolerances; the model may admit spurious indicators.",
                epsilon
            );
        }

        TimetableModel {
            catalog,
            policy,
            linear,
            epsilon,
            assign,
            day_used,
            slot_used,
            room_used,
            pattern,
            scheduled,
        }
    }

    fn set_objective(&mut self) {
        let mut objective = LinearExpr::zero();
        for (cell, var) in self.assignments() {
            objective.add_term(var, self.catalog.sections[cell.section].preferences[cell.slot]);
        }
        self.linear.set_objective(objective);
    }

    /// Right-hand side `k` of a count constraint, or `k * scheduled[s]`.
    fn times_scheduled(&self, section: usize, k: f64) -> (LinearExpr, f64) {
        match &self.scheduled {
            Some(scheduled) => {
                let mut expr = LinearExpr::zero();
                expr.add_term(scheduled[section], -k);
                (expr, 0.0)
            }
            None => (LinearExpr::zero(), k),
        }
    }

    fn link(&mut self, name: String, indicator: VarId, ors: Vec<VarId>) {
        let mut upper = LinearExpr::sum_of(ors.iter().copied()).scale(self.epsilon);
        upper.add_term(indicator, -1.0);
        self.linear.add_constraint(
            ConstraintFamily::IndicatorLinkage,
            format!("{}#up", name),
            upper,
            Sense::Le,
            0.0,
        );

        let mut lower = LinearExpr::sum_of(ors);
        lower.add_term(indicator, -1.0);
        self.linear.add_constraint(
            ConstraintFamily::IndicatorLinkage,
            format!("{}#lo", name),
            lower,
            Sense::Ge,
            0.0,
        );
    }

    fn link_indicators(&mut self) {
        let c = self.catalog;
        let (rooms, slots) = (c.classrooms.len(), c.slots.len());

        for s in 0..c.sections.len() {
            for l in 0..slots {
                let ors = iproduct!(Weekday::ALL, 0..rooms)
                    .map(|(weekday, k)| self.x(s, weekday, k, l))
                    .collect();
                let name = self.linear.var_name(self.slot_used[s * slots + l]).to_string();
                self.link(name, self.slot_used[s * slots + l], ors);
            }

            for weekday in Weekday::ALL {
                let ors = iproduct!(0..rooms, 0..slots)
                    .map(|(k, l)| self.x(s, weekday, k, l))
                    .collect();
                let indicator = self.day_used[s * DAYS + weekday.index()];
                let name = self.linear.var_name(indicator).to_string();
                self.link(name, indicator, ors);
            }

            for k in 0..rooms {
                let ors = iproduct!(Weekday::ALL, 0..slots)
                    .map(|(weekday, l)| self.x(s, weekday, k, l))
                    .collect();
                let name = self.linear.var_name(self.room_used[s * rooms + k]).to_string();
                self.link(name, self.room_used[s * rooms + k], ors);
            }
        }
    }

    fn add_count_constraints(&mut self) {
        let c = self.catalog;
        let slots = c.slots.len();

        for (s, section) in c.sections.iter().enumerate() {
            let required = section.duration.slots_required() as f64;
            let (rhs_vars, rhs) = self.times_scheduled(s, required);
            let mut expr = LinearExpr::sum_of(self.slot_used[s * slots..(s + 1) * slots].iter().copied());
            expr.terms.extend(rhs_vars.terms);
            self.linear.add_constraint(
                ConstraintFamily::SlotCount,
                format!("slots#{}", lp_name(&section.id)),
                expr,
                Sense::Eq,
                rhs,
            );

            let meetings = section.frequency.meetings() as f64;
            let (rhs_vars, rhs) = self.times_scheduled(s, meetings);
            let mut expr = LinearExpr::sum_of(self.day_used[s * DAYS..(s + 1) * DAYS].iter().copied());
            expr.terms.extend(rhs_vars.terms);
            self.linear.add_constraint(
                ConstraintFamily::DayCount,
                format!("days#{}", lp_name(&section.id)),
                expr,
                Sense::Eq,
                rhs,
            );
        }
    }

    /// Twice-weekly sections meet Monday/Wednesday (`z = 1`) or
    /// Tuesday/Thursday (`z = 0`).
    fn add_pattern_constraints(&mut self) {
        let c = self.catalog;
        for (s, section) in c.sections.iter().enumerate() {
            let Some(z) = self.pattern[s] else {
                continue;
            };
            let day = |weekday: Weekday| self.day_used[s * DAYS + weekday.index()];

            let mut mon_wed = LinearExpr::sum_of([day(Weekday::Monday), day(Weekday::Wednesday)]);
            mon_wed.add_term(z, -2.0);

            let mut tue_thu = LinearExpr::sum_of([day(Weekday::Tuesday), day(Weekday::Thursday)]);
            tue_thu.add_term(z, 2.0);
            let (rhs_vars, rhs) = self.times_scheduled(s, 2.0);
            tue_thu.terms.extend(rhs_vars.terms);

            self.linear.add_constraint(
                ConstraintFamily::MeetingPattern,
                format!("mw#{}", lp_name(&section.id)),
                mon_wed,
                Sense::Eq,
                0.0,
            );
            self.linear.add_constraint(
                ConstraintFamily::MeetingPattern,
                format!("tt#{}", lp_name(&section.id)),
                tue_thu,
                Sense::Eq,
                rhs,
            );
        }
    }

    fn add_room_uniqueness(&mut self) {
        let c = self.catalog;
        let rooms = c.classrooms.len();
        for (s, section) in c.sections.iter().enumerate() {
            let expr = LinearExpr::sum_of(self.room_used[s * rooms..(s + 1) * rooms].iter().copied());
            self.linear.add_constraint(
                ConstraintFamily::RoomUniqueness,
                format!("one_room#{}", lp_name(&section.id)),
                expr,
                Sense::Le,
                1.0,
            );
        }
    }

    fn add_slot_exclusivity(&mut self) {
        let c = self.catalog;
        for (weekday, k, l) in iproduct!(Weekday::ALL, 0..c.classrooms.len(), 0..c.slots.len()) {
            let expr = LinearExpr::sum_of((0..c.sections.len()).map(|s| self.x(s, weekday, k, l)));
            self.linear.add_constraint(
                ConstraintFamily::SlotExclusivity,
                format!(
                    "cell#{}#{}#{}",
                    weekday.short_name(),
                    lp_name(&c.classrooms[k]),
                    lp_name(&c.slots[l].id)
                ),
                expr,
                Sense::Le,
                1.0,
            );
        }
    }

    fn add_instructor_exclusivity(&mut self) {
        let c = self.catalog;
        for (instructor, sections) in &c.by_instructor {
            for (weekday, l) in iproduct!(Weekday::ALL, 0..c.slots.len()) {
                let expr = LinearExpr::sum_of(
                    iproduct!(sections.iter(), 0..c.classrooms.len())
                        .map(|(&s, k)| self.x(s, weekday, k, l)),
                );
                self.linear.add_constraint(
                    ConstraintFamily::InstructorExclusivity,
                    format!(
                        "teach#{}#{}#{}",
                        lp_name(instructor),
                        weekday.short_name(),
                        lp_name(&c.slots[l].id)
                    ),
                    expr,
                    Sense::Le,
                    1.0,
                );
            }
        }
    }

    /// A half-semester section never shares a cell with a full-semester one.
    fn add_semester_overlap(&mut self) {
        let c = self.catalog;
        for (&half, &full) in iproduct!(c.half_semester.iter(), c.full_semester.iter()) {
            for (weekday, k, l) in iproduct!(Weekday::ALL, 0..c.classrooms.len(), 0..c.slots.len()) {
                let expr = LinearExpr::sum_of([self.x(half, weekday, k, l), self.x(full, weekday, k, l)]);
                self.linear.add_constraint(
                    ConstraintFamily::SemesterOverlap,
                    format!(
                        "term#{}#{}#{}#{}#{}",
                        lp_name(&c.sections[half].id),
                        lp_name(&c.sections[full].id),
                        weekday.short_name(),
                        lp_name(&c.classrooms[k]),
                        lp_name(&c.slots[l].id)
                    ),
                    expr,
                    Sense::Le,
                    1.0,
                );
            }
        }
    }

    fn x(&self, section: usize, weekday: Weekday, classroom: usize, slot: usize) -> VarId {
        self.assignment(Cell {
            section,
            weekday,
            classroom,
            slot,
        })
    }
}

/// LP identifiers may not contain whitespace or operator characters. Distinct
/// ids can map to the same text; [`LinearModel`] suffixes such clashes.
fn lp_name(id: &str) -> String {
    id.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' { ch } else { '_' })
        .collect()
}
