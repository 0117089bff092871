use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::decode::Timetable;

// Type aliases for clarity
pub type SectionId = String;
pub type ClassroomId = String;
pub type InstructorId = String;
pub type SlotId = String;

/// One row of the section table, as it arrives on the wire.
///
/// Numeric fields are kept raw here; [`crate::catalog::Catalog`] checks them
/// against the allowed values before any model is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRow {
    pub id: SectionId,
    pub duration_minutes: u32,
    pub frequency: u32,
    pub semester: String,
    pub instructor: InstructorId,
    /// Preference score for every time slot, keyed by slot id.
    pub preferences: BTreeMap<SlotId, f64>,
}

/// Represents a bookable room.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassroomRow {
    pub id: ClassroomId,
}

/// Represents a bookable period within a day.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeSlotRow {
    pub id: SlotId,
    /// Wall-clock label, only used for output rows.
    pub time: String,
}

/// The three input tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    pub sections: Vec<SectionRow>,
    pub classrooms: Vec<ClassroomRow>,
    pub timeslots: Vec<TimeSlotRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Represents a single scheduled meeting of a section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub section_id: SectionId,
    pub weekday: Weekday,
    pub classroom_id: ClassroomId,
    pub slot_id: SlotId,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} in {} at slot {}",
            self.section_id, self.weekday, self.classroom_id, self.slot_id
        )
    }
}

/// Whether the engine proved the returned assignment optimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveStatus {
    Optimal,
    /// Feasible incumbent returned when the time limit ran out.
    TimeLimited,
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutput {
    pub timetable: Timetable,
    pub placements: Vec<Placement>,
    pub objective: f64,
    pub status: SolveStatus,
    pub unscheduled: Vec<SectionId>,
}
