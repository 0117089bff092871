//! Validated, indexed view of the three input tables.

use std::collections::HashSet;

use itertools::Itertools;
use log::warn;

use crate::data::{SchedulingInput, SectionRow};
use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duration {
    Minutes90,
    Minutes180,
}

impl Duration {
    /// Number of distinct slots a section of this length occupies.
    pub fn slots_required(self) -> u32 {
        match self {
            Duration::Minutes90 => 1,
            Duration::Minutes180 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Once,
    Twice,
}

impl Frequency {
    pub fn meetings(self) -> u32 {
        match self {
            Frequency::Once => 1,
            Frequency::Twice => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemesterSpan {
    First,
    Second,
    Full,
}

impl SemesterSpan {
    pub fn is_half(self) -> bool {
        !matches!(self, SemesterSpan::Full)
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub id: String,
    pub duration: Duration,
    pub frequency: Frequency,
    pub span: SemesterSpan,
    pub instructor: String,
    /// Preference score per slot, in slot table order.
    pub preferences: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct TimeSlot {
    pub id: String,
    pub time: String,
}

/// Sections, classrooms and slots in input order, with the section subsets
/// the model builder iterates over computed once up front.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub sections: Vec<Section>,
    pub classrooms: Vec<String>,
    pub slots: Vec<TimeSlot>,
    /// Section indices grouped by instructor, instructors in first-seen order.
    pub by_instructor: Vec<(String, Vec<usize>)>,
    pub half_semester: Vec<usize>,
    pub full_semester: Vec<usize>,
}

impl Catalog {
    pub fn from_input(input: &SchedulingInput) -> Result<Catalog, InputError> {
        check_unique("section", input.sections.iter().map(|s| s.id.as_str()))?;
        check_unique("classroom", input.classrooms.iter().map(|c| c.id.as_str()))?;
        check_unique("timeslot", input.timeslots.iter().map(|t| t.id.as_str()))?;

        let slots: Vec<TimeSlot> = input
            .timeslots
            .iter()
            .map(|t| TimeSlot {
                id: t.id.clone(),
                time: t.time.clone(),
            })
            .collect();

        let sections = input
            .sections
            .iter()
            .map(|row| parse_section(row, &slots))
            .collect::<Result<Vec<_>, _>>()?;

        let by_instructor = sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.instructor.clone(), i))
            .into_group_map()
            .into_iter()
            .sorted_by_key(|(_, indices)| indices[0])
            .collect();

        let (half_semester, full_semester): (Vec<usize>, Vec<usize>) =
            (0..sections.len()).partition(|&i| sections[i].span.is_half());

        Ok(Catalog {
            sections,
            classrooms: input.classrooms.iter().map(|c| c.id.clone()).collect(),
            slots,
            by_instructor,
            half_semester,
            full_semester,
        })
    }

    pub fn slot_index(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn classroom_index(&self, id: &str) -> Option<usize> {
        self.classrooms.iter().position(|c| c == id)
    }

    pub fn section_index(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }
}

fn check_unique<'a>(
    table: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), InputError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(InputError::EmptyId { table });
        }
        if !seen.insert(id) {
            return Err(InputError::DuplicateId {
                table,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_section(row: &SectionRow, slots: &[TimeSlot]) -> Result<Section, InputError> {
    let duration = match row.duration_minutes {
        90 => Duration::Minutes90,
        180 => Duration::Minutes180,
        minutes => {
            return Err(InputError::InvalidDuration {
                section: row.id.clone(),
                minutes,
            });
        }
    };

    let frequency = match row.frequency {
        1 => Frequency::Once,
        2 => Frequency::Twice,
        frequency => {
            return Err(InputError::InvalidFrequency {
                section: row.id.clone(),
                frequency,
            });
        }
    };

    let span = match row.semester.trim() {
        "first" => SemesterSpan::First,
        "second" => SemesterSpan::Second,
        "full" => SemesterSpan::Full,
        other => {
            return Err(InputError::InvalidSemester {
                section: row.id.clone(),
                value: other.to_string(),
            });
        }
    };

    let instructor = row.instructor.trim();
    if instructor.is_empty() {
        return Err(InputError::MissingInstructor {
            section: row.id.clone(),
        });
    }

    let mut preferences = Vec::with_capacity(slots.len());
    for slot in slots {
        let score = *row
            .preferences
            .get(&slot.id)
            .ok_or_else(|| InputError::MissingPreference {
                section: row.id.clone(),
                slot: slot.id.clone(),
            })?;
        if !score.is_finite() {
            return Err(InputError::InvalidPreference {
                section: row.id.clone(),
                slot: slot.id.clone(),
            });
        }
        preferences.push(score);
    }

    let known: HashSet<&str> = slots.iter().map(|s| s.id.as_str()).collect();
    for key in row.preferences.keys() {
        if !known.contains(key.as_str()) {
            warn!(
                "Section {} has a preference for unknown slot `{}`; ignoring it.",
                row.id, key
            );
        }
    }

    Ok(Section {
        id: row.id.clone(),
        duration,
        frequency,
        span,
        instructor: instructor.to_string(),
        preferences,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{ClassroomRow, TimeSlotRow};
    use std::collections::BTreeMap;

    pub(crate) fn section(
        id: &str,
        duration_minutes: u32,
        frequency: u32,
        semester: &str,
        instructor: &str,
        preferences: &[(&str, f64)],
    ) -> SectionRow {
        SectionRow {
            id: id.to_string(),
            duration_minutes,
            frequency,
            semester: semester.to_string(),
            instructor: instructor.to_string(),
            preferences: preferences
                .iter()
                .map(|(slot, score)| (slot.to_string(), *score))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    pub(crate) fn input(
        sections: Vec<SectionRow>,
        classrooms: &[&str],
        slots: &[(&str, &str)],
    ) -> SchedulingInput {
        SchedulingInput {
            sections,
            classrooms: classrooms
                .iter()
                .map(|id| ClassroomRow { id: id.to_string() })
                .collect(),
            timeslots: slots
                .iter()
                .map(|(id, time)| TimeSlotRow {
                    id: id.to_string(),
                    time: time.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_indexes_by_instructor_and_span() {
        let input = input(
            vec![
                section("A", 90, 1, "full", "smith", &[("S1", 1.0)]),
                section("B", 180, 2, "first", "jones", &[("S1", 1.0)]),
                section("C", 90, 2, "second", "smith", &[("S1", 1.0)]),
            ],
            &["R1"],
            &[("S1", "08:00")],
        );
        let catalog = Catalog::from_input(&input).unwrap();

        assert_eq!(
            catalog.by_instructor,
            vec![
                ("smith".to_string(), vec![0, 2]),
                ("jones".to_string(), vec![1]),
            ]
        );
        assert_eq!(catalog.half_semester, vec![1, 2]);
        assert_eq!(catalog.full_semester, vec![0]);
        assert_eq!(catalog.sections[1].duration.slots_required(), 2);
        assert_eq!(catalog.sections[2].frequency.meetings(), 2);
    }

    #[test]
    fn test_instructor_names_are_trimmed() {
        let prefs = [("S1", 1.0)];
        let input = input(
            vec![
                section("A", 90, 1, "full", "smith", &prefs),
                section("B", 90, 1, "full", " smith ", &prefs),
            ],
            &["R1"],
            &[("S1", "08:00")],
        );
        let catalog = Catalog::from_input(&input).unwrap();
        assert_eq!(catalog.by_instructor, vec![("smith".to_string(), vec![0, 1])]);
    }

    #[test]
    fn test_preferences_follow_slot_order() {
        let input = input(
            vec![section(
                "A",
                90,
                1,
                "full",
                "smith",
                &[("S2", 5.0), ("S1", 2.0), ("X", 9.0)],
            )],
            &["R1"],
            &[("S1", "08:00"), ("S2", "10:00")],
        );
        let catalog = Catalog::from_input(&input).unwrap();
        assert_eq!(catalog.sections[0].preferences, vec![2.0, 5.0]);
    }

    #[test]
    fn test_rejects_bad_enumerations() {
        let slots = [("S1", "08:00")];
        let prefs = [("S1", 1.0)];

        let bad_duration = input(vec![section("A", 120, 1, "full", "x", &prefs)], &["R1"], &slots);
        assert_eq!(
            Catalog::from_input(&bad_duration).unwrap_err(),
            InputError::InvalidDuration {
                section: "A".to_string(),
                minutes: 120
            }
        );

        let bad_frequency = input(vec![section("A", 90, 3, "full", "x", &prefs)], &["R1"], &slots);
        assert!(matches!(
            Catalog::from_input(&bad_frequency),
            Err(InputError::InvalidFrequency { frequency: 3, .. })
        ));

        let bad_semester = input(vec![section("A", 90, 1, "summer", "x", &prefs)], &["R1"], &slots);
        assert!(matches!(
            Catalog::from_input(&bad_semester),
            Err(InputError::InvalidSemester { .. })
        ));

        let no_instructor = input(vec![section("A", 90, 1, "full", " ", &prefs)], &["R1"], &slots);
        assert!(matches!(
            Catalog::from_input(&no_instructor),
            Err(InputError::MissingInstructor { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_or_bad_preferences() {
        let slots = [("S1", "08:00"), ("S2", "10:00")];

        let missing = input(
            vec![section("A", 90, 1, "full", "x", &[("S1", 1.0)])],
            &["R1"],
            &slots,
        );
        assert_eq!(
            Catalog::from_input(&missing).unwrap_err(),
            InputError::MissingPreference {
                section: "A".to_string(),
                slot: "S2".to_string()
            }
        );

        let nan = input(
            vec![section("A", 90, 1, "full", "x", &[("S1", 1.0), ("S2", f64::NAN)])],
            &["R1"],
            &slots,
        );
        assert!(matches!(
            Catalog::from_input(&nan),
            Err(InputError::InvalidPreference { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_and_empty_ids() {
        let prefs = [("S1", 1.0)];
        let dup_sections = input(
            vec![
                section("A", 90, 1, "full", "x", &prefs),
                section("A", 90, 1, "full", "y", &prefs),
            ],
            &["R1"],
            &[("S1", "08:00")],
        );
        assert_eq!(
            Catalog::from_input(&dup_sections).unwrap_err(),
            InputError::DuplicateId {
                table: "section",
                id: "A".to_string()
            }
        );

        let dup_rooms = input(vec![], &["R1", "R1"], &[("S1", "08:00")]);
        assert!(matches!(
            Catalog::from_input(&dup_rooms),
            Err(InputError::DuplicateId { table: "classroom", .. })
        ));

        let empty_slot = input(vec![], &["R1"], &[("", "08:00")]);
        assert_eq!(
            Catalog::from_input(&empty_slot).unwrap_err(),
            InputError::EmptyId { table: "timeslot" }
        );
    }
}
