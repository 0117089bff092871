//! Projects a solved assignment onto the weekly grid.

use std::fmt;

use serde::Serialize;

use crate::data::{ClassroomId, Placement, SectionId, SlotId, Weekday};
use crate::error::DecodeError;
use crate::model::TimetableModel;

/// Values above this count as 1.
const ONE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnKey {
    pub classroom: ClassroomId,
    pub weekday: Weekday,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableRow {
    pub slot: SlotId,
    pub time: String,
    /// One entry per column; `None` is an empty cell.
    pub cells: Vec<Option<SectionId>>,
}

/// Rows are time slots, columns are (classroom, weekday) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timetable {
    pub columns: Vec<ColumnKey>,
    pub rows: Vec<TimetableRow>,
}

impl Timetable {
    pub fn get(&self, slot: &str, classroom: &str, weekday: Weekday) -> Option<&str> {
        let column = self
            .columns
            .iter()
            .position(|c| c.classroom == classroom && c.weekday == weekday)?;
        let row = self.rows.iter().find(|r| r.slot == slot)?;
        row.cells[column].as_deref()
    }

    pub fn occupied_cells(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.cells.iter().filter(|c| c.is_some()).count())
            .sum()
    }
}

impl fmt::Display for Timetable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.classroom, c.weekday.short_name()))
            .collect();
        // padding counts chars, so widths must too
        let label_width = self
            .rows
            .iter()
            .map(|r| r.time.chars().count())
            .max()
            .unwrap_or(0)
            .max(4);
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.cells[i].as_ref().map(|id| id.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(h.chars().count())
            })
            .collect();

        write!(f, "{:<label_width$}", "Time")?;
        for (h, w) in headers.iter().zip(&widths) {
            write!(f, " | {:<w$}", h, w = *w)?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "{:<label_width$}", row.time)?;
            for (cell, w) in row.cells.iter().zip(&widths) {
                write!(f, " | {:<w$}", cell.as_deref().unwrap_or(""), w = *w)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Everything read back from one solved model.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub timetable: Timetable,
    pub placements: Vec<Placement>,
    pub objective: f64,
    pub unscheduled: Vec<SectionId>,
}

pub fn decode(model: &TimetableModel<'_>, values: &[f64]) -> Result<Decoded, DecodeError> {
    let linear = model.linear();
    if values.len() != linear.num_vars() {
        return Err(DecodeError::ValueCount {
            expected: linear.num_vars(),
            got: values.len(),
        });
    }

    let catalog = model.catalog();
    let columns: Vec<ColumnKey> = catalog
        .classrooms
        .iter()
        .flat_map(|classroom| {
            Weekday::ALL.into_iter().map(move |weekday| ColumnKey {
                classroom: classroom.clone(),
                weekday,
            })
        })
        .collect();
    let mut rows: Vec<TimetableRow> = catalog
        .slots
        .iter()
        .map(|slot| TimetableRow {
            slot: slot.id.clone(),
            time: slot.time.clone(),
            cells: vec![None; columns.len()],
        })
        .collect();

    let mut placements = Vec::new();
    let mut placed = vec![false; catalog.sections.len()];
    for (cell, var) in model.assignments() {
        if values[var.index()] <= ONE_THRESHOLD {
            continue;
        }
        let section = &catalog.sections[cell.section];
        let column = cell.classroom * Weekday::ALL.len() + cell.weekday.index();
        let entry = &mut rows[cell.slot].cells[column];
        if let Some(first) = entry {
            return Err(DecodeError::DoubleBooked {
                classroom: catalog.classrooms[cell.classroom].clone(),
                weekday: cell.weekday,
                slot: catalog.slots[cell.slot].id.clone(),
                first: first.clone(),
                second: section.id.clone(),
            });
        }
        *entry = Some(section.id.clone());
        placed[cell.section] = true;
        placements.push(Placement {
            section_id: section.id.clone(),
            weekday: cell.weekday,
            classroom_id: catalog.classrooms[cell.classroom].clone(),
            slot_id: catalog.slots[cell.slot].id.clone(),
        });
    }
    placements.sort();

    let unscheduled = catalog
        .sections
        .iter()
        .zip(&placed)
        .filter(|(_, placed)| !**placed)
        .map(|(s, _)| s.id.clone())
        .collect();

    // solver output carries round-off; score the 0/1 assignment itself
    let rounded: Vec<f64> = values
        .iter()
        .map(|v| if *v > ONE_THRESHOLD { 1.0 } else { 0.0 })
        .collect();

    Ok(Decoded {
        timetable: Timetable { columns, rows },
        placements,
        objective: linear.objective().value(&rounded),
        unscheduled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::catalog::tests::{input, section};
    use crate::model::{Cell, SchedulingPolicy};

    fn catalog() -> Catalog {
        let prefs = [("S1", 2.0), ("S2", 1.0)];
        Catalog::from_input(&input(
            vec![
                section("A", 90, 1, "full", "smith", &prefs),
                section("B", 90, 2, "full", "jones", &prefs),
                section("C", 90, 1, "full", "lee", &prefs),
            ],
            &["R1", "R2"],
            &[("S1", "08:00"), ("S2", "10:00")],
        ))
        .unwrap()
    }

    #[test]
    fn test_grid_layout_and_cells() {
        let catalog = catalog();
        let model = TimetableModel::build(&catalog, SchedulingPolicy::AllowUnscheduled);
        let cells = [
            Cell { section: 0, weekday: Weekday::Friday, classroom: 1, slot: 1 },
            Cell { section: 1, weekday: Weekday::Tuesday, classroom: 0, slot: 0 },
            Cell { section: 1, weekday: Weekday::Thursday, classroom: 0, slot: 0 },
        ];
        let decoded = decode(&model, &model.values_for(&cells)).unwrap();
        let grid = &decoded.timetable;

        assert_eq!(grid.columns.len(), 10);
        assert_eq!(
            grid.columns[6],
            ColumnKey { classroom: "R2".to_string(), weekday: Weekday::Tuesday }
        );
        assert_eq!(grid.rows.iter().map(|r| r.time.as_str()).collect::<Vec<_>>(), ["08:00", "10:00"]);
        assert_eq!(grid.get("S2", "R2", Weekday::Friday), Some("A"));
        assert_eq!(grid.get("S1", "R1", Weekday::Tuesday), Some("B"));
        assert_eq!(grid.get("S1", "R1", Weekday::Thursday), Some("B"));
        assert_eq!(grid.get("S1", "R1", Weekday::Monday), None);
        assert_eq!(grid.occupied_cells(), 3);

        assert_eq!(decoded.placements.len(), 3);
        assert_eq!(decoded.objective, 1.0 + 2.0 + 2.0);
        assert_eq!(decoded.unscheduled, vec!["C".to_string()]);
    }

    #[test]
    fn test_double_booking_is_reported() {
        let catalog = catalog();
        let model = TimetableModel::build(&catalog, SchedulingPolicy::AllowUnscheduled);
        let cells = [
            Cell { section: 0, weekday: Weekday::Monday, classroom: 0, slot: 0 },
            Cell { section: 2, weekday: Weekday::Monday, classroom: 0, slot: 0 },
        ];
        let err = decode(&model, &model.values_for(&cells)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::DoubleBooked {
                classroom: "R1".to_string(),
                weekday: Weekday::Monday,
                slot: "S1".to_string(),
                first: "A".to_string(),
                second: "C".to_string(),
            }
        );
    }

    #[test]
    fn test_wrong_value_count() {
        let catalog = catalog();
        let model = TimetableModel::build(&catalog, SchedulingPolicy::RequireAll);
        assert!(matches!(
            decode(&model, &[1.0]),
            Err(DecodeError::ValueCount { got: 1, .. })
        ));
    }

    #[test]
    fn test_display_renders_header_and_rows() {
        let catalog = catalog();
        let model = TimetableModel::build(&catalog, SchedulingPolicy::AllowUnscheduled);
        let cells = [Cell { section: 0, weekday: Weekday::Monday, classroom: 0, slot: 0 }];
        let text = decode(&model, &model.values_for(&cells)).unwrap().timetable.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Time  | R1 Mon | R1 Tue"));
        assert!(lines[1].starts_with("08:00 | A      |"));
    }

    #[test]
    fn test_display_aligns_non_ascii_text() {
        let prefs = [("S1", 1.0)];
        let catalog = Catalog::from_input(&input(
            vec![section("Ökonomie-1", 90, 1, "full", "müller", &prefs)],
            &["Saal"],
            &[("S1", "8 Uhr früh")],
        ))
        .unwrap();
        let model = TimetableModel::build(&catalog, SchedulingPolicy::RequireAll);
        let cells = [Cell { section: 0, weekday: Weekday::Monday, classroom: 0, slot: 0 }];
        let text = decode(&model, &model.values_for(&cells)).unwrap().timetable.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Time       | Saal Mon   | Saal Tue | Saal Wed | Saal Thu | Saal Fri");
        assert_eq!(lines[1], "8 Uhr früh | Ökonomie-1 |          |          |          |         ");
        assert_eq!(lines[0].chars().count(), lines[1].chars().count());
    }
}
