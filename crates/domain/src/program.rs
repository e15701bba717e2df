use chrono::NaiveDate;

use crate::{WorkoutSet, unique_by, unique_sorted};

/// Training program instance, identified by its name and start date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Program {
    pub program_name: String,
    pub start_date: NaiveDate,
}

impl From<&WorkoutSet> for Program {
    fn from(value: &WorkoutSet) -> Self {
        Self {
            program_name: value.program_name.clone(),
            start_date: value.start_date,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    Name,
}

/// Distinct programs of the given rows.
///
/// Programs with the same start date keep the order in which they first appear.
#[must_use]
pub fn program_list(workout_sets: &[WorkoutSet], order: ProgramOrder) -> Vec<Program> {
    let programs = workout_sets.iter().map(Program::from).collect::<Vec<_>>();
    unique_by(&programs, Program::clone, |a, b| match order {
        ProgramOrder::NewestFirst => b.start_date.cmp(&a.start_date),
        ProgramOrder::OldestFirst => a.start_date.cmp(&b.start_date),
        ProgramOrder::Name => a
            .program_name
            .cmp(&b.program_name)
            .then(b.start_date.cmp(&a.start_date)),
    })
}

/// Distinct program names, ignoring start dates.
#[must_use]
pub fn program_names(workout_sets: &[WorkoutSet]) -> Vec<String> {
    unique_sorted(workout_sets, |w| w.program_name.clone())
}
