use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::{OwnerID, ProgramDay, Rating, WorkoutSet};

/// Order of workout sets within a program: by week, then by day with unassigned sets last, then
/// by exercise number.
#[must_use]
pub fn listing_order(a: &WorkoutSet, b: &WorkoutSet) -> Ordering {
    a.week_number
        .cmp(&b.week_number)
        .then_with(|| day_order(a.day_number, b.day_number))
        .then(a.exercise_number.cmp(&b.exercise_number))
}

fn day_order(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts the workout sets of one athlete and program for presentation.
///
/// Sets which compare equal keep their relative order.
#[must_use]
pub fn day_listing(mut workout_sets: Vec<WorkoutSet>) -> Vec<WorkoutSet> {
    workout_sets.sort_by(listing_order);
    workout_sets
}

/// Identifies a day of one program instance: owner, start date, week and day.
type DayIdentity = (OwnerID, NaiveDate, u32, Option<u32>);

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingDay {
    pub owner_id: OwnerID,
    pub start_date: NaiveDate,
    pub week_number: u32,
    pub day_number: Option<u32>,
    pub exercises: Vec<ExerciseGroup>,
    pub completed: bool,
    pub rating: Option<Rating>,
}

impl TrainingDay {
    fn new((owner_id, start_date, week_number, day_number): DayIdentity) -> Self {
        Self {
            owner_id,
            start_date,
            week_number,
            day_number,
            exercises: vec![],
            completed: false,
            rating: None,
        }
    }

    fn identity(&self) -> DayIdentity {
        (
            self.owner_id,
            self.start_date,
            self.week_number,
            self.day_number,
        )
    }

    #[must_use]
    pub fn is_rest_day(&self) -> bool {
        self.exercises.is_empty()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .collect::<Progress>()
    }

    fn push(&mut self, workout_set: WorkoutSet) {
        match self
            .exercises
            .iter_mut()
            .find(|e| e.exercise_name == workout_set.exercise_name)
        {
            Some(exercise) => exercise.sets.push(workout_set),
            None => self.exercises.push(ExerciseGroup {
                exercise_name: workout_set.exercise_name.clone(),
                sets: vec![workout_set],
            }),
        }
    }
}

/// Sets of one named exercise within a training day.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExerciseGroup {
    pub exercise_name: String,
    pub sets: Vec<WorkoutSet>,
}

/// Groups workout sets into training days.
///
/// Each program instance, identified by owner and start date, has its own days. Program days
/// without any workout set are kept as rest days. Completion and rating of a day are taken from
/// the program day with the same key.
#[must_use]
pub fn training_days(
    workout_sets: Vec<WorkoutSet>,
    program_days: &[ProgramDay],
) -> Vec<TrainingDay> {
    let mut days: Vec<TrainingDay> = vec![];

    for workout_set in day_listing(workout_sets) {
        let identity = (
            workout_set.owner_id,
            workout_set.start_date,
            workout_set.week_number,
            workout_set.day_number,
        );
        day_mut(&mut days, identity).push(workout_set);
    }

    for program_day in program_days {
        let key = &program_day.key;
        let day = day_mut(
            &mut days,
            (
                key.owner_id,
                key.start_date,
                key.week_number,
                Some(key.day_number),
            ),
        );
        day.completed = program_day.completed;
        day.rating = program_day.rating;
    }

    days.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then(a.week_number.cmp(&b.week_number))
            .then_with(|| day_order(a.day_number, b.day_number))
    });
    days
}

fn day_mut(days: &mut Vec<TrainingDay>, identity: DayIdentity) -> &mut TrainingDay {
    let position = match days.iter().position(|d| d.identity() == identity) {
        Some(position) => position,
        None => {
            days.push(TrainingDay::new(identity));
            days.len() - 1
        }
    };
    &mut days[position]
}

/// Number of total and completed sets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
}

impl Progress {
    /// Share of completed sets, undefined without any set.
    #[must_use]
    pub fn ratio(&self) -> Option<f32> {
        if self.total == 0 {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            Some(self.completed as f32 / self.total as f32)
        }
    }
}

impl<'a> FromIterator<&'a WorkoutSet> for Progress {
    fn from_iter<I: IntoIterator<Item = &'a WorkoutSet>>(iter: I) -> Self {
        iter.into_iter().fold(Progress::default(), |p, w| Progress {
            total: p.total + 1,
            completed: p.completed + usize::from(w.completed),
        })
    }
}
