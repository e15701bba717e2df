use crate::{WorkoutSet, unique_sorted};

/// Distinct athlete names, in ascending order as stored.
#[must_use]
pub fn athlete_list(workout_sets: &[WorkoutSet]) -> Vec<String> {
    unique_sorted(workout_sets, |w| w.athlete_name.clone())
}
