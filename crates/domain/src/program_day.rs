use std::collections::HashSet;

use chrono::NaiveDate;

use crate::{
    CreateError, OwnerID, ReadError, TrainingDay, UpdateError, WorkoutFilter, WorkoutService,
    WorkoutSet, training_days,
};

#[allow(async_fn_in_trait)]
pub trait ProgramDayService {
    async fn get_program_days(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Vec<ProgramDay>, ReadError>;
    async fn create_program_days(
        &self,
        program_days: Vec<ProgramDay>,
    ) -> Result<usize, CreateError>;
    async fn modify_program_day(
        &self,
        key: &ProgramDayKey,
        completed: Option<bool>,
        rating: Option<Option<Rating>>,
    ) -> Result<ProgramDay, UpdateError>;

    async fn set_program_day_completed(
        &self,
        key: &ProgramDayKey,
        completed: bool,
    ) -> Result<ProgramDay, UpdateError> {
        self.modify_program_day(key, Some(completed), None).await
    }

    async fn rate_program_day(
        &self,
        key: &ProgramDayKey,
        rating: Option<Rating>,
    ) -> Result<ProgramDay, UpdateError> {
        self.modify_program_day(key, None, Some(rating)).await
    }

    async fn get_training_days(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Vec<TrainingDay>, ReadError>
    where
        Self: WorkoutService,
    {
        let workout_sets = self
            .get_workout_sets(&WorkoutFilter::athlete_program(athlete_name, program_name))
            .await?;
        let program_days = self.get_program_days(athlete_name, program_name).await?;
        Ok(training_days(workout_sets, &program_days))
    }
}

#[allow(async_fn_in_trait)]
pub trait ProgramDayRepository {
    async fn read_program_days(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Vec<ProgramDay>, ReadError>;
    /// Inserts all program days whose key does not exist yet and returns the number of inserted
    /// days. Existing days are left untouched.
    async fn upsert_program_days(&self, program_days: Vec<ProgramDay>)
    -> Result<usize, CreateError>;
    async fn modify_program_day(
        &self,
        key: &ProgramDayKey,
        completed: Option<bool>,
        rating: Option<Option<Rating>>,
    ) -> Result<ProgramDay, UpdateError>;
}

/// Natural key of a program day.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ProgramDayKey {
    pub owner_id: OwnerID,
    pub athlete_name: String,
    pub program_name: String,
    pub start_date: NaiveDate,
    pub week_number: u32,
    pub day_number: u32,
}

impl ProgramDayKey {
    /// The key of the day a workout set belongs to, if the set is assigned to a day.
    #[must_use]
    pub fn of(workout_set: &WorkoutSet) -> Option<Self> {
        Some(Self {
            owner_id: workout_set.owner_id,
            athlete_name: workout_set.athlete_name.clone(),
            program_name: workout_set.program_name.clone(),
            start_date: workout_set.start_date,
            week_number: workout_set.week_number,
            day_number: workout_set.day_number?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProgramDay {
    #[serde(flatten)]
    pub key: ProgramDayKey,
    pub completed: bool,
    pub rating: Option<Rating>,
}

impl ProgramDay {
    #[must_use]
    pub fn new(key: ProgramDayKey) -> Self {
        Self {
            key,
            completed: false,
            rating: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, RatingError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(RatingError::OutOfRange(value));
        }

        Ok(Self(value))
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl TryFrom<&str> for Rating {
    type Error = RatingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().parse::<u8>() {
            Ok(parsed_value) => Rating::new(parsed_value),
            Err(_) => Err(RatingError::ParseError),
        }
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RatingError {
    #[error("Rating must be in the range 1 to 5 ({0})")]
    OutOfRange(u8),
    #[error("Rating must be an integer")]
    ParseError,
}

/// Derives the distinct program days implied by a batch of workout sets.
///
/// Sets without a day number do not belong to a program day. Keys are emitted in the order of
/// their first occurrence, each as a fresh day which is neither completed nor rated.
#[must_use]
pub fn program_days(workout_sets: &[WorkoutSet]) -> Vec<ProgramDay> {
    let mut seen = HashSet::new();
    workout_sets
        .iter()
        .filter_map(ProgramDayKey::of)
        .filter(|key| seen.insert(key.clone()))
        .map(ProgramDay::new)
        .collect()
}
