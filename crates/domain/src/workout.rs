use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use derive_more::Deref;
use uuid::Uuid;

use crate::{
    CreateError, DeleteError, Name, OwnerID, Program, ProgramOrder, ReadError, UpdateError,
    ValidationError, athlete_list, day_listing, program_list, program_names,
};

#[allow(async_fn_in_trait)]
pub trait WorkoutService {
    async fn get_workout_sets(&self, filter: &WorkoutFilter)
    -> Result<Vec<WorkoutSet>, ReadError>;
    async fn get_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSet, ReadError>;
    async fn create_workout_sets(
        &self,
        workout_sets: Vec<NewWorkoutSet>,
    ) -> Result<Vec<WorkoutSet>, CreateError>;
    async fn modify_workout_set(
        &self,
        id: WorkoutSetID,
        completed: Option<bool>,
        weight: Option<Option<f32>>,
        notes: Option<String>,
    ) -> Result<WorkoutSet, UpdateError>;
    async fn delete_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSetID, DeleteError>;
    async fn delete_program(&self, athlete_name: &str, program_name: &str)
    -> Result<usize, DeleteError>;

    async fn create_workout_set(
        &self,
        workout_set: NewWorkoutSet,
    ) -> Result<WorkoutSet, CreateError> {
        self.create_workout_sets(vec![workout_set])
            .await?
            .pop()
            .ok_or_else(|| CreateError::Other("no workout set was created".into()))
    }

    async fn set_completed(
        &self,
        id: WorkoutSetID,
        completed: bool,
    ) -> Result<WorkoutSet, UpdateError> {
        self.modify_workout_set(id, Some(completed), None, None)
            .await
    }

    async fn set_weight(
        &self,
        id: WorkoutSetID,
        weight: Option<f32>,
    ) -> Result<WorkoutSet, UpdateError> {
        self.modify_workout_set(id, None, Some(weight), None).await
    }

    async fn set_notes(&self, id: WorkoutSetID, notes: String) -> Result<WorkoutSet, UpdateError> {
        self.modify_workout_set(id, None, None, Some(notes)).await
    }

    async fn get_athletes(&self) -> Result<Vec<String>, ReadError> {
        Ok(athlete_list(
            &self.get_workout_sets(&WorkoutFilter::All).await?,
        ))
    }

    async fn get_programs(
        &self,
        athlete_name: &str,
        order: ProgramOrder,
    ) -> Result<Vec<Program>, ReadError> {
        Ok(program_list(
            &self
                .get_workout_sets(&WorkoutFilter::Athlete(athlete_name.to_string()))
                .await?,
            order,
        ))
    }

    async fn get_program_names(&self, athlete_name: &str) -> Result<Vec<String>, ReadError> {
        Ok(program_names(
            &self
                .get_workout_sets(&WorkoutFilter::Athlete(athlete_name.to_string()))
                .await?,
        ))
    }

    async fn get_day_listing(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Vec<WorkoutSet>, ReadError> {
        Ok(day_listing(
            self.get_workout_sets(&WorkoutFilter::athlete_program(athlete_name, program_name))
                .await?,
        ))
    }

    async fn program_exists(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<bool, ReadError> {
        Ok(!self
            .get_workout_sets(&WorkoutFilter::athlete_program(athlete_name, program_name))
            .await?
            .is_empty())
    }

    async fn validate_program_name(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Name, ValidationError> {
        match Name::new(program_name) {
            Ok(name) => match self.program_exists(athlete_name, name.as_str()).await {
                Ok(false) => Ok(name),
                Ok(true) => Err(ValidationError::Conflict("program".to_string())),
                Err(err) => Err(ValidationError::Other(err.into())),
            },
            Err(err) => Err(ValidationError::Other(err.into())),
        }
    }

    fn validate_weight(&self, weight: &str) -> Result<Option<f32>, ValidationError> {
        let weight = weight.trim();
        if weight.is_empty() {
            return Ok(None);
        }
        match weight.replace(',', ".").parse::<f32>() {
            Ok(parsed_weight) => {
                if parsed_weight.is_finite() && parsed_weight >= 0.0 {
                    Ok(Some(parsed_weight))
                } else {
                    Err(ValidationError::Other(
                        "Weight must be a non-negative decimal number".into(),
                    ))
                }
            }
            Err(_) => Err(ValidationError::Other(
                "Weight must be a decimal number".into(),
            )),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait WorkoutRepository {
    async fn read_workout_sets(&self, filter: &WorkoutFilter)
    -> Result<Vec<WorkoutSet>, ReadError>;
    async fn read_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSet, ReadError>;
    async fn create_workout_sets(
        &self,
        workout_sets: Vec<NewWorkoutSet>,
    ) -> Result<Vec<WorkoutSet>, CreateError>;
    async fn modify_workout_set(
        &self,
        id: WorkoutSetID,
        completed: Option<bool>,
        weight: Option<Option<f32>>,
        notes: Option<String>,
    ) -> Result<WorkoutSet, UpdateError>;
    async fn delete_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSetID, DeleteError>;
    async fn delete_program(&self, athlete_name: &str, program_name: &str)
    -> Result<usize, DeleteError>;
}

/// One prescribed or performed set of one exercise.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkoutSet {
    pub id: WorkoutSetID,
    pub owner_id: OwnerID,
    pub athlete_name: String,
    pub program_name: String,
    pub start_date: NaiveDate,
    pub week_number: u32,
    pub day_number: Option<u32>,
    pub exercise_number: u32,
    pub exercise_name: String,
    pub sets: Option<u32>,
    /// Kept as text, prescriptions like `10-15` are common.
    pub reps: String,
    pub weight: Option<f32>,
    pub percent: Option<f32>,
    pub notes: String,
    pub completed: bool,
}

impl WorkoutSet {
    #[must_use]
    pub fn new(id: WorkoutSetID, workout_set: NewWorkoutSet) -> Self {
        Self {
            id,
            owner_id: workout_set.owner_id,
            athlete_name: workout_set.athlete_name,
            program_name: workout_set.program_name,
            start_date: workout_set.start_date,
            week_number: workout_set.week_number,
            day_number: workout_set.day_number,
            exercise_number: workout_set.exercise_number,
            exercise_name: workout_set.exercise_name,
            sets: workout_set.sets,
            reps: workout_set.reps,
            weight: workout_set.weight,
            percent: workout_set.percent,
            notes: workout_set.notes,
            completed: workout_set.completed,
        }
    }
}

/// Workout set which has not been stored yet.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NewWorkoutSet {
    /// Nil if the owner is to be assigned by the importer.
    #[serde(default)]
    pub owner_id: OwnerID,
    pub athlete_name: String,
    pub program_name: String,
    pub start_date: NaiveDate,
    pub week_number: u32,
    #[serde(default)]
    pub day_number: Option<u32>,
    pub exercise_number: u32,
    pub exercise_name: String,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: String,
    #[serde(default, alias = "weights")]
    pub weight: Option<f32>,
    #[serde(default)]
    pub percent: Option<f32>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(
    Deref,
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct WorkoutSetID(Uuid);

impl WorkoutSetID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for WorkoutSetID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for WorkoutSetID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

impl FromStr for WorkoutSetID {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for WorkoutSetID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query surface of the workout store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkoutFilter {
    All,
    Athlete(String),
    AthleteProgram {
        athlete_name: String,
        program_name: String,
    },
    AthleteStartDate {
        athlete_name: String,
        start_date: NaiveDate,
    },
    Program(String),
    Week(u32),
}

impl WorkoutFilter {
    #[must_use]
    pub fn athlete_program(athlete_name: &str, program_name: &str) -> Self {
        Self::AthleteProgram {
            athlete_name: athlete_name.to_string(),
            program_name: program_name.to_string(),
        }
    }

    #[must_use]
    pub fn matches(&self, workout_set: &WorkoutSet) -> bool {
        match self {
            WorkoutFilter::All => true,
            WorkoutFilter::Athlete(athlete_name) => workout_set.athlete_name == *athlete_name,
            WorkoutFilter::AthleteProgram {
                athlete_name,
                program_name,
            } => {
                workout_set.athlete_name == *athlete_name
                    && workout_set.program_name == *program_name
            }
            WorkoutFilter::AthleteStartDate {
                athlete_name,
                start_date,
            } => {
                workout_set.athlete_name == *athlete_name && workout_set.start_date == *start_date
            }
            WorkoutFilter::Program(program_name) => workout_set.program_name == *program_name,
            WorkoutFilter::Week(week_number) => workout_set.week_number == *week_number,
        }
    }
}
