//! SQLite backed store for workout sets and program days.
//!
//! The database is the single source of truth. Every mutation notifies the subscriptions whose
//! filter matches the affected workout sets.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use atlas_domain::{
    Callback, Change, CreateError, DeleteError, NewWorkoutSet, OwnerID, Pending, ProgramDay,
    ProgramDayKey, ProgramDayRepository, Rating, ReadError, StorageError, Subscribers,
    SubscriptionID, UpdateError, WorkoutFilter, WorkoutRepository, WorkoutSet, WorkoutSetID,
    WorkoutSubscriber,
};
use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, Transaction, params, params_from_iter,
    types::Value,
};
use uuid::Uuid;

use crate::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE, Table};

const WORKOUT_SET_COLUMNS: &str = "id, user_id, athlete_name, program_name, start_date, \
    week_number, day_number, exercise_number, exercise_name, sets, reps, weights, percent, \
    notes, completed";

const PROGRAM_DAY_COLUMNS: &str =
    "user_id, athlete_name, program_name, start_date, week_number, day_number, completed, rating";

const PROGRAM_DAY_KEY_CONDITION: &str = "user_id = ? AND athlete_name = ? AND program_name = ? \
    AND start_date = ? AND week_number = ? AND day_number = ?";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid {column} in database: {value}")]
    InvalidValue { column: &'static str, value: String },
}

impl Error {
    fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Sqlite(rusqlite::Error::SqliteFailure(error, _)) => Some(error.code),
            _ => None,
        }
    }
}

impl From<Error> for StorageError {
    fn from(value: Error) -> Self {
        match value.code() {
            Some(ErrorCode::CannotOpen | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                StorageError::NoConnection
            }
            Some(
                ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::AuthorizationForStatementDenied,
            ) => StorageError::Unauthorized,
            _ => StorageError::Other(Box::new(value)),
        }
    }
}

impl From<Error> for ReadError {
    fn from(value: Error) -> Self {
        ReadError::Storage(value.into())
    }
}

impl From<Error> for CreateError {
    fn from(value: Error) -> Self {
        match value.code() {
            Some(ErrorCode::ConstraintViolation) => CreateError::Conflict,
            _ => CreateError::Storage(value.into()),
        }
    }
}

impl From<Error> for UpdateError {
    fn from(value: Error) -> Self {
        UpdateError::Storage(value.into())
    }
}

impl From<Error> for DeleteError {
    fn from(value: Error) -> Self {
        DeleteError::Storage(value.into())
    }
}

pub struct Sqlite {
    connection: Mutex<Connection>,
    subscribers: Mutex<Subscribers>,
}

impl Sqlite {
    /// Opens the database at the given path, creating the file and its parent directories if
    /// necessary.
    pub fn open(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("opening database {}", path.display());
        Self::initialize(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(connection: Connection) -> Result<Self, Error> {
        connection.execute_batch(SCHEMA_VERSION_TABLE)?;
        let version = schema_version(&connection)?;
        if version < CURRENT_VERSION {
            migrate(&connection, version)?;
        }
        Ok(Self {
            connection: Mutex::new(connection),
            subscribers: Mutex::new(Subscribers::default()),
        })
    }

    pub fn schema_version(&self) -> Result<i32, Error> {
        schema_version(&self.connection())
    }

    /// Number of active subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.subscribers().len()
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called while the connection is locked, so that every subscription receives the
    /// changes in commit order.
    fn publish(&self, change: &Change) -> Pending {
        self.subscribers().publish(change)
    }
}

fn schema_version(connection: &Connection) -> Result<i32, Error> {
    Ok(connection.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?)
}

fn migrate(connection: &Connection, from_version: i32) -> Result<(), Error> {
    if from_version < 1 {
        debug!("migrating database schema to version 1");
        connection.execute_batch(SCHEMA)?;
        connection.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            params![1],
        )?;
    }
    Ok(())
}

fn condition(filter: &WorkoutFilter) -> (&'static str, Vec<Value>) {
    match filter {
        WorkoutFilter::All => ("", vec![]),
        WorkoutFilter::Athlete(athlete_name) => {
            ("WHERE athlete_name = ?", vec![text(athlete_name)])
        }
        WorkoutFilter::AthleteProgram {
            athlete_name,
            program_name,
        } => (
            "WHERE athlete_name = ? AND program_name = ?",
            vec![text(athlete_name), text(program_name)],
        ),
        WorkoutFilter::AthleteStartDate {
            athlete_name,
            start_date,
        } => (
            "WHERE athlete_name = ? AND start_date = ?",
            vec![text(athlete_name), date(*start_date)],
        ),
        WorkoutFilter::Program(program_name) => {
            ("WHERE program_name = ?", vec![text(program_name)])
        }
        WorkoutFilter::Week(week_number) => {
            ("WHERE week_number = ?", vec![Value::Integer(i64::from(*week_number))])
        }
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn date(value: NaiveDate) -> Value {
    Value::Text(value.to_string())
}

fn key_values(key: &ProgramDayKey) -> Vec<Value> {
    vec![
        text(&key.owner_id.to_string()),
        text(&key.athlete_name),
        text(&key.program_name),
        date(key.start_date),
        Value::Integer(i64::from(key.week_number)),
        Value::Integer(i64::from(key.day_number)),
    ]
}

fn select_workout_sets(
    connection: &Connection,
    filter: &WorkoutFilter,
) -> Result<Vec<WorkoutSet>, Error> {
    let (condition, values) = condition(filter);
    let mut statement = connection.prepare(&format!(
        "SELECT {WORKOUT_SET_COLUMNS} FROM {} {condition} ORDER BY rowid",
        Table::ProgramWorkouts
    ))?;
    let rows = statement.query_map(params_from_iter(values), WorkoutSetRow::from_row)?;
    let workout_sets = rows
        .map(|row| WorkoutSet::try_from(row?))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(workout_sets)
}

fn select_workout_set(
    connection: &Connection,
    id: WorkoutSetID,
) -> Result<Option<WorkoutSet>, Error> {
    connection
        .query_row(
            &format!(
                "SELECT {WORKOUT_SET_COLUMNS} FROM {} WHERE id = ?1",
                Table::ProgramWorkouts
            ),
            params![id.to_string()],
            WorkoutSetRow::from_row,
        )
        .optional()?
        .map(WorkoutSet::try_from)
        .transpose()
}

fn insert_workout_set(
    transaction: &Transaction,
    workout_set: &WorkoutSet,
) -> Result<(), Error> {
    transaction.execute(
        &format!(
            "INSERT INTO {} ({WORKOUT_SET_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            Table::ProgramWorkouts
        ),
        params![
            workout_set.id.to_string(),
            workout_set.owner_id.to_string(),
            workout_set.athlete_name,
            workout_set.program_name,
            workout_set.start_date.to_string(),
            workout_set.week_number,
            workout_set.day_number,
            workout_set.exercise_number,
            workout_set.exercise_name,
            workout_set.sets,
            workout_set.reps,
            workout_set.weight,
            workout_set.percent,
            workout_set.notes,
            workout_set.completed,
        ],
    )?;
    Ok(())
}

fn select_program_day(
    connection: &Connection,
    key: &ProgramDayKey,
) -> Result<Option<ProgramDay>, Error> {
    connection
        .query_row(
            &format!(
                "SELECT {PROGRAM_DAY_COLUMNS} FROM {} WHERE {PROGRAM_DAY_KEY_CONDITION}",
                Table::ProgramDays
            ),
            params_from_iter(key_values(key)),
            ProgramDayRow::from_row,
        )
        .optional()?
        .map(ProgramDay::try_from)
        .transpose()
}

impl WorkoutRepository for Sqlite {
    async fn read_workout_sets(
        &self,
        filter: &WorkoutFilter,
    ) -> Result<Vec<WorkoutSet>, ReadError> {
        Ok(select_workout_sets(&self.connection(), filter)?)
    }

    async fn read_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSet, ReadError> {
        select_workout_set(&self.connection(), id)?.ok_or(ReadError::NotFound)
    }

    async fn create_workout_sets(
        &self,
        workout_sets: Vec<NewWorkoutSet>,
    ) -> Result<Vec<WorkoutSet>, CreateError> {
        let created = workout_sets
            .into_iter()
            .map(|workout_set| WorkoutSet::new(Uuid::new_v4().into(), workout_set))
            .collect::<Vec<_>>();
        let pending = {
            let mut connection = self.connection();
            let transaction = connection.transaction().map_err(Error::from)?;
            for workout_set in &created {
                insert_workout_set(&transaction, workout_set)?;
            }
            transaction.commit().map_err(Error::from)?;
            self.publish(&Change::Inserted(created.clone()))
        };
        debug!("created {} workout sets", created.len());
        pending.deliver();
        Ok(created)
    }

    async fn modify_workout_set(
        &self,
        id: WorkoutSetID,
        completed: Option<bool>,
        weight: Option<Option<f32>>,
        notes: Option<String>,
    ) -> Result<WorkoutSet, UpdateError> {
        let mut assignments = vec![];
        let mut values = vec![];
        if let Some(completed) = completed {
            assignments.push("completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        if let Some(weight) = weight {
            assignments.push("weights = ?");
            values.push(weight.map_or(Value::Null, |w| Value::Real(f64::from(w))));
        }
        if let Some(notes) = notes {
            assignments.push("notes = ?");
            values.push(Value::Text(notes));
        }

        let (workout_set, pending) = {
            let connection = self.connection();
            if !assignments.is_empty() {
                assignments.push("updated_at = datetime('now')");
                values.push(text(&id.to_string()));
                let modified = connection
                    .execute(
                        &format!(
                            "UPDATE {} SET {} WHERE id = ?",
                            Table::ProgramWorkouts,
                            assignments.join(", ")
                        ),
                        params_from_iter(values),
                    )
                    .map_err(Error::from)?;
                if modified == 0 {
                    return Err(UpdateError::NotFound);
                }
            }
            let workout_set = select_workout_set(&connection, id)?.ok_or(UpdateError::NotFound)?;
            let pending = self.publish(&Change::Updated(workout_set.clone()));
            (workout_set, pending)
        };
        pending.deliver();
        Ok(workout_set)
    }

    async fn delete_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSetID, DeleteError> {
        let pending = {
            let connection = self.connection();
            let Some(workout_set) = select_workout_set(&connection, id)? else {
                return Ok(id);
            };
            connection
                .execute(
                    &format!("DELETE FROM {} WHERE id = ?1", Table::ProgramWorkouts),
                    params![id.to_string()],
                )
                .map_err(Error::from)?;
            self.publish(&Change::Deleted(vec![workout_set]))
        };
        pending.deliver();
        Ok(id)
    }

    async fn delete_program(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<usize, DeleteError> {
        let (deleted, pending) = {
            let mut connection = self.connection();
            let deleted = select_workout_sets(
                &connection,
                &WorkoutFilter::athlete_program(athlete_name, program_name),
            )?;
            let transaction = connection.transaction().map_err(Error::from)?;
            for table in [Table::ProgramWorkouts, Table::ProgramDays] {
                transaction
                    .execute(
                        &format!(
                            "DELETE FROM {table} WHERE athlete_name = ?1 AND program_name = ?2"
                        ),
                        params![athlete_name, program_name],
                    )
                    .map_err(Error::from)?;
            }
            transaction.commit().map_err(Error::from)?;
            let pending = if deleted.is_empty() {
                Pending::default()
            } else {
                self.publish(&Change::Deleted(deleted.clone()))
            };
            (deleted, pending)
        };
        info!(
            "deleted program {program_name} of {athlete_name} ({} workout sets)",
            deleted.len()
        );
        pending.deliver();
        Ok(deleted.len())
    }
}

impl ProgramDayRepository for Sqlite {
    async fn read_program_days(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Vec<ProgramDay>, ReadError> {
        let connection = self.connection();
        let mut statement = connection
            .prepare(&format!(
                "SELECT {PROGRAM_DAY_COLUMNS} FROM {} \
                 WHERE athlete_name = ?1 AND program_name = ?2 ORDER BY id",
                Table::ProgramDays
            ))
            .map_err(Error::from)?;
        let rows = statement
            .query_map(params![athlete_name, program_name], ProgramDayRow::from_row)
            .map_err(Error::from)?;
        let program_days = rows
            .map(|row| ProgramDay::try_from(row?))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(program_days)
    }

    async fn upsert_program_days(
        &self,
        program_days: Vec<ProgramDay>,
    ) -> Result<usize, CreateError> {
        let mut connection = self.connection();
        let transaction = connection.transaction().map_err(Error::from)?;
        let mut inserted = 0;
        for program_day in &program_days {
            let mut values = key_values(&program_day.key);
            values.push(Value::Integer(i64::from(program_day.completed)));
            values.push(
                program_day
                    .rating
                    .map_or(Value::Null, |rating| Value::Integer(i64::from(u8::from(rating)))),
            );
            inserted += transaction
                .execute(
                    &format!(
                        "INSERT INTO {} ({PROGRAM_DAY_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                         ON CONFLICT (user_id, athlete_name, program_name, start_date, \
                         week_number, day_number) DO NOTHING",
                        Table::ProgramDays
                    ),
                    params_from_iter(values),
                )
                .map_err(Error::from)?;
        }
        transaction.commit().map_err(Error::from)?;
        debug!(
            "inserted {inserted} of {} program days",
            program_days.len()
        );
        Ok(inserted)
    }

    async fn modify_program_day(
        &self,
        key: &ProgramDayKey,
        completed: Option<bool>,
        rating: Option<Option<Rating>>,
    ) -> Result<ProgramDay, UpdateError> {
        let mut assignments = vec![];
        let mut values = vec![];
        if let Some(completed) = completed {
            assignments.push("completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        if let Some(rating) = rating {
            assignments.push("rating = ?");
            values.push(rating.map_or(Value::Null, |r| Value::Integer(i64::from(u8::from(r)))));
        }

        let connection = self.connection();
        if !assignments.is_empty() {
            assignments.push("updated_at = datetime('now')");
            values.extend(key_values(key));
            let modified = connection
                .execute(
                    &format!(
                        "UPDATE {} SET {} WHERE {PROGRAM_DAY_KEY_CONDITION}",
                        Table::ProgramDays,
                        assignments.join(", ")
                    ),
                    params_from_iter(values),
                )
                .map_err(Error::from)?;
            if modified == 0 {
                return Err(UpdateError::NotFound);
            }
        }
        select_program_day(&connection, key)?.ok_or(UpdateError::NotFound)
    }
}

impl WorkoutSubscriber for Sqlite {
    async fn subscribe(
        &self,
        filter: WorkoutFilter,
        callback: Callback,
    ) -> Result<SubscriptionID, ReadError> {
        let (id, pending) = {
            let connection = self.connection();
            let snapshot = select_workout_sets(&connection, &filter)?;
            self.subscribers().add(filter, callback, snapshot)
        };
        debug!("added subscription {id:?}");
        pending.deliver();
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionID) -> bool {
        let removed = self.subscribers().remove(id);
        if removed {
            debug!("removed subscription {id:?}");
        }
        removed
    }
}

struct WorkoutSetRow {
    id: String,
    user_id: String,
    athlete_name: String,
    program_name: String,
    start_date: String,
    week_number: u32,
    day_number: Option<u32>,
    exercise_number: u32,
    exercise_name: String,
    sets: Option<u32>,
    reps: String,
    weights: Option<f32>,
    percent: Option<f32>,
    notes: String,
    completed: bool,
}

impl WorkoutSetRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            athlete_name: row.get(2)?,
            program_name: row.get(3)?,
            start_date: row.get(4)?,
            week_number: row.get(5)?,
            day_number: row.get(6)?,
            exercise_number: row.get(7)?,
            exercise_name: row.get(8)?,
            sets: row.get(9)?,
            reps: row.get(10)?,
            weights: row.get(11)?,
            percent: row.get(12)?,
            notes: row.get(13)?,
            completed: row.get(14)?,
        })
    }
}

impl TryFrom<WorkoutSetRow> for WorkoutSet {
    type Error = Error;

    fn try_from(value: WorkoutSetRow) -> Result<Self, Self::Error> {
        Ok(WorkoutSet {
            id: parse_id(&value.id, "id")?,
            owner_id: parse_id(&value.user_id, "user_id")?,
            athlete_name: value.athlete_name,
            program_name: value.program_name,
            start_date: parse_date(&value.start_date)?,
            week_number: value.week_number,
            day_number: value.day_number,
            exercise_number: value.exercise_number,
            exercise_name: value.exercise_name,
            sets: value.sets,
            reps: value.reps,
            weight: value.weights,
            percent: value.percent,
            notes: value.notes,
            completed: value.completed,
        })
    }
}

struct ProgramDayRow {
    user_id: String,
    athlete_name: String,
    program_name: String,
    start_date: String,
    week_number: u32,
    day_number: u32,
    completed: bool,
    rating: Option<u8>,
}

impl ProgramDayRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            athlete_name: row.get(1)?,
            program_name: row.get(2)?,
            start_date: row.get(3)?,
            week_number: row.get(4)?,
            day_number: row.get(5)?,
            completed: row.get(6)?,
            rating: row.get(7)?,
        })
    }
}

impl TryFrom<ProgramDayRow> for ProgramDay {
    type Error = Error;

    fn try_from(value: ProgramDayRow) -> Result<Self, Self::Error> {
        Ok(ProgramDay {
            key: ProgramDayKey {
                owner_id: parse_id::<OwnerID>(&value.user_id, "user_id")?,
                athlete_name: value.athlete_name,
                program_name: value.program_name,
                start_date: parse_date(&value.start_date)?,
                week_number: value.week_number,
                day_number: value.day_number,
            },
            completed: value.completed,
            rating: value
                .rating
                .map(Rating::try_from)
                .transpose()
                .map_err(|_| Error::InvalidValue {
                    column: "rating",
                    value: format!("{:?}", value.rating),
                })?,
        })
    }
}

fn parse_id<T: From<Uuid>>(value: &str, column: &'static str) -> Result<T, Error> {
    Uuid::parse_str(value)
        .map(T::from)
        .map_err(|_| Error::InvalidValue {
            column,
            value: value.to_string(),
        })
}

fn parse_date(value: &str) -> Result<NaiveDate, Error> {
    value.parse().map_err(|_| Error::InvalidValue {
        column: "start_date",
        value: value.to_string(),
    })
}
