use strum::{AsRefStr, Display};

#[derive(AsRefStr, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    ProgramWorkouts,
    ProgramDays,
}

pub const CURRENT_VERSION: i32 = 1;

pub const SCHEMA_VERSION_TABLE: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
";

/// Workout sets and the program days derived from them.
///
/// Dates are stored as ISO 8601 text, ids as hyphenated UUIDs.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS program_workouts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    athlete_name TEXT NOT NULL,
    program_name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    week_number INTEGER NOT NULL,
    day_number INTEGER,
    exercise_number INTEGER NOT NULL,
    exercise_name TEXT NOT NULL,
    sets INTEGER,
    reps TEXT NOT NULL DEFAULT '',
    weights REAL,
    percent REAL,
    notes TEXT NOT NULL DEFAULT '',
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_program_workouts_athlete
    ON program_workouts(athlete_name);
CREATE INDEX IF NOT EXISTS idx_program_workouts_athlete_program
    ON program_workouts(athlete_name, program_name);
CREATE INDEX IF NOT EXISTS idx_program_workouts_athlete_start_date
    ON program_workouts(athlete_name, start_date);
CREATE INDEX IF NOT EXISTS idx_program_workouts_program
    ON program_workouts(program_name);
CREATE INDEX IF NOT EXISTS idx_program_workouts_week
    ON program_workouts(week_number);

CREATE TABLE IF NOT EXISTS program_days (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    athlete_name TEXT NOT NULL,
    program_name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    week_number INTEGER NOT NULL,
    day_number INTEGER NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    rating INTEGER CHECK (rating BETWEEN 1 AND 5),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (user_id, athlete_name, program_name, start_date, week_number, day_number)
);
";
