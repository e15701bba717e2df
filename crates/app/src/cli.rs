use std::{collections::BTreeSet, fs, path::PathBuf};

use anyhow::{Context, bail};
use atlas_domain::{
    NewWorkoutSet, OwnerID, ProgramDayKey, ProgramDayService, ProgramOrder, Progress, Rating,
    WorkoutService, WorkoutSetID,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json, to_value};

use crate::browse::Browser;

#[derive(Parser, Debug)]
#[command(
    name = "atlas",
    version,
    about = "Browse and maintain training programs",
    long_about = "Browse the athletes, programs and training days stored in the workout database \
                  and record their progress. All output is JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file override
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Owner id override
    #[arg(long, global = true)]
    pub owner: Option<OwnerID>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List all athletes
    Athletes,

    /// List the programs of an athlete
    Programs {
        athlete: String,

        #[arg(long, value_enum, default_value = "newest-first")]
        order: Order,

        /// Only list the distinct program names
        #[arg(long)]
        names: bool,
    },

    /// List the workout sets of a program in training order
    Workouts { athlete: String, program: String },

    /// Show the training days of a program
    Days { athlete: String, program: String },

    /// Show how many sets of a program are completed
    Progress { athlete: String, program: String },

    /// Import workout sets from a JSON file
    Import {
        file: PathBuf,

        /// Allow adding sets to programs which already exist
        #[arg(long)]
        append: bool,
    },

    /// Mark a workout set as completed
    Complete {
        id: WorkoutSetID,

        /// Mark as not completed instead
        #[arg(long)]
        undo: bool,
    },

    /// Set or clear the weight of a workout set
    Weight {
        id: WorkoutSetID,

        /// Weight in kg, omit to clear
        #[arg(allow_hyphen_values = true)]
        weight: Option<String>,
    },

    /// Replace the notes of a workout set
    Notes { id: WorkoutSetID, text: String },

    /// Delete a workout set
    Delete { id: WorkoutSetID },

    /// Delete all workout sets and days of a program
    DeleteProgram { athlete: String, program: String },

    /// Rate a training day, omit the rating to clear it
    RateDay {
        #[command(flatten)]
        day: DayArgs,

        rating: Option<String>,
    },

    /// Mark a training day as finished
    FinishDay {
        #[command(flatten)]
        day: DayArgs,

        /// Mark as not finished instead
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Args, Debug, PartialEq)]
pub struct DayArgs {
    pub athlete: String,
    pub program: String,
    pub start_date: NaiveDate,
    pub week: u32,
    pub day: u32,
}

impl DayArgs {
    fn key(self, owner_id: OwnerID) -> ProgramDayKey {
        ProgramDayKey {
            owner_id,
            athlete_name: self.athlete,
            program_name: self.program,
            start_date: self.start_date,
            week_number: self.week,
            day_number: self.day,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NewestFirst,
    OldestFirst,
    Name,
}

impl From<Order> for ProgramOrder {
    fn from(value: Order) -> Self {
        match value {
            Order::NewestFirst => ProgramOrder::NewestFirst,
            Order::OldestFirst => ProgramOrder::OldestFirst,
            Order::Name => ProgramOrder::Name,
        }
    }
}

/// Executes a command and returns its result as JSON.
pub async fn run<S>(command: Command, service: &S, owner_id: OwnerID) -> anyhow::Result<Value>
where
    S: WorkoutService + ProgramDayService,
{
    let order = match &command {
        Command::Programs { order, .. } => (*order).into(),
        _ => ProgramOrder::default(),
    };
    let browser = Browser::new(service, order);

    let output = match command {
        Command::Athletes => to_value(browser.athletes().await?)?,
        Command::Programs {
            athlete,
            names: true,
            ..
        } => to_value(service.get_program_names(&athlete).await?)?,
        Command::Programs { athlete, .. } => to_value(
            browser
                .select_athlete(&athlete)
                .await?
                .context("athlete selection was superseded")?,
        )?,
        Command::Workouts { athlete, program } => to_value(
            browser
                .select_program_listing(&athlete, &program)
                .await?
                .context("program selection was superseded")?,
        )?,
        Command::Days { athlete, program } => to_value(
            browser
                .select_program(&athlete, &program)
                .await?
                .context("program selection was superseded")?,
        )?,
        Command::Progress { athlete, program } => {
            let progress = service
                .get_day_listing(&athlete, &program)
                .await?
                .iter()
                .collect::<Progress>();
            json!({
                "total": progress.total,
                "completed": progress.completed,
                "ratio": progress.ratio(),
            })
        }
        Command::Import { file, append } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let workout_sets = serde_json::from_str::<Vec<NewWorkoutSet>>(&content)
                .with_context(|| format!("invalid workout sets in {}", file.display()))?;
            to_value(import(service, workout_sets, owner_id, append).await?)?
        }
        Command::Complete { id, undo } => to_value(service.set_completed(id, !undo).await?)?,
        Command::Weight { id, weight } => {
            let weight = match weight {
                Some(weight) => service.validate_weight(&weight)?,
                None => None,
            };
            to_value(service.set_weight(id, weight).await?)?
        }
        Command::Notes { id, text } => to_value(service.set_notes(id, text).await?)?,
        Command::Delete { id } => json!({ "id": service.delete_workout_set(id).await? }),
        Command::DeleteProgram { athlete, program } => {
            json!({ "deleted": service.delete_program(&athlete, &program).await? })
        }
        Command::RateDay { day, rating } => {
            let rating = rating
                .as_deref()
                .map(Rating::try_from)
                .transpose()?;
            to_value(
                service
                    .rate_program_day(&day.key(owner_id), rating)
                    .await?,
            )?
        }
        Command::FinishDay { day, undo } => to_value(
            service
                .set_program_day_completed(&day.key(owner_id), !undo)
                .await?,
        )?,
    };

    Ok(output)
}

async fn import<S: WorkoutService>(
    service: &S,
    mut workout_sets: Vec<NewWorkoutSet>,
    owner_id: OwnerID,
    append: bool,
) -> anyhow::Result<Vec<atlas_domain::WorkoutSet>> {
    for workout_set in &mut workout_sets {
        if workout_set.owner_id.is_nil() {
            workout_set.owner_id = owner_id;
        }
    }

    if !append {
        let programs = workout_sets
            .iter()
            .map(|w| (w.athlete_name.as_str(), w.program_name.as_str()))
            .collect::<BTreeSet<_>>();
        for (athlete_name, program_name) in programs {
            if service.program_exists(athlete_name, program_name).await? {
                bail!(
                    "program {program_name} of {athlete_name} already exists, \
                     use --append to add workout sets to it"
                );
            }
        }
    }

    let created = service.create_workout_sets(workout_sets).await?;
    log::info!("imported {} workout sets", created.len());
    Ok(created)
}
