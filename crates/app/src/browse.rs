//! Drill-down from athletes to programs to training days.
//!
//! Each level keeps a [`Selection`], so a response for an athlete or program which has been
//! superseded by a later selection is dropped instead of being shown.

use atlas_domain::{
    Program, ProgramDayService, ProgramOrder, ReadError, Selection, TrainingDay, WorkoutService,
    WorkoutSet,
};

pub struct Browser<'a, S> {
    service: &'a S,
    order: ProgramOrder,
    athlete: Selection<String>,
    program: Selection<(String, String)>,
}

impl<'a, S> Browser<'a, S> {
    pub fn new(service: &'a S, order: ProgramOrder) -> Self {
        Self {
            service,
            order,
            athlete: Selection::new(),
            program: Selection::new(),
        }
    }

    pub fn selected_athlete(&self) -> Option<String> {
        self.athlete.current()
    }

    pub fn selected_program(&self) -> Option<(String, String)> {
        self.program.current()
    }
}

impl<S: WorkoutService + ProgramDayService> Browser<'_, S> {
    pub async fn athletes(&self) -> Result<Vec<String>, ReadError> {
        self.service.get_athletes().await
    }

    /// The programs of the athlete, or `None` if another athlete has been selected meanwhile.
    pub async fn select_athlete(
        &self,
        athlete_name: &str,
    ) -> Result<Option<Vec<Program>>, ReadError> {
        let ticket = self.athlete.select(athlete_name.to_string());
        let programs = self.service.get_programs(&ticket.filter, self.order).await;
        self.athlete.accept(&ticket, programs).transpose()
    }

    /// The training days of the program, or `None` if another program has been selected
    /// meanwhile.
    pub async fn select_program(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Option<Vec<TrainingDay>>, ReadError> {
        let ticket = self
            .program
            .select((athlete_name.to_string(), program_name.to_string()));
        let (athlete_name, program_name) = &ticket.filter;
        let training_days = self
            .service
            .get_training_days(athlete_name, program_name)
            .await;
        self.program.accept(&ticket, training_days).transpose()
    }

    /// Like [`Browser::select_program`], but returns the flat day listing.
    pub async fn select_program_listing(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Option<Vec<WorkoutSet>>, ReadError> {
        let ticket = self
            .program
            .select((athlete_name.to_string(), program_name.to_string()));
        let (athlete_name, program_name) = &ticket.filter;
        let listing = self
            .service
            .get_day_listing(athlete_name, program_name)
            .await;
        self.program.accept(&ticket, listing).transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use atlas_domain::{
        CreateError, DeleteError, NewWorkoutSet, ProgramDay, ProgramDayKey, Rating, StorageError,
        UpdateError, WorkoutFilter, WorkoutSetID,
    };
    use chrono::NaiveDate;
    use futures::{
        channel::oneshot,
        executor::block_on,
        future::join3,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct FakeService {
        workout_sets: Vec<WorkoutSet>,
        pending: RefCell<HashMap<String, oneshot::Receiver<Vec<WorkoutSet>>>>,
        unavailable: bool,
    }

    impl FakeService {
        fn delay(&self, athlete_name: &str) -> oneshot::Sender<Vec<WorkoutSet>> {
            let (sender, receiver) = oneshot::channel();
            self.pending
                .borrow_mut()
                .insert(athlete_name.to_string(), receiver);
            sender
        }
    }

    fn athlete_of(filter: &WorkoutFilter) -> Option<&str> {
        match filter {
            WorkoutFilter::Athlete(athlete_name)
            | WorkoutFilter::AthleteProgram { athlete_name, .. }
            | WorkoutFilter::AthleteStartDate { athlete_name, .. } => Some(athlete_name),
            WorkoutFilter::All | WorkoutFilter::Program(_) | WorkoutFilter::Week(_) => None,
        }
    }

    impl WorkoutService for FakeService {
        async fn get_workout_sets(
            &self,
            filter: &WorkoutFilter,
        ) -> Result<Vec<WorkoutSet>, ReadError> {
            if self.unavailable {
                return Err(ReadError::Storage(StorageError::NoConnection));
            }
            let pending = athlete_of(filter).and_then(|a| self.pending.borrow_mut().remove(a));
            let workout_sets = match pending {
                Some(receiver) => receiver.await.unwrap_or_default(),
                None => self.workout_sets.clone(),
            };
            Ok(workout_sets
                .into_iter()
                .filter(|w| filter.matches(w))
                .collect())
        }

        async fn get_workout_set(&self, _: WorkoutSetID) -> Result<WorkoutSet, ReadError> {
            Err(ReadError::NotFound)
        }

        async fn create_workout_sets(
            &self,
            _: Vec<NewWorkoutSet>,
        ) -> Result<Vec<WorkoutSet>, CreateError> {
            Err(CreateError::Other("read only".into()))
        }

        async fn modify_workout_set(
            &self,
            _: WorkoutSetID,
            _: Option<bool>,
            _: Option<Option<f32>>,
            _: Option<String>,
        ) -> Result<WorkoutSet, UpdateError> {
            Err(UpdateError::NotFound)
        }

        async fn delete_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSetID, DeleteError> {
            Ok(id)
        }

        async fn delete_program(&self, _: &str, _: &str) -> Result<usize, DeleteError> {
            Ok(0)
        }
    }

    impl ProgramDayService for FakeService {
        async fn get_program_days(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Vec<ProgramDay>, ReadError> {
            Ok(vec![])
        }

        async fn create_program_days(&self, _: Vec<ProgramDay>) -> Result<usize, CreateError> {
            Ok(0)
        }

        async fn modify_program_day(
            &self,
            _: &ProgramDayKey,
            _: Option<bool>,
            _: Option<Option<Rating>>,
        ) -> Result<ProgramDay, UpdateError> {
            Err(UpdateError::NotFound)
        }
    }

    fn workout_set(id: u128, athlete_name: &str, program_name: &str, day: u32) -> WorkoutSet {
        WorkoutSet::new(
            id.into(),
            NewWorkoutSet {
                owner_id: 1.into(),
                athlete_name: athlete_name.to_string(),
                program_name: program_name.to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                week_number: 1,
                day_number: Some(day),
                exercise_number: 1,
                exercise_name: "Clean".to_string(),
                sets: Some(3),
                reps: "2".to_string(),
                weight: Some(70.0),
                percent: None,
                notes: String::new(),
                completed: false,
            },
        )
    }

    fn program(program_name: &str) -> Program {
        Program {
            program_name: program_name.to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_select_athlete() {
        let service = FakeService {
            workout_sets: vec![
                workout_set(1, "Alice", "Base", 1),
                workout_set(2, "Bob", "Peak", 1),
            ],
            ..FakeService::default()
        };
        let browser = Browser::new(&service, ProgramOrder::default());

        assert_eq!(
            block_on(browser.athletes()).unwrap(),
            vec!["Alice".to_string(), "Bob".to_string()]
        );
        assert_eq!(
            block_on(browser.select_athlete("Bob")).unwrap(),
            Some(vec![program("Peak")])
        );
        assert_eq!(browser.selected_athlete(), Some("Bob".to_string()));
    }

    #[test]
    fn test_select_athlete_discards_superseded_response() {
        let service = FakeService::default();
        let alice = service.delay("Alice");
        let bob = service.delay("Bob");
        let browser = Browser::new(&service, ProgramOrder::default());

        let (alice_programs, bob_programs, ()) = block_on(join3(
            browser.select_athlete("Alice"),
            browser.select_athlete("Bob"),
            async {
                bob.send(vec![workout_set(2, "Bob", "Peak", 1)]).unwrap();
                alice.send(vec![workout_set(1, "Alice", "Base", 1)]).unwrap();
            },
        ));

        assert_eq!(alice_programs.unwrap(), None);
        assert_eq!(bob_programs.unwrap(), Some(vec![program("Peak")]));
        assert_eq!(browser.selected_athlete(), Some("Bob".to_string()));
    }

    #[test]
    fn test_select_program() {
        let service = FakeService {
            workout_sets: vec![
                workout_set(1, "Alice", "Base", 2),
                workout_set(2, "Alice", "Base", 1),
                workout_set(3, "Alice", "Peak", 1),
            ],
            ..FakeService::default()
        };
        let browser = Browser::new(&service, ProgramOrder::default());

        let training_days = block_on(browser.select_program("Alice", "Base"))
            .unwrap()
            .unwrap();
        assert_eq!(
            training_days
                .iter()
                .map(|d| d.day_number)
                .collect::<Vec<_>>(),
            vec![Some(1), Some(2)]
        );

        let listing = block_on(browser.select_program_listing("Alice", "Peak"))
            .unwrap()
            .unwrap();
        assert_eq!(listing, vec![workout_set(3, "Alice", "Peak", 1)]);
        assert_eq!(
            browser.selected_program(),
            Some(("Alice".to_string(), "Peak".to_string()))
        );
    }

    #[test]
    fn test_select_program_fetch_failure() {
        let service = FakeService {
            unavailable: true,
            ..FakeService::default()
        };
        let browser = Browser::new(&service, ProgramOrder::default());

        assert!(matches!(
            block_on(browser.select_program("Alice", "Base")),
            Err(err) if err.is_fetch_failure()
        ));
    }
}
