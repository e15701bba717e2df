use log::{debug, error};

use crate::{
    Callback, CreateError, DeleteError, NewWorkoutSet, ProgramDay, ProgramDayKey,
    ProgramDayRepository, ProgramDayService, Rating, ReadError, StorageError, SubscriptionID,
    UpdateError, WorkoutFilter, WorkoutRepository, WorkoutService, WorkoutSet, WorkoutSetID,
    WorkoutSubscriber, program_days,
};

pub struct Service<R> {
    repository: R,
}

impl<R> Service<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

macro_rules! log_on_error {
    ($func: expr, $error: ident, $action: literal, $entity: literal) => {{
        let result = $func.await;
        match result {
            Ok(_) => {}
            Err(ref err) => match err {
                $error::Storage(crate::StorageError::NoConnection) => {
                    debug!("failed to {} {}: {err}", $action, $entity);
                }
                _ => {
                    error!("failed to {} {}: {err}", $action, $entity);
                }
            },
        }
        result
    }};
}

impl<R: WorkoutRepository + ProgramDayRepository> WorkoutService for Service<R> {
    async fn get_workout_sets(
        &self,
        filter: &WorkoutFilter,
    ) -> Result<Vec<WorkoutSet>, ReadError> {
        log_on_error!(
            self.repository.read_workout_sets(filter),
            ReadError,
            "get",
            "workout sets"
        )
    }

    async fn get_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSet, ReadError> {
        log_on_error!(
            self.repository.read_workout_set(id),
            ReadError,
            "get",
            "workout set"
        )
    }

    /// Stores the workout sets and derives their program days.
    ///
    /// Creating the program days is best effort. A failure is logged, but the stored workout sets
    /// are returned nonetheless.
    async fn create_workout_sets(
        &self,
        workout_sets: Vec<NewWorkoutSet>,
    ) -> Result<Vec<WorkoutSet>, CreateError> {
        let created = log_on_error!(
            self.repository.create_workout_sets(workout_sets),
            CreateError,
            "create",
            "workout sets"
        )?;

        let program_days = program_days(&created);
        if !program_days.is_empty() {
            match self.repository.upsert_program_days(program_days).await {
                Ok(inserted) => debug!("created {inserted} program days"),
                Err(CreateError::Storage(StorageError::NoConnection)) => {
                    debug!("failed to create program days: no connection");
                }
                Err(err) => error!("failed to create program days: {err}"),
            }
        }

        Ok(created)
    }

    async fn modify_workout_set(
        &self,
        id: WorkoutSetID,
        completed: Option<bool>,
        weight: Option<Option<f32>>,
        notes: Option<String>,
    ) -> Result<WorkoutSet, UpdateError> {
        log_on_error!(
            self.repository
                .modify_workout_set(id, completed, weight, notes),
            UpdateError,
            "modify",
            "workout set"
        )
    }

    async fn delete_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSetID, DeleteError> {
        log_on_error!(
            self.repository.delete_workout_set(id),
            DeleteError,
            "delete",
            "workout set"
        )
    }

    async fn delete_program(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<usize, DeleteError> {
        log_on_error!(
            self.repository.delete_program(athlete_name, program_name),
            DeleteError,
            "delete",
            "program"
        )
    }
}

impl<R: ProgramDayRepository> ProgramDayService for Service<R> {
    async fn get_program_days(
        &self,
        athlete_name: &str,
        program_name: &str,
    ) -> Result<Vec<ProgramDay>, ReadError> {
        log_on_error!(
            self.repository
                .read_program_days(athlete_name, program_name),
            ReadError,
            "get",
            "program days"
        )
    }

    async fn create_program_days(
        &self,
        program_days: Vec<ProgramDay>,
    ) -> Result<usize, CreateError> {
        log_on_error!(
            self.repository.upsert_program_days(program_days),
            CreateError,
            "create",
            "program days"
        )
    }

    async fn modify_program_day(
        &self,
        key: &ProgramDayKey,
        completed: Option<bool>,
        rating: Option<Option<Rating>>,
    ) -> Result<ProgramDay, UpdateError> {
        log_on_error!(
            self.repository.modify_program_day(key, completed, rating),
            UpdateError,
            "modify",
            "program day"
        )
    }
}

impl<R: WorkoutSubscriber> WorkoutSubscriber for Service<R> {
    async fn subscribe(
        &self,
        filter: WorkoutFilter,
        callback: Callback,
    ) -> Result<SubscriptionID, ReadError> {
        log_on_error!(
            self.repository.subscribe(filter, callback),
            ReadError,
            "subscribe to",
            "workout sets"
        )
    }

    fn unsubscribe(&self, id: SubscriptionID) -> bool {
        self.repository.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::NaiveDate;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{Program, ProgramOrder, ValidationError, tests::workout_set};

    #[test]
    fn test_create_workout_sets_creates_program_days() {
        let service = Service::new(FakeRepository::default());

        let created = block_on(service.create_workout_sets(vec![
            new_workout_set("W1", "P1", Some(1), 1),
            new_workout_set("W1", "P1", Some(1), 2),
            new_workout_set("W1", "P1", Some(2), 1),
            new_workout_set("W1", "P1", None, 1),
        ]))
        .unwrap();

        assert_eq!(created.len(), 4);
        assert_eq!(
            block_on(service.get_program_days("W1", "P1"))
                .unwrap()
                .into_iter()
                .map(|d| d.key.day_number)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_create_workout_sets_ignores_program_day_failure() {
        let service = Service::new(FakeRepository {
            fail_upsert: true,
            ..FakeRepository::default()
        });

        let created = block_on(service.create_workout_set(new_workout_set("W1", "P1", Some(1), 1)))
            .unwrap();

        assert_eq!(created.athlete_name, "W1");
        assert_eq!(
            block_on(service.get_workout_sets(&WorkoutFilter::All)).unwrap(),
            vec![created]
        );
        assert_eq!(block_on(service.get_program_days("W1", "P1")).unwrap(), vec![]);
    }

    #[test]
    fn test_create_workout_sets_failure_is_propagated() {
        let service = Service::new(FakeRepository {
            fail_reads_and_writes: true,
            ..FakeRepository::default()
        });

        assert!(matches!(
            block_on(service.create_workout_sets(vec![new_workout_set("W1", "P1", Some(1), 1)])),
            Err(CreateError::Storage(StorageError::NoConnection))
        ));
        assert_eq!(service.repository().upsert_calls.get(), 0);
    }

    #[test]
    fn test_get_workout_sets_fetch_failure() {
        let service = Service::new(FakeRepository {
            fail_reads_and_writes: true,
            ..FakeRepository::default()
        });

        let result = block_on(service.get_athletes());

        assert!(matches!(result, Err(ref err) if err.is_fetch_failure()));
    }

    #[test]
    fn test_get_athletes_and_programs() {
        let service = Service::new(FakeRepository::with_workout_sets(vec![
            workout_set(1, "Bob", "Base", 1, Some(1), 1),
            WorkoutSet {
                start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                ..workout_set(2, "Alice", "Peak", 1, Some(1), 1)
            },
            workout_set(3, "Alice", "Base", 1, Some(1), 1),
            workout_set(4, "Alice", "Base", 1, Some(2), 1),
        ]));

        assert_eq!(block_on(service.get_athletes()).unwrap(), vec!["Alice", "Bob"]);
        assert_eq!(
            block_on(service.get_programs("Alice", ProgramOrder::NewestFirst)).unwrap(),
            vec![
                Program {
                    program_name: "Peak".to_string(),
                    start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                },
                Program {
                    program_name: "Base".to_string(),
                    start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                },
            ]
        );
        assert_eq!(
            block_on(service.get_program_names("Alice")).unwrap(),
            vec!["Base", "Peak"]
        );
        assert_eq!(
            block_on(service.get_programs("Carol", ProgramOrder::NewestFirst)).unwrap(),
            vec![]
        );
    }

    #[test]
    fn test_get_day_listing() {
        let service = Service::new(FakeRepository::with_workout_sets(vec![
            workout_set(1, "Alice", "Base", 2, Some(1), 1),
            workout_set(2, "Alice", "Base", 1, None, 1),
            workout_set(3, "Alice", "Peak", 1, Some(1), 1),
            workout_set(4, "Alice", "Base", 1, Some(1), 2),
            workout_set(5, "Alice", "Base", 1, Some(1), 1),
        ]));

        assert_eq!(
            block_on(service.get_day_listing("Alice", "Base"))
                .unwrap()
                .into_iter()
                .map(|w| w.id)
                .collect::<Vec<_>>(),
            [5, 4, 2, 1].map(WorkoutSetID::from).to_vec()
        );
    }

    #[test]
    fn test_get_training_days_includes_rest_days() {
        let service = Service::new(FakeRepository::with_workout_sets(vec![workout_set(
            1,
            "Alice",
            "Base",
            1,
            Some(1),
            1,
        )]));
        let mut rest_day = ProgramDay::new(
            ProgramDayKey::of(&workout_set(2, "Alice", "Base", 1, Some(2), 1)).unwrap(),
        );
        rest_day.completed = true;
        block_on(service.create_program_days(vec![rest_day])).unwrap();

        let days = block_on(service.get_training_days("Alice", "Base")).unwrap();

        assert_eq!(
            days.iter()
                .map(|d| (d.day_number, d.is_rest_day(), d.completed))
                .collect::<Vec<_>>(),
            vec![(Some(1), false, false), (Some(2), true, true)]
        );
    }

    #[test]
    fn test_modify_workout_set() {
        let service = Service::new(FakeRepository::with_workout_sets(vec![workout_set(
            1,
            "Alice",
            "Base",
            1,
            Some(1),
            1,
        )]));
        let id = WorkoutSetID::from(1);

        assert!(block_on(service.set_completed(id, true)).unwrap().completed);
        assert_eq!(block_on(service.set_weight(id, None)).unwrap().weight, None);
        assert_eq!(
            block_on(service.set_notes(id, "felt fast".to_string()))
                .unwrap()
                .notes,
            "felt fast"
        );
        assert!(matches!(
            block_on(service.set_completed(WorkoutSetID::from(9), true)),
            Err(UpdateError::NotFound)
        ));
    }

    #[test]
    fn test_delete_program() {
        let service = Service::new(FakeRepository::with_workout_sets(vec![
            workout_set(1, "Alice", "Base", 1, Some(1), 1),
            workout_set(2, "Alice", "Base", 1, Some(1), 2),
            workout_set(3, "Alice", "Peak", 1, Some(1), 1),
        ]));

        assert_eq!(block_on(service.delete_program("Alice", "Base")).unwrap(), 2);
        assert!(!block_on(service.program_exists("Alice", "Base")).unwrap());
        assert!(block_on(service.program_exists("Alice", "Peak")).unwrap());
    }

    #[test]
    fn test_validate_program_name() {
        let service = Service::new(FakeRepository::with_workout_sets(vec![workout_set(
            1,
            "Alice",
            "Base",
            1,
            Some(1),
            1,
        )]));

        assert_eq!(
            block_on(service.validate_program_name("Alice", " Peak ")).unwrap().as_str(),
            "Peak"
        );
        assert!(matches!(
            block_on(service.validate_program_name("Alice", "Base")),
            Err(ValidationError::Conflict(field)) if field == "program"
        ));
        assert!(matches!(
            block_on(service.validate_program_name("Alice", "")),
            Err(ValidationError::Other(_))
        ));
        assert_eq!(
            block_on(service.validate_program_name("Bob", "Base")).unwrap().as_str(),
            "Base"
        );
    }

    #[rstest]
    #[case("", Some(None))]
    #[case("80", Some(Some(80.0)))]
    #[case(" 102,5 ", Some(Some(102.5)))]
    #[case("-1", None)]
    #[case("heavy", None)]
    fn test_validate_weight(#[case] weight: &str, #[case] expected: Option<Option<f32>>) {
        let service = Service::new(FakeRepository::default());
        assert_eq!(service.validate_weight(weight).ok(), expected);
    }

    #[derive(Default)]
    struct FakeRepository {
        workout_sets: RefCell<Vec<WorkoutSet>>,
        program_days: RefCell<Vec<ProgramDay>>,
        next_id: Cell<u128>,
        upsert_calls: Cell<usize>,
        fail_upsert: bool,
        fail_reads_and_writes: bool,
    }

    impl FakeRepository {
        fn with_workout_sets(workout_sets: Vec<WorkoutSet>) -> Self {
            Self {
                workout_sets: RefCell::new(workout_sets),
                next_id: Cell::new(100),
                ..Self::default()
            }
        }
    }

    impl WorkoutRepository for FakeRepository {
        async fn read_workout_sets(
            &self,
            filter: &WorkoutFilter,
        ) -> Result<Vec<WorkoutSet>, ReadError> {
            if self.fail_reads_and_writes {
                return Err(StorageError::NoConnection.into());
            }
            Ok(self
                .workout_sets
                .borrow()
                .iter()
                .filter(|w| filter.matches(w))
                .cloned()
                .collect())
        }

        async fn read_workout_set(&self, id: WorkoutSetID) -> Result<WorkoutSet, ReadError> {
            self.workout_sets
                .borrow()
                .iter()
                .find(|w| w.id == id)
                .cloned()
                .ok_or(ReadError::NotFound)
        }

        async fn create_workout_sets(
            &self,
            workout_sets: Vec<NewWorkoutSet>,
        ) -> Result<Vec<WorkoutSet>, CreateError> {
            if self.fail_reads_and_writes {
                return Err(StorageError::NoConnection.into());
            }
            let created = workout_sets
                .into_iter()
                .map(|w| {
                    self.next_id.set(self.next_id.get() + 1);
                    WorkoutSet::new(self.next_id.get().into(), w)
                })
                .collect::<Vec<_>>();
            self.workout_sets.borrow_mut().extend(created.clone());
            Ok(created)
        }

        async fn modify_workout_set(
            &self,
            id: WorkoutSetID,
            completed: Option<bool>,
            weight: Option<Option<f32>>,
            notes: Option<String>,
        ) -> Result<WorkoutSet, UpdateError> {
            let mut workout_sets = self.workout_sets.borrow_mut();
            let workout_set = workout_sets
                .iter_mut()
                .find(|w| w.id == id)
                .ok_or(UpdateError::NotFound)?;
            if let Some(completed) = completed {
                workout_set.completed = completed;
            }
            if let Some(weight) = weight {
                workout_set.weight = weight;
            }
            if let Some(notes) = notes {
                workout_set.notes = notes;
            }
            Ok(workout_set.clone())
        }

        async fn delete_workout_set(
            &self,
            id: WorkoutSetID,
        ) -> Result<WorkoutSetID, DeleteError> {
            self.workout_sets.borrow_mut().retain(|w| w.id != id);
            Ok(id)
        }

        async fn delete_program(
            &self,
            athlete_name: &str,
            program_name: &str,
        ) -> Result<usize, DeleteError> {
            let filter = WorkoutFilter::athlete_program(athlete_name, program_name);
            let mut workout_sets = self.workout_sets.borrow_mut();
            let len = workout_sets.len();
            workout_sets.retain(|w| !filter.matches(w));
            Ok(len - workout_sets.len())
        }
    }

    impl ProgramDayRepository for FakeRepository {
        async fn read_program_days(
            &self,
            athlete_name: &str,
            program_name: &str,
        ) -> Result<Vec<ProgramDay>, ReadError> {
            Ok(self
                .program_days
                .borrow()
                .iter()
                .filter(|d| {
                    d.key.athlete_name == athlete_name && d.key.program_name == program_name
                })
                .cloned()
                .collect())
        }

        async fn upsert_program_days(
            &self,
            program_days: Vec<ProgramDay>,
        ) -> Result<usize, CreateError> {
            self.upsert_calls.set(self.upsert_calls.get() + 1);
            if self.fail_upsert {
                return Err(CreateError::Other("relation program_days does not exist".into()));
            }
            let mut existing = self.program_days.borrow_mut();
            let mut inserted = 0;
            for day in program_days {
                if existing.iter().all(|d| d.key != day.key) {
                    existing.push(day);
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn modify_program_day(
            &self,
            key: &ProgramDayKey,
            completed: Option<bool>,
            rating: Option<Option<Rating>>,
        ) -> Result<ProgramDay, UpdateError> {
            let mut program_days = self.program_days.borrow_mut();
            let day = program_days
                .iter_mut()
                .find(|d| d.key == *key)
                .ok_or(UpdateError::NotFound)?;
            if let Some(completed) = completed {
                day.completed = completed;
            }
            if let Some(rating) = rating {
                day.rating = rating;
            }
            Ok(day.clone())
        }
    }

    fn new_workout_set(
        athlete_name: &str,
        program_name: &str,
        day_number: Option<u32>,
        exercise_number: u32,
    ) -> NewWorkoutSet {
        NewWorkoutSet {
            owner_id: 1.into(),
            athlete_name: athlete_name.to_string(),
            program_name: program_name.to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            week_number: 1,
            day_number,
            exercise_number,
            exercise_name: "Snatch".to_string(),
            sets: Some(3),
            reps: "3".to_string(),
            weight: None,
            percent: None,
            notes: String::new(),
            completed: false,
        }
    }
}
