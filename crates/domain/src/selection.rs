//! Discarding of results which were requested for a superseded filter.
//!
//! Every call of [`Selection::select`] supersedes all earlier tickets. A result fetched for a
//! ticket is only accepted while that ticket is still the most recent one, so the last selected
//! filter always wins, independent of the order in which requests complete.

use std::sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug)]
pub struct Selection<F> {
    generation: AtomicU64,
    current: Mutex<Option<F>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<F> {
    generation: u64,
    pub filter: F,
}

impl<F: Clone> Selection<F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn select(&self, filter: F) -> Ticket<F> {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *current = Some(filter.clone());
        Ticket { generation, filter }
    }

    /// The most recently selected filter.
    pub fn current(&self) -> Option<F> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn is_current(&self, ticket: &Ticket<F>) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Returns the result if it belongs to the most recent selection and discards it otherwise.
    pub fn accept<T>(&self, ticket: &Ticket<F>, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            log::debug!("discarding result of superseded selection");
            None
        }
    }
}

impl<F: Clone> Default for Selection<F> {
    fn default() -> Self {
        Self::new()
    }
}
