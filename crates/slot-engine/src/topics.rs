//! Topic filters: named predicates a viewer can toggle to narrow the occurrence list.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Timelike;

use crate::error::{EngineError, Result};
use crate::model::Occurrence;

/// A predicate over one occurrence.
pub type TopicPredicate = Arc<dyn Fn(&Occurrence) -> bool + Send + Sync>;

/// Flexible day period of a local time, as in "in the afternoon".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            17.. => DayPeriod::Evening,
            12.. => DayPeriod::Afternoon,
            4.. => DayPeriod::Morning,
            _ => DayPeriod::Night,
        }
    }

    pub fn of(occurrence: &Occurrence) -> Self {
        Self::from_hour(occurrence.date.hour())
    }

    pub fn label(self) -> &'static str {
        match self {
            DayPeriod::Night => "at night",
            DayPeriod::Morning => "in the morning",
            DayPeriod::Afternoon => "in the afternoon",
            DayPeriod::Evening => "in the evening",
        }
    }
}

/// Name → predicate table used by [`TopicRegistry::filter`].
#[derive(Clone, Default)]
pub struct TopicRegistry {
    predicates: HashMap<String, TopicPredicate>,
}

impl fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("topics", &self.names())
            .finish()
    }
}

impl TopicRegistry {
    /// An empty registry; every topic name is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in topics: `lunch`, `dinner`, `work`, `afternoon`, `evening`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("lunch", |o| o.summary.contains("Lunch"));
        registry.register("dinner", |o| o.summary.contains("Dinner"));
        registry.register("work", |o| o.summary.contains("Work") && o.date.hour() < 17);
        registry.register("afternoon", |o| {
            DayPeriod::of(o).label().ends_with("afternoon")
        });
        registry.register("evening", |o| DayPeriod::of(o).label().ends_with("evening"));
        registry
    }

    /// Add a topic, replacing any predicate already registered under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Occurrence) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Registered topic names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check that every active topic is registered.
    ///
    /// # Errors
    /// Returns `EngineError::UnknownTopic` for the first unregistered name.
    pub fn validate<S: AsRef<str>>(&self, active: &[S]) -> Result<()> {
        match active.iter().find(|name| !self.contains(name.as_ref())) {
            Some(name) => Err(EngineError::UnknownTopic(name.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Keep the occurrences matching at least one active topic.
    ///
    /// With no active topics every occurrence passes. Topics are validated before
    /// any occurrence is looked at, so a misconfigured name fails even on an empty
    /// list.
    ///
    /// # Errors
    /// Returns `EngineError::UnknownTopic` if an active topic is not registered.
    pub fn filter<S: AsRef<str>>(
        &self,
        occurrences: Vec<Occurrence>,
        active: &[S],
    ) -> Result<Vec<Occurrence>> {
        self.validate(active)?;
        if active.is_empty() {
            return Ok(occurrences);
        }

        let predicates: Vec<&TopicPredicate> = active
            .iter()
            .filter_map(|name| self.predicates.get(name.as_ref()))
            .collect();

        Ok(occurrences
            .into_iter()
            .filter(|o| predicates.iter().any(|matches| matches(o)))
            .collect())
    }
}
