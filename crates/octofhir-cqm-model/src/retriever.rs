//! Timeline queries and an in-memory timeline store

use crate::codeset::CodesetRef;
use crate::provider::{CodesetMatcher, TimelineStore};
use indexmap::IndexMap;
use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_types::{ClinicalEvent, EventCategory, Patient, Timeframe};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How an event is tested against a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMatch {
    /// The event's timestamp lies inside the window
    #[default]
    Occurred,
    /// The event's active interval `timestamp..ended_at` overlaps the window
    Intersecting,
}

impl WindowMatch {
    pub fn accepts(&self, window: &Timeframe, event: &ClinicalEvent) -> bool {
        match self {
            WindowMatch::Occurred => window.contains(event.timestamp),
            WindowMatch::Intersecting => window.intersects(event.timestamp, event.ended_at),
        }
    }
}

/// A lazy `find(codesets, categories).within(window)` query.
///
/// Nothing touches the store until [`EventQuery::last`], [`EventQuery::count`]
/// or [`EventQuery::iter`] is called.
#[derive(Clone, Copy)]
pub struct EventQuery<'a> {
    store: &'a dyn TimelineStore,
    matcher: &'a dyn CodesetMatcher,
    codesets: &'a CodesetRef,
    categories: &'a [EventCategory],
    window: Option<Timeframe>,
    mode: WindowMatch,
}

impl<'a> EventQuery<'a> {
    /// Query every event of `categories` belonging to any of `codesets`
    pub fn new(
        store: &'a dyn TimelineStore,
        matcher: &'a dyn CodesetMatcher,
        codesets: &'a CodesetRef,
        categories: &'a [EventCategory],
    ) -> Self {
        Self {
            store,
            matcher,
            codesets,
            categories,
            window: None,
            mode: WindowMatch::Occurred,
        }
    }

    /// Restrict to events that occurred inside `window` (bounds inclusive)
    pub fn within(mut self, window: Timeframe) -> Self {
        self.window = Some(window);
        self.mode = WindowMatch::Occurred;
        self
    }

    /// Restrict to events whose active interval overlaps `window`
    pub fn intersecting(mut self, window: Timeframe) -> Self {
        self.window = Some(window);
        self.mode = WindowMatch::Intersecting;
        self
    }

    /// Restrict to `window` using the given matching mode
    pub fn matching(mut self, window: Timeframe, mode: WindowMatch) -> Self {
        self.window = Some(window);
        self.mode = mode;
        self
    }

    /// Matching events in category order, then timeline order
    pub fn iter(&self) -> impl Iterator<Item = &'a ClinicalEvent> + use<'a> {
        let store = self.store;
        let matcher = self.matcher;
        let codesets = self.codesets;
        let window = self.window;
        let mode = self.mode;
        let categories = self.categories;
        categories
            .iter()
            .flat_map(move |category| store.events(*category))
            .filter(move |event| {
                window.is_none_or(|window| mode.accepts(&window, event))
                    && matcher.belongs_to_any(event, codesets)
            })
    }

    /// The matching event with the greatest timestamp.
    ///
    /// Ties go to the event yielded last by [`EventQuery::iter`].
    pub fn last(&self) -> Option<&'a ClinicalEvent> {
        self.iter().max_by_key(|event| event.timestamp)
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn exists(&self) -> bool {
        self.iter().next().is_some()
    }
}

/// Serialized form of a patient timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineDocument {
    pub patient: Patient,
    #[serde(default)]
    pub events: Vec<ClinicalEvent>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PanelDocument {
    One(TimelineDocument),
    Many(Vec<TimelineDocument>),
}

/// Timeline held in memory, grouped by category in insertion order
#[derive(Debug, Clone)]
pub struct InMemoryTimeline {
    patient: Patient,
    events: IndexMap<EventCategory, Vec<ClinicalEvent>>,
}

impl InMemoryTimeline {
    pub fn new(patient: Patient) -> Self {
        Self {
            patient,
            events: IndexMap::new(),
        }
    }

    /// Append an event after all events already in its category
    pub fn push(&mut self, event: ClinicalEvent) {
        self.events.entry(event.category).or_default().push(event);
    }

    pub fn with_event(mut self, event: ClinicalEvent) -> Self {
        self.push(event);
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = ClinicalEvent>) -> Self {
        for event in events {
            self.push(event);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_document(&self) -> TimelineDocument {
        TimelineDocument {
            patient: self.patient.clone(),
            events: self.events.values().flatten().cloned().collect(),
        }
    }

    /// Parse one timeline document or an array of them (a panel)
    pub fn from_json(json: &str) -> Result<Vec<Self>, ConfigurationError> {
        let document: PanelDocument =
            serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidTimeline {
                message: e.to_string(),
            })?;
        let timelines: Vec<Self> = match document {
            PanelDocument::One(doc) => vec![doc.into()],
            PanelDocument::Many(docs) => docs.into_iter().map(Self::from).collect(),
        };
        log::debug!("Loaded {} patient timeline(s)", timelines.len());
        Ok(timelines)
    }

    /// Load timelines from a `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Vec<Self>, ConfigurationError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| ConfigurationError::io(path.display(), e))?;
                Self::from_json(&json)
            }
            _ => Err(ConfigurationError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

impl From<TimelineDocument> for InMemoryTimeline {
    fn from(document: TimelineDocument) -> Self {
        Self::new(document.patient).with_events(document.events)
    }
}

impl TimelineStore for InMemoryTimeline {
    fn patient(&self) -> &Patient {
        &self.patient
    }

    fn events(&self, category: EventCategory) -> &[ClinicalEvent] {
        self.events
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Matcher that trusts the codeset tags already carried by each event.
///
/// Every codeset counts as defined. Useful for pre-classified timelines and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConceptTagMatcher;

impl ConceptTagMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl CodesetMatcher for ConceptTagMatcher {
    fn belongs_to(&self, event: &ClinicalEvent, codeset: &str) -> bool {
        event.concepts.contains(codeset)
    }

    fn is_defined(&self, _codeset: &str) -> bool {
        true
    }
}
