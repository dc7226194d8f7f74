//! Capabilities the measure engine reads patient data through

use crate::codeset::CodesetRef;
use octofhir_cqm_types::{ClinicalEvent, EventCategory, Patient};
use std::sync::Arc;

/// Read-only view of one patient's categorized clinical events.
///
/// Implementations must be deterministic: identical contents yield identical
/// slices in identical order. The order of a category's slice is the stable
/// ordering used to break same-timestamp ties (later wins).
pub trait TimelineStore: Send + Sync {
    /// The patient the timeline belongs to
    fn patient(&self) -> &Patient;

    /// All events of one category, in timeline order
    fn events(&self, category: EventCategory) -> &[ClinicalEvent];
}

/// Membership test "does event E belong to concept group G".
///
/// Supplied by a value-set catalog; any implementation (static lookup,
/// terminology service, tagged events) is acceptable as long as it is pure.
pub trait CodesetMatcher: Send + Sync {
    /// Whether `event` belongs to the codeset named `codeset`
    fn belongs_to(&self, event: &ClinicalEvent, codeset: &str) -> bool;

    /// Whether the matcher knows the codeset at all; checked at registration
    fn is_defined(&self, codeset: &str) -> bool;

    /// Stop accepting codeset changes. A measure registry calls this when it
    /// takes the matcher, so codesets validated at registration stay put.
    fn freeze(&self) {}

    /// Union membership: true if `event` belongs to any of `codesets`
    fn belongs_to_any(&self, event: &ClinicalEvent, codesets: &CodesetRef) -> bool {
        codesets.iter().any(|codeset| self.belongs_to(event, codeset))
    }
}

macro_rules! forward_timeline_store {
    ($($ptr:ty),*) => {$(
        impl<T: TimelineStore + ?Sized> TimelineStore for $ptr {
            fn patient(&self) -> &Patient {
                (**self).patient()
            }

            fn events(&self, category: EventCategory) -> &[ClinicalEvent] {
                (**self).events(category)
            }
        }
    )*};
}

macro_rules! forward_codeset_matcher {
    ($($ptr:ty),*) => {$(
        impl<T: CodesetMatcher + ?Sized> CodesetMatcher for $ptr {
            fn belongs_to(&self, event: &ClinicalEvent, codeset: &str) -> bool {
                (**self).belongs_to(event, codeset)
            }

            fn is_defined(&self, codeset: &str) -> bool {
                (**self).is_defined(codeset)
            }

            fn freeze(&self) {
                (**self).freeze()
            }
        }
    )*};
}

forward_timeline_store!(&T, Box<T>, Arc<T>);
forward_codeset_matcher!(&T, Box<T>, Arc<T>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConceptTagMatcher, InMemoryTimeline};
    use chrono::{TimeZone, Utc};

    fn count_visits(store: impl TimelineStore) -> usize {
        store.events(EventCategory::Encounter).len()
    }

    fn is_office_visit(matcher: impl CodesetMatcher, event: &ClinicalEvent) -> bool {
        matcher.belongs_to(event, "OfficeVisit")
    }

    #[test]
    fn test_smart_pointers_forward_to_the_store() {
        let visit = ClinicalEvent::new(
            "v1",
            EventCategory::Encounter,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        )
        .in_concept("OfficeVisit");
        let timeline = InMemoryTimeline::new(Patient::new("p1", "Jane")).with_event(visit.clone());

        assert_eq!(count_visits(&timeline), 1);
        assert_eq!(count_visits(Box::new(timeline.clone()) as Box<dyn TimelineStore>), 1);
        assert_eq!(count_visits(Arc::new(timeline)), 1);

        assert!(is_office_visit(&ConceptTagMatcher::new(), &visit));
        assert!(is_office_visit(Box::new(ConceptTagMatcher::new()) as Box<dyn CodesetMatcher>, &visit));
        assert!(is_office_visit(Arc::new(ConceptTagMatcher::new()), &visit));
    }
}
