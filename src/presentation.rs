//! Server-side view building: type filter, weekend bucketing and sorting.

use crate::types::{Event, EventType};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Distance,
    Type,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Query string of `GET /api/view`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
}

impl ViewQuery {
    /// `None` means every type; blank and "all" count as no filter.
    pub fn type_filter(&self) -> Option<EventType> {
        match self.event_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) if label.eq_ignore_ascii_case("all") => None,
            Some(label) => Some(EventType::from_label(label)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub weekend: Vec<Event>,
    pub others: Vec<Event>,
    pub total: usize,
}

/// Half-open window [Saturday 00:00, Monday 00:00) of the current weekend if
/// `now` falls on one, otherwise of the next.
pub fn weekend_window(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let today = now.date();
    let saturday = match today.weekday() {
        Weekday::Sat => today,
        Weekday::Sun => today - Duration::days(1),
        wd => today + Duration::days(5 - wd.num_days_from_monday() as i64),
    };
    let start = saturday.and_time(NaiveTime::MIN);
    (start, start + Duration::days(2))
}

pub fn is_this_weekend(event: &Event, now: NaiveDateTime) -> bool {
    let (start, end) = weekend_window(now);
    event.date.map_or(false, |date| date >= start && date < end)
}

pub fn filter_by_type(events: &[Event], event_type: Option<EventType>) -> Vec<Event> {
    events
        .iter()
        .filter(|e| event_type.map_or(true, |t| e.event_type == t))
        .cloned()
        .collect()
}

// Missing values sort after present ones in either direction
fn cmp_present<T>(a: Option<T>, b: Option<T>, order: SortOrder, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => cmp(&a, &b),
            SortOrder::Desc => cmp(&b, &a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort in place.
pub fn sort_events(events: &mut [Event], key: SortKey, order: SortOrder) {
    match key {
        SortKey::Date => events.sort_by(|a, b| cmp_present(a.date, b.date, order, Ord::cmp)),
        SortKey::Distance => {
            events.sort_by(|a, b| cmp_present(a.distance, b.distance, order, f64::total_cmp))
        }
        SortKey::Type => events.sort_by(|a, b| {
            let by_type = match order {
                SortOrder::Asc => a.event_type.as_str().cmp(b.event_type.as_str()),
                SortOrder::Desc => b.event_type.as_str().cmp(a.event_type.as_str()),
            };
            by_type.then_with(|| cmp_present(a.date, b.date, SortOrder::Asc, Ord::cmp))
        }),
    }
}

pub fn build_view(events: &[Event], query: &ViewQuery, now: NaiveDateTime) -> EventView {
    let mut filtered = filter_by_type(events, query.type_filter());
    sort_events(&mut filtered, query.sort, query.order);
    let total = filtered.len();
    let (weekend, others) = filtered
        .into_iter()
        .partition(|event| is_this_weekend(event, now));
    EventView {
        weekend,
        others,
        total,
    }
}
