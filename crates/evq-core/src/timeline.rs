//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evq_client::{EventType, JourneyEvent};
use serde_json::Value;

use crate::reconciler::plain_number;
use crate::surface::{SurfaceError, TimelineSurface};

/// Visual class of a journey event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Info,
    Moved,
    Charging,
    Warning,
    Abandoned,
}

impl EventCategory {
    pub fn classify(event_type: &EventType) -> Self {
        match event_type {
            EventType::Moved => EventCategory::Moved,
            EventType::StartedCharging
            | EventType::ChargingProgress
            | EventType::ChargingComplete => EventCategory::Charging,
            EventType::InsufficientBattery | EventType::ChargingNeeded => EventCategory::Warning,
            EventType::Abandoned => EventCategory::Abandoned,
            EventType::Initialized
            | EventType::JoinedQueue
            | EventType::TripCompleted
            | EventType::Other(_) => EventCategory::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Info => "info",
            EventCategory::Moved => "moved",
            EventCategory::Charging => "charging",
            EventCategory::Warning => "warning",
            EventCategory::Abandoned => "abandoned",
        }
    }
}

/// One rendered timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineItem {
    pub time: String,
    pub title: String,
    pub category: EventCategory,
    /// `(label, value)` pairs in backend order.
    pub details: Vec<(String, String)>,
}

impl From<&JourneyEvent> for TimelineItem {
    fn from(event: &JourneyEvent) -> Self {
        Self {
            time: event.timestamp.display_time(),
            title: event.event_type.display_name().to_owned(),
            category: EventCategory::classify(&event.event_type),
            details: event
                .details
                .iter()
                .map(|(key, value)| (title_case_label(key), detail_text(value)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelinePlaceholder {
    SelectAgent,
    NoData,
}

impl TimelinePlaceholder {
    pub fn message(self) -> &'static str {
        match self {
            TimelinePlaceholder::SelectAgent => "Select an EV to view its journey timeline.",
            TimelinePlaceholder::NoData => "No journey logs available for this EV.",
        }
    }
}

/// `battery_before` and `batteryBefore` both become `Battery Before`.
pub fn title_case_label(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in key.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn detail_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if !number.is_i64() && !number.is_u64() => plain_number(float),
            _ => number.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct TimelineRenderer {
    surface: Box<dyn TimelineSurface>,
    items: usize,
}

impl TimelineRenderer {
    pub fn new(surface: Box<dyn TimelineSurface>) -> Self {
        Self { surface, items: 0 }
    }

    /// Rebuild the timeline from a complete journey log.
    pub fn render(&mut self, events: &[JourneyEvent]) -> Result<(), SurfaceError> {
        if events.is_empty() {
            return self.show_placeholder(TimelinePlaceholder::NoData);
        }
        self.surface.clear()?;
        self.items = 0;
        for event in events {
            self.surface.append(&TimelineItem::from(event))?;
            self.items += 1;
        }
        self.surface.scroll_to_latest()
    }

    pub fn show_placeholder(&mut self, placeholder: TimelinePlaceholder) -> Result<(), SurfaceError> {
        self.items = 0;
        self.surface.show_placeholder(placeholder)
    }

    pub fn item_count(&self) -> usize {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_become_title_case() {
        assert_eq!(title_case_label("battery_before"), "Battery Before");
        assert_eq!(title_case_label("stationId"), "Station Id");
        assert_eq!(title_case_label("from"), "From");
        assert_eq!(title_case_label("wait_time_s"), "Wait Time S");
    }

    #[test]
    fn classification_table() {
        let cases = [
            ("Initialized", EventCategory::Info),
            ("Moved", EventCategory::Moved),
            ("Started Charging", EventCategory::Charging),
            ("Charging Progress", EventCategory::Charging),
            ("Charging Complete", EventCategory::Charging),
            ("Joined Queue", EventCategory::Info),
            ("Insufficient Battery", EventCategory::Warning),
            ("Charging Needed", EventCategory::Warning),
            ("Abandoned", EventCategory::Abandoned),
            ("Trip Completed", EventCategory::Info),
            ("Teleported", EventCategory::Info),
        ];
        for (raw, expected) in cases {
            let event_type = EventType::from(raw.to_owned());
            assert_eq!(EventCategory::classify(&event_type), expected, "{raw}");
        }
    }

    #[test]
    fn item_keeps_detail_order_and_formats_values() {
        let event: JourneyEvent = serde_json::from_value(json!({
            "timestamp": "2024-03-01T14:02:09",
            "event": "Charging Complete",
            "details": {"battery_after": "80.0%", "charged_kwh": 12.5, "stationId": "station-4", "queue": 2}
        }))
        .unwrap();
        let item = TimelineItem::from(&event);
        assert_eq!(item.time, "14:02:09");
        assert_eq!(item.category, EventCategory::Charging);
        assert_eq!(
            item.details,
            vec![
                ("Battery After".to_owned(), "80.0%".to_owned()),
                ("Charged Kwh".to_owned(), "12.5".to_owned()),
                ("Station Id".to_owned(), "station-4".to_owned()),
                ("Queue".to_owned(), "2".to_owned()),
            ]
        );
    }
}
