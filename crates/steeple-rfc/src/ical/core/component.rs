//! Component tree (RFC 5545 §3.4-3.6).

use super::{Property, Value};

/// The component kinds a published feed carries.
///
/// Everything else (`VTODO`, `VJOURNAL`, vendor `X-` blocks) is kept as
/// [`ComponentKind::Other`] with its original name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Calendar,
    Event,
    Timezone,
    /// `STANDARD`/`DAYLIGHT` rules inside a `VTIMEZONE`.
    TimezoneRule,
    Alarm,
    Other,
}

impl ComponentKind {
    /// Classifies a `BEGIN:` name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        const KINDS: [(&str, ComponentKind); 6] = [
            ("VCALENDAR", ComponentKind::Calendar),
            ("VEVENT", ComponentKind::Event),
            ("VTIMEZONE", ComponentKind::Timezone),
            ("STANDARD", ComponentKind::TimezoneRule),
            ("DAYLIGHT", ComponentKind::TimezoneRule),
            ("VALARM", ComponentKind::Alarm),
        ];

        KINDS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map_or(Self::Other, |&(_, kind)| kind)
    }
}

/// A `BEGIN:`/`END:` block with its properties and nested blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub kind: ComponentKind,
    /// Uppercased `BEGIN:` name, kept for [`ComponentKind::Other`] blocks.
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<Component>,
}

impl Component {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into().to_ascii_uppercase();
        Self {
            kind: ComponentKind::from_name(&name),
            name,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// First property called `name` (case-insensitive).
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Every property called `name`, in feed order.
    #[must_use]
    pub fn get_properties(&self, name: &str) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect()
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.get_property(name)?.as_text()
    }

    fn value(&self, name: &str) -> Option<&Value> {
        self.get_property(name).map(|p| &p.value)
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.text("UID")
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.text("SUMMARY")
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.text("DESCRIPTION")
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.text("LOCATION")
    }

    #[must_use]
    pub fn dtstart(&self) -> Option<&Value> {
        self.value("DTSTART")
    }

    #[must_use]
    pub fn dtend(&self) -> Option<&Value> {
        self.value("DTEND")
    }

    #[must_use]
    pub fn recurrence_id(&self) -> Option<&Value> {
        self.value("RECURRENCE-ID")
    }

    /// The first `RRULE`. Feeds with several rules are deprecated by RFC 5545
    /// and Google never emits them.
    #[must_use]
    pub fn rrule(&self) -> Option<&str> {
        self.value("RRULE")?.as_recur()
    }

    /// A series is anything with a rule or explicit extra dates.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.get_property("RRULE").is_some() || self.get_property("RDATE").is_some()
    }

    #[must_use]
    pub fn attachments(&self) -> Vec<&Property> {
        self.get_properties("ATTACH")
    }

    #[must_use]
    pub fn children_of_kind(&self, kind: ComponentKind) -> Vec<&Component> {
        self.children.iter().filter(|c| c.kind == kind).collect()
    }
}

/// A parsed feed: the `VCALENDAR` root and everything under it.
#[derive(Debug, Clone, PartialEq)]
pub struct ICalendar {
    pub root: Component,
}

impl ICalendar {
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.root.text("VERSION")
    }

    /// Calendar-wide zone advertised by Google and Apple exports
    /// (`X-WR-TIMEZONE`).
    #[must_use]
    pub fn declared_timezone(&self) -> Option<&str> {
        self.root.text("X-WR-TIMEZONE")
    }

    #[must_use]
    pub fn events(&self) -> Vec<&Component> {
        self.root.children_of_kind(ComponentKind::Event)
    }
}
