//! Expansion of feed events into concrete occurrences inside a window.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use steeple_core::util::slug::generate_slug;
use steeple_rfc::ical::expand::{OccurrenceRule, TimeZoneResolver, date_to_utc};
use steeple_rfc::ical::{Component, DateTimeForm, ICalendar, Value};

use super::attachment::image_attachments;
use super::model::{
    CalendarEvent, RecurrenceWindow, UNTITLED_EVENT, occurrence_id, occurrence_slug,
};
use super::sanitize::sanitize_description;

/// Hard stop for walking a single series, whatever the window and cap say.
pub const MAX_ITERATOR_STEPS: usize = 5000;

/// Resolved timing of an event's `DTSTART`.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    start: DateTime<Utc>,
    /// Zone the rule engine walks in: the declared zone, UTC for `Z` values,
    /// the calendar default for floating and all-day values.
    rule_zone: Tz,
    /// Zone reported on the occurrence.
    display_zone: Tz,
    all_day: bool,
}

/// Expands the events of one parsed feed.
///
/// Floating and all-day values are read in the calendar's `X-WR-TIMEZONE`
/// when it names a known zone, else in the configured default.
#[derive(Debug)]
pub struct RecurrenceExpander {
    default_tz: Tz,
    resolver: TimeZoneResolver,
}

impl RecurrenceExpander {
    #[must_use]
    pub fn new(default_tz: Tz) -> Self {
        Self {
            default_tz,
            resolver: TimeZoneResolver::new(),
        }
    }

    /// ## Summary
    /// Expands every event in the calendar into occurrences inside `window`.
    ///
    /// Overrides (`RECURRENCE-ID`) replace the instance they name and are not
    /// emitted on their own while their series exists. Results are in feed
    /// order, not sorted.
    pub fn expand_calendar(
        &mut self,
        ical: &ICalendar,
        window: &RecurrenceWindow,
    ) -> Vec<CalendarEvent> {
        if let Some(declared) = ical.declared_timezone() {
            match self.resolver.resolve(declared) {
                Ok(tz) => self.default_tz = tz,
                Err(e) => tracing::warn!(error = %e, "Ignoring calendar X-WR-TIMEZONE"),
            }
        }

        let events = ical.events();
        let masters: HashSet<&str> = events
            .iter()
            .filter(|e| e.recurrence_id().is_none())
            .filter_map(|e| e.uid())
            .collect();

        let mut overrides: HashMap<&str, Vec<&Component>> = HashMap::new();
        for event in &events {
            if event.recurrence_id().is_some()
                && let Some(uid) = event.uid()
                && masters.contains(uid)
            {
                overrides.entry(uid).or_default().push(event);
            }
        }

        let mut out = Vec::new();
        for event in events {
            let is_override = event.recurrence_id().is_some();
            let has_master = event.uid().is_some_and(|uid| masters.contains(uid));
            if is_override && has_master {
                continue;
            }

            let event_overrides = if is_override {
                &[][..]
            } else {
                event
                    .uid()
                    .and_then(|uid| overrides.get(uid))
                    .map_or(&[][..], Vec::as_slice)
            };
            out.extend(self.expand_event(event, event_overrides, window));
        }

        tracing::debug!(occurrences = out.len(), "Expanded calendar");
        out
    }

    /// ## Summary
    /// Expands one event into its occurrences inside `window`.
    ///
    /// Non-recurring events yield at most one occurrence. Recurring events are
    /// walked from their original `DTSTART`, capped at
    /// `window.per_event_limit` emitted occurrences and
    /// [`MAX_ITERATOR_STEPS`] iterator steps. An unusable rule is logged and
    /// the event is treated as a single occurrence.
    pub fn expand_event(
        &mut self,
        master: &Component,
        overrides: &[&Component],
        window: &RecurrenceWindow,
    ) -> Vec<CalendarEvent> {
        if window.per_event_limit == 0 {
            return Vec::new();
        }

        let Some(anchor) = self.anchor(master) else {
            tracing::debug!(uid = master.uid(), "Skipping event without a usable DTSTART");
            return Vec::new();
        };
        let duration = self.duration(master, &anchor);

        let single = |this: &Self| {
            if window.contains(anchor.start) {
                vec![this.build(master, master, anchor.start, anchor.start + duration, &anchor)]
            } else {
                Vec::new()
            }
        };

        if !master.is_recurring() {
            return single(self);
        }

        let exdates = self.date_list(master, "EXDATE", anchor.rule_zone);
        let rdates = self.date_list(master, "RDATE", anchor.rule_zone);
        let rule = match OccurrenceRule::new(
            master.rrule(),
            anchor.start,
            anchor.rule_zone,
            &exdates,
            &rdates,
        ) {
            Ok(rule) => rule.starting_at(window.start),
            Err(e) => {
                tracing::warn!(
                    uid = master.uid(),
                    rrule = master.rrule(),
                    error = %e,
                    "Unusable recurrence rule, treating event as non-recurring"
                );
                return single(self);
            }
        };

        let by_instance = self.index_overrides(overrides, anchor.rule_zone);

        let mut out = Vec::new();
        for (step, instance) in rule.occurrences().enumerate() {
            if step >= MAX_ITERATOR_STEPS {
                tracing::warn!(uid = master.uid(), "Recurrence walk hit the step limit");
                break;
            }
            if instance < window.start {
                continue;
            }
            if instance > window.end {
                break;
            }

            let occurrence = match by_instance.get(&instance) {
                Some(&replacement) => {
                    self.build_override(master, replacement, instance, duration, &anchor)
                }
                None => self.build(master, master, instance, instance + duration, &anchor),
            };
            // An override may move its instance out of the window.
            if !window.contains(occurrence.start) {
                continue;
            }
            out.push(occurrence);
            if out.len() >= window.per_event_limit {
                break;
            }
        }

        out
    }

    fn anchor(&mut self, component: &Component) -> Option<Anchor> {
        match component.dtstart()? {
            Value::DateTime(dt) => {
                let start = self
                    .resolver
                    .utc_instant(dt, self.default_tz)
                    .inspect_err(|e| tracing::warn!(error = %e, "Unconvertible DTSTART"))
                    .ok()?;
                let display_zone = self.resolver.zone_for(dt, self.default_tz);
                let rule_zone = match dt.form {
                    DateTimeForm::Utc => Tz::UTC,
                    DateTimeForm::Floating | DateTimeForm::Zoned { .. } => display_zone,
                };
                Some(Anchor {
                    start,
                    rule_zone,
                    display_zone,
                    all_day: false,
                })
            }
            Value::Date(date) => {
                let start = date_to_utc(*date, self.default_tz).ok()?;
                Some(Anchor {
                    start,
                    rule_zone: self.default_tz,
                    display_zone: self.default_tz,
                    all_day: true,
                })
            }
            _ => None,
        }
    }

    /// `DTEND - DTSTART`, else `DURATION`, else zero (timed) or one day (all-day).
    fn duration(&mut self, component: &Component, anchor: &Anchor) -> TimeDelta {
        let end = match component.dtend() {
            Some(Value::DateTime(dt)) => self.resolver.utc_instant(dt, self.default_tz).ok(),
            Some(Value::Date(date)) => date_to_utc(*date, anchor.rule_zone).ok(),
            _ => None,
        };
        if let Some(end) = end {
            return end - anchor.start;
        }

        if let Some(duration) = component
            .get_property("DURATION")
            .and_then(|p| p.value.as_duration())
        {
            return duration;
        }

        if anchor.all_day {
            TimeDelta::days(1)
        } else {
            TimeDelta::zero()
        }
    }

    fn date_list(&mut self, component: &Component, name: &str, zone: Tz) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        for prop in component.get_properties(name) {
            match &prop.value {
                Value::DateTimeList(list) => out.extend(
                    list.iter()
                        .filter_map(|dt| self.resolver.utc_instant(dt, zone).ok()),
                ),
                Value::DateList(list) => {
                    out.extend(list.iter().filter_map(|d| date_to_utc(*d, zone).ok()));
                }
                _ => tracing::debug!(property = name, "Ignoring untyped date list"),
            }
        }
        out
    }

    fn recurrence_instant(&mut self, component: &Component, zone: Tz) -> Option<DateTime<Utc>> {
        match component.recurrence_id()? {
            Value::DateTime(dt) => self.resolver.utc_instant(dt, zone).ok(),
            Value::Date(date) => date_to_utc(*date, zone).ok(),
            _ => None,
        }
    }

    fn index_overrides<'a>(
        &mut self,
        overrides: &[&'a Component],
        zone: Tz,
    ) -> HashMap<DateTime<Utc>, &'a Component> {
        overrides
            .iter()
            .filter_map(|&c| Some((self.recurrence_instant(c, zone)?, c)))
            .collect()
    }

    fn build_override(
        &mut self,
        master: &Component,
        replacement: &Component,
        instance: DateTime<Utc>,
        master_duration: TimeDelta,
        master_anchor: &Anchor,
    ) -> CalendarEvent {
        let Some(anchor) = self.anchor(replacement) else {
            let end = instance + master_duration;
            return self.build(replacement, master, instance, end, master_anchor);
        };

        let has_own_end = replacement.dtend().is_some()
            || replacement.get_property("DURATION").is_some();
        let duration = if has_own_end {
            self.duration(replacement, &anchor)
        } else {
            master_duration
        };

        self.build(replacement, master, anchor.start, anchor.start + duration, &anchor)
    }

    /// Builds one occurrence; `primary` wins over `master` field by field.
    fn build(
        &self,
        primary: &Component,
        master: &Component,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        anchor: &Anchor,
    ) -> CalendarEvent {
        let pick = |f: fn(&Component) -> Option<&str>| {
            f(primary)
                .or_else(|| f(master))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let title = pick(Component::summary).unwrap_or(UNTITLED_EVENT).to_string();
        let uid = master
            .uid()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| format!("no-uid-{}", generate_slug(&title)), str::to_string);
        let description = primary
            .description()
            .or_else(|| master.description())
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string);
        let description_html = description.as_deref().and_then(sanitize_description);

        let mut images = image_attachments(primary);
        if images.is_empty() && !std::ptr::eq(primary, master) {
            images = image_attachments(master);
        }

        CalendarEvent {
            id: occurrence_id(&uid, start),
            slug: occurrence_slug(&title, &uid, start, anchor.display_zone),
            uid,
            title,
            start,
            end,
            time_zone: anchor.display_zone.name().to_string(),
            all_day: anchor.all_day,
            location: pick(Component::location).map(str::to_string),
            description,
            description_html,
            thumbnail_url: images.first().map(|i| i.thumbnail_url.clone()),
            images,
        }
    }
}
