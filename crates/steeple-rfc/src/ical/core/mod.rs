//! iCalendar core models (RFC 5545).
//!
//! Read-only representation of a parsed feed. Unknown properties and
//! components are kept so callers can look at `X-` extensions.

mod component;
mod parameter;
mod property;
mod value;

pub use component::{Component, ComponentKind, ICalendar};
pub use parameter::Parameter;
pub use property::{ContentLine, Property};
pub use value::{DateTime, DateTimeForm, Value};
