//! # tourdesk-types
//!
//! Domain model shared by every tourdesk crate.
//!
//! ## Design Principles
//!
//! - Shift state is an explicit enum; the set of transitions the system
//!   reacts to is a total function over `(before, after)` pairs
//!   ([`ShiftTrigger::classify`]), never an implicit trigger convention.
//! - Assignment state is pool-wide, keyed by `(date, slot)`. Availability
//!   is guide-scoped, keyed by `(guide_id, date, slot)`. The two
//!   partitioning schemes never mix.
//! - Records that exist only as an audit trail ([`Notification`],
//!   [`AvailabilityAlert`], [`ShiftChange`]) are append-only.

mod alert;
mod change;
mod error;
mod guide;
mod ids;
mod notification;
mod shift;
mod slot;

pub use alert::{AlertKind, AvailabilityAlert};
pub use change::ShiftChange;
pub use error::{IdError, ParseError};
pub use guide::{Guide, GuideStatus};
pub use ids::{ChangeId, GuideId};
pub use notification::{Notification, NotificationKind, NotificationStatus};
pub use shift::{AvailabilityRecord, Shift, ShiftDate, ShiftState, ShiftTrigger};
pub use slot::{Slot, SlotGroup};
