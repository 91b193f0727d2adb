pub mod actor;
pub mod coordinate;
pub mod event;
pub mod event_type;
pub mod shift;
pub mod site;

pub use actor::{Actor, ActorRole, MemberRole, Membership, Profile};
pub use coordinate::Coordinate;
pub use event::{Classification, GeofenceEvent, TimeEntryEvent, new_event_id};
pub use event_type::{EventSource, GeofenceEventType, ShiftEventType};
pub use shift::Shift;
pub use site::{DEFAULT_RADIUS_M, Site};
