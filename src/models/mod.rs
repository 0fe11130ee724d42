pub mod user;
pub mod event;
pub mod rsvp;
pub mod team;

pub use user::User;
pub use event::{Event, EventType, HomeAway};
pub use rsvp::{Rsvp, RsvpCounts, RsvpStatus};
pub use team::TeamMembership;
