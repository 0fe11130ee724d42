pub mod recurrence;
pub mod events;
pub mod rsvp;
pub mod aggregate;
pub mod roster;
pub mod notifier;
