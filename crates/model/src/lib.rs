pub mod catalog;
pub mod class_session;
pub mod conflict;
pub mod ids;
pub mod recurrence;
pub mod schedule;
pub mod session;
pub mod slot;
