pub mod event_log;
pub mod persistence;
pub mod report;
