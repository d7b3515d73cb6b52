pub mod headless;
pub mod messages;
