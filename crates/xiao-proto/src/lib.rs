pub mod config;
pub mod platform;
pub mod prefs;
pub mod protocol;
