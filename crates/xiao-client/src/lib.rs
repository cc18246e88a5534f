pub mod action;
pub mod app;
pub mod app_state;
pub mod breadcrumb;
pub mod chat;
pub mod console;
pub mod intent;
pub mod player;
pub mod theme;
