//! Usage: Tauri command surface, grouped by area. `lib.rs` re-exports
//! everything for `generate_handler!`.

pub(crate) mod app;
pub(crate) mod settings;
pub(crate) mod views;

pub(crate) use app::*;
pub(crate) use settings::*;
pub(crate) use views::*;
