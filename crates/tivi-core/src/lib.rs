//! tivi-core — shared model, playlist parsing, catalog state, and
//! preference persistence for the tivi IPTV shell.

pub mod catalog;
pub mod config;
pub mod model;
pub mod platform;
pub mod playlist;
pub mod prefs;
