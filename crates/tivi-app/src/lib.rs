//! tivi-app — navigation state machine, stream resolver, player contract,
//! and the controller event loop for the tivi IPTV shell.

pub mod action;
pub mod app;
pub mod nav;
pub mod player;
pub mod resolver;
