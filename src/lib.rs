//! Gesture Duel - two-party gesture combat engine
//!
//! Each side classifies hand landmarks into actions, runs its own match state,
//! and stays consistent with its peer through telegraphed attacks and
//! authoritative health reports.

pub mod app;
pub mod config;
pub mod game;
pub mod gesture;
pub mod http;
pub mod util;
pub mod ws;
