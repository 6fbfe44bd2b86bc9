//! TCP front end: accept loop and background maintenance.

pub mod listener;
