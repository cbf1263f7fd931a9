// Showings monitor: alerts on new rows in an embedded showings activity log.
//
// This is the library root. Each module corresponds to one stage of a poll
// cycle (scrape, db, notify) or to the loop and surfaces around it.

pub mod config;
pub mod db;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod scrape;
pub mod showing;
pub mod status;

#[cfg(feature = "web")]
pub mod web;
