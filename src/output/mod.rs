//! Output formatting for range listings.
//!
//! This module handles printing ranges and supernets:
//! - [`csv`] - CSV output with gap rows
//! - [`terminal`] - field padding and status colors

mod csv;
mod terminal;

pub use csv::{range_print, supernet_print};
pub use terminal::{format_field, status_field, status_label};
