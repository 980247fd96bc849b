//! qmtrainer-report: rendering of session reports.
//!
//! JSON reports are written by `qmtrainer_core::report`; this crate renders
//! the self-contained HTML versions.

pub mod html;

pub use html::{generate_html, generate_listing_html, write_html_report, write_listing_html};
