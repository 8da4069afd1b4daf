#![forbid(unsafe_code)]

//! Command-line rendition of the name-form page: a profile section with
//! first and last name inputs, a derived full name, a greeting, and a reset
//! button, driven by flags instead of a browser.

pub mod cli;
pub mod error;
pub mod page;

pub use cli::{Cli, run, run_from_env};
pub use error::{DemoError, Result};
