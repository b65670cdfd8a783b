//! Command-line surface: argument parsing, command dispatch, and the JSON
//! response printed for the POS.

pub mod cli;
pub mod response;
