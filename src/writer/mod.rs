//! Output writers. Each takes a finished model and an output directory.
pub mod json;
