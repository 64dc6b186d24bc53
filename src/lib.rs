//! stackforge: declarative CloudFormation generation.
//!
//! Resources are declared into a typed graph whose references are checked as
//! they are added, then emitted as a single JSON or YAML document.

pub mod cli;
pub mod core;
pub mod resources;
pub mod stacks;
