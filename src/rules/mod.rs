pub mod condition;
pub mod engine;
pub mod error;

pub use engine::{Requirement, Requirements, RuleEngine};
