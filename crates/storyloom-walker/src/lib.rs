//! Storyloom — Graph Walker.
//!
//! Responsible for navigating a story: resolving nodes, folding their
//! consequences into story state, filtering choices and reporting visits
//! and completed routes to the progress ledger.

pub mod application;
pub mod domain;

pub use application::walker::GraphWalker;
pub use domain::history::WalkHistory;
pub use domain::step::{ChoiceOutcome, Step, StoryTotals};
