pub mod path;
pub mod states;
pub mod table;

pub use path::{BranchPath, BranchToken, PathParseError, PATH_SEPARATOR};
pub use states::{DecisionOutcome, DecisionSettings, DecisionState, NextAction};
pub use table::decide;
