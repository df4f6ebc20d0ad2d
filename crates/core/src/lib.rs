pub mod config;
pub mod decision;
pub mod domain;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use decision::{
    decide, BranchPath, BranchToken, DecisionOutcome, DecisionSettings, DecisionState, NextAction,
    PathParseError,
};
pub use domain::filter::{FilterAttribute, FilterTier, PriceRange, StrengthRange, WineFilter};
pub use domain::record::{DecisionRecord, RecordId, UserId};
