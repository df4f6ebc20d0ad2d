pub mod engine;

pub use engine::{DecisionEngine, EngineError};
