// External API clients module
pub mod llm;
pub mod psn;
pub mod steam;
pub mod xbox;
