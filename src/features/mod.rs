// Domain features built on top of the models and API clients
pub mod context;
pub mod library;
