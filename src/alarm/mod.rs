pub mod engine;
pub mod evaluator;
pub mod model;
pub mod ringing;
pub mod store;
