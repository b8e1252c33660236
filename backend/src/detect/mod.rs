pub mod classifier;
pub mod drought;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod preprocess;
