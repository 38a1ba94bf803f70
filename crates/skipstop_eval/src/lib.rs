pub mod instance;
pub mod service;
pub mod solution;
pub mod stats;
