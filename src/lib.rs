pub mod config;
pub mod dataset;
pub mod engine;
pub mod logging;
pub mod naive_bayes;
pub mod pipeline;
pub mod server;
pub mod types;
pub mod vectorizer;
