use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "model/spam_model.json";

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Serve SPAM/HAM predictions over HTTP", long_about = None)]
pub struct ServerConfig {
    /// Path to the trained classifier artifact
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Log verbosity, used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,
}

impl ServerConfig {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Train the spam classifier and write it to disk", long_about = None)]
pub struct TrainConfig {
    /// Where to write the fitted classifier
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub output: PathBuf,

    /// Additive smoothing for the naive Bayes estimator
    #[arg(long, env = "NB_ALPHA", default_value = "1.0", value_parser = parse_alpha)]
    pub alpha: f64,

    /// Log verbosity, used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_alpha(raw: &str) -> Result<f64, String> {
    let alpha: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if alpha.is_finite() && alpha > 0.0 {
        Ok(alpha)
    } else {
        Err(format!("alpha must be a positive number, got {alpha}"))
    }
}
