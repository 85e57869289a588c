use std::env;
use std::fs::File;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode, WriteLogger};

pub mod gemini;
pub mod store;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to initialize http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

const DEFAULT_ABOUT: &str = "Hey there! I am using Messenger.";

#[derive(Clone, Debug, PartialEq)]
pub enum Env {
    Local,
    Dev,
    Stage,
    Production,
}

impl Env {
    pub fn from_env() -> Self {
        env::var("ENV")
            .map(|env| match env.as_str() {
                "dev" => Env::Dev,
                "stg" => Env::Stage,
                "prod" => Env::Production,
                _ => Env::Local,
            })
            .unwrap_or(Env::Local)
    }

    pub const fn is_local(&self) -> bool {
        matches!(self, Env::Local)
    }
}

#[derive(Clone)]
pub struct Config {
    pub env: Env,
    pub gemini: gemini::Config,
    pub default_about: String,
}

impl Default for Config {
    fn default() -> Self {
        dotenv().ok();

        let default_about = env::var("DEFAULT_ABOUT").unwrap_or(DEFAULT_ABOUT.into());

        Self {
            env: Env::from_env(),
            gemini: gemini::Config::env().unwrap_or_default(),
            default_about,
        }
    }
}

impl Config {
    /// Configuration for tests and embedding: no env lookups, no API key.
    pub fn local() -> Self {
        Self {
            env: Env::Local,
            gemini: gemini::Config::default(),
            default_about: DEFAULT_ABOUT.into(),
        }
    }
}

/// Installs the terminal + file logger. Only binaries call this.
pub fn init_logger() {
    dotenv().ok();

    let rust_log = env::var("RUST_LOG").unwrap_or("info".into());
    let level = LevelFilter::from_str(&rust_log).unwrap_or(LevelFilter::Info);
    let log_file = env::var("SERVICE_NAME")
        .map(|pkg| format!("{pkg}.log"))
        .unwrap_or("messenger-sync.log".into());

    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![TermLogger::new(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    match File::create(&log_file) {
        Ok(file) => loggers.push(WriteLogger::new(level, simplelog::Config::default(), file)),
        Err(e) => eprintln!("could not create log file {log_file}: {e}"),
    }

    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("logger already initialized: {e}");
    }
}

pub fn init_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}
