mod analyser;
mod error;
mod insight;
mod ui;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::{env, path::PathBuf, process};
use analyser::containers::{Mode, RunConfig};
use analyser::utils::TsharkSource;
use error::Result;
use insight::{ApiKey, InsightClient, OpenAiClient};
use ui::output;

/// Summarise a packet capture and have a language model explain it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The OpenAI model to use (e.g., gpt-4o, gpt-4o-mini)
    #[arg(short = 'm', long, default_value = "gpt-4o-mini", value_parser)]
    model: String,

    /// pcap/pcapng file to analyze
    #[arg(short = 'p', long, value_parser)]
    pcap: PathBuf,

    /// Lua dissection script for tshark
    #[arg(short = 'l', long, value_parser)]
    lua: Option<PathBuf>,

    /// Maximum number of packets to process, all packets if not set
    #[arg(long = "max_packets", value_parser)]
    max_packets: Option<u64>,

    /// Print every packet and skip the OpenAI upload
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Output the layer and protocol summary and skip the OpenAI upload
    #[arg(long, action = ArgAction::SetTrue)]
    summarize: bool,

    /// Send the layer and protocol summary to OpenAI for evaluation
    #[arg(long, action = ArgAction::SetTrue)]
    aisummarize: bool,

    /// Maximum number of tokens in the OpenAI response
    #[arg(long = "max_tokens", default_value_t = 500, value_parser)]
    max_tokens: u32,
}

impl Args {
    fn into_config(self) -> RunConfig {
        RunConfig {
            pcap: self.pcap,
            lua_script: self.lua,
            max_packets: self.max_packets,
            model: self.model,
            max_tokens: self.max_tokens,
            mode: Mode::from_flags(self.debug, self.summarize, self.aisummarize),
        }
    }
}

/// Builds the insight client if the mode needs one.
///
/// Runs before the capture is touched, so a missing key fails fast.
fn build_client(config: &RunConfig, api_key: Option<String>, base_url: &str) -> Result<Option<OpenAiClient>> {
    if !config.mode.uses_model() {
        return Ok(None);
    }
    let api_key = ApiKey::new(api_key)?;
    OpenAiClient::new(api_key, base_url, &config.model, config.max_tokens).map(Some)
}

fn run(config: &RunConfig, api_key: Option<String>, base_url: &str) -> Result<()> {
    log::info!("Running in {} mode.", config.mode);
    let client = build_client(config, api_key, base_url)?;

    let outcome = {
        let mut source = TsharkSource::open(&config.pcap, config.lua_script.as_deref())?;
        analyser::core::run_analysis(
            config,
            &mut source,
            client.as_ref().map(|client| client as &dyn InsightClient),
        )?
    };

    output::print_outcome(&outcome)
}

fn main() {
    if let Err(err) = SimpleLogger::new().with_level(LevelFilter::Warn).env().init() {
        eprintln!("Could not set up logging: {err}");
    }

    let config = Args::parse().into_config();
    let api_key = env::var(insight::API_KEY_ENV).ok();
    let base_url = insight::base_url_from_env();

    if let Err(err) = run(&config, api_key, &base_url) {
        log::error!("{err}");
        process::exit(1);
    }
}
