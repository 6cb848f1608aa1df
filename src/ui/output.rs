//! Everything that ends up on the console.
//!
//! The final result goes to stdout so it can be piped; banners and packet dumps are for the user at the terminal.
use ansi_term::Colour;
use crate::analyser::containers::{Mode, PacketRecord, Summary};
use crate::analyser::core::Outcome;
use crate::error::Result;

/// Pretty-printed JSON, the form the summary is shown and sent in.
pub fn data_as_json(summary: &Summary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// Dumps one packet during a debug run.
pub fn print_packet(index: u64, packet: &PacketRecord) {
    println!("{}", Colour::Red.paint(format!("Packet {index}:")));
    print!("{packet}");
    println!("---------");
}

pub fn print_mode_banner(mode: Mode) {
    let banner = match mode {
        Mode::Debug => "Debug mode: No data sent to OpenAI.",
        Mode::Summarize => "Summarize mode: No data sent to OpenAI.",
        Mode::AiSummarize => "AISummarize mode: Sending summary to OpenAI for evaluation.",
        Mode::Normal => "Sending summary to OpenAI for analysis.",
    };
    eprintln!("{}", Colour::Fixed(226).paint(banner));
}

pub fn print_outcome(outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Summary(summary) => println!("{}", data_as_json(summary)?),
        Outcome::Insights(text) => println!("{text}"),
    }
    Ok(())
}
