use crate::error::{Error, Result};
use crate::insight::{InsightClient, Prompt};
use crate::ui::output;
use super::containers::{Mode, PacketRecord, RunConfig, Summary, NO_TRANSPORT};
use super::utils::PacketSource;

/// What a run hands back to `main` for printing.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Summary(Summary),
    Insights(String),
}

/// Pulls packets from `source` and folds them into a [Summary].
///
/// With `max_packets = Some(n)` at most n packets are requested from the source; the rest of the
/// capture is never read. `on_packet` sees every visited packet (1-based index) before it is counted.
pub fn summarise<S, F>(source: &mut S, max_packets: Option<u64>, mut on_packet: F) -> Result<Summary>
where
    S: PacketSource + ?Sized,
    F: FnMut(u64, &PacketRecord),
{
    log::info!("Summarising packets.");
    let mut summary = Summary::default();

    loop {
        if max_packets.is_some_and(|max| summary.total_packets >= max) {
            log::info!("Reached packet limit of {}", summary.total_packets);
            break;
        }

        let packet = match source.next_packet()? {
            Some(packet) => packet,
            None => break,
        };
        summary.total_packets += 1;
        on_packet(summary.total_packets, &packet);

        if let Some(network) = &packet.network {
            let tag = network.transport.as_deref().unwrap_or(NO_TRANSPORT);
            *summary.protocol_distribution.entry(tag.to_string()).or_insert(0) += 1;
            summary.source_ips.insert(network.src.clone());
            summary.destination_ips.insert(network.dst.clone());
        }

        for name in packet.layer_names() {
            *summary.layer_counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    log::info!(
        "Summarised {} packets, {} distinct layers.",
        summary.total_packets,
        summary.layer_counts.len()
    );
    Ok(summary)
}

/// Runs one analysis according to `config.mode`.
///
/// Debug and Summarize modes return the summary and never touch `client`. The other modes
/// serialize the summary and return the model's answer; they need a client.
pub fn run_analysis<S>(
    config: &RunConfig,
    source: &mut S,
    client: Option<&dyn InsightClient>,
) -> Result<Outcome>
where
    S: PacketSource + ?Sized,
{
    let debug = config.mode == Mode::Debug;
    let summary = summarise(source, config.max_packets, |index, packet| {
        if debug {
            output::print_packet(index, packet);
        }
    })?;

    output::print_mode_banner(config.mode);

    let prompt = match config.mode {
        Mode::Debug | Mode::Summarize => return Ok(Outcome::Summary(summary)),
        Mode::AiSummarize => Prompt::LayerEvaluation,
        Mode::Normal => Prompt::TrafficAnalysis,
    };

    let client = client.ok_or_else(|| {
        Error::Auth(format!("{} mode needs an insight client but none was configured", config.mode))
    })?;

    let data = output::data_as_json(&summary)?;
    let insights = client.analyse(&data, prompt)?;
    Ok(Outcome::Insights(insights))
}
