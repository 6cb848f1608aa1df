use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Tag counted for packets that have a network layer but no transport layer tshark recognised.
pub const NO_TRANSPORT: &str = "null";

/// Network-layer view of a packet, present only for IPv4/IPv6 traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkLayer {
    pub src: String,
    pub dst: String,
    pub transport: Option<String>,
}

/// A single decoded protocol layer and the human-readable field lines tshark gave us for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerRecord {
    pub name: String,
    pub fields: Vec<String>,
}

impl LayerRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }
}

/// One packet as handed out by a [`PacketSource`](super::utils::PacketSource).
///
/// Whether the packet has a network layer is decided once, when the record is built.
/// Layers are kept in the order tshark dissected them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketRecord {
    pub network: Option<NetworkLayer>,
    pub layers: Vec<LayerRecord>,
}

impl PacketRecord {
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.name.as_str())
    }
}

impl fmt::Display for PacketRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for layer in &self.layers {
            writeln!(f, "Layer {}:", layer.name.to_uppercase())?;
            for field in &layer.fields {
                writeln!(f, "\t{}", field)?;
            }
        }
        Ok(())
    }
}

/// Statistical summary of a capture.
///
/// Field order is the order of the serialized JSON object.
/// Maps and sets remember first-seen order; nothing is sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_packets: u64,
    pub protocol_distribution: IndexMap<String, u64>,
    pub source_ips: IndexSet<String>,
    pub destination_ips: IndexSet<String>,
    pub layer_counts: IndexMap<String, u64>,
}

/// What the run does once the capture has been summarised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Print every packet, output the summary, never contact the model.
    Debug,
    /// Output the summary, never contact the model.
    Summarize,
    /// Ask the model to evaluate the layer and protocol breakdown.
    AiSummarize,
    /// Ask the model for a traffic analysis of the summary.
    Normal,
}

impl Mode {
    /// Resolves the CLI flags. Debug wins over summarize, which wins over aisummarize.
    pub fn from_flags(debug: bool, summarize: bool, aisummarize: bool) -> Self {
        if debug {
            Mode::Debug
        } else if summarize {
            Mode::Summarize
        } else if aisummarize {
            Mode::AiSummarize
        } else {
            Mode::Normal
        }
    }

    pub fn uses_model(&self) -> bool {
        matches!(self, Mode::AiSummarize | Mode::Normal)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Everything a run needs, fixed once the arguments are parsed.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub pcap: PathBuf,
    pub lua_script: Option<PathBuf>,
    pub max_packets: Option<u64>,
    pub model: String,
    pub max_tokens: u32,
    pub mode: Mode,
}
