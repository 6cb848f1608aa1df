use std::fmt;

const SYSTEM_INSTRUCTION: &str = "You are a network traffic analysis assistant. \
    Help analyze and extract insights from network packet data.";

/// The fixed instructions sent along with a capture summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// Who talks to whom, how much, and over which protocols.
    TrafficAnalysis,
    /// Evaluate the per-layer and per-protocol breakdown.
    LayerEvaluation,
}

impl Prompt {
    pub fn system(&self) -> &'static str {
        SYSTEM_INSTRUCTION
    }

    /// The user message with `data` embedded.
    pub fn user(&self, data: &str) -> String {
        match self {
            Prompt::TrafficAnalysis => format!(
                "Here is a network packet capture summary: {data}. Please analyze this data. \
                Summarize the address being connected, how many packets are being sent to those \
                addresses and which protocols are being used. An example of a good response is \
                'there was 1000 number of packets sent to IP address via SSH'. Identify any \
                failures or items for investigation, or anything that might be concerning to a user."
            ),
            Prompt::LayerEvaluation => format!(
                "Here is a summary of the protocol layers and transport protocols seen in a network \
                packet capture: {data}. Please evaluate this breakdown. Explain what the layer counts \
                say about the kind of traffic in the capture, point out protocols or layers that are \
                unusual for the number of packets, and note anything that deserves a closer look."
            ),
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
