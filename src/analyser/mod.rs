//! Packet loading and summarising.
//! tshark does the dissection; we count what comes out of it and decide what to do with the result.
pub mod utils;
pub mod core;
pub mod containers;

#[cfg(test)]
pub mod testing;
