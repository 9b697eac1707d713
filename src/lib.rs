#![forbid(unsafe_code)]

//! Library side of the `fetch_channel` tool: walks every upload of a public
//! YouTube channel through the Data API v3 and turns it into one JSON
//! document.

pub mod api;
pub mod channel;
pub mod config;
pub mod gate;
pub mod harvest;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod preflight;
pub mod transport;
