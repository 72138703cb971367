pub mod client;

pub use client::{FlightQuote, FlightSearchClient};
