use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::calendar::TravelWindow;
use crate::config::Config;
use crate::error::{FareWatchError, Result};

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One priced round-trip itinerary returned by the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightQuote {
    pub total_price: f64,
    pub per_person_price: f64,
    pub airline: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration_min: u32,
}

/// Select the cheapest quote by per-person price. Ties keep the first
/// itinerary encountered at the minimum.
pub fn cheapest(quotes: &[FlightQuote]) -> Option<&FlightQuote> {
    quotes.iter().reduce(|best, q| {
        if q.per_person_price < best.per_person_price {
            q
        } else {
            best
        }
    })
}

/// SerpAPI Google Flights client for the configured route.
pub struct FlightSearchClient {
    http: Client,
    config: Config,
}

impl FlightSearchClient {
    pub fn new(config: Config) -> Result<Self> {
        // A hanging search must not stall the remaining windows.
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    /// Search nonstop round trips for one travel window. Returns every
    /// priced itinerary; the caller picks the cheapest.
    pub async fn search_flights(&self, window: &TravelWindow) -> Result<Vec<FlightQuote>> {
        info!(
            "Searching flights {}->{}  {} to {}",
            self.config.origin, self.config.destination, window.depart, window.ret,
        );

        let adults = self.config.adults.to_string();
        let children = self.config.children.to_string();
        let params = [
            ("engine", "google_flights"),
            ("departure_id", self.config.origin.as_str()),
            ("arrival_id", self.config.destination.as_str()),
            ("outbound_date", &window.depart.to_string()),
            ("return_date", &window.ret.to_string()),
            ("adults", adults.as_str()),
            ("children", children.as_str()),
            ("currency", "USD"),
            ("hl", "en"),
            ("type", "1"),  // round trip
            ("stops", "1"), // nonstop only
            ("include_airlines", self.config.airline_code.as_str()),
            ("api_key", self.config.serpapi_key.as_str()),
        ];

        let response = self.http.get(SERPAPI_URL).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("SerpAPI returned {}: {}", status, body);
            return Err(FareWatchError::search_error(format!(
                "SerpAPI returned {status}"
            )));
        }

        let data: SearchResponse = response.json().await?;

        if let Some(err) = data.error {
            return Err(FareWatchError::search_error(format!("SerpAPI error: {err}")));
        }

        let quotes = parse_quotes(data, self.config.passenger_count());
        info!("Found {} itineraries", quotes.len());
        Ok(quotes)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    best_flights: Vec<Itinerary>,
    #[serde(default)]
    other_flights: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    price: Option<f64>,
    #[serde(default)]
    flights: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    airline: Option<String>,
    departure_airport: Option<AirportTime>,
    arrival_airport: Option<AirportTime>,
    #[serde(default)]
    duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AirportTime {
    #[serde(default)]
    time: Option<String>,
}

fn parse_quotes(data: SearchResponse, passenger_count: u32) -> Vec<FlightQuote> {
    let mut quotes = Vec::new();

    for itinerary in data.best_flights.into_iter().chain(data.other_flights) {
        let Some(price) = itinerary.price else {
            continue; // unpriced itinerary
        };

        let per_person = (price / f64::from(passenger_count) * 100.0).round() / 100.0;
        let outbound = itinerary.flights.into_iter().next();

        quotes.push(FlightQuote {
            total_price: price,
            per_person_price: per_person,
            airline: outbound
                .as_ref()
                .and_then(|leg| leg.airline.clone())
                .unwrap_or_else(|| "Delta".to_string()),
            departure_time: outbound
                .as_ref()
                .and_then(|leg| leg.departure_airport.as_ref())
                .and_then(|a| a.time.clone())
                .unwrap_or_default(),
            arrival_time: outbound
                .as_ref()
                .and_then(|leg| leg.arrival_airport.as_ref())
                .and_then(|a| a.time.clone())
                .unwrap_or_default(),
            duration_min: outbound.and_then(|leg| leg.duration).unwrap_or(0),
        });
    }

    quotes
}
