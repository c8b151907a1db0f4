//! Askama templates for the web frontend.

use askama::Template;

use crate::lookup::LookupOutcome;

use super::dto::FacilityResult;

// ============================================================================
// Page Templates (extend base.html)
// ============================================================================

/// Home page with the address search form.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub monthly_limit: u32,
    pub result_limit: usize,
}

// ============================================================================
// Fragment Templates (form responses, no base.html)
// ============================================================================

/// Lookup results fragment.
#[derive(Template)]
#[template(path = "results.html")]
pub struct ResultsTemplate {
    pub address: String,
    pub origin: String,
    pub results: Vec<ResultView>,
    pub remaining: i64,
}

impl ResultsTemplate {
    pub fn from_outcome(address: &str, outcome: &LookupOutcome) -> Self {
        Self {
            address: address.trim().to_string(),
            origin: outcome.origin.to_string(),
            results: outcome
                .results
                .iter()
                .map(|r| ResultView::from_result(&FacilityResult::from_ranked(r)))
                .collect(),
            remaining: outcome.remaining.max(0),
        }
    }
}

/// Message shown in place of results.
#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    pub message: String,
}

// ============================================================================
// View Models (for templates)
// ============================================================================

/// One result row, pre-formatted for display.
#[derive(Debug, Clone)]
pub struct ResultView {
    pub name: String,
    pub full_address: String,
    pub distance: String,
    pub capacity: String,
    pub distributor: String,
    pub forecasts: Vec<ForecastView>,
    pub map_link: String,
}

impl ResultView {
    pub fn from_result(r: &FacilityResult) -> Self {
        Self {
            name: r.name.clone(),
            full_address: r.full_address.clone(),
            distance: format!("{:.2} km", r.distance_km),
            capacity: format_mw(r.available_capacity_mw),
            distributor: r.distributor.clone(),
            forecasts: r
                .forecast_by_year
                .iter()
                .map(|(&year, &mw)| ForecastView {
                    year,
                    capacity: format_mw(mw),
                })
                .collect(),
            map_link: format!(
                "https://www.openstreetmap.org/?mlat={}&mlon={}#map=15/{}/{}",
                r.latitude, r.longitude, r.latitude, r.longitude
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForecastView {
    pub year: u16,
    pub capacity: String,
}

fn format_mw(mw: f64) -> String {
    format!("{mw} MW")
}
