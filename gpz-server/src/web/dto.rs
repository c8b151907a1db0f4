//! Data transfer objects for web requests and responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinate, Facility};
use crate::lookup::{LookupOutcome, QuotaStatus};
use crate::ranker::RankedResult;

/// Round a distance to two decimal places for presentation.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Request to find the substations nearest an address.
///
/// Accepted as a form (`address=...`) or as JSON.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub address: String,
}

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinate> for Point {
    fn from(c: Coordinate) -> Self {
        Self {
            latitude: c.latitude(),
            longitude: c.longitude(),
        }
    }
}

/// One substation in lookup results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityResult {
    pub name: String,

    /// Address, city and postal code
    pub full_address: String,

    /// Distance from the searched address, rounded to 2 decimal places
    pub distance_km: f64,

    pub available_capacity_mw: f64,

    pub distributor: String,

    /// Forecast capacity for every catalog year
    pub forecast_by_year: BTreeMap<u16, f64>,

    pub latitude: f64,
    pub longitude: f64,
}

impl FacilityResult {
    pub fn from_ranked(ranked: &RankedResult) -> Self {
        let f = &ranked.facility;
        Self {
            name: f.name.clone(),
            full_address: f.full_address(),
            distance_km: round_km(ranked.distance_km),
            available_capacity_mw: f.available_capacity_mw,
            distributor: f.distributor.clone(),
            forecast_by_year: f.forecast_by_year(),
            latitude: f.location.latitude(),
            longitude: f.location.longitude(),
        }
    }
}

/// Response from a lookup.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Where the searched address resolved to
    pub origin: Point,

    /// Nearest substations, closest first
    pub results: Vec<FacilityResult>,

    /// Lookups left this month
    pub remaining: i64,
}

impl SearchResponse {
    pub fn from_outcome(outcome: &LookupOutcome) -> Self {
        Self {
            origin: outcome.origin.into(),
            results: outcome
                .results
                .iter()
                .map(FacilityResult::from_ranked)
                .collect(),
            remaining: outcome.remaining.max(0),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Serialize)]
pub struct FacilityRecord {
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub full_address: String,
    pub distributor: String,
    pub available_capacity_mw: f64,
    pub forecast_by_year: BTreeMap<u16, f64>,
    pub latitude: f64,
    pub longitude: f64,
}

impl FacilityRecord {
    pub fn from_facility(f: &Facility) -> Self {
        Self {
            name: f.name.clone(),
            address: f.address.clone(),
            city: f.city.clone(),
            postal_code: f.postal_code.clone(),
            full_address: f.full_address(),
            distributor: f.distributor.clone(),
            available_capacity_mw: f.available_capacity_mw,
            forecast_by_year: f.forecast_by_year(),
            latitude: f.location.latitude(),
            longitude: f.location.longitude(),
        }
    }
}

/// Response listing the catalog.
#[derive(Debug, Serialize)]
pub struct FacilityListResponse {
    pub count: usize,
    pub facilities: Vec<FacilityRecord>,
}

impl FacilityListResponse {
    pub fn from_facilities(facilities: &[Facility]) -> Self {
        Self {
            count: facilities.len(),
            facilities: facilities.iter().map(FacilityRecord::from_facility).collect(),
        }
    }
}

/// The caller's allowance this month.
#[derive(Debug, PartialEq, Serialize)]
pub struct QuotaResponse {
    pub month: String,
    pub used: u32,
    pub limit: u32,

    /// Lookups left; zero once the limit is reached or overrun
    pub remaining: i64,
}

impl From<QuotaStatus> for QuotaResponse {
    fn from(status: QuotaStatus) -> Self {
        Self {
            month: status.month.as_str().to_string(),
            used: status.used,
            limit: status.limit,
            remaining: status.remaining.max(0),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed_facilities;
    use crate::domain::UsageMonth;
    use crate::ranker::rank_nearest;

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round_km(0.0), 0.0);
        assert_eq!(round_km(0.932_47), 0.93);
        assert_eq!(round_km(2.459_83), 2.46);
        assert_eq!(round_km(17.005_1), 17.01);
    }

    #[test]
    fn facility_result_from_ranked() {
        let seed = seed_facilities().unwrap();
        let ranked = rank_nearest(seed[0].location, &seed, 3);

        let result = FacilityResult::from_ranked(&ranked[2]);

        assert_eq!(result.name, "GPZ Zachód");
        assert_eq!(result.full_address, "ul. Zachodnia 7, Warszawa");
        assert_eq!(result.distance_km, 2.46);
        assert_eq!(result.available_capacity_mw, 12.0);
        assert_eq!(result.forecast_by_year.len(), 6);
        assert_eq!(result.latitude, 52.2299);
    }

    #[test]
    fn search_response_serialises_rows() {
        let seed = seed_facilities().unwrap();
        let outcome = LookupOutcome {
            origin: seed[0].location,
            results: rank_nearest(seed[0].location, &seed, 1),
            remaining: 42,
        };

        let json = serde_json::to_value(SearchResponse::from_outcome(&outcome)).unwrap();

        assert_eq!(json["remaining"], 42);
        assert_eq!(json["origin"]["latitude"], 52.2297);
        assert_eq!(json["results"][0]["name"], "GPZ Centrum");
        assert_eq!(json["results"][0]["distance_km"], 0.0);
        assert_eq!(json["results"][0]["forecast_by_year"]["2030"], 0.0);
    }

    #[test]
    fn quota_response_clamps_remaining() {
        let status = QuotaStatus {
            month: UsageMonth::parse("2025-05").unwrap(),
            used: 101,
            limit: 100,
            remaining: -1,
        };

        assert_eq!(
            QuotaResponse::from(status),
            QuotaResponse {
                month: "2025-05".into(),
                used: 101,
                limit: 100,
                remaining: 0,
            }
        );
    }

    #[test]
    fn facility_list_counts() {
        let seed = seed_facilities().unwrap();
        let list = FacilityListResponse::from_facilities(&seed);
        assert_eq!(list.count, 3);
        assert_eq!(list.facilities[1].name, "GPZ Wschód");
    }

    #[test]
    fn search_request_from_json() {
        let req: SearchRequest = serde_json::from_str(r#"{"address": "Rynek 1"}"#).unwrap();
        assert_eq!(req.address, "Rynek 1");
    }
}
