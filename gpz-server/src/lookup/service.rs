//! Nearest-facility lookup orchestration.
//!
//! A lookup checks the user's monthly allowance, geocodes the address,
//! ranks the catalog by distance and only then charges the allowance.
//! No lock is held across the geocoder call.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::domain::{Coordinate, FORECAST_YEARS, Facility, UsageMonth};
use crate::geocode::{GeocodeError, Geocoder};
use crate::quota::{QuotaStore, QuotaTracker};
use crate::ranker::{RankedResult, rank_nearest};

use super::config::LookupConfig;
use super::error::{AdminError, LookupError};

/// Successful lookup.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    /// Where the address resolved to.
    pub origin: Coordinate,

    /// Nearest facilities, closest first.
    pub results: Vec<RankedResult>,

    /// Lookups left this month after this one.
    pub remaining: i64,
}

/// A user's allowance for one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatus {
    pub month: UsageMonth,
    pub used: u32,
    pub limit: u32,
    pub remaining: i64,
}

/// Submitted details of a facility to add to the catalog.
///
/// The location is not supplied; it is geocoded from the address and city.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFacility {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub distributor: String,
    pub available_capacity_mw: f64,
    #[serde(default)]
    pub forecast_by_year: BTreeMap<u16, f64>,
}

impl NewFacility {
    /// Text sent to the geocoder.
    pub fn geocode_query(&self) -> String {
        [self.address.trim(), self.city.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn validate(&self) -> Result<(), AdminError> {
        if self.name.trim().is_empty() {
            return Err(AdminError::Invalid("name must not be empty".to_string()));
        }
        if self.address.trim().is_empty() {
            return Err(AdminError::Invalid("address must not be empty".to_string()));
        }
        if !self.available_capacity_mw.is_finite() || self.available_capacity_mw < 0.0 {
            return Err(AdminError::Invalid(format!(
                "available capacity {} MW must be finite and non-negative",
                self.available_capacity_mw
            )));
        }
        for (&year, &mw) in &self.forecast_by_year {
            if !FORECAST_YEARS.contains(&year) {
                return Err(AdminError::Invalid(format!(
                    "forecast year {year} outside {}..={}",
                    FORECAST_YEARS.start(),
                    FORECAST_YEARS.end()
                )));
            }
            if !mw.is_finite() || mw < 0.0 {
                return Err(AdminError::Invalid(format!(
                    "forecast for {year} of {mw} MW must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }

    fn into_facility(self, location: Coordinate) -> Result<Facility, AdminError> {
        let facility = Facility::new(self.name.trim(), location, self.available_capacity_mw)?
            .with_address(self.address.trim(), self.city.trim(), self.postal_code.trim())
            .with_distributor(self.distributor.trim());

        Ok(self
            .forecast_by_year
            .into_iter()
            .fold(facility, |f, (year, mw)| f.with_forecast(year, mw)))
    }
}

/// Composes catalog, geocoder, ranker and quota into lookups.
pub struct LookupService {
    catalog: Catalog,
    geocoder: Arc<dyn Geocoder>,
    quota: QuotaTracker,
    config: LookupConfig,
}

impl LookupService {
    pub fn new(
        catalog: Catalog,
        geocoder: Arc<dyn Geocoder>,
        quota_store: Arc<dyn QuotaStore>,
        config: LookupConfig,
    ) -> Self {
        let quota = QuotaTracker::new(quota_store, config.monthly_limit);
        Self {
            catalog,
            geocoder,
            quota,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Find the facilities nearest to `address` for `user_id`.
    pub async fn lookup(&self, user_id: &str, address: &str) -> Result<LookupOutcome, LookupError> {
        self.lookup_at(user_id, address, Utc::now()).await
    }

    /// [`lookup`](Self::lookup) with the quota month taken from `now`.
    pub async fn lookup_at(
        &self,
        user_id: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<LookupOutcome, LookupError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(LookupError::EmptyAddress);
        }

        let month = UsageMonth::from_datetime(now);
        let available = self.quota.check_and_reserve(user_id, &month).await?;

        let Some(origin) = self.resolve(address).await else {
            info!(user_id, address, "address not found");
            return Err(LookupError::AddressNotFound {
                address: address.to_string(),
            });
        };

        let catalog = self.catalog.snapshot().await;
        let results = rank_nearest(origin, &catalog, self.config.result_limit);

        if results.is_empty() {
            warn!(user_id, "lookup found no facilities; not charged");
            return Ok(LookupOutcome {
                origin,
                results,
                remaining: available,
            });
        }

        let remaining = self.quota.commit_increment(user_id, &month).await?;
        info!(
            user_id,
            %month,
            results = results.len(),
            remaining,
            "lookup complete"
        );

        Ok(LookupOutcome {
            origin,
            results,
            remaining,
        })
    }

    /// Geocode with a deadline. Errors and timeouts read as not found.
    async fn resolve(&self, address: &str) -> Option<Coordinate> {
        let timeout = self.config.geocode_timeout();
        let result = tokio::time::timeout(timeout, self.geocoder.geocode(address))
            .await
            .unwrap_or(Err(GeocodeError::Timeout {
                secs: timeout.as_secs(),
            }));

        match result {
            Ok(found) => {
                debug!(address, found = found.is_some(), "geocoded");
                found
            }
            Err(e) => {
                warn!(address, error = %e, "geocoder failed");
                None
            }
        }
    }

    /// The user's allowance for the current month.
    pub async fn quota_status(&self, user_id: &str) -> Result<QuotaStatus, LookupError> {
        self.quota_status_at(user_id, Utc::now()).await
    }

    /// [`quota_status`](Self::quota_status) for the month containing `now`.
    pub async fn quota_status_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, LookupError> {
        let month = UsageMonth::from_datetime(now);
        let usage = self.quota.usage(user_id, &month).await?;
        let limit = self.quota.limit();

        Ok(QuotaStatus {
            month,
            used: usage.count,
            limit,
            remaining: i64::from(limit) - i64::from(usage.count),
        })
    }

    /// Geocode and persist a new facility, then publish the reloaded catalog.
    pub async fn register_facility(&self, new: NewFacility) -> Result<Facility, AdminError> {
        new.validate()?;

        let query = new.geocode_query();
        let Some(location) = self.resolve(&query).await else {
            return Err(AdminError::AddressNotFound { address: query });
        };

        let facility = new.into_facility(location)?;
        let count = self.catalog.add(&facility).await?;
        info!(name = %facility.name, %location, facilities = count, "facility registered");

        Ok(facility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::catalog::{InMemoryCatalogSource, seed_facilities};
    use crate::geocode::StaticGeocoder;
    use crate::quota::InMemoryQuotaStore;

    const CENTRE: &str = "Plac Defilad 1, Warszawa";

    fn centre() -> Coordinate {
        Coordinate::new(52.2297, 21.0122).unwrap()
    }

    fn may() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 14, 12, 0, 0).unwrap()
    }

    fn may_key() -> UsageMonth {
        UsageMonth::parse("2025-05").unwrap()
    }

    async fn catalog_of(facilities: Vec<Facility>) -> Catalog {
        Catalog::load(Arc::new(InMemoryCatalogSource::new(facilities)))
            .await
            .unwrap()
    }

    struct Fixture {
        service: LookupService,
        geocoder: Arc<StaticGeocoder>,
        store: Arc<InMemoryQuotaStore>,
    }

    async fn fixture_with(facilities: Vec<Facility>, config: LookupConfig) -> Fixture {
        let geocoder = Arc::new(
            StaticGeocoder::new()
                .with(CENTRE, centre())
                .with("ul. Nowa 5, Warszawa", Coordinate::new(52.2298, 21.0123).unwrap()),
        );
        let store = Arc::new(InMemoryQuotaStore::new());
        let service = LookupService::new(
            catalog_of(facilities).await,
            geocoder.clone(),
            store.clone(),
            config,
        );
        Fixture {
            service,
            geocoder,
            store,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(seed_facilities().unwrap(), LookupConfig::default()).await
    }

    async fn used(fx: &Fixture) -> u32 {
        fx.store.get_or_create("alice", &may_key()).await.unwrap().count
    }

    /// Geocoder that always fails.
    struct BrokenGeocoder;

    #[async_trait]
    impl Geocoder for BrokenGeocoder {
        async fn geocode(&self, _address: &str) -> Result<Option<Coordinate>, GeocodeError> {
            Err(GeocodeError::RateLimited)
        }
    }

    /// Geocoder that answers long after any sensible deadline.
    struct SlowGeocoder;

    #[async_trait]
    impl Geocoder for SlowGeocoder {
        async fn geocode(&self, _address: &str) -> Result<Option<Coordinate>, GeocodeError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Some(Coordinate::new(52.2297, 21.0122).unwrap()))
        }
    }

    async fn service_with_geocoder(
        geocoder: Arc<dyn Geocoder>,
        config: LookupConfig,
    ) -> (LookupService, Arc<InMemoryQuotaStore>) {
        let store = Arc::new(InMemoryQuotaStore::new());
        let service = LookupService::new(
            catalog_of(seed_facilities().unwrap()).await,
            geocoder,
            store.clone(),
            config,
        );
        (service, store)
    }

    #[tokio::test]
    async fn nearest_three_in_distance_order() {
        let fx = fixture().await;

        let outcome = fx.service.lookup_at("alice", CENTRE, may()).await.unwrap();

        assert_eq!(outcome.origin, centre());
        let names: Vec<_> = outcome
            .results
            .iter()
            .map(|r| r.facility.name.as_str())
            .collect();
        assert_eq!(names, ["GPZ Centrum", "GPZ Wschód", "GPZ Zachód"]);

        assert!(outcome.results[0].distance_km < 0.005);
        assert!((0.9..1.0).contains(&outcome.results[1].distance_km));
        assert!((2.4..2.5).contains(&outcome.results[2].distance_km));

        assert_eq!(outcome.remaining, 99);
        assert_eq!(used(&fx).await, 1);
    }

    #[tokio::test]
    async fn result_limit_comes_from_config() {
        let config = LookupConfig {
            result_limit: 2,
            ..LookupConfig::default()
        };
        let fx = fixture_with(seed_facilities().unwrap(), config).await;

        let outcome = fx.service.lookup_at("alice", CENTRE, may()).await.unwrap();
        assert_eq!(outcome.results.len(), 2);
    }

    #[tokio::test]
    async fn remaining_counts_down_with_each_lookup() {
        let fx = fixture().await;

        for n in 1..=100 {
            let outcome = fx.service.lookup_at("alice", CENTRE, may()).await.unwrap();
            assert_eq!(outcome.remaining, 100 - n);
        }

        let err = fx
            .service
            .lookup_at("alice", CENTRE, may())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::QuotaExceeded { limit: 100, .. }));

        let status = fx.service.quota_status_at("alice", may()).await.unwrap();
        assert_eq!(status.remaining, 0);
        assert_eq!(status.used, 100);
        assert_eq!(used(&fx).await, 100);
    }

    #[tokio::test]
    async fn hundred_and_first_lookup_is_refused() {
        let fx = fixture().await;
        fx.store.set_count("alice", &may_key(), 100);

        let err = fx.service.lookup_at("alice", CENTRE, may()).await.unwrap_err();

        assert!(matches!(err, LookupError::QuotaExceeded { limit: 100, .. }));
        assert_eq!(used(&fx).await, 100);
        // Refused before reaching the geocoder
        assert_eq!(fx.geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn failed_geocodes_are_free() {
        let fx = fixture().await;

        for _ in 0..5 {
            let err = fx
                .service
                .lookup_at("alice", "Nowhere 1, Atlantis", may())
                .await
                .unwrap_err();
            assert!(matches!(err, LookupError::AddressNotFound { .. }));

            let status = fx.service.quota_status_at("alice", may()).await.unwrap();
            assert_eq!(status.remaining, 100);
        }
        assert_eq!(fx.geocoder.calls(), 5);
    }

    #[tokio::test]
    async fn geocoder_errors_read_as_not_found() {
        let (service, store) =
            service_with_geocoder(Arc::new(BrokenGeocoder), LookupConfig::default()).await;

        let err = service.lookup_at("alice", CENTRE, may()).await.unwrap_err();

        assert!(matches!(err, LookupError::AddressNotFound { .. }));
        assert_eq!(store.get_or_create("alice", &may_key()).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn geocoder_timeout_reads_as_not_found() {
        let config = LookupConfig {
            geocode_timeout_secs: 1,
            ..LookupConfig::default()
        };
        let (service, store) = service_with_geocoder(Arc::new(SlowGeocoder), config).await;

        let err = service.lookup_at("alice", CENTRE, may()).await.unwrap_err();

        assert!(matches!(err, LookupError::AddressNotFound { .. }));
        assert_eq!(store.get_or_create("alice", &may_key()).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn blank_address_is_rejected_up_front() {
        let fx = fixture().await;

        for address in ["", "   ", "\t\n"] {
            let err = fx.service.lookup_at("alice", address, may()).await.unwrap_err();
            assert!(matches!(err, LookupError::EmptyAddress));
        }
        assert_eq!(fx.geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn address_is_trimmed_before_geocoding() {
        let fx = fixture().await;
        let outcome = fx
            .service
            .lookup_at("alice", "  Plac Defilad 1, Warszawa \n", may())
            .await
            .unwrap();
        assert_eq!(outcome.origin, centre());
    }

    #[tokio::test]
    async fn empty_catalog_is_not_charged() {
        let fx = fixture_with(Vec::new(), LookupConfig::default()).await;

        let outcome = fx.service.lookup_at("alice", CENTRE, may()).await.unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.remaining, 100);
        assert_eq!(used(&fx).await, 0);
    }

    #[tokio::test]
    async fn short_catalog_returns_everything() {
        let two = seed_facilities().unwrap().into_iter().take(2).collect();
        let fx = fixture_with(two, LookupConfig::default()).await;

        let outcome = fx.service.lookup_at("alice", CENTRE, may()).await.unwrap();
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results[0].distance_km <= outcome.results[1].distance_km);
    }

    #[tokio::test]
    async fn new_month_starts_a_fresh_allowance() {
        let fx = fixture().await;
        fx.store.set_count("alice", &may_key(), 100);

        let june = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let outcome = fx.service.lookup_at("alice", CENTRE, june).await.unwrap();

        assert_eq!(outcome.remaining, 99);
        // May's counter is kept
        assert_eq!(used(&fx).await, 100);
    }

    #[tokio::test]
    async fn users_have_separate_allowances() {
        let fx = fixture().await;
        fx.store.set_count("alice", &may_key(), 100);

        let outcome = fx.service.lookup_at("bob", CENTRE, may()).await.unwrap();
        assert_eq!(outcome.remaining, 99);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_are_all_charged() {
        let fx = Arc::new(fixture().await);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let fx = Arc::clone(&fx);
                tokio::spawn(async move {
                    fx.service.lookup_at("alice", CENTRE, may()).await.unwrap();
                })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(used(&fx).await, 20);
    }

    fn new_facility() -> NewFacility {
        NewFacility {
            name: "GPZ Nowa".into(),
            address: "ul. Nowa 5".into(),
            city: "Warszawa".into(),
            postal_code: "00-001".into(),
            distributor: "".into(),
            available_capacity_mw: 4.5,
            forecast_by_year: BTreeMap::from([(2026, 6.0)]),
        }
    }

    #[tokio::test]
    async fn registered_facility_is_immediately_searchable() {
        let fx = fixture().await;

        let facility = fx.service.register_facility(new_facility()).await.unwrap();
        assert_eq!(facility.location, Coordinate::new(52.2298, 21.0123).unwrap());
        assert_eq!(facility.distributor, "Unknown");
        assert_eq!(facility.forecast(2026), 6.0);
        assert_eq!(facility.forecast(2025), 0.0);
        assert_eq!(fx.service.catalog().len().await, 4);

        let outcome = fx.service.lookup_at("alice", CENTRE, may()).await.unwrap();
        assert_eq!(outcome.results[1].facility.name, "GPZ Nowa");
    }

    #[tokio::test]
    async fn registration_with_unknown_address_fails() {
        let fx = fixture().await;
        let new = NewFacility {
            address: "Nowhere 1".into(),
            ..new_facility()
        };

        let err = fx.service.register_facility(new).await.unwrap_err();

        assert!(matches!(
            err,
            AdminError::AddressNotFound { ref address } if address == "Nowhere 1, Warszawa"
        ));
        assert_eq!(fx.service.catalog().len().await, 3);
    }

    #[tokio::test]
    async fn invalid_registrations_skip_the_geocoder() {
        let fx = fixture().await;

        let cases = [
            NewFacility {
                name: " ".into(),
                ..new_facility()
            },
            NewFacility {
                address: "".into(),
                ..new_facility()
            },
            NewFacility {
                available_capacity_mw: -1.0,
                ..new_facility()
            },
            NewFacility {
                forecast_by_year: BTreeMap::from([(2040, 1.0)]),
                ..new_facility()
            },
        ];
        for new in cases {
            let err = fx.service.register_facility(new).await.unwrap_err();
            assert!(matches!(err, AdminError::Invalid(_)), "{err}");
        }

        assert_eq!(fx.geocoder.calls(), 0);
        assert_eq!(fx.service.catalog().len().await, 3);
    }

    #[test]
    fn geocode_query_skips_blank_city() {
        let mut new = new_facility();
        assert_eq!(new.geocode_query(), "ul. Nowa 5, Warszawa");

        new.city = "  ".into();
        assert_eq!(new.geocode_query(), "ul. Nowa 5");
    }

    #[test]
    fn new_facility_from_json() {
        let new: NewFacility = serde_json::from_str(
            r#"{
                "name": "GPZ Test",
                "address": "ul. Testowa 1",
                "available_capacity_mw": 3.5,
                "forecast_by_year": {"2027": 4.0}
            }"#,
        )
        .unwrap();

        assert_eq!(new.city, "");
        assert_eq!(new.forecast_by_year.get(&2027), Some(&4.0));
    }
}
