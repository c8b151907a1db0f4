//! Service configuration.
//!
//! Built-in defaults overridden by `GPZ_`-prefixed environment variables,
//! e.g. `GPZ_BIND_ADDR=0.0.0.0:8080` or `GPZ_GEOCODER=offline`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Deserializer, Serialize};

use crate::geocode::NominatimConfig;
use crate::lookup::LookupConfig;

/// Which geocoder backs lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderKind {
    /// Nominatim over HTTP, cached.
    Nominatim,
    /// Resolve only catalog addresses and cities; no network.
    Offline,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub catalog_path: PathBuf,
    pub database_url: String,
    pub monthly_limit: u32,
    pub result_limit: usize,
    pub geocode_timeout_secs: u64,
    pub geocoder: GeocoderKind,
    pub nominatim_url: String,
    #[serde(deserialize_with = "text")]
    pub user_agent: String,
    #[serde(deserialize_with = "text")]
    pub country_suffix: String,
    /// Token required to add facilities. Registration is disabled without one.
    #[serde(default, deserialize_with = "optional_text")]
    pub admin_token: Option<String>,
}

/// Settings that are always text, even when they look like numbers.
const TEXT_KEYS: &[&str] = &["user_agent", "country_suffix", "admin_token"];

/// A scalar setting read back as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Signed(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<Scalar>::deserialize(deserializer).map(|v| v.map(String::from))
}

impl Default for AppConfig {
    fn default() -> Self {
        let lookup = LookupConfig::default();
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            catalog_path: PathBuf::from("gpz_database.csv"),
            database_url: "sqlite://gpz.db".to_string(),
            monthly_limit: lookup.monthly_limit,
            result_limit: lookup.result_limit,
            geocode_timeout_secs: lookup.geocode_timeout_secs,
            geocoder: GeocoderKind::Nominatim,
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "gpz-finder".to_string(),
            country_suffix: "Polska".to_string(),
            admin_token: None,
        }
    }
}

impl AppConfig {
    /// Load defaults merged with the process environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Defaults merged with `GPZ_` environment variables, before extraction.
    ///
    /// Text settings are taken verbatim so a token like `007` keeps its
    /// leading zeros.
    pub fn figment() -> Figment {
        let env = Env::prefixed("GPZ_");
        let verbatim: BTreeMap<String, String> = env
            .clone()
            .only(TEXT_KEYS)
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect();

        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(env.ignore(TEXT_KEYS))
            .merge(Serialized::defaults(verbatim))
    }

    pub fn lookup_config(&self) -> LookupConfig {
        LookupConfig::new(
            self.monthly_limit,
            self.result_limit,
            self.geocode_timeout_secs,
        )
    }

    pub fn nominatim_config(&self) -> NominatimConfig {
        NominatimConfig::new(self.user_agent.clone())
            .with_base_url(self.nominatim_url.clone())
            .with_country_suffix(self.country_suffix.clone())
            .with_timeout(self.geocode_timeout_secs)
    }

    /// The admin token, ignoring a blank value.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
