//! CSV-backed catalog source.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{Coordinate, FORECAST_YEARS, Facility};

use super::error::CatalogError;
use super::seed::seed_facilities;
use super::source::CatalogSource;

const COL_NAME: &str = "name";
const COL_ADDRESS: &str = "address";
const COL_CITY: &str = "city";
const COL_POSTAL_CODE: &str = "postal_code";
const COL_LATITUDE: &str = "latitude";
const COL_LONGITUDE: &str = "longitude";
const COL_CAPACITY: &str = "available_capacity_mw";
const COL_DISTRIBUTOR: &str = "distributor";
const FORECAST_PREFIX: &str = "forecast_capacity_mw_";

/// Header row written to new catalog files.
pub fn header() -> Vec<String> {
    let mut cols: Vec<String> = [
        COL_NAME,
        COL_ADDRESS,
        COL_CITY,
        COL_POSTAL_CODE,
        COL_LATITUDE,
        COL_LONGITUDE,
        COL_CAPACITY,
        COL_DISTRIBUTOR,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    cols.extend(FORECAST_YEARS.map(|y| format!("{FORECAST_PREFIX}{y}")));
    cols
}

/// Catalog stored as a CSV file, one facility per row.
///
/// Expected header columns (by name):
/// - name, latitude, longitude, available_capacity_mw (required)
/// - address, city, postal_code, distributor (optional)
/// - forecast_capacity_mw_2025 .. forecast_capacity_mw_2030 (optional)
///
/// Rows with a missing or malformed required field are skipped with a
/// warning rather than failing the whole load.
#[derive(Debug, Clone)]
pub struct CsvCatalogSource {
    path: PathBuf,
}

impl CsvCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the catalog file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with the header and the seed facilities.
    fn bootstrap(&self) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let seed = seed_facilities()?;
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(header())?;
        for facility in &seed {
            writer.write_record(to_record(facility))?;
        }
        writer.flush()?;

        info!(path = %self.path.display(), facilities = seed.len(), "created catalog with seed data");
        Ok(())
    }
}

impl CatalogSource for CsvCatalogSource {
    fn load(&self) -> Result<Vec<Facility>, CatalogError> {
        if !self.path.exists() {
            self.bootstrap()?;
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let columns = Columns::resolve(&headers)?;

        let mut facilities = Vec::new();
        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping unreadable catalog row");
                    continue;
                }
            };

            match columns.parse(&record) {
                Ok(facility) => facilities.push(facility),
                Err(reason) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    warn!(path = %self.path.display(), line, %reason, "skipping invalid catalog row");
                }
            }
        }

        Ok(facilities)
    }

    /// Append `facility` in the column order of the existing header.
    ///
    /// A header that lacks any of the standard columns is widened first,
    /// so nothing about the new facility is dropped on the next load.
    fn append(&self, facility: &Facility) -> Result<(), CatalogError> {
        let is_empty = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if is_empty {
            let mut writer = csv::Writer::from_path(&self.path)?;
            writer.write_record(header())?;
            writer.write_record(to_record(facility))?;
            writer.flush()?;
            return Ok(());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let missing: Vec<String> = header()
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h.trim() == col))
            .collect();

        if !missing.is_empty() {
            let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
            return self.rewrite_widened(&headers, &missing, &rows, facility);
        }
        drop(reader);

        let needs_newline = !ends_with_newline(&self.path)?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        if needs_newline {
            file.write_all(b"\n")?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(headers.iter().map(|col| field(facility, col.trim())))?;
        writer.flush()?;
        Ok(())
    }
}

impl CsvCatalogSource {
    /// Rewrite the file with `missing` columns added after the existing
    /// ones, then append `facility`.
    fn rewrite_widened(
        &self,
        headers: &StringRecord,
        missing: &[String],
        rows: &[StringRecord],
        facility: &Facility,
    ) -> Result<(), CatalogError> {
        let mut columns: Vec<String> = headers.iter().map(str::to_string).collect();
        let width = columns.len();
        columns.extend(missing.iter().cloned());

        let tmp = self.path.with_extension("csv.tmp");
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;
        writer.write_record(&columns)?;
        for row in rows {
            let mut fields: Vec<&str> = row.iter().collect();
            if fields.len() < width {
                fields.resize(width, "");
            }
            fields.resize(fields.len() + missing.len(), "");
            writer.write_record(fields)?;
        }
        writer.write_record(columns.iter().map(|col| field(facility, col.trim())))?;
        writer.flush()?;
        drop(writer);
        std::fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), added = ?missing, "widened catalog header");
        Ok(())
    }
}

/// Column positions resolved from the header row.
struct Columns {
    name: usize,
    latitude: usize,
    longitude: usize,
    capacity: usize,
    address: Option<usize>,
    city: Option<usize>,
    postal_code: Option<usize>,
    distributor: Option<usize>,
    forecasts: Vec<(u16, usize)>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, CatalogError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| CatalogError::DataFormat {
                message: format!("missing column '{name}'"),
            })
        };

        Ok(Self {
            name: require(COL_NAME)?,
            latitude: require(COL_LATITUDE)?,
            longitude: require(COL_LONGITUDE)?,
            capacity: require(COL_CAPACITY)?,
            address: find(COL_ADDRESS),
            city: find(COL_CITY),
            postal_code: find(COL_POSTAL_CODE),
            distributor: find(COL_DISTRIBUTOR),
            forecasts: FORECAST_YEARS
                .filter_map(|y| find(&format!("{FORECAST_PREFIX}{y}")).map(|idx| (y, idx)))
                .collect(),
        })
    }

    fn parse(&self, record: &StringRecord) -> Result<Facility, String> {
        let text = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let number = |idx: usize, name: &str| -> Result<f64, String> {
            let raw = record.get(idx).map(str::trim).unwrap_or("");
            if raw.is_empty() {
                return Err(format!("missing {name}"));
            }
            raw.parse::<f64>()
                .map_err(|e| format!("invalid {name} '{raw}': {e}"))
        };

        let latitude = number(self.latitude, COL_LATITUDE)?;
        let longitude = number(self.longitude, COL_LONGITUDE)?;
        let capacity = number(self.capacity, COL_CAPACITY)?;
        let location = Coordinate::new(latitude, longitude).map_err(|e| e.to_string())?;

        let mut facility = Facility::new(text(Some(self.name)), location, capacity)
            .map_err(|e| e.to_string())?
            .with_address(text(self.address), text(self.city), text(self.postal_code))
            .with_distributor(text(self.distributor));

        for &(year, idx) in &self.forecasts {
            // Blank or malformed forecasts read as absent
            if let Ok(mw) = number(idx, "forecast")
                && mw.is_finite()
            {
                facility = facility.with_forecast(year, mw);
            }
        }

        Ok(facility)
    }
}

/// Serialize a facility in standard header order.
fn to_record(facility: &Facility) -> Vec<String> {
    header().iter().map(|col| field(facility, col)).collect()
}

/// The value of one named column for `facility`. Unknown columns are blank.
fn field(facility: &Facility, column: &str) -> String {
    match column {
        COL_NAME => facility.name.clone(),
        COL_ADDRESS => facility.address.clone(),
        COL_CITY => facility.city.clone(),
        COL_POSTAL_CODE => facility.postal_code.clone(),
        COL_LATITUDE => facility.location.latitude().to_string(),
        COL_LONGITUDE => facility.location.longitude().to_string(),
        COL_CAPACITY => facility.available_capacity_mw.to_string(),
        COL_DISTRIBUTOR => facility.distributor.clone(),
        other => other
            .strip_prefix(FORECAST_PREFIX)
            .and_then(|year| year.parse::<u16>().ok())
            .and_then(|year| facility.forecasts.get(&year))
            .map(|mw| mw.to_string())
            .unwrap_or_default(),
    }
}

fn ends_with_newline(path: &Path) -> Result<bool, CatalogError> {
    let mut file = File::open(path)?;
    if file.seek(SeekFrom::End(-1)).is_err() {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
