//! CSV reading for raw incident rows.
//!
//! Headers are matched by name, ignoring case and treating spaces as
//! underscores. Each field accepts several header spellings:
//!
//! | field       | headers, highest priority first         |
//! |-------------|-----------------------------------------|
//! | `id`        | `id`                                    |
//! | `timestamp` | `timestamp`, `occurred_at`, `date`      |
//! | `latitude`  | `latitude`, `lat`                       |
//! | `longitude` | `longitude`, `lon`, `lng`               |
//! | `category`  | `category`, `primary_type`              |
//! | `arrest`    | `arrest`                                |
//!
//! When a file carries more than one spelling for a field, the first
//! non-blank value in priority order is used. Other columns are ignored. A
//! row that cannot be read at all is an error, but a row with bad field
//! values is returned as-is and rejected later by validation.

use std::io::Read;
use std::path::Path;

use crime_hotspots_ingest_models::RawIncidentRow;

use crate::IngestError;
use crate::parsing::non_blank;

const ID_HEADERS: &[&str] = &["id"];
const TIMESTAMP_HEADERS: &[&str] = &["timestamp", "occurred_at", "date"];
const LATITUDE_HEADERS: &[&str] = &["latitude", "lat"];
const LONGITUDE_HEADERS: &[&str] = &["longitude", "lon", "lng"];
const CATEGORY_HEADERS: &[&str] = &["category", "primary_type"];
const ARREST_HEADERS: &[&str] = &["arrest"];

/// Column positions for each field, in priority order.
#[derive(Debug, Default)]
struct ColumnMap {
    id: Vec<usize>,
    timestamp: Vec<usize>,
    latitude: Vec<usize>,
    longitude: Vec<usize>,
    category: Vec<usize>,
    arrest: Vec<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_ascii_lowercase().replace(' ', "_"))
            .collect();

        let positions = |candidates: &[&str]| -> Vec<usize> {
            candidates
                .iter()
                .filter_map(|candidate| names.iter().position(|name| name == candidate))
                .collect()
        };

        Self {
            id: positions(ID_HEADERS),
            timestamp: positions(TIMESTAMP_HEADERS),
            latitude: positions(LATITUDE_HEADERS),
            longitude: positions(LONGITUDE_HEADERS),
            category: positions(CATEGORY_HEADERS),
            arrest: positions(ARREST_HEADERS),
        }
    }

    fn row(&self, record: &csv::StringRecord) -> RawIncidentRow {
        let field = |columns: &[usize]| {
            columns
                .iter()
                .find_map(|&column| non_blank(record.get(column)))
                .map(ToString::to_string)
        };

        RawIncidentRow {
            id: field(&self.id),
            timestamp: field(&self.timestamp),
            latitude: field(&self.latitude),
            longitude: field(&self.longitude),
            category: field(&self.category),
            arrest: field(&self.arrest),
        }
    }
}

/// Reads raw rows from any CSV source with a header line.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the CSV is structurally malformed.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawIncidentRow>, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(csv_reader.headers()?);

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        rows.push(columns.row(&result?));
    }

    log::debug!("Read {} raw rows from CSV", rows.len());
    Ok(rows)
}

/// Reads raw rows from a CSV file on disk.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the file cannot be opened, or
/// [`IngestError::Csv`] if it is malformed.
pub fn read_csv_path(path: &Path) -> Result<Vec<RawIncidentRow>, IngestError> {
    log::info!("Reading incidents from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_csv(std::io::BufReader::new(file))
}
