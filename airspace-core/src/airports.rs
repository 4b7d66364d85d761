//! Airport reference table and typeahead search.
//!
//! A small built-in table covers the navigation buttons and common picks.
//! A full table can be generated from the OurAirports CSV with
//! [`parse_airports_csv`] and loaded back with [`AirportIndex::from_json`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{AirspaceError, LngLat, Result};

/// Public OurAirports dump used by `gen-airports`.
pub const AIRPORTS_CSV_URL: &str = "https://davidmegginson.github.io/ourairports-data/airports.csv";

/// Maximum number of typeahead results.
pub const SEARCH_LIMIT: usize = 20;

/// Airports offered as one-click buttons on the navigate page.
pub const NAV_AIRPORT_IDS: [&str; 9] = [
    "BAH", "BOS", "DXB", "HND", "JFK", "LAX", "LHR", "ORD", "SFO",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    /// IATA code.
    pub id: String,
    pub name: String,
    pub municipality: String,
    pub iso_country: String,
    pub coordinates: LngLat,
}

/// `"ID - Name"`, the label shown in the typeahead input.
pub fn label(airport: &Airport) -> String {
    format!("{} - {}", airport.id, airport.name)
}

// (id, name, municipality, country, lng, lat)
const BUILTIN: &[(&str, &str, &str, &str, f64, f64)] = &[
    ("ATL", "Hartsfield-Jackson Atlanta International Airport", "Atlanta", "US", -84.428101, 33.6367),
    ("BAH", "Bahrain International Airport", "Manama", "BH", 50.633889, 26.270833),
    ("BLQ", "Bologna Guglielmo Marconi Airport", "Bologna", "IT", 11.2887, 44.5354),
    ("BOS", "Boston Logan Airport", "Boston", "US", -71.011487, 42.356007),
    ("CDG", "Charles de Gaulle International Airport", "Paris", "FR", 2.55, 49.012798),
    ("DEN", "Denver International Airport", "Denver", "US", -104.672996, 39.861698),
    ("DFW", "Dallas Fort Worth International Airport", "Dallas-Fort Worth", "US", -97.038002, 32.896801),
    ("DXB", "Dubai International Airport", "Dubai", "AE", 55.3644, 25.2528),
    ("EWR", "Newark Liberty International Airport", "Newark", "US", -74.168701, 40.692501),
    ("FRA", "Frankfurt Airport", "Frankfurt am Main", "DE", 8.570556, 50.033333),
    ("HKG", "Hong Kong International Airport", "Hong Kong", "HK", 113.915001, 22.308901),
    ("HND", "Tokyo Haneda Airport", "Tokyo", "JP", 139.7798, 35.5494),
    ("JFK", "John F. Kennedy International Airport", "New York", "US", -73.7787, 40.6399),
    ("LAS", "Harry Reid International Airport", "Las Vegas", "US", -115.152, 36.083361),
    ("LAX", "Los Angeles International Airport", "Los Angeles", "US", -118.408, 33.9425),
    ("LGA", "LaGuardia Airport", "New York", "US", -73.872597, 40.777199),
    ("LHR", "London Heathrow Airport", "London", "GB", -0.454295, 51.47002),
    ("MIA", "Miami International Airport", "Miami", "US", -80.290604, 25.7932),
    ("NRT", "Narita International Airport", "Tokyo", "JP", 140.386002, 35.764702),
    ("ORD", "Chicago O'Hare International Airport", "Chicago", "US", -87.90784, 41.97728),
    ("SEA", "Seattle-Tacoma International Airport", "Seattle", "US", -122.308998, 47.449001),
    ("SFO", "San Francisco International Airport", "San Francisco", "US", -122.3789, 37.6213),
    ("SIN", "Singapore Changi Airport", "Singapore", "SG", 103.994003, 1.35019),
    ("SYD", "Sydney Kingsford Smith International Airport", "Sydney", "AU", 151.177002, -33.946098),
    ("YYZ", "Toronto Pearson International Airport", "Toronto", "CA", -79.630603, 43.6772),
];

/// Airports sorted by id with a lookup map.
#[derive(Debug, Clone, Default)]
pub struct AirportIndex {
    airports: Vec<Airport>,
    by_id: HashMap<String, usize>,
}

impl AirportIndex {
    /// Build an index. Ids are sorted by byte order, which is alphabetical
    /// for uppercase ASCII IATA codes; the first entry wins on duplicates.
    pub fn new(airports: Vec<Airport>) -> Self {
        let mut airports = airports;
        airports.sort_by(|a, b| a.id.cmp(&b.id));
        airports.dedup_by(|b, a| a.id == b.id);

        let by_id = airports
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();
        AirportIndex { airports, by_id }
    }

    pub fn builtin() -> Self {
        let airports = BUILTIN
            .iter()
            .map(|&(id, name, municipality, iso_country, lng, lat)| Airport {
                id: id.to_string(),
                name: name.to_string(),
                municipality: municipality.to_string(),
                iso_country: iso_country.to_string(),
                coordinates: LngLat::new(lng, lat),
            })
            .collect();
        Self::new(airports)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let airports: Vec<Airport> = serde_json::from_str(text)?;
        Ok(Self::new(airports))
    }

    /// Load a generated table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.airports)?)
    }

    pub fn get(&self, id: &str) -> Option<&Airport> {
        self.by_id.get(id).map(|&i| &self.airports[i])
    }

    /// Like [`get`](Self::get) but an unknown id is an error.
    pub fn require(&self, id: &str) -> Result<&Airport> {
        self.get(id)
            .ok_or_else(|| AirspaceError::UnknownAirport(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Airport> {
        self.airports.iter()
    }

    /// Typeahead filter. Id-prefix matches first, then name or municipality
    /// substring matches, case-insensitive, capped at [`SEARCH_LIMIT`].
    pub fn search(&self, query: &str) -> Vec<&Airport> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return self.airports.iter().take(SEARCH_LIMIT).collect();
        }

        let mut results: Vec<&Airport> = self
            .airports
            .iter()
            .filter(|a| a.id.to_lowercase().starts_with(&q))
            .collect();
        let prefix_count = results.len();

        for airport in &self.airports {
            if results.len() >= SEARCH_LIMIT {
                break;
            }
            if results[..prefix_count].iter().any(|a| a.id == airport.id) {
                continue;
            }
            if airport.name.to_lowercase().contains(&q)
                || airport.municipality.to_lowercase().contains(&q)
            {
                results.push(airport);
            }
        }

        results.truncate(SEARCH_LIMIT);
        results
    }
}

// ---------------------------------------------------------------------------
// OurAirports CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    iata_code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    municipality: String,
    #[serde(default)]
    iso_country: String,
    #[serde(default)]
    latitude_deg: String,
    #[serde(default)]
    longitude_deg: String,
}

fn parse_coord(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an OurAirports `airports.csv`, keeping rows with an IATA code and
/// finite coordinates. Other columns are ignored.
pub fn parse_airports_csv(text: &str) -> Result<Vec<Airport>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut airports = Vec::new();
    for record in reader.deserialize::<CsvRow>() {
        let row = record?;
        if row.iata_code.is_empty() {
            continue;
        }
        let (Some(lat), Some(lng)) = (parse_coord(&row.latitude_deg), parse_coord(&row.longitude_deg)) else {
            continue;
        };
        airports.push(Airport {
            id: row.iata_code,
            name: row.name,
            municipality: row.municipality,
            iso_country: row.iso_country,
            coordinates: LngLat::new(lng, lat),
        });
    }
    Ok(airports)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(id: &str, name: &str, municipality: &str) -> Airport {
        Airport {
            id: id.into(),
            name: name.into(),
            municipality: municipality.into(),
            iso_country: "XX".into(),
            coordinates: LngLat::new(0.0, 0.0),
        }
    }

    #[test]
    fn test_prefix_matches_rank_first() {
        let index = AirportIndex::new(vec![
            airport("BLQ", "Bologna Guglielmo Marconi Airport", "Bologna"),
            airport("BOS", "Boston Logan Airport", "Boston"),
            airport("BO", "Bo Airport", "Bo"),
        ]);
        let ids: Vec<&str> = index.search("BO").iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["BO", "BOS", "BLQ"]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_trimmed() {
        let index = AirportIndex::builtin();
        let ids: Vec<&str> = index.search("  heathrow ").iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["LHR"]);
        let ids: Vec<&str> = index.search("tokyo").iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["HND", "NRT"]);
    }

    #[test]
    fn test_prefix_match_not_duplicated() {
        // "la" is an id prefix of LAS/LAX and a substring of their names
        let index = AirportIndex::builtin();
        let results = index.search("la");
        let las = results.iter().filter(|a| a.id == "LAS").count();
        assert_eq!(las, 1);
        assert_eq!(results[0].id, "LAS");
        assert_eq!(results[1].id, "LAX");
    }

    #[test]
    fn test_empty_query_returns_first_sorted() {
        let index = AirportIndex::builtin();
        let results = index.search("");
        assert_eq!(results.len(), SEARCH_LIMIT);
        assert_eq!(results[0].id, "ATL");
        assert!(results.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_ids_sorted_by_byte_order() {
        let index = AirportIndex::new(vec![
            airport("ZRH", "Zurich", "Zurich"),
            airport("AMS", "Schiphol", "Amsterdam"),
            airport("A1", "Field", "Nowhere"),
            airport("LHR", "Heathrow", "London"),
        ]);
        let ids: Vec<&str> = index.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "AMS", "LHR", "ZRH"]);
    }

    #[test]
    fn test_results_capped() {
        let many = (0..30)
            .map(|i| airport(&format!("Z{i:02}"), "Zed Field", "Zville"))
            .collect();
        let index = AirportIndex::new(many);
        assert_eq!(index.search("zed").len(), SEARCH_LIMIT);
        assert_eq!(index.search("z").len(), SEARCH_LIMIT);
    }

    #[test]
    fn test_no_match() {
        assert!(AirportIndex::builtin().search("qqqq").is_empty());
    }

    #[test]
    fn test_lookup_and_label() {
        let index = AirportIndex::builtin();
        let bos = index.get("BOS").unwrap();
        assert_eq!(label(bos), "BOS - Boston Logan Airport");
        assert!(index.get("XXX").is_none());
        assert!(matches!(index.require("XXX"), Err(AirspaceError::UnknownAirport(_))));
    }

    #[test]
    fn test_nav_airports_in_builtin() {
        let index = AirportIndex::builtin();
        for id in NAV_AIRPORT_IDS {
            assert!(index.get(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn test_duplicate_ids_keep_one() {
        let index = AirportIndex::new(vec![
            airport("AAA", "First", "x"),
            airport("AAA", "Second", "y"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("AAA").unwrap().name, "First");
    }

    #[test]
    fn test_parse_csv_filters_rows() {
        let csv = "\
id,ident,type,name,latitude_deg,longitude_deg,elevation_ft,continent,iso_country,iso_region,municipality,scheduled_service,gps_code,iata_code,local_code
1,KBOS,large_airport,General Edward Lawrence Logan International Airport,42.3643,-71.005203,20,NA,US,US-MA,Boston,yes,KBOS,BOS,BOS
2,00A,heliport,Total RF Heliport,40.070985,-74.933689,11,NA,US,US-PA,Bensalem,no,K00A,,00A
3,XXXX,small_airport,Broken Field,,-10.0,0,NA,US,US-XX,Nowhere,no,,BRK,
4,EGLL,large_airport,London Heathrow Airport,51.4706, -0.461941 ,83,EU,GB,GB-ENG,London,yes,EGLL, LHR ,
";
        let airports = parse_airports_csv(csv).unwrap();
        assert_eq!(airports.len(), 2);
        assert_eq!(airports[0].id, "BOS");
        assert_eq!(airports[0].municipality, "Boston");
        assert_eq!(airports[0].coordinates, LngLat::new(-71.005203, 42.3643));
        assert_eq!(airports[1].id, "LHR");
        assert_eq!(airports[1].coordinates.lng, -0.461941);
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airports.json");
        std::fs::write(&path, AirportIndex::builtin().to_json().unwrap()).unwrap();
        let loaded = AirportIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), BUILTIN.len());
        assert_eq!(loaded.get("SFO").unwrap().municipality, "San Francisco");
    }
}
