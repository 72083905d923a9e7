//! Free-text place name → search coordinates.
//!
//! The table is small and static. Lookups go through [`normalize_location`]
//! so "Japón", "JAPON" and " japon " all land on the same entry, and anything
//! unknown resolves to the Oaxaca entry.

use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub radius: &'static str,
    pub language: Option<&'static str>,
    pub region: Option<&'static str>,
    pub default_query: Option<&'static str>,
}

impl Location {
    /// `"lat,lng"` as the search endpoint expects it.
    pub fn coordinates(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

pub const DEFAULT_LOCATION_KEY: &str = "oaxaca";

const fn mx(name: &'static str, lat: f64, lng: f64) -> Location {
    Location {
        name,
        lat,
        lng,
        radius: "50km",
        language: Some("es"),
        region: Some("MX"),
        default_query: None,
    }
}

const fn country(
    name: &'static str,
    lat: f64,
    lng: f64,
    radius: &'static str,
    language: &'static str,
    region: &'static str,
) -> Location {
    Location {
        name,
        lat,
        lng,
        radius,
        language: Some(language),
        region: Some(region),
        default_query: None,
    }
}

static OAXACA: Location = mx("Oaxaca", 17.0732, -96.7266);
static CDMX: Location = mx("Ciudad de México", 19.4326, -99.1332);
static GUADALAJARA: Location = mx("Guadalajara", 20.6597, -103.3496);
static MONTERREY: Location = mx("Monterrey", 25.6866, -100.3161);
static PUEBLA: Location = mx("Puebla", 19.0414, -98.2063);

static CHINA: Location = Location {
    default_query: Some("china travel vlog"),
    ..country("China", 35.8617, 104.1954, "1000km", "zh", "CN")
};
static USA: Location = country("Estados Unidos", 37.0902, -95.7129, "1000km", "en", "US");
static SPAIN: Location = country("España", 40.4637, -3.7492, "500km", "es", "ES");
static JAPAN: Location = country("Japón", 36.2048, 138.2529, "500km", "ja", "JP");
static ARGENTINA: Location = country("Argentina", -38.4161, -63.6167, "1000km", "es", "AR");
static BRAZIL: Location = country("Brasil", -14.2350, -51.9253, "1000km", "pt", "BR");

static LOCATIONS: Lazy<HashMap<&'static str, &'static Location>> = Lazy::new(|| {
    HashMap::from([
        (DEFAULT_LOCATION_KEY, &OAXACA),
        ("ciudad de mexico", &CDMX),
        ("cdmx", &CDMX),
        ("mexico city", &CDMX),
        ("guadalajara", &GUADALAJARA),
        ("monterrey", &MONTERREY),
        ("puebla", &PUEBLA),
        ("china", &CHINA),
        ("estados unidos", &USA),
        ("usa", &USA),
        ("espana", &SPAIN),
        ("japon", &JAPAN),
        ("argentina", &ARGENTINA),
        ("brasil", &BRAZIL),
    ])
});

/// Lower-cases, strips Latin diacritics and collapses whitespace.
///
/// Handles both precomposed letters ("ó") and a base letter followed by a
/// combining mark ("o\u{301}").
pub fn normalize_location(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            word.chars()
                .flat_map(char::to_lowercase)
                .filter(|c| !is_combining_mark(*c))
                .map(fold_diacritic)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Never fails: unknown names get the default entry.
pub fn resolve_location(raw: &str) -> &'static Location {
    lookup_location(raw).unwrap_or_else(default_location)
}

pub fn lookup_location(raw: &str) -> Option<&'static Location> {
    LOCATIONS.get(normalize_location(raw).as_str()).copied()
}

pub fn default_location() -> &'static Location {
    &OAXACA
}
