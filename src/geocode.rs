//! Place-name geocoding for publication places.
//!
//! Input lines are `<code> <name>`; each produces one JSON line. A name that
//! cannot be located (lookup error or no match) still produces a line with
//! just the code and name, so output lines correspond one-to-one with input.

use std::io::{BufRead, Write};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

use miette::Diagnostic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Public Nominatim search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = concat!("catalog-ld/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Error, Diagnostic)]
pub enum GeocodeError {
    #[error("geocoder unreachable: {message}")]
    #[diagnostic(
        code(catalog::geocode::transport),
        help("Check network access to the geocoding endpoint.")
    )]
    Transport { message: String },

    #[error("geocoder returned HTTP {code}: {message}")]
    #[diagnostic(
        code(catalog::geocode::status),
        help("HTTP 429 or 403 usually means the request rate or user agent was rejected.")
    )]
    Status { code: u16, message: String },

    #[error("unexpected geocoder response: {message}")]
    #[diagnostic(code(catalog::geocode::decode))]
    Decode { message: String },

    #[error("geocode I/O error: {source}")]
    #[diagnostic(code(catalog::geocode::io))]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl GeocodeError {
    /// Worth another attempt after a pause.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type GeocodeResult<T> = std::result::Result<T, GeocodeError>;

/// A resolved place.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Name-to-coordinates lookup.
pub trait Geocoder {
    /// `Ok(None)` when the service has no match for `query`.
    fn geocode(&mut self, query: &str) -> GeocodeResult<Option<Location>>;
}

// ── Nominatim ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Blocking client for the Nominatim search API.
pub struct NominatimGeocoder {
    agent: ureq::Agent,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&mut self, query: &str) -> GeocodeResult<Option<Location>> {
        let response = match self
            .agent
            .get(&self.endpoint)
            .query("q", query)
            .query("format", "jsonv2")
            .query("limit", "1")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(GeocodeError::Status {
                    code,
                    message: response.into_string().unwrap_or_default(),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(GeocodeError::Transport {
                    message: transport.to_string(),
                });
            }
        };

        let places: Vec<NominatimPlace> =
            response.into_json().map_err(|e| GeocodeError::Decode {
                message: e.to_string(),
            })?;
        places.into_iter().next().map(place_location).transpose()
    }
}

fn place_location(place: NominatimPlace) -> GeocodeResult<Location> {
    let coordinate = |value: &str| {
        value.parse::<f64>().map_err(|e| GeocodeError::Decode {
            message: format!("coordinate \"{value}\": {e}"),
        })
    };
    Ok(Location {
        latitude: coordinate(&place.lat)?,
        longitude: coordinate(&place.lon)?,
        display_name: place.display_name,
    })
}

// ── Rate limiting ───────────────────────────────────────────────────────

/// Spaces calls to the wrapped geocoder at least `min_delay` apart and
/// retries transient failures up to `max_retries` times.
pub struct RateLimiter<G> {
    inner: G,
    min_delay: Duration,
    max_retries: u32,
    last_call: Option<Instant>,
}

impl<G: Geocoder> RateLimiter<G> {
    pub fn new(inner: G, min_delay: Duration) -> Self {
        Self {
            inner,
            min_delay,
            max_retries: DEFAULT_MAX_RETRIES,
            last_call: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn into_inner(self) -> G {
        self.inner
    }

    fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                thread::sleep(self.min_delay - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }
}

impl<G: Geocoder> Geocoder for RateLimiter<G> {
    fn geocode(&mut self, query: &str) -> GeocodeResult<Option<Location>> {
        let mut attempt = 0;
        loop {
            self.wait();
            match self.inner.geocode(query) {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(query, attempt, error = %e, "geocode failed, retrying");
                }
                result => return result,
            }
        }
    }
}

// ── Line processing ─────────────────────────────────────────────────────

static LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(.*)$").expect("static regex"));

/// One output line. Coordinates are present only for located names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeRecord {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoded_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl GeocodeRecord {
    pub fn unresolved(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            geocoded_name: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn located(code: &str, name: &str, location: Location) -> Self {
        Self {
            geocoded_name: Some(location.display_name),
            latitude: Some(location.latitude),
            longitude: Some(location.longitude),
            ..Self::unresolved(code, name)
        }
    }
}

/// Counts from one geocoding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeocodeSummary {
    pub located: usize,
    pub unresolved: usize,
    /// Lines that are not `<code> <name>`.
    pub malformed: usize,
}

/// Geocode every `<code> <name>` line of `input` into JSON lines on `output`.
///
/// Lookup failures are logged and written as unresolved records; only I/O
/// errors end the pass.
pub fn geocode_lines<R, W, G>(input: R, mut output: W, geocoder: &mut G) -> GeocodeResult<GeocodeSummary>
where
    R: BufRead,
    W: Write,
    G: Geocoder,
{
    let mut summary = GeocodeSummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let Some(caps) = LINE.captures(line.trim_end_matches('\r')) else {
            tracing::warn!(line = index + 1, "not a <code> <name> line, skipped");
            summary.malformed += 1;
            continue;
        };
        let (code, name) = (&caps[1], &caps[2]);
        tracing::info!(code, name, "geocoding");

        let record = match geocoder.geocode(name) {
            Ok(Some(location)) => {
                summary.located += 1;
                GeocodeRecord::located(code, name, location)
            }
            Ok(None) => {
                tracing::debug!(name, "no match");
                summary.unresolved += 1;
                GeocodeRecord::unresolved(code, name)
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "geocode failed");
                summary.unresolved += 1;
                GeocodeRecord::unresolved(code, name)
            }
        };

        serde_json::to_writer(&mut output, &record).map_err(|e| GeocodeError::Io {
            source: e.into(),
        })?;
        output.write_all(b"\n")?;
    }

    output.flush()?;
    Ok(summary)
}
