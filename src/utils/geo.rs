use serde::{Deserialize, Serialize};

use super::contact::ascii_digit;

/// Decimal places kept when building route cache keys (~1 m).
pub const ROUTE_KEY_PRECISION: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// `None` for non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    pub fn from_pair(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::new(lat, lng),
            _ => None,
        }
    }

    /// Parses `"lat,lng"` (spaces and Arabic-Indic digits tolerated).
    pub fn parse(text: &str) -> Option<Self> {
        let ascii: String = text
            .chars()
            .map(|c| match c {
                '٫' => '.',
                '،' => ',',
                other => ascii_digit(other).unwrap_or(other),
            })
            .collect();

        let (lat, lng) = ascii.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lng = lng.trim().parse::<f64>().ok()?;
        Self::new(lat, lng)
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    fn rounded(&self) -> (f64, f64) {
        let factor = 10f64.powi(ROUTE_KEY_PRECISION);
        (
            (self.lat * factor).round() / factor,
            (self.lng * factor).round() / factor,
        )
    }
}

/// Identifies a route computation; jitter below the key precision maps to
/// the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey(String);

impl RouteKey {
    pub fn new(from: &Coordinates, to: &Coordinates) -> Self {
        let (from_lat, from_lng) = from.rounded();
        let (to_lat, to_lng) = to.rounded();
        let p = ROUTE_KEY_PRECISION as usize;
        Self(format!(
            "{:.p$},{:.p$}>{:.p$},{:.p$}",
            from_lat,
            from_lng,
            to_lat,
            to_lng,
            p = p
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Drops the whole polyline if any point is invalid; a partial route
/// would draw a wrong path.
pub fn validate_polyline(points: &[[f64; 2]]) -> Option<Vec<[f64; 2]>> {
    if points.is_empty() {
        return None;
    }
    points
        .iter()
        .map(|[lat, lng]| Coordinates::new(*lat, *lng).map(|c| [c.lat, c.lng]))
        .collect()
}
