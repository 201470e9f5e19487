//! GPS sub-mapping ⇄ decimal coordinate conversion.

use std::fmt;
use thiserror::Error;

use crate::tags::{Rational, TagKey, TagMap, TagValue};

const TAG_LATITUDE_REF: &str = "GPSLatitudeRef";
const TAG_LATITUDE: &str = "GPSLatitude";
const TAG_LONGITUDE_REF: &str = "GPSLongitudeRef";
const TAG_LONGITUDE: &str = "GPSLongitude";

/// Seconds are stored with this denominator when encoding.
const SECONDS_DENOMINATOR: u32 = 10_000;

/// A signed decimal latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Parse `"lat, lon"` (comma or whitespace separated) and range-check it.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty());
        let latitude = parts.next()?.parse::<f64>().ok()?;
        let longitude = parts.next()?.parse::<f64>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let coord = Self { latitude, longitude };
        coord.is_valid().then_some(coord)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Why no coordinate could be derived. Display only; never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpsError {
    #[error("no GPS data")]
    Absent,
    #[error("GPS data incomplete: {0} missing")]
    Missing(&'static str),
    #[error("GPS data invalid: {0} has a zero denominator")]
    ZeroDenominator(&'static str),
    #[error("GPS data invalid: {tag} is '{value}'")]
    BadReference { tag: &'static str, value: String },
    #[error("GPS data invalid: {0} is not three rationals")]
    Malformed(&'static str),
}

/// Derive a decimal coordinate from the GPS sub-mapping of `tags`.
pub fn decode(tags: &TagMap) -> Result<Coordinate, GpsError> {
    let gps = tags.gps().ok_or(GpsError::Absent)?;
    if gps.is_empty() {
        return Err(GpsError::Absent);
    }

    let lat = axis(gps, TAG_LATITUDE)?;
    let lat_ref = reference(gps, TAG_LATITUDE_REF, ['N', 'S'])?;
    let lon = axis(gps, TAG_LONGITUDE)?;
    let lon_ref = reference(gps, TAG_LONGITUDE_REF, ['E', 'W'])?;

    Ok(Coordinate {
        latitude: if lat_ref == 'S' { -lat } else { lat },
        longitude: if lon_ref == 'W' { -lon } else { lon },
    })
}

/// degrees + minutes/60 + seconds/3600
fn axis(gps: &TagMap, tag: &'static str) -> Result<f64, GpsError> {
    let value = entry(gps, tag).ok_or(GpsError::Missing(tag))?;
    let TagValue::Rational(parts) = value else {
        return Err(GpsError::Malformed(tag));
    };
    let [deg, min, sec] = parts.as_slice() else {
        return Err(GpsError::Malformed(tag));
    };
    let deg = deg.to_f64().ok_or(GpsError::ZeroDenominator(tag))?;
    let min = min.to_f64().ok_or(GpsError::ZeroDenominator(tag))?;
    let sec = sec.to_f64().ok_or(GpsError::ZeroDenominator(tag))?;
    Ok(deg + min / 60.0 + sec / 3600.0)
}

fn reference(gps: &TagMap, tag: &'static str, allowed: [char; 2]) -> Result<char, GpsError> {
    let value = entry(gps, tag).ok_or(GpsError::Missing(tag))?;
    let text = match value {
        TagValue::Text(s) => s.trim_end_matches('\0').trim().to_string(),
        other => other.to_string(),
    };
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if allowed.contains(&c.to_ascii_uppercase()) => Ok(c.to_ascii_uppercase()),
        _ => Err(GpsError::BadReference { tag, value: text }),
    }
}

/// Look a GPS tag up directly in the sub-mapping.
fn entry<'a>(gps: &'a TagMap, tag: &str) -> Option<&'a TagValue> {
    gps.get(&TagKey::known(tag)?)
}

/// Build a tag mapping whose GPS sub-mapping holds `coord`.
pub fn encode(coord: Coordinate) -> TagMap {
    let (lat_ref, lat_dms) = to_dms(coord.latitude, 'N', 'S');
    let (lon_ref, lon_dms) = to_dms(coord.longitude, 'E', 'W');

    let mut gps = TagMap::new();
    for (name, value) in [
        (TAG_LATITUDE_REF, TagValue::Text(lat_ref.to_string())),
        (TAG_LATITUDE, TagValue::Rational(lat_dms)),
        (TAG_LONGITUDE_REF, TagValue::Text(lon_ref.to_string())),
        (TAG_LONGITUDE, TagValue::Rational(lon_dms)),
    ] {
        if let Some(key) = TagKey::known(name) {
            gps.insert(key, value);
        }
    }
    gps
}

fn to_dms(value: f64, positive: char, negative: char) -> (char, Vec<Rational>) {
    let reference = if value >= 0.0 { positive } else { negative };
    let abs = value.abs();

    let deg = abs.floor() as u32;
    let min = ((abs - deg as f64) * 60.0).floor() as u32;
    let sec = ((abs - deg as f64 - min as f64 / 60.0) * 3600.0 * SECONDS_DENOMINATOR as f64)
        .round() as u32;

    (
        reference,
        vec![
            Rational::new(deg, 1),
            Rational::new(min, 1),
            Rational::new(sec, SECONDS_DENOMINATOR),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> TagKey {
        TagKey::known(name).unwrap()
    }

    fn gps_map(lat: [(u32, u32); 3], lat_ref: &str, lon: [(u32, u32); 3], lon_ref: &str) -> TagMap {
        let r = |t: [(u32, u32); 3]| {
            TagValue::Rational(t.iter().map(|&(n, d)| Rational::new(n, d)).collect())
        };
        let mut map = TagMap::new();
        map.insert(key("GPSLatitudeRef"), TagValue::Text(lat_ref.into()));
        map.insert(key("GPSLatitude"), r(lat));
        map.insert(key("GPSLongitudeRef"), TagValue::Text(lon_ref.into()));
        map.insert(key("GPSLongitude"), r(lon));
        map
    }

    // ── decode ───────────────────────────────────────────────────────

    #[test]
    fn decode_new_york() {
        let map = gps_map([(40, 1), (51, 1), (4608, 100)], "N", [(74, 1), (0, 1), (216, 10)], "W");
        let c = decode(&map).unwrap();
        assert!((c.latitude - 40.8628).abs() < 1e-4, "{}", c.latitude);
        assert!((c.longitude - (-74.0060)).abs() < 1e-4, "{}", c.longitude);
    }

    #[test]
    fn decode_southern_eastern() {
        let map = gps_map([(33, 1), (52, 1), (0, 1)], "S", [(151, 1), (12, 1), (36, 1)], "E");
        let c = decode(&map).unwrap();
        assert!(c.latitude < 0.0);
        assert!(c.longitude > 0.0);
        assert!((c.longitude - 151.21).abs() < 1e-9);
    }

    #[test]
    fn decode_without_gps() {
        assert_eq!(decode(&TagMap::new()), Err(GpsError::Absent));
    }

    #[test]
    fn decode_zero_denominator() {
        let map = gps_map([(40, 1), (51, 0), (4608, 100)], "N", [(74, 1), (0, 1), (216, 10)], "W");
        assert_eq!(decode(&map), Err(GpsError::ZeroDenominator("GPSLatitude")));

        let map = gps_map([(40, 1), (51, 1), (4608, 100)], "N", [(74, 0), (0, 1), (216, 10)], "W");
        assert_eq!(decode(&map), Err(GpsError::ZeroDenominator("GPSLongitude")));
    }

    #[test]
    fn decode_bad_reference() {
        let map = gps_map([(40, 1), (51, 1), (0, 1)], "X", [(74, 1), (0, 1), (0, 1)], "W");
        assert!(matches!(decode(&map), Err(GpsError::BadReference { tag: "GPSLatitudeRef", .. })));

        // Latitude reference letters are not valid for longitude.
        let map = gps_map([(40, 1), (51, 1), (0, 1)], "N", [(74, 1), (0, 1), (0, 1)], "S");
        assert!(matches!(decode(&map), Err(GpsError::BadReference { tag: "GPSLongitudeRef", .. })));
    }

    #[test]
    fn decode_accepts_nul_terminated_reference() {
        let map = gps_map([(1, 1), (0, 1), (0, 1)], "S\0", [(2, 1), (0, 1), (0, 1)], "w");
        let c = decode(&map).unwrap();
        assert_eq!((c.latitude, c.longitude), (-1.0, -2.0));
    }

    #[test]
    fn decode_missing_subtag() {
        let mut map = TagMap::new();
        map.insert(key("GPSLatitudeRef"), TagValue::Text("N".into()));
        assert_eq!(decode(&map), Err(GpsError::Missing("GPSLatitude")));
    }

    #[test]
    fn decode_wrong_arity() {
        let mut map = gps_map([(1, 1), (0, 1), (0, 1)], "N", [(2, 1), (0, 1), (0, 1)], "E");
        map.insert(key("GPSLatitude"), TagValue::Rational(vec![Rational::new(1, 1)]));
        assert_eq!(decode(&map), Err(GpsError::Malformed("GPSLatitude")));
    }

    // ── encode ───────────────────────────────────────────────────────

    #[test]
    fn encode_decode_round_trip() {
        for (lat, lon) in [
            (40.8628, -74.0060),
            (-33.8688, 151.2093),
            (0.0, 0.0),
            (89.999999, -179.999999),
            (51.5007, -0.1246),
        ] {
            let c = decode(&encode(Coordinate { latitude: lat, longitude: lon })).unwrap();
            assert!((c.latitude - lat).abs() < 1e-6, "{lat} -> {}", c.latitude);
            assert!((c.longitude - lon).abs() < 1e-6, "{lon} -> {}", c.longitude);
        }
    }

    #[test]
    fn encode_uses_hemisphere_refs() {
        let gps = encode(Coordinate { latitude: -1.5, longitude: -2.25 });
        assert_eq!(gps.get_named("GPSLatitudeRef"), Some(&TagValue::Text("S".into())));
        assert_eq!(gps.get_named("GPSLongitudeRef"), Some(&TagValue::Text("W".into())));
        assert_eq!(
            gps.get_named("GPSLongitude"),
            Some(&TagValue::Rational(vec![
                Rational::new(2, 1),
                Rational::new(15, 1),
                Rational::new(0, SECONDS_DENOMINATOR)
            ]))
        );
    }

    // ── Coordinate::parse ────────────────────────────────────────────

    #[test]
    fn coordinate_parse() {
        assert_eq!(
            Coordinate::parse("40.8628, -74.006"),
            Some(Coordinate { latitude: 40.8628, longitude: -74.006 })
        );
        assert!(Coordinate::parse("40.8 -74.0").is_some());
        assert!(Coordinate::parse("91, 0").is_none());
        assert!(Coordinate::parse("0, 181").is_none());
        assert!(Coordinate::parse("north").is_none());
        assert!(Coordinate::parse("1, 2, 3").is_none());
    }
}
