//! In-place edits on a [`TagMap`]. Nothing here touches the filesystem.

use crate::error::{Error, Result};
use crate::gps::{self, Coordinate};
use crate::tags::{TagKey, TagMap, TagValue, registry};

/// Fields offered when building metadata from scratch.
pub const COMMON_FIELDS: &[&str] = &["Make", "Model", "DateTime", "Artist", "Copyright", "Software"];

impl TagMap {
    /// Insert or overwrite a registry tag from user input.
    ///
    /// Fails with [`Error::UnknownTag`] when `tag` has no registry entry and
    /// with [`Error::InvalidValue`] when `value` does not fit the tag's
    /// storage format. The mapping is untouched on failure.
    pub fn set(&mut self, tag: &str, value: &str) -> Result<()> {
        let info = registry::lookup(tag).ok_or_else(|| Error::UnknownTag(tag.trim().to_string()))?;
        let parsed = TagValue::parse(info, value)?;
        log::debug!("set {} = {parsed}", info.name);
        self.insert(TagKey::Known(info), parsed);
        Ok(())
    }

    /// Drop the whole GPS sub-mapping. Returns `false` if there was none.
    pub fn remove_gps(&mut self) -> bool {
        self.remove(&TagKey::gps_info()).is_some()
    }

    /// Replace the GPS sub-mapping with `coord`.
    pub fn set_gps(&mut self, coord: Coordinate) {
        self.remove_gps();
        for (key, value) in gps::encode(coord).iter() {
            self.insert(key.clone(), value.clone());
        }
    }

    pub fn clear_all(&mut self) {
        self.clear();
    }

    /// Build a fresh mapping from `(name, value)` pairs.
    ///
    /// Registry names are parsed like [`TagMap::set`], falling back to text
    /// when the value does not fit; any other name is kept as a custom tag.
    /// Blank names or values are skipped.
    pub fn create_from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = TagMap::new();
        for (name, value) in fields {
            let (name, value) = (name.as_ref().trim(), value.as_ref().trim());
            if name.is_empty() || value.is_empty() {
                continue;
            }
            match registry::lookup(name) {
                Some(info) => {
                    let parsed = TagValue::parse(info, value).unwrap_or_else(|e| {
                        log::warn!("{e}; keeping it as text");
                        TagValue::Text(value.to_string())
                    });
                    map.insert(TagKey::Known(info), parsed);
                }
                None => {
                    map.insert(TagKey::Custom(name.to_string()), TagValue::Text(value.to_string()));
                }
            }
        }
        map
    }
}

/// Current local time in EXIF `YYYY:MM:DD HH:MM:SS` form.
pub fn now_exif_datetime() -> String {
    chrono::Local::now().format("%Y:%m:%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::GpsError;
    use crate::tags::Rational;

    fn sample() -> TagMap {
        let mut map = TagMap::new();
        map.set("Make", "Canon").unwrap();
        map.set("Model", "EOS 5D").unwrap();
        map.set_gps(Coordinate { latitude: 40.8628, longitude: -74.006 });
        map
    }

    // ── set ──────────────────────────────────────────────────────────

    #[test]
    fn set_inserts_and_overwrites() {
        let mut map = sample();
        map.set("Artist", "John Doe").unwrap();
        map.set("artist", "Jane Doe").unwrap();
        assert_eq!(map.get_named("Artist"), Some(&TagValue::Text("Jane Doe".into())));
    }

    #[test]
    fn set_unknown_tag() {
        let mut map = sample();
        let before = map.clone();
        let err = map.set("FavouriteColour", "blue").unwrap_err();
        assert!(matches!(err, Error::UnknownTag(ref t) if t == "FavouriteColour"));
        assert!(err.is_recoverable());
        assert_eq!(map, before);
    }

    #[test]
    fn set_invalid_value_leaves_map() {
        let mut map = sample();
        let before = map.clone();
        assert!(matches!(map.set("Orientation", "upside down"), Err(Error::InvalidValue { .. })));
        assert_eq!(map, before);
    }

    #[test]
    fn set_parses_rationals() {
        let mut map = TagMap::new();
        map.set("ExposureTime", "1/250").unwrap();
        map.set("FNumber", "2.8").unwrap();
        assert_eq!(map.get_named("ExposureTime"), Some(&TagValue::Rational(vec![Rational::new(1, 250)])));
        assert_eq!(map.get_named("FNumber"), Some(&TagValue::Rational(vec![Rational::new(14, 5)])));
    }

    #[test]
    fn set_accepts_standard_exif_names() {
        use crate::tags::SignedRational;

        let mut map = TagMap::new();
        map.set("LensModel", "RF 24-70mm").unwrap();
        map.set("ExposureCompensation", "-0.5").unwrap();
        map.set("ExposureProgram", "3").unwrap();
        map.set("GPSImgDirection", "181.5").unwrap();
        assert_eq!(map.get_named("LensModel"), Some(&TagValue::Text("RF 24-70mm".into())));
        assert_eq!(
            map.get_named("ExposureBiasValue"),
            Some(&TagValue::SignedRational(vec![SignedRational::new(-1, 2)]))
        );
        assert_eq!(map.get_named("ExposureProgram"), Some(&TagValue::Integer(3)));
        assert!(map.gps().unwrap().get_named("GPSImgDirection").is_some());
    }

    #[test]
    fn set_gps_subtag_routes_to_gps() {
        let mut map = sample();
        map.set("GPSLatitudeRef", "S").unwrap();
        let c = gps::decode(&map).unwrap();
        assert!(c.latitude < 0.0);
    }

    #[test]
    fn set_gps_info_is_rejected() {
        let mut map = sample();
        assert!(matches!(map.set("GPSInfo", "x"), Err(Error::UnknownTag(_))));
    }

    // ── remove_gps / clear_all ───────────────────────────────────────

    #[test]
    fn remove_gps_then_decode_is_absent() {
        let mut map = sample();
        assert!(gps::decode(&map).is_ok());
        assert!(map.remove_gps());
        assert_eq!(gps::decode(&map), Err(GpsError::Absent));
        assert_eq!(map.get_named("Make"), Some(&TagValue::Text("Canon".into())));
    }

    #[test]
    fn remove_gps_without_gps_is_noop() {
        let mut map = TagMap::new();
        map.set("Make", "Canon").unwrap();
        let before = map.clone();
        assert!(!map.remove_gps());
        assert_eq!(map, before);
    }

    #[test]
    fn clear_all_empties() {
        let mut map = sample();
        map.clear_all();
        assert!(map.is_empty());
        for name in ["Make", "Model", "GPSLatitude", "Artist"] {
            assert!(map.get_named(name).is_none(), "{name}");
        }
        assert_eq!(gps::decode(&map), Err(GpsError::Absent));
    }

    // ── create_from_fields ───────────────────────────────────────────

    #[test]
    fn create_from_common_and_custom_fields() {
        let map = TagMap::create_from_fields([
            ("Make", "Nikon"),
            ("Model", "D850"),
            ("DateTime", "2024:05:01 10:00:00"),
            ("Artist", ""),
            ("Mood", "sunny"),
            ("  ", "ignored"),
        ]);
        assert_eq!(map.len(), 4);
        assert_eq!(map.get_named("Make"), Some(&TagValue::Text("Nikon".into())));
        assert!(map.get_named("Artist").is_none());
        assert_eq!(map.get(&TagKey::Custom("Mood".into())), Some(&TagValue::Text("sunny".into())));
    }

    #[test]
    fn create_keeps_unparsable_known_values_as_text() {
        let map = TagMap::create_from_fields(vec![("Orientation".to_string(), "rotated".to_string())]);
        assert_eq!(map.get_named("Orientation"), Some(&TagValue::Text("rotated".into())));
    }

    #[test]
    fn common_fields_are_known() {
        for name in COMMON_FIELDS {
            assert!(TagKey::known(name).is_some(), "{name}");
        }
    }

    #[test]
    fn now_is_exif_formatted() {
        let s = now_exif_datetime();
        assert_eq!(s.len(), 19);
        assert_eq!(&s[4..5], ":");
        assert_eq!(&s[10..11], " ");
    }
}
