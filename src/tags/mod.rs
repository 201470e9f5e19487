//! In-memory tag mapping shared by the reader, editor and writer.
//!
//! A [`TagMap`] is an ordered list of `(TagKey, TagValue)` pairs with unique
//! keys. GPS tags never sit at the top level: they live in a nested map
//! stored under the `GPSInfo` key, mirroring the GPS sub-IFD on disk.

pub mod registry;

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};
pub use registry::{Namespace, TagFormat, TagInfo};

/// An unsigned EXIF rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub denom: u32,
}

impl Rational {
    pub const fn new(num: u32, denom: u32) -> Self {
        Self { num, denom }
    }

    /// `None` when the denominator is zero.
    pub fn to_f64(self) -> Option<f64> {
        if self.denom == 0 {
            None
        } else {
            Some(self.num as f64 / self.denom as f64)
        }
    }

    /// Parse `"a/b"`, an integer or a decimal such as `"2.8"`.
    fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        if let Some((n, d)) = s.split_once('/') {
            let num = n.trim().parse::<u32>().map_err(|e| format!("bad numerator: {e}"))?;
            let denom = d.trim().parse::<u32>().map_err(|e| format!("bad denominator: {e}"))?;
            if denom == 0 {
                return Err("zero denominator".to_string());
            }
            return Ok(Self::new(num, denom));
        }
        if let Some((int, frac)) = s.split_once('.') {
            if int.is_empty() && frac.is_empty() {
                return Err("bad number: no digits".to_string());
            }
            if !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
                return Err(format!("bad number: '{s}'"));
            }
            let frac = frac.trim_end_matches('0');
            if frac.len() > 6 {
                return Err("too many decimal places".to_string());
            }
            let denom = 10u32.pow(frac.len() as u32);
            let whole = if int.is_empty() { 0 } else {
                int.parse::<u32>().map_err(|e| format!("bad number: {e}"))?
            };
            let part = if frac.is_empty() { 0 } else {
                frac.parse::<u32>().map_err(|e| format!("bad number: {e}"))?
            };
            let num = whole
                .checked_mul(denom)
                .and_then(|w| w.checked_add(part))
                .ok_or_else(|| "number too large".to_string())?;
            return Ok(Self::new(num, denom).reduced());
        }
        let num = s.parse::<u32>().map_err(|e| format!("bad number: {e}"))?;
        Ok(Self::new(num, 1))
    }

    fn reduced(self) -> Self {
        let g = gcd(self.num, self.denom);
        if g <= 1 {
            self
        } else {
            Self::new(self.num / g, self.denom / g)
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

/// A signed EXIF rational (SRATIONAL), e.g. an exposure bias of `-2/3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedRational {
    pub num: i32,
    pub denom: i32,
}

impl SignedRational {
    pub const fn new(num: i32, denom: i32) -> Self {
        Self { num, denom }
    }

    /// Same forms as [`Rational`], with an optional leading sign.
    fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        let (negative, magnitude) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let r = Rational::parse(magnitude)?;
        let out_of_range = || "number out of range".to_string();
        let num = i32::try_from(r.num).map_err(|_| out_of_range())?;
        let denom = i32::try_from(r.denom).map_err(|_| out_of_range())?;
        Ok(Self::new(if negative { -num } else { num }, denom))
    }
}

impl fmt::Display for SignedRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

/// A tag read from a file that the registry does not describe.
///
/// Two raw tags are the same key when they share namespace and code.
#[derive(Debug, Clone, Copy)]
pub struct RawTag {
    pub namespace: Namespace,
    pub code: u16,
    /// Storage format found in the file; `None` when it has no writable form.
    pub format: Option<TagFormat>,
}

impl RawTag {
    pub const fn new(namespace: Namespace, code: u16, format: Option<TagFormat>) -> Self {
        Self {
            namespace,
            code,
            format,
        }
    }
}

impl PartialEq for RawTag {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.code == other.code
    }
}

impl Eq for RawTag {}

/// Identifies a tag in a [`TagMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKey {
    /// A tag from the registry; the writer can encode it.
    Known(&'static TagInfo),
    /// A user-supplied name with no registry entry.
    Custom(String),
    /// A numeric tag read from a file that the registry does not describe.
    Code(RawTag),
}

impl TagKey {
    /// Resolve a name against the registry.
    pub fn known(name: &str) -> Option<Self> {
        registry::lookup(name).map(Self::Known)
    }

    pub fn gps_info() -> Self {
        Self::Known(&registry::GPS_INFO)
    }

    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Self::Known(info) => Cow::Borrowed(info.name),
            Self::Custom(name) => Cow::Borrowed(name.as_str()),
            Self::Code(raw) => Cow::Owned(format!("0x{:04X}", raw.code)),
        }
    }

    pub fn namespace(&self) -> Option<Namespace> {
        match self {
            Self::Known(info) => Some(info.namespace),
            Self::Code(raw) => Some(raw.namespace),
            Self::Custom(_) => None,
        }
    }

    fn is_gps(&self) -> bool {
        self.namespace() == Some(Namespace::Gps)
    }

    fn is_gps_info(&self) -> bool {
        matches!(self, Self::Known(info) if *info == &registry::GPS_INFO)
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A tag value as held in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Integer(u32),
    /// More than one BYTE/SHORT/LONG component.
    Integers(Vec<u32>),
    Rational(Vec<Rational>),
    SignedRational(Vec<SignedRational>),
    Bytes(Vec<u8>),
    /// The nested GPS sub-mapping.
    Gps(TagMap),
}

impl TagValue {
    /// Parse user input according to a tag's storage format.
    pub fn parse(info: &TagInfo, raw: &str) -> Result<Self> {
        Self::parse_as(info.name, info.format, info.count, raw)
    }

    /// Like [`TagValue::parse`] for a tag described by its parts.
    pub(crate) fn parse_as(
        name: &str,
        format: TagFormat,
        count: Option<usize>,
        raw: &str,
    ) -> Result<Self> {
        let value = raw.trim();
        let invalid = |reason: String| Error::invalid_value(name, raw, reason);
        let check_count = |len: usize| match count {
            Some(count) if len != count => Err(invalid(format!(
                "expected {count} value(s), got {len}"
            ))),
            _ => Ok(()),
        };

        match format {
            TagFormat::Ascii | TagFormat::Utf16 | TagFormat::Comment => {
                Ok(Self::Text(value.to_string()))
            }
            TagFormat::Undefined => {
                check_count(value.len())?;
                Ok(Self::Text(value.to_string()))
            }
            TagFormat::Byte | TagFormat::Short | TagFormat::Long => {
                let max = match format {
                    TagFormat::Byte => u32::from(u8::MAX),
                    TagFormat::Short => u32::from(u16::MAX),
                    _ => u32::MAX,
                };
                let numbers = split_list(value)
                    .map(|p| match p.parse::<u32>() {
                        Ok(n) if n <= max => Ok(n),
                        Ok(n) => Err(format!("{n} is larger than {max}")),
                        Err(e) => Err(e.to_string()),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(invalid)?;
                if numbers.is_empty() {
                    return Err(invalid("empty value".to_string()));
                }
                check_count(numbers.len())?;
                Ok(Self::from_integers(numbers))
            }
            TagFormat::Rational => {
                let rationals = split_list(value)
                    .map(Rational::parse)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(invalid)?;
                if rationals.is_empty() {
                    return Err(invalid("empty value".to_string()));
                }
                check_count(rationals.len())?;
                Ok(Self::Rational(rationals))
            }
            TagFormat::SRational => {
                let rationals = split_list(value)
                    .map(SignedRational::parse)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(invalid)?;
                if rationals.is_empty() {
                    return Err(invalid("empty value".to_string()));
                }
                check_count(rationals.len())?;
                Ok(Self::SignedRational(rationals))
            }
            TagFormat::SubIfd => Err(invalid("set the individual GPS tags instead".to_string())),
        }
    }

    /// `Integer` for a single component, `Integers` otherwise.
    pub(crate) fn from_integers(mut numbers: Vec<u32>) -> Self {
        if numbers.len() == 1 {
            Self::Integer(numbers.remove(0))
        } else {
            Self::Integers(numbers)
        }
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Integers(values) => write_list(f, values),
            Self::Rational(values) => write_list(f, values),
            Self::SignedRational(values) => write_list(f, values),
            Self::Bytes(bytes) if bytes.len() <= 16 => {
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Bytes(bytes) => write!(f, "({} bytes)", bytes.len()),
            Self::Gps(map) => write!(f, "({} GPS entries)", map.len()),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

/// Ordered mapping from tag to value with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMap {
    entries: Vec<(TagKey, TagValue)>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagKey, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn get(&self, key: &TagKey) -> Option<&TagValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look a tag up by name. GPS tag names are searched in the GPS
    /// sub-mapping; names without a registry entry match custom keys.
    pub fn get_named(&self, name: &str) -> Option<&TagValue> {
        match TagKey::known(name) {
            Some(key) if key.is_gps() => self.gps()?.get(&key),
            Some(key) => self.get(&key),
            None => self.get(&TagKey::Custom(name.trim().to_string())),
        }
    }

    /// Insert or overwrite. An overwritten entry keeps its position.
    /// GPS-namespace keys are routed into the GPS sub-mapping.
    pub fn insert(&mut self, key: TagKey, value: TagValue) -> Option<TagValue> {
        if key.is_gps() {
            return self.gps_mut().insert_here(key, value);
        }
        self.insert_here(key, value)
    }

    fn insert_here(&mut self, key: TagKey, value: TagValue) -> Option<TagValue> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &TagKey) -> Option<TagValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// The GPS sub-mapping, if present.
    pub fn gps(&self) -> Option<&TagMap> {
        self.entries.iter().find_map(|(k, v)| match v {
            TagValue::Gps(map) if k.is_gps_info() => Some(map),
            _ => None,
        })
    }

    /// The GPS sub-mapping, created empty if missing.
    pub(crate) fn gps_mut(&mut self) -> &mut TagMap {
        let pos = match self.entries.iter().position(|(k, _)| k.is_gps_info()) {
            Some(pos) => pos,
            None => {
                self.entries
                    .push((TagKey::gps_info(), TagValue::Gps(TagMap::new())));
                self.entries.len() - 1
            }
        };
        let slot = &mut self.entries[pos].1;
        if !matches!(slot, TagValue::Gps(_)) {
            *slot = TagValue::Gps(TagMap::new());
        }
        match slot {
            TagValue::Gps(map) => map,
            _ => unreachable!("slot was just set to a GPS map"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(name: &str) -> TagKey {
        TagKey::known(name).unwrap()
    }

    // ── Rational ──────────────────────────────────────────────────────

    #[test]
    fn rational_parse_forms() {
        assert_eq!(Rational::parse("1/250"), Ok(Rational::new(1, 250)));
        assert_eq!(Rational::parse("72"), Ok(Rational::new(72, 1)));
        assert_eq!(Rational::parse("2.8"), Ok(Rational::new(14, 5)));
        assert_eq!(Rational::parse("46.08"), Ok(Rational::new(1152, 25)));
        assert_eq!(Rational::parse("5.0"), Ok(Rational::new(5, 1)));
    }

    #[test]
    fn rational_parse_rejects_zero_denominator() {
        assert!(Rational::parse("1/0").is_err());
        assert!(Rational::parse("abc").is_err());
        assert!(Rational::parse("-1").is_err());
    }

    #[test]
    fn rational_parse_decimal_errors() {
        assert_eq!(Rational::parse("1.a"), Err("bad number: '1.a'".to_string()));
        assert_eq!(Rational::parse("a.5"), Err("bad number: 'a.5'".to_string()));
        assert_eq!(Rational::parse("1.1234567"), Err("too many decimal places".to_string()));
        assert!(Rational::parse(".").is_err());
        assert_eq!(Rational::parse(".5"), Ok(Rational::new(1, 2)));
        assert_eq!(Rational::parse("3."), Ok(Rational::new(3, 1)));
    }

    #[test]
    fn signed_rational_parse() {
        assert_eq!(SignedRational::parse("-2/3"), Ok(SignedRational::new(-2, 3)));
        assert_eq!(SignedRational::parse("+0.5"), Ok(SignedRational::new(1, 2)));
        assert_eq!(SignedRational::parse("-0.7"), Ok(SignedRational::new(-7, 10)));
        assert!(SignedRational::parse("--1").is_err());
        assert!(SignedRational::parse("3000000000").is_err());
    }

    #[test]
    fn rational_to_f64() {
        assert_eq!(Rational::new(1, 4).to_f64(), Some(0.25));
        assert_eq!(Rational::new(1, 0).to_f64(), None);
    }

    // ── TagValue::parse ──────────────────────────────────────────────

    #[test]
    fn parse_short() {
        let info = registry::lookup("Orientation").unwrap();
        assert_eq!(TagValue::parse(info, " 6 ").unwrap(), TagValue::Integer(6));
        assert!(TagValue::parse(info, "sideways").is_err());
        assert!(TagValue::parse(info, "70000").is_err());
    }

    #[test]
    fn parse_rational_count() {
        let info = registry::lookup("GPSLatitude").unwrap();
        let v = TagValue::parse(info, "40/1, 51/1, 4608/100").unwrap();
        assert_eq!(
            v,
            TagValue::Rational(vec![
                Rational::new(40, 1),
                Rational::new(51, 1),
                Rational::new(4608, 100)
            ])
        );
        assert!(TagValue::parse(info, "40/1 51/1").is_err());
    }

    #[test]
    fn parse_integer_lists() {
        let version = registry::lookup("GPSVersionID").unwrap();
        assert_eq!(
            TagValue::parse(version, "2, 3, 0, 0").unwrap(),
            TagValue::Integers(vec![2, 3, 0, 0])
        );
        assert!(TagValue::parse(version, "2 3 0").is_err());
        assert!(TagValue::parse(version, "2 3 0 300").is_err());

        let iso = registry::lookup("ISOSpeedRatings").unwrap();
        assert_eq!(TagValue::parse(iso, "400").unwrap(), TagValue::Integer(400));
        assert!(TagValue::parse(iso, "").is_err());

        let width = registry::lookup("PixelXDimension").unwrap();
        assert_eq!(TagValue::parse(width, "100000").unwrap(), TagValue::Integer(100_000));
    }

    #[test]
    fn parse_signed_and_undefined() {
        let bias = registry::lookup("ExposureBiasValue").unwrap();
        assert_eq!(
            TagValue::parse(bias, "-1/3").unwrap(),
            TagValue::SignedRational(vec![SignedRational::new(-1, 3)])
        );
        let version = registry::lookup("ExifVersion").unwrap();
        assert_eq!(TagValue::parse(version, "0232").unwrap(), TagValue::Text("0232".into()));
        assert!(TagValue::parse(version, "2.32").is_err());
    }

    #[test]
    fn parse_text_trims() {
        let info = registry::lookup("Artist").unwrap();
        assert_eq!(
            TagValue::parse(info, "  John Doe ").unwrap(),
            TagValue::Text("John Doe".into())
        );
    }

    #[test]
    fn display_values() {
        assert_eq!(TagValue::Integer(3).to_string(), "3");
        assert_eq!(
            TagValue::Rational(vec![Rational::new(1, 2), Rational::new(3, 1)]).to_string(),
            "1/2, 3/1"
        );
        assert_eq!(TagValue::Bytes(vec![0x30, 0x32]).to_string(), "30 32");
        assert_eq!(TagValue::Bytes(vec![0; 40]).to_string(), "(40 bytes)");
        assert_eq!(TagValue::Integers(vec![2, 3, 0, 0]).to_string(), "2, 3, 0, 0");
        assert_eq!(
            TagValue::SignedRational(vec![SignedRational::new(-1, 3)]).to_string(),
            "-1/3"
        );
    }

    // ── TagMap ───────────────────────────────────────────────────────

    #[test]
    fn insert_overwrites_in_place() {
        let mut map = TagMap::new();
        map.insert(known("Make"), TagValue::Text("A".into()));
        map.insert(known("Model"), TagValue::Text("B".into()));
        let old = map.insert(known("Make"), TagValue::Text("C".into()));

        assert_eq!(old, Some(TagValue::Text("A".into())));
        assert_eq!(map.len(), 2);
        let names: Vec<_> = map.iter().map(|(k, _)| k.name().into_owned()).collect();
        assert_eq!(names, ["Make", "Model"]);
        assert_eq!(map.get_named("make"), Some(&TagValue::Text("C".into())));
    }

    #[test]
    fn gps_keys_are_nested() {
        let mut map = TagMap::new();
        map.insert(known("GPSLatitudeRef"), TagValue::Text("N".into()));

        assert_eq!(map.len(), 1);
        assert!(map.get(&known("GPSLatitudeRef")).is_none());
        assert_eq!(map.gps().map(TagMap::len), Some(1));
        assert_eq!(map.get_named("GPSLatitudeRef"), Some(&TagValue::Text("N".into())));
    }

    #[test]
    fn custom_and_code_keys() {
        let print_im = TagKey::Code(RawTag::new(Namespace::Image, 0xC4A5, Some(TagFormat::Undefined)));
        let mut map = TagMap::new();
        map.insert(TagKey::Custom("Mood".into()), TagValue::Text("happy".into()));
        map.insert(print_im.clone(), TagValue::Bytes(vec![1, 2]));

        assert_eq!(map.get_named("Mood"), Some(&TagValue::Text("happy".into())));
        assert_eq!(print_im.to_string(), "0xC4A5");
        assert!(map.remove(&TagKey::Code(RawTag::new(Namespace::Image, 0xC4A5, None))).is_some());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn gps_code_keys_are_nested() {
        let mut map = TagMap::new();
        let key = TagKey::Code(RawTag::new(Namespace::Gps, 0x001F, Some(TagFormat::Rational)));
        map.insert(key.clone(), TagValue::Rational(vec![Rational::new(5, 1)]));

        assert!(map.get(&key).is_none());
        assert!(map.gps().is_some_and(|gps| gps.get(&key).is_some()));
    }
}
