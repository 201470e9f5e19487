use std::path::Path;

use nom_exif::{EntryValue, ExifIter, GPSInfo, LatLng, MediaParser, MediaSource};

use crate::error::{Error, Result};
use crate::tags::registry::{self, GPS_MAX_CODE, SKIPPED_CODES};
use crate::tags::{
    Namespace, Rational, RawTag, SignedRational, TagFormat, TagInfo, TagKey, TagMap, TagValue,
};

/// Character-code prefixes of the UserComment field.
const CHARSET_ASCII: &[u8; 8] = b"ASCII\0\0\0";
const CHARSET_UNICODE: &[u8; 8] = b"UNICODE\0";

/// Tags whose text is reformatted to EXIF `YYYY:MM:DD HH:MM:SS`.
const DATETIME_TAGS: &[&str] = &["DateTime", "DateTimeOriginal", "DateTimeDigitized"];

/// Read the primary-image EXIF tags of `path` into a [`TagMap`].
///
/// A file without EXIF yields an empty map. Thumbnail (IFD1) entries, IFD
/// pointers and strip layout are skipped. Codes the registry does not know
/// are kept as [`RawTag`] keys with the format they were stored in.
pub fn read_tags(path: &Path) -> Result<TagMap> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path)
        .map_err(|e| Error::Decode(format!("failed to open image file: {e}")))?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(e) => {
            log::debug!("No EXIF data found in {}: {e}", path.display());
            return Ok(TagMap::new());
        }
    };

    let mut tags = TagMap::new();

    // Seed the GPS sub-mapping from nom-exif's own GPS parser before the
    // iterator is consumed.
    let gps_info = iter.parse_gps_info().ok().flatten();
    let has_gps = gps_info.is_some();
    if let Some(gps) = gps_info {
        seed_gps(&mut tags, &gps);
    }

    for entry in iter {
        if entry.ifd_index() != 0 {
            continue;
        }
        let code = entry.tag_code();
        if SKIPPED_CODES.contains(&code) {
            continue;
        }
        let Some(value) = entry.get_value() else {
            log::debug!("Skipping unreadable entry 0x{code:04X}");
            continue;
        };

        if code <= GPS_MAX_CODE {
            // Interop sub-IFD entries share this code range; only trust it
            // alongside a parsed GPS block, and never over the seeded values.
            if !has_gps {
                continue;
            }
            let info = registry::by_code(Namespace::Gps, code);
            let key = key_for(info, Namespace::Gps, code, value);
            let present = tags.gps().is_some_and(|gps| gps.get(&key).is_some());
            if !present {
                tags.insert(key, convert(info, value));
            }
            continue;
        }

        let info = registry::by_code(Namespace::Image, code)
            .or_else(|| registry::by_code(Namespace::Photo, code));
        // Unregistered codes cannot be placed in IFD0 or the Exif sub-IFD from
        // the entry alone; they are written back to IFD0.
        let key = key_for(info, Namespace::Image, code, value);
        tags.insert(key, convert(info, value));
    }

    log::debug!("Read {} tags from {}", tags.len(), path.display());
    Ok(tags)
}

fn key_for(info: Option<&'static TagInfo>, namespace: Namespace, code: u16, value: &EntryValue) -> TagKey {
    match info {
        Some(info) => TagKey::Known(info),
        None => TagKey::Code(RawTag::new(namespace, code, raw_format(value))),
    }
}

/// Storage format of an unregistered entry, judged by its decoded value.
fn raw_format(value: &EntryValue) -> Option<TagFormat> {
    let format = match value {
        EntryValue::Text(_) => TagFormat::Ascii,
        EntryValue::U8(_) | EntryValue::U8Array(_) => TagFormat::Byte,
        EntryValue::U16(_) | EntryValue::U16Array(_) => TagFormat::Short,
        EntryValue::U32(_) | EntryValue::U32Array(_) => TagFormat::Long,
        EntryValue::URational(_) | EntryValue::URationalArray(_) => TagFormat::Rational,
        EntryValue::IRational(_) | EntryValue::IRationalArray(_) => TagFormat::SRational,
        EntryValue::Undefined(_) => TagFormat::Undefined,
        _ => return None,
    };
    Some(format)
}

fn seed_gps(tags: &mut TagMap, gps: &GPSInfo) {
    let seeds = [
        ("GPSLatitudeRef", TagValue::Text(gps.latitude_ref.to_string())),
        ("GPSLatitude", latlng(&gps.latitude)),
        ("GPSLongitudeRef", TagValue::Text(gps.longitude_ref.to_string())),
        ("GPSLongitude", latlng(&gps.longitude)),
    ];
    for (name, value) in seeds {
        if let Some(key) = TagKey::known(name) {
            tags.insert(key, value);
        }
    }
}

fn latlng(v: &LatLng) -> TagValue {
    TagValue::Rational(vec![
        Rational::new(v.0.0, v.0.1),
        Rational::new(v.1.0, v.1.1),
        Rational::new(v.2.0, v.2.1),
    ])
}

/// Map a nom-exif value onto the in-memory model.
fn convert(info: Option<&TagInfo>, value: &EntryValue) -> TagValue {
    let format = info.map(|i| i.format);
    match value {
        EntryValue::Text(s) if format == Some(TagFormat::Comment) => {
            TagValue::Text(decode_user_comment(s.as_bytes()))
        }
        EntryValue::Text(s) => text_value(info, s),
        EntryValue::U8(n) => TagValue::Integer(u32::from(*n)),
        EntryValue::U16(n) => TagValue::Integer(u32::from(*n)),
        EntryValue::U32(n) => TagValue::Integer(*n),
        EntryValue::U16Array(ns) => TagValue::from_integers(ns.iter().map(|&n| u32::from(n)).collect()),
        EntryValue::U32Array(ns) => TagValue::from_integers(ns.clone()),
        EntryValue::URational(r) => TagValue::Rational(vec![Rational::new(r.0, r.1)]),
        EntryValue::URationalArray(rs) => {
            TagValue::Rational(rs.iter().map(|r| Rational::new(r.0, r.1)).collect())
        }
        EntryValue::IRational(r) => TagValue::SignedRational(vec![SignedRational::new(r.0, r.1)]),
        EntryValue::IRationalArray(rs) => {
            TagValue::SignedRational(rs.iter().map(|r| SignedRational::new(r.0, r.1)).collect())
        }
        EntryValue::U8Array(bytes) | EntryValue::Undefined(bytes) => match format {
            Some(TagFormat::Utf16) => TagValue::Text(decode_utf16le(bytes)),
            Some(TagFormat::Comment) => TagValue::Text(decode_user_comment(bytes)),
            Some(TagFormat::Byte) => TagValue::from_integers(bytes.iter().map(|&b| u32::from(b)).collect()),
            Some(TagFormat::Ascii) => text_value(info, &String::from_utf8_lossy(bytes)),
            _ => TagValue::Bytes(bytes.clone()),
        },
        other => text_value(info, other.to_string().trim().trim_matches('"')),
    }
}

fn text_value(info: Option<&TagInfo>, s: &str) -> TagValue {
    let s = s.trim_end_matches('\0');
    match info {
        Some(info) if DATETIME_TAGS.contains(&info.name) => {
            TagValue::Text(exif_datetime(s).unwrap_or_else(|| s.to_string()))
        }
        _ => TagValue::Text(s.to_string()),
    }
}

/// nom-exif renders timestamps as RFC 3339; EXIF stores `YYYY:MM:DD HH:MM:SS`.
fn exif_datetime(s: &str) -> Option<String> {
    const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
    if chrono::NaiveDateTime::parse_from_str(s, EXIF_FORMAT).is_ok() {
        return Some(s.to_string());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.format(EXIF_FORMAT).to_string());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %:z") {
        return Some(dt.format(EXIF_FORMAT).to_string());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|f| chrono::NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.format(EXIF_FORMAT).to_string())
}

/// Windows XP* tags: UTF-16LE, NUL-terminated.
fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// UserComment: 8-byte character-code prefix followed by the text.
fn decode_user_comment(bytes: &[u8]) -> String {
    let (prefix, body) = if bytes.len() >= 8 { bytes.split_at(8) } else { (&[][..], bytes) };
    let text = if prefix == CHARSET_UNICODE {
        decode_utf16le(body)
    } else if prefix == CHARSET_ASCII || prefix.iter().all(|&b| b == 0) {
        String::from_utf8_lossy(body).into_owned()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };
    text.trim_end_matches(['\0', ' ']).to_string()
}
