use std::borrow::Cow;
use std::cell::Cell;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Once;

use image::codecs::jpeg::JpegEncoder;
use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;

use crate::config::OutputConfig;
use crate::error::{Error, Result};
use crate::media::{ColorMode, LoadedImage, temp_beside};
use crate::tags::{Namespace, Rational, TagFormat, TagInfo, TagKey, TagMap, TagValue};

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

/// What happened to the tag mapping during a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// An EXIF block with this many tags was embedded.
    Embedded { tags: usize },
    /// Nothing encodable; the image was saved without EXIF.
    Empty,
    /// The mapping could not be encoded; the image was saved without EXIF.
    Dropped { reason: String },
}

/// Result of [`save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub path: PathBuf,
    /// Set when the pixels had to be converted to RGB first.
    pub converted_from: Option<ColorMode>,
    pub metadata: MetadataOutcome,
    /// Custom tags, and file tags of an unwritable type, left out of the EXIF block.
    pub skipped: Vec<String>,
}

impl SaveReport {
    pub fn metadata_dropped(&self) -> bool {
        matches!(self.metadata, MetadataOutcome::Dropped { .. })
    }
}

/// `<stem><suffix>.jpg` in the directory of `source`.
pub fn output_path(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    source.with_file_name(format!("{stem}{suffix}.jpg"))
}

/// Write `image` as a JPEG carrying `tags` to `dest`.
///
/// Strategy:
/// 1. Convert to 8-bit RGB if needed and encode the pixels as JPEG
/// 2. Encode the tag mapping into a TIFF block with little_exif
/// 3. Embed it as the APP1 segment with img-parts, right after JFIF
/// 4. If step 2 or 3 fails, keep the plain JPEG and report the metadata as dropped
/// 5. Write to a temp file beside `dest` and rename it into place
pub fn save(image: &LoadedImage, tags: &TagMap, dest: &Path, config: &OutputConfig) -> Result<SaveReport> {
    if is_same_file(&image.path, dest) {
        return Err(Error::InvalidInput(format!(
            "refusing to overwrite the source image {}",
            dest.display()
        )));
    }

    let (rgb, converted_from) = image.to_encodable();
    if let Some(mode) = converted_from {
        log::info!("Converting {mode} image to RGB for JPEG output");
    }

    let mut jpeg_bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, config.quality());
    rgb.write_with_encoder(encoder)
        .map_err(|e| Error::Encode(format!("failed to encode JPEG: {e}")))?;

    let (bytes, metadata, skipped) = match encode_tags(tags) {
        Ok(encoded) if encoded.tiff.is_empty() => (jpeg_bytes, MetadataOutcome::Empty, encoded.skipped),
        Ok(encoded) => match embed_exif(&jpeg_bytes, encoded.tiff) {
            Ok(bytes) => (bytes, MetadataOutcome::Embedded { tags: encoded.count }, encoded.skipped),
            Err(e) => {
                log::warn!("Could not embed EXIF, saving without metadata: {e}");
                (jpeg_bytes, MetadataOutcome::Dropped { reason: e.to_string() }, encoded.skipped)
            }
        },
        Err(e) => {
            log::warn!("Could not encode EXIF, saving without metadata: {e}");
            (jpeg_bytes, MetadataOutcome::Dropped { reason: e.to_string() }, Vec::new())
        }
    };

    for name in &skipped {
        log::warn!("Tag {name} has no EXIF encoding and was not written");
    }

    write_atomic(dest, &bytes)?;
    log::info!("Saved {}", dest.display());

    Ok(SaveReport {
        path: dest.to_path_buf(),
        converted_from,
        metadata,
        skipped,
    })
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = temp_beside(dest)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

struct EncodedTags {
    /// TIFF data without the APP1 header. Empty when nothing was encodable.
    tiff: Vec<u8>,
    count: usize,
    skipped: Vec<String>,
}

/// Where and how one entry is stored on disk.
struct Slot<'a> {
    name: Cow<'a, str>,
    code: u16,
    namespace: Namespace,
    format: TagFormat,
    count: Option<usize>,
}

impl<'a> Slot<'a> {
    fn known(info: &'a TagInfo) -> Self {
        Slot {
            name: Cow::Borrowed(info.name),
            code: info.code,
            namespace: info.namespace,
            format: info.format,
            count: info.count,
        }
    }

    /// `None` for custom names and file tags with no writable format.
    fn for_key(key: &'a TagKey) -> Option<Self> {
        match key {
            TagKey::Known(info) => Some(Slot::known(info)),
            TagKey::Code(raw) => Some(Slot {
                name: key.name(),
                code: raw.code,
                namespace: raw.namespace,
                format: raw.format?,
                count: None,
            }),
            TagKey::Custom(_) => None,
        }
    }
}

/// Encode the mapping as a little_exif TIFF block.
fn encode_tags(tags: &TagMap) -> Result<EncodedTags> {
    let mut exif_tags = Vec::new();
    let mut skipped = Vec::new();

    let gps_entries = tags.gps().into_iter().flat_map(TagMap::iter);
    let top_level = tags.iter().filter(|(_, v)| !matches!(v, TagValue::Gps(_)));
    for (key, value) in top_level.chain(gps_entries) {
        match Slot::for_key(key) {
            Some(slot) => exif_tags.push(to_exif_tag(&slot, value)?),
            None => skipped.push(key.name().into_owned()),
        }
    }

    if exif_tags.is_empty() {
        return Ok(EncodedTags { tiff: Vec::new(), count: 0, skipped });
    }

    let count = exif_tags.len();
    let tiff = build_tiff(exif_tags)?;
    Ok(EncodedTags { tiff, count, skipped })
}

/// Run little_exif's serializer with its panics contained.
fn build_tiff(exif_tags: Vec<ExifTag>) -> Result<Vec<u8>> {
    let result = catch_unwind_quietly(move || {
        let mut metadata = Metadata::new();
        for tag in exif_tags {
            metadata.set_tag(tag);
        }
        metadata.as_u8_vec(FileExtension::JPEG)
    });

    match result {
        Ok(bytes) if bytes.len() > JPEG_EXIF_OVERHEAD => Ok(bytes[JPEG_EXIF_OVERHEAD..].to_vec()),
        Ok(_) => Err(Error::Encode("EXIF encoder produced no data".to_string())),
        Err(_) => Err(Error::Encode("EXIF encoder panicked".to_string())),
    }
}

thread_local! {
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: Once = Once::new();

/// `catch_unwind` that keeps panics on this thread off stderr.
///
/// The process-wide hook is wrapped once; other threads keep reporting
/// their panics as usual.
fn catch_unwind_quietly<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if !QUIET_PANICS.with(Cell::get) {
                previous(info);
            }
        }));
    });
    QUIET_PANICS.with(|quiet| quiet.set(true));
    let result = std::panic::catch_unwind(AssertUnwindSafe(f));
    QUIET_PANICS.with(|quiet| quiet.set(false));
    result
}

/// Translate one entry into its little_exif representation.
fn to_exif_tag(slot: &Slot<'_>, value: &TagValue) -> Result<ExifTag> {
    let (format, raw_data) = raw_value(slot, value)?;
    let group = match slot.namespace {
        Namespace::Image => ExifTagGroup::IFD0,
        Namespace::Photo => ExifTagGroup::ExifIFD,
        Namespace::Gps => ExifTagGroup::GPSIFD,
    };
    ExifTag::from_u16_with_data(slot.code, &format, &raw_data, &Endian::Little, &group)
        .map_err(|e| Error::Encode(format!("{}: {e:?}", slot.name)))
}

/// The on-disk bytes of `value`, little-endian.
fn raw_value(slot: &Slot<'_>, value: &TagValue) -> Result<(ExifTagFormat, Vec<u8>)> {
    let encoded = match slot.format {
        TagFormat::Ascii => {
            let mut bytes = ascii(slot, value)?.into_bytes();
            bytes.push(0);
            (ExifTagFormat::STRING, bytes)
        }
        TagFormat::Byte => {
            let bytes = integers(slot, value)?
                .into_iter()
                .map(|n| u8::try_from(n).map_err(|_| mismatch(slot, value, "bytes")))
                .collect::<Result<Vec<_>>>()?;
            (ExifTagFormat::INT8U, bytes)
        }
        TagFormat::Short => {
            let mut bytes = Vec::new();
            for n in integers(slot, value)? {
                let n = u16::try_from(n).map_err(|_| mismatch(slot, value, "16-bit integers"))?;
                bytes.extend_from_slice(&n.to_le_bytes());
            }
            (ExifTagFormat::INT16U, bytes)
        }
        TagFormat::Long => {
            let bytes = integers(slot, value)?
                .into_iter()
                .flat_map(u32::to_le_bytes)
                .collect();
            (ExifTagFormat::INT32U, bytes)
        }
        TagFormat::Rational => (ExifTagFormat::RATIONAL64U, rationals(slot, value)?),
        TagFormat::SRational => (ExifTagFormat::RATIONAL64S, signed_rationals(slot, value)?),
        TagFormat::Undefined => (ExifTagFormat::UNDEF, undefined(slot, value)?),
        TagFormat::Comment => (ExifTagFormat::UNDEF, user_comment(slot, value)?),
        TagFormat::Utf16 => (ExifTagFormat::INT8U, encode_utf16le(&ascii(slot, value)?)),
        TagFormat::SubIfd => {
            return Err(Error::Encode(format!("{} has no EXIF encoding", slot.name)));
        }
    };
    Ok(encoded)
}

fn mismatch(slot: &Slot<'_>, value: &TagValue, expected: &str) -> Error {
    Error::Encode(format!("{} expects {expected}, got '{value}'", slot.name))
}

fn check_count(slot: &Slot<'_>, value: &TagValue, len: usize) -> Result<()> {
    match slot.count {
        Some(count) if count != len => Err(mismatch(slot, value, &format!("{count} value(s)"))),
        _ => Ok(()),
    }
}

/// Text held for a numeric tag is parsed the way user input is.
fn reparse(slot: &Slot<'_>, value: &TagValue) -> Result<TagValue> {
    match value {
        TagValue::Text(s) => TagValue::parse_as(&slot.name, slot.format, slot.count, s)
            .map_err(|_| mismatch(slot, value, "a number")),
        other => Ok(other.clone()),
    }
}

fn ascii(slot: &Slot<'_>, value: &TagValue) -> Result<String> {
    let s = match value {
        TagValue::Text(s) => s.clone(),
        TagValue::Integer(n) => n.to_string(),
        other => return Err(mismatch(slot, other, "text")),
    };
    if s.contains('\0') {
        return Err(mismatch(slot, value, "text without NUL bytes"));
    }
    Ok(s)
}

fn integers(slot: &Slot<'_>, value: &TagValue) -> Result<Vec<u32>> {
    let numbers = match reparse(slot, value)? {
        TagValue::Integer(n) => vec![n],
        TagValue::Integers(ns) => ns,
        TagValue::Bytes(bytes) if slot.format == TagFormat::Byte => {
            bytes.into_iter().map(u32::from).collect()
        }
        _ => return Err(mismatch(slot, value, "integers")),
    };
    check_count(slot, value, numbers.len())?;
    Ok(numbers)
}

fn rationals(slot: &Slot<'_>, value: &TagValue) -> Result<Vec<u8>> {
    let parts = match reparse(slot, value)? {
        TagValue::Rational(parts) => parts,
        TagValue::Integer(n) => vec![Rational::new(n, 1)],
        _ => return Err(mismatch(slot, value, "rationals")),
    };
    check_count(slot, value, parts.len())?;
    Ok(parts
        .into_iter()
        .flat_map(|r| [r.num.to_le_bytes(), r.denom.to_le_bytes()])
        .flatten()
        .collect())
}

fn signed_rationals(slot: &Slot<'_>, value: &TagValue) -> Result<Vec<u8>> {
    let parts: Vec<(i32, i32)> = match reparse(slot, value)? {
        TagValue::SignedRational(parts) => parts.into_iter().map(|r| (r.num, r.denom)).collect(),
        TagValue::Rational(parts) => parts
            .into_iter()
            .map(|r| Some((i32::try_from(r.num).ok()?, i32::try_from(r.denom).ok()?)))
            .collect::<Option<_>>()
            .ok_or_else(|| mismatch(slot, value, "signed rationals"))?,
        _ => return Err(mismatch(slot, value, "signed rationals")),
    };
    check_count(slot, value, parts.len())?;
    Ok(parts
        .into_iter()
        .flat_map(|(num, denom)| [num.to_le_bytes(), denom.to_le_bytes()])
        .flatten()
        .collect())
}

fn undefined(slot: &Slot<'_>, value: &TagValue) -> Result<Vec<u8>> {
    let bytes = match value {
        TagValue::Bytes(b) => b.clone(),
        TagValue::Text(s) => s.as_bytes().to_vec(),
        other => return Err(mismatch(slot, other, "bytes")),
    };
    check_count(slot, value, bytes.len())?;
    Ok(bytes)
}

fn user_comment(slot: &Slot<'_>, value: &TagValue) -> Result<Vec<u8>> {
    match value {
        TagValue::Text(s) => {
            let mut bytes = b"ASCII\0\0\0".to_vec();
            bytes.extend_from_slice(s.as_bytes());
            Ok(bytes)
        }
        TagValue::Bytes(b) => Ok(b.clone()),
        other => Err(mismatch(slot, other, "text")),
    }
}

/// Encode a string as UTF-16LE bytes (used for XP* tags).
fn encode_utf16le(s: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = s
        .encode_utf16()
        .flat_map(|c| c.to_le_bytes())
        .collect();
    // Null terminator
    bytes.push(0);
    bytes.push(0);
    bytes
}

/// Put `tiff` into the JPEG's APP1 segment, directly after any APP0 (JFIF).
fn embed_exif(jpeg_bytes: &[u8], tiff: Vec<u8>) -> Result<Vec<u8>> {
    let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(jpeg_bytes))
        .map_err(|e| Error::Encode(format!("failed to parse encoded JPEG: {e}")))?;

    jpeg.set_exif(Some(Bytes::from(tiff)));

    // set_exif() may insert after other segments; many EXIF parsers only
    // look right after SOI/APP0.
    let target_pos = jpeg
        .segments()
        .iter()
        .position(|s| s.marker() != APP0)
        .unwrap_or(0);
    if let Some(new_pos) = find_exif_segment_pos(&jpeg) {
        if new_pos > target_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}
