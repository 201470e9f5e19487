//! Table of the standard EXIF tags: IFD0, the Exif sub-IFD and the GPS sub-IFD.

/// Which IFD a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// IFD0, the primary image directory.
    Image,
    /// Exif sub-IFD, capture settings.
    Photo,
    /// GPS sub-IFD.
    Gps,
}

impl Namespace {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Photo => "Photo",
            Self::Gps => "GPS",
        }
    }
}

/// On-disk storage format of a tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    Ascii,
    Byte,
    Short,
    Long,
    Rational,
    SRational,
    /// Opaque bytes.
    Undefined,
    /// UNDEFINED text behind an 8-byte character-code prefix (UserComment).
    Comment,
    /// UTF-16LE text stored as BYTE (Windows XP* tags).
    Utf16,
    /// Pointer to a sub-IFD; never set directly.
    SubIfd,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TagInfo {
    pub name: &'static str,
    pub code: u16,
    pub namespace: Namespace,
    pub format: TagFormat,
    /// Required number of components, if fixed.
    pub count: Option<usize>,
}

const fn tag(
    name: &'static str,
    code: u16,
    namespace: Namespace,
    format: TagFormat,
    count: Option<usize>,
) -> TagInfo {
    TagInfo {
        name,
        code,
        namespace,
        format,
        count,
    }
}

use Namespace::{Gps, Image, Photo};
use TagFormat::{Ascii, Byte, Comment, Long, Rational, SRational, Short, Undefined, Utf16};

/// The GPS sub-mapping is stored under this key.
pub static GPS_INFO: TagInfo = tag("GPSInfo", 0x8825, Image, TagFormat::SubIfd, None);

pub static TAGS: &[TagInfo] = &[
    // IFD0
    tag("ImageWidth", 0x0100, Image, Long, Some(1)),
    tag("ImageLength", 0x0101, Image, Long, Some(1)),
    tag("BitsPerSample", 0x0102, Image, Short, None),
    tag("Compression", 0x0103, Image, Short, Some(1)),
    tag("PhotometricInterpretation", 0x0106, Image, Short, Some(1)),
    tag("ImageDescription", 0x010E, Image, Ascii, None),
    tag("Make", 0x010F, Image, Ascii, None),
    tag("Model", 0x0110, Image, Ascii, None),
    tag("Orientation", 0x0112, Image, Short, Some(1)),
    tag("SamplesPerPixel", 0x0115, Image, Short, Some(1)),
    tag("XResolution", 0x011A, Image, Rational, Some(1)),
    tag("YResolution", 0x011B, Image, Rational, Some(1)),
    tag("PlanarConfiguration", 0x011C, Image, Short, Some(1)),
    tag("ResolutionUnit", 0x0128, Image, Short, Some(1)),
    tag("Software", 0x0131, Image, Ascii, None),
    tag("DateTime", 0x0132, Image, Ascii, None),
    tag("Artist", 0x013B, Image, Ascii, None),
    tag("WhitePoint", 0x013E, Image, Rational, Some(2)),
    tag("PrimaryChromaticities", 0x013F, Image, Rational, Some(6)),
    tag("YCbCrCoefficients", 0x0211, Image, Rational, Some(3)),
    tag("YCbCrSubSampling", 0x0212, Image, Short, Some(2)),
    tag("YCbCrPositioning", 0x0213, Image, Short, Some(1)),
    tag("ReferenceBlackWhite", 0x0214, Image, Rational, Some(6)),
    tag("Copyright", 0x8298, Image, Ascii, None),
    tag("XPTitle", 0x9C9B, Image, Utf16, None),
    tag("XPComment", 0x9C9C, Image, Utf16, None),
    tag("XPAuthor", 0x9C9D, Image, Utf16, None),
    tag("XPKeywords", 0x9C9E, Image, Utf16, None),
    tag("XPSubject", 0x9C9F, Image, Utf16, None),
    // Exif sub-IFD
    tag("ExposureTime", 0x829A, Photo, Rational, Some(1)),
    tag("FNumber", 0x829D, Photo, Rational, Some(1)),
    tag("ExposureProgram", 0x8822, Photo, Short, Some(1)),
    tag("SpectralSensitivity", 0x8824, Photo, Ascii, None),
    tag("ISOSpeedRatings", 0x8827, Photo, Short, None),
    tag("SensitivityType", 0x8830, Photo, Short, Some(1)),
    tag("StandardOutputSensitivity", 0x8831, Photo, Long, Some(1)),
    tag("RecommendedExposureIndex", 0x8832, Photo, Long, Some(1)),
    tag("ISOSpeed", 0x8833, Photo, Long, Some(1)),
    tag("ExifVersion", 0x9000, Photo, Undefined, Some(4)),
    tag("DateTimeOriginal", 0x9003, Photo, Ascii, None),
    tag("DateTimeDigitized", 0x9004, Photo, Ascii, None),
    tag("OffsetTime", 0x9010, Photo, Ascii, None),
    tag("OffsetTimeOriginal", 0x9011, Photo, Ascii, None),
    tag("OffsetTimeDigitized", 0x9012, Photo, Ascii, None),
    tag("ComponentsConfiguration", 0x9101, Photo, Undefined, Some(4)),
    tag("CompressedBitsPerPixel", 0x9102, Photo, Rational, Some(1)),
    tag("ShutterSpeedValue", 0x9201, Photo, SRational, Some(1)),
    tag("ApertureValue", 0x9202, Photo, Rational, Some(1)),
    tag("BrightnessValue", 0x9203, Photo, SRational, Some(1)),
    tag("ExposureBiasValue", 0x9204, Photo, SRational, Some(1)),
    tag("MaxApertureValue", 0x9205, Photo, Rational, Some(1)),
    tag("SubjectDistance", 0x9206, Photo, Rational, Some(1)),
    tag("MeteringMode", 0x9207, Photo, Short, Some(1)),
    tag("LightSource", 0x9208, Photo, Short, Some(1)),
    tag("Flash", 0x9209, Photo, Short, Some(1)),
    tag("FocalLength", 0x920A, Photo, Rational, Some(1)),
    tag("SubjectArea", 0x9214, Photo, Short, None),
    tag("MakerNote", 0x927C, Photo, Undefined, None),
    tag("UserComment", 0x9286, Photo, Comment, None),
    tag("SubSecTime", 0x9290, Photo, Ascii, None),
    tag("SubSecTimeOriginal", 0x9291, Photo, Ascii, None),
    tag("SubSecTimeDigitized", 0x9292, Photo, Ascii, None),
    tag("FlashpixVersion", 0xA000, Photo, Undefined, Some(4)),
    tag("ColorSpace", 0xA001, Photo, Short, Some(1)),
    tag("PixelXDimension", 0xA002, Photo, Long, Some(1)),
    tag("PixelYDimension", 0xA003, Photo, Long, Some(1)),
    tag("RelatedSoundFile", 0xA004, Photo, Ascii, None),
    tag("FlashEnergy", 0xA20B, Photo, Rational, Some(1)),
    tag("FocalPlaneXResolution", 0xA20E, Photo, Rational, Some(1)),
    tag("FocalPlaneYResolution", 0xA20F, Photo, Rational, Some(1)),
    tag("FocalPlaneResolutionUnit", 0xA210, Photo, Short, Some(1)),
    tag("SubjectLocation", 0xA214, Photo, Short, Some(2)),
    tag("ExposureIndex", 0xA215, Photo, Rational, Some(1)),
    tag("SensingMethod", 0xA217, Photo, Short, Some(1)),
    tag("FileSource", 0xA300, Photo, Undefined, Some(1)),
    tag("SceneType", 0xA301, Photo, Undefined, Some(1)),
    tag("CFAPattern", 0xA302, Photo, Undefined, None),
    tag("CustomRendered", 0xA401, Photo, Short, Some(1)),
    tag("ExposureMode", 0xA402, Photo, Short, Some(1)),
    tag("WhiteBalance", 0xA403, Photo, Short, Some(1)),
    tag("DigitalZoomRatio", 0xA404, Photo, Rational, Some(1)),
    tag("FocalLengthIn35mmFilm", 0xA405, Photo, Short, Some(1)),
    tag("SceneCaptureType", 0xA406, Photo, Short, Some(1)),
    tag("GainControl", 0xA407, Photo, Short, Some(1)),
    tag("Contrast", 0xA408, Photo, Short, Some(1)),
    tag("Saturation", 0xA409, Photo, Short, Some(1)),
    tag("Sharpness", 0xA40A, Photo, Short, Some(1)),
    tag("DeviceSettingDescription", 0xA40B, Photo, Undefined, None),
    tag("SubjectDistanceRange", 0xA40C, Photo, Short, Some(1)),
    tag("ImageUniqueID", 0xA420, Photo, Ascii, None),
    tag("CameraOwnerName", 0xA430, Photo, Ascii, None),
    tag("BodySerialNumber", 0xA431, Photo, Ascii, None),
    tag("LensSpecification", 0xA432, Photo, Rational, Some(4)),
    tag("LensMake", 0xA433, Photo, Ascii, None),
    tag("LensModel", 0xA434, Photo, Ascii, None),
    tag("LensSerialNumber", 0xA435, Photo, Ascii, None),
    tag("Gamma", 0xA500, Photo, Rational, Some(1)),
    // GPS sub-IFD
    tag("GPSVersionID", 0x0000, Gps, Byte, Some(4)),
    tag("GPSLatitudeRef", 0x0001, Gps, Ascii, None),
    tag("GPSLatitude", 0x0002, Gps, Rational, Some(3)),
    tag("GPSLongitudeRef", 0x0003, Gps, Ascii, None),
    tag("GPSLongitude", 0x0004, Gps, Rational, Some(3)),
    tag("GPSAltitudeRef", 0x0005, Gps, Byte, Some(1)),
    tag("GPSAltitude", 0x0006, Gps, Rational, Some(1)),
    tag("GPSTimeStamp", 0x0007, Gps, Rational, Some(3)),
    tag("GPSSatellites", 0x0008, Gps, Ascii, None),
    tag("GPSStatus", 0x0009, Gps, Ascii, None),
    tag("GPSMeasureMode", 0x000A, Gps, Ascii, None),
    tag("GPSDOP", 0x000B, Gps, Rational, Some(1)),
    tag("GPSSpeedRef", 0x000C, Gps, Ascii, None),
    tag("GPSSpeed", 0x000D, Gps, Rational, Some(1)),
    tag("GPSTrackRef", 0x000E, Gps, Ascii, None),
    tag("GPSTrack", 0x000F, Gps, Rational, Some(1)),
    tag("GPSImgDirectionRef", 0x0010, Gps, Ascii, None),
    tag("GPSImgDirection", 0x0011, Gps, Rational, Some(1)),
    tag("GPSMapDatum", 0x0012, Gps, Ascii, None),
    tag("GPSDestLatitudeRef", 0x0013, Gps, Ascii, None),
    tag("GPSDestLatitude", 0x0014, Gps, Rational, Some(3)),
    tag("GPSDestLongitudeRef", 0x0015, Gps, Ascii, None),
    tag("GPSDestLongitude", 0x0016, Gps, Rational, Some(3)),
    tag("GPSDestBearingRef", 0x0017, Gps, Ascii, None),
    tag("GPSDestBearing", 0x0018, Gps, Rational, Some(1)),
    tag("GPSDestDistanceRef", 0x0019, Gps, Ascii, None),
    tag("GPSDestDistance", 0x001A, Gps, Rational, Some(1)),
    tag("GPSProcessingMethod", 0x001B, Gps, Comment, None),
    tag("GPSAreaInformation", 0x001C, Gps, Comment, None),
    tag("GPSDateStamp", 0x001D, Gps, Ascii, None),
    tag("GPSDifferential", 0x001E, Gps, Short, Some(1)),
    tag("GPSHPositioningError", 0x001F, Gps, Rational, Some(1)),
];

/// Other common spellings (exiftool and little_exif names) of registry tags.
pub static ALIASES: &[(&str, &str)] = &[
    ("ModifyDate", "DateTime"),
    ("CreateDate", "DateTimeDigitized"),
    ("ImageHeight", "ImageLength"),
    ("ISO", "ISOSpeedRatings"),
    ("ExposureCompensation", "ExposureBiasValue"),
    ("ExifImageWidth", "PixelXDimension"),
    ("ExifImageHeight", "PixelYDimension"),
    ("FocalLengthIn35mmFormat", "FocalLengthIn35mmFilm"),
    ("OwnerName", "CameraOwnerName"),
    ("SerialNumber", "BodySerialNumber"),
    ("LensInfo", "LensSpecification"),
];

/// Entries that are never shown or copied: IFD pointers, strip layout of
/// the old pixel data and Interop sub-IFD fields.
pub const SKIPPED_CODES: &[u16] = &[
    0x0111, 0x0116, 0x0117, 0x0201, 0x0202, 0x1000, 0x1001, 0x1002, 0x8769, 0x8825, 0xA005,
];

/// Highest tag code used inside the GPS sub-IFD.
pub const GPS_MAX_CODE: u16 = 0x001F;

/// Find a tag by name. Case, spaces and underscores are ignored so that
/// `"date time"` and `"DateTime"` resolve to the same entry.
pub fn lookup(name: &str) -> Option<&'static TagInfo> {
    let wanted = normalize(name);
    if wanted.is_empty() {
        return None;
    }
    TAGS.iter()
        .find(|t| normalize(t.name) == wanted)
        .or_else(|| {
            let (_, target) = ALIASES.iter().find(|(alias, _)| normalize(alias) == wanted)?;
            TAGS.iter().find(|t| t.name == *target)
        })
}

/// Find a tag by its numeric code within a namespace.
pub fn by_code(namespace: Namespace, code: u16) -> Option<&'static TagInfo> {
    TAGS
        .iter()
        .find(|t| t.namespace == namespace && t.code == code)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_forgiving() {
        assert_eq!(lookup("Artist").map(|t| t.code), Some(0x013B));
        assert_eq!(lookup("artist").map(|t| t.code), Some(0x013B));
        assert_eq!(lookup(" date_time ").map(|t| t.name), Some("DateTime"));
        assert_eq!(lookup("GPS latitude").map(|t| t.name), Some("GPSLatitude"));
    }

    #[test]
    fn lookup_covers_standard_tags() {
        assert_eq!(lookup("ExposureBiasValue").map(|t| t.format), Some(TagFormat::SRational));
        assert_eq!(lookup("GPSDateStamp").map(|t| t.namespace), Some(Namespace::Gps));
        assert_eq!(lookup("BodySerialNumber").map(|t| t.code), Some(0xA431));
    }

    #[test]
    fn lookup_resolves_aliases() {
        assert_eq!(lookup("ModifyDate").map(|t| t.name), Some("DateTime"));
        assert_eq!(lookup("iso").map(|t| t.name), Some("ISOSpeedRatings"));
        assert_eq!(lookup("Lens Info").map(|t| t.name), Some("LensSpecification"));
        for (alias, target) in ALIASES {
            assert!(TAGS.iter().all(|t| t.name != *alias), "{alias} shadows a tag");
            assert!(TAGS.iter().any(|t| t.name == *target), "{target} missing");
        }
    }

    #[test]
    fn lookup_unknown() {
        assert!(lookup("FavouriteColour").is_none());
        assert!(lookup("").is_none());
        assert!(lookup("GPSInfo").is_none());
    }

    #[test]
    fn by_code_respects_namespace() {
        assert_eq!(by_code(Namespace::Gps, 0x0002).map(|t| t.name), Some("GPSLatitude"));
        assert!(by_code(Namespace::Image, 0x0002).is_none());
        assert_eq!(by_code(Namespace::Photo, 0x9003).map(|t| t.name), Some("DateTimeOriginal"));
    }

    #[test]
    fn names_and_codes_are_unique() {
        for (i, a) in TAGS.iter().enumerate() {
            for b in &TAGS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert!(
                    !(a.namespace == b.namespace && a.code == b.code),
                    "{} and {} share a code",
                    a.name,
                    b.name
                );
            }
        }
    }

    #[test]
    fn skipped_codes_are_not_registry_tags() {
        for code in SKIPPED_CODES {
            assert!(
                TAGS.iter().all(|t| t.namespace == Namespace::Gps || t.code != *code),
                "0x{code:04X}"
            );
        }
    }

    #[test]
    fn gps_tags_fit_in_gps_range() {
        for t in TAGS.iter().filter(|t| t.namespace == Namespace::Gps) {
            assert!(t.code <= GPS_MAX_CODE, "{}", t.name);
        }
    }
}
