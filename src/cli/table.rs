use std::path::Path;

use exif_edit::exif::{MetadataOutcome, SaveReport};
use exif_edit::gps;
use exif_edit::media::LoadedImage;
use exif_edit::tags::{Namespace, TagKey, TagMap, TagValue};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

type Rows = Vec<(String, String)>;

/// Print all tags of an image, grouped by namespace.
pub fn print_tags(path: &Path, image: &LoadedImage, tags: &TagMap) {
    let (width, height) = image.dimensions();

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{width} x {height}, {}{RESET}", image.color_mode());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let sections = sections(tags);
    if sections.is_empty() {
        println!("  {DIM}(no EXIF metadata found){RESET}");
        println!();
        return;
    }

    for (title, rows) in &sections {
        println!("  {BOLD}{title}{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (tag, val) in rows {
            print_row(tag, val);
        }
        println!();
    }
}

/// Rows per section, in display order. Empty sections are omitted.
fn sections(tags: &TagMap) -> Vec<(&'static str, Rows)> {
    let mut image = Rows::new();
    let mut photo = Rows::new();
    let mut other = Rows::new();

    for (key, value) in tags.iter() {
        if matches!(value, TagValue::Gps(_)) {
            continue;
        }
        let row = (key.name().into_owned(), value.to_string());
        match key.namespace() {
            Some(Namespace::Image) => image.push(row),
            Some(Namespace::Photo) => photo.push(row),
            _ => other.push(row),
        }
    }

    let mut gps_rows = Rows::new();
    if let Some(sub) = tags.gps() {
        for (key, value) in sub.iter() {
            gps_rows.push((gps_row_name(key), value.to_string()));
        }
        let decoded = match gps::decode(tags) {
            Ok(coord) => coord.to_string(),
            Err(e) => format!("unavailable ({e})"),
        };
        gps_rows.push(("Coordinates".to_string(), decoded));
    }

    [
        (Namespace::Image.label(), image),
        (Namespace::Photo.label(), photo),
        (Namespace::Gps.label(), gps_rows),
        ("Other", other),
    ]
    .into_iter()
    .filter(|(_, rows)| !rows.is_empty())
    .collect()
}

fn gps_row_name(key: &TagKey) -> String {
    match key {
        TagKey::Code(raw) => format!("GPS 0x{:04X}", raw.code),
        other => other.name().into_owned(),
    }
}

/// Print a single row in the EXIF display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Summarise a finished save.
pub fn print_save_report(report: &SaveReport) {
    println!();
    println!("  {GREEN}Saved{RESET} {}", report.path.display());
    if let Some(mode) = report.converted_from {
        println!("  {DIM}Converted from {mode} to 8-bit RGB{RESET}");
    }
    match &report.metadata {
        MetadataOutcome::Embedded { tags } => println!("  {DIM}{tags} tag(s) written{RESET}"),
        MetadataOutcome::Empty => println!("  {DIM}No metadata to write{RESET}"),
        MetadataOutcome::Dropped { reason } => {
            println!("  {YELLOW}Metadata could not be written and was dropped: {reason}{RESET}")
        }
    }
    if !report.skipped.is_empty() {
        println!(
            "  {YELLOW}Not written (no EXIF encoding): {}{RESET}",
            report.skipped.join(", ")
        );
    }
    println!();
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif_edit::gps::Coordinate;

    #[test]
    fn wrap_text_breaks_on_words() {
        assert_eq!(wrap_text("a bb ccc", 4), ["a bb", "ccc"]);
        assert_eq!(wrap_text("", 10), [""]);
        assert_eq!(wrap_text("averyveryverylongword", 5), ["averyveryverylongword"]);
    }

    #[test]
    fn sections_group_by_namespace() {
        let mut tags = TagMap::create_from_fields([
            ("Make", "Canon"),
            ("ExposureTime", "1/250"),
            ("Mood", "sunny"),
        ]);
        tags.set_gps(Coordinate { latitude: 40.8628, longitude: -74.006 });

        let sections = sections(&tags);
        let titles: Vec<_> = sections.iter().map(|(t, _)| *t).collect();
        assert_eq!(titles, ["Image", "Photo", "GPS", "Other"]);

        let (_, gps_rows) = &sections[2];
        let (name, coord) = gps_rows.last().unwrap();
        assert_eq!(name, "Coordinates");
        assert_eq!(coord, "40.862800, -74.006000");
    }

    #[test]
    fn undecodable_gps_is_shown_as_unavailable() {
        let mut tags = TagMap::new();
        tags.set("GPSLatitudeRef", "N").unwrap();

        let sections = sections(&tags);
        let (title, rows) = &sections[0];
        assert_eq!(*title, "GPS");
        assert!(rows.last().unwrap().1.starts_with("unavailable"));
    }

    #[test]
    fn file_code_tags_are_listed_by_namespace() {
        use exif_edit::tags::{RawTag, TagFormat};

        let mut tags = TagMap::new();
        let printim = RawTag::new(Namespace::Image, 0xC4A5, Some(TagFormat::Undefined));
        tags.insert(TagKey::Code(printim), TagValue::Bytes(vec![1, 2]));
        let gps = RawTag::new(Namespace::Gps, 0x001F, Some(TagFormat::Rational));
        tags.insert(TagKey::Code(gps), TagValue::Integer(5));

        let sections = sections(&tags);
        assert_eq!(sections[0].0, "Image");
        assert_eq!(sections[0].1[0].0, "0xC4A5");
        assert_eq!(sections[1].0, "GPS");
        assert_eq!(sections[1].1[0].0, "GPS 0x001F");
    }

    #[test]
    fn empty_mapping_has_no_sections() {
        assert!(sections(&TagMap::new()).is_empty());
    }
}
