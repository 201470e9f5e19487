// Prompt layer: every question the interactive flow asks, via `dialoguer`.
//
// Validation lives in the library; the prompts re-ask until the library
// accepts the answer, so callers only ever see valid values.

use std::path::PathBuf;

use anyhow::Result;
use dialoguer::{Confirm, Input, Select};
use exif_edit::acquire::{normalize_filename, resolve_local, validate_url};
use exif_edit::editor::{COMMON_FIELDS, now_exif_datetime};
use exif_edit::gps::Coordinate;
use exif_edit::tags::registry;
use reqwest::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Download,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    UpdateTag,
    SetGps,
    RemoveGps,
    ClearAll,
    View,
    SaveAndExit,
    ExitWithoutSaving,
}

const MENU: &[(&str, MenuChoice)] = &[
    ("Update a tag", MenuChoice::UpdateTag),
    ("Set GPS coordinates", MenuChoice::SetGps),
    ("Remove GPS data", MenuChoice::RemoveGps),
    ("Clear all metadata", MenuChoice::ClearAll),
    ("View metadata", MenuChoice::View),
    ("Save and exit", MenuChoice::SaveAndExit),
    ("Exit without saving", MenuChoice::ExitWithoutSaving),
];

pub fn ask_source() -> Result<Source> {
    let items = ["Download from a URL", "Open a local file"];
    let selection = Select::new()
        .with_prompt("Where is the image?")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(if selection == 0 { Source::Download } else { Source::Local })
}

pub fn ask_url() -> Result<Url> {
    let raw: String = Input::new()
        .with_prompt("Image URL")
        .validate_with(|s: &String| validate_url(s).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()?;
    Ok(validate_url(&raw)?)
}

pub fn ask_filename() -> Result<String> {
    let raw: String = Input::new()
        .with_prompt("Save as (without extension)")
        .validate_with(|s: &String| normalize_filename(s).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()?;
    Ok(normalize_filename(&raw)?)
}

pub fn ask_local_path() -> Result<PathBuf> {
    let raw: String = Input::new()
        .with_prompt("Path to image")
        .validate_with(|s: &String| resolve_local(s).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()?;
    Ok(resolve_local(&raw)?)
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(default).interact()?)
}

pub fn menu() -> Result<MenuChoice> {
    let labels: Vec<&str> = MENU.iter().map(|(label, _)| *label).collect();
    let selection = Select::new()
        .with_prompt("What next?")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(MENU[selection].1)
}

/// A tag name and its new value. Unknown names are reported by the caller.
pub fn ask_tag_value() -> Result<(String, String)> {
    let tag: String = Input::new()
        .with_prompt("Tag name")
        .validate_with(|s: &String| {
            if s.trim().is_empty() { Err("tag name must not be empty") } else { Ok(()) }
        })
        .interact_text()?;
    let hint = registry::lookup(&tag).map(|info| format!("{:?}", info.format));
    let prompt = match hint {
        Some(format) => format!("New value for {} ({format})", tag.trim()),
        None => format!("New value for {}", tag.trim()),
    };
    let value: String = Input::new().with_prompt(prompt).allow_empty(true).interact_text()?;
    Ok((tag, value))
}

pub fn ask_coordinate() -> Result<Coordinate> {
    let raw: String = Input::new()
        .with_prompt("Latitude, longitude (decimal degrees)")
        .validate_with(|s: &String| match Coordinate::parse(s) {
            Some(_) => Ok(()),
            None => Err("expected e.g. 40.8628, -74.0060 within ±90 / ±180"),
        })
        .interact_text()?;
    Coordinate::parse(&raw).ok_or_else(|| anyhow::anyhow!("invalid coordinate '{raw}'"))
}

/// Collect fields for a fresh mapping: the common ones, then any custom
/// `name=value` pairs until a blank line.
pub fn ask_fields() -> Result<Vec<(String, String)>> {
    let mut fields = Vec::new();
    for name in COMMON_FIELDS {
        let mut input = Input::<String>::new();
        input.with_prompt(format!("{name} (blank to skip)")).allow_empty(true);
        if *name == "DateTime" {
            input.default(now_exif_datetime());
        }
        fields.push((name.to_string(), input.interact_text()?));
    }

    loop {
        let line: String = Input::new()
            .with_prompt("Custom tag as name=value (blank to finish)")
            .allow_empty(true)
            .validate_with(|s: &String| {
                if s.trim().is_empty() || s.contains('=') { Ok(()) } else { Err("use name=value") }
            })
            .interact_text()?;
        match line.split_once('=') {
            Some((name, value)) => fields.push((name.trim().to_string(), value.trim().to_string())),
            None => break,
        }
    }
    Ok(fields)
}
