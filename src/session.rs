//! The view/edit/save loop as an explicit state machine.
//!
//! ```text
//! Viewing ──edit──▶ Editing ──Save──▶ Saved
//!    │                 │
//!    └──── Exit ───────┴──── Exit ──▶ Exited
//! ```
//!
//! The interactive front end only collects [`Command`]s; every transition
//! and every filesystem effect happens here.

use std::path::PathBuf;

use crate::config::OutputConfig;
use crate::error::{Error, Result};
use crate::exif::{self, SaveReport};
use crate::gps::Coordinate;
use crate::media::LoadedImage;
use crate::tags::TagMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Viewing,
    Editing,
    Saved(SaveReport),
    Exited,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Saved(_) | Self::Exited)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Update { tag: String, value: String },
    SetGps(Coordinate),
    RemoveGps,
    ClearAll,
    Save,
    Exit,
}

pub struct Session {
    image: LoadedImage,
    tags: TagMap,
    dest: PathBuf,
    output: OutputConfig,
    state: State,
}

impl Session {
    /// Start in `Viewing`. The output path is derived from the image path.
    pub fn new(image: LoadedImage, tags: TagMap, output: OutputConfig) -> Self {
        let dest = exif::output_path(&image.path, &output.suffix);
        Self {
            image,
            tags,
            dest,
            output,
            state: State::Viewing,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    pub fn image(&self) -> &LoadedImage {
        &self.image
    }

    /// Where `Save` will write.
    pub fn destination(&self) -> &std::path::Path {
        &self.dest
    }

    /// Move from `Viewing` to `Editing`. A no-op while already editing.
    pub fn begin_editing(&mut self) -> Result<()> {
        match self.state {
            State::Viewing | State::Editing => {
                self.state = State::Editing;
                Ok(())
            }
            _ => Err(Error::SessionClosed),
        }
    }

    /// Replace the whole mapping, e.g. with one built from scratch.
    pub fn replace_tags(&mut self, tags: TagMap) -> Result<()> {
        self.begin_editing()?;
        self.tags = tags;
        Ok(())
    }

    /// Apply one command.
    ///
    /// Edits are allowed from `Viewing` and move the session to `Editing`.
    /// Recoverable edit errors leave both state and mapping unchanged.
    pub fn apply(&mut self, command: Command) -> Result<&State> {
        if self.state.is_terminal() {
            return Err(Error::SessionClosed);
        }

        match command {
            Command::Exit => {
                self.state = State::Exited;
            }
            Command::Save => {
                let report = exif::save(&self.image, &self.tags, &self.dest, &self.output)?;
                self.state = State::Saved(report);
            }
            Command::Update { tag, value } => {
                self.begin_editing()?;
                self.tags.set(&tag, &value)?;
            }
            Command::SetGps(coord) => {
                self.begin_editing()?;
                self.tags.set_gps(coord);
            }
            Command::RemoveGps => {
                self.begin_editing()?;
                if !self.tags.remove_gps() {
                    log::info!("No GPS data to remove");
                }
            }
            Command::ClearAll => {
                self.begin_editing()?;
                self.tags.clear_all();
            }
        }
        Ok(&self.state)
    }
}
