//! # exif-edit
//!
//! Inspect and edit the EXIF metadata of an image, then save an edited JPEG
//! copy. The source image is never modified.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_edit::config::Config;
//! use exif_edit::session::{Command, Session, State};
//! use exif_edit::{exif, gps, media};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let path = Path::new("photo.jpg");
//!
//!     // 1. Decode the pixels and read the existing tags
//!     let image = media::load_image(path)?;
//!     let tags = exif::read_tags(path)?;
//!     match gps::decode(&tags) {
//!         Ok(coord) => println!("Taken at {coord}"),
//!         Err(e) => println!("{e}"),
//!     }
//!
//!     // 2. Edit and save to photo_modified.jpg
//!     let mut session = Session::new(image, tags, config.output);
//!     session.apply(Command::Update { tag: "Artist".into(), value: "John Doe".into() })?;
//!     session.apply(Command::RemoveGps)?;
//!     if let State::Saved(report) = session.apply(Command::Save)? {
//!         println!("Saved {}", report.path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`acquire`]: URL and path validation, HTTP download
//! - [`config`]: configuration types and loading/saving
//! - [`editor`]: tag edits on a [`tags::TagMap`]
//! - [`exif`]: EXIF reading and JPEG writing
//! - [`gps`]: GPS sub-mapping to decimal coordinates and back
//! - [`media`]: image decoding and color modes
//! - [`session`]: the view/edit/save state machine
//! - [`tags`]: the in-memory tag model and tag registry

pub mod acquire;
pub mod config;
pub mod editor;
pub mod error;
pub mod exif;
pub mod gps;
pub mod media;
pub mod session;
pub mod tags;

pub use error::{Error, Result};
