//! EXIF reading and writing.
//!
//! - [`read_tags`] parses the EXIF block of an image into a [`TagMap`](crate::tags::TagMap)
//! - [`save`] writes a JPEG with the mapping embedded, falling back to a
//!   metadata-free image when the mapping cannot be encoded

mod reader;
mod writer;

pub use reader::read_tags;
pub use writer::{MetadataOutcome, SaveReport, output_path, save};
