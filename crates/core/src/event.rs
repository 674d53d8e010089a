use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A realtime event pushed to every open viewer session.
///
/// On the wire an event is its bare tag (e.g. `image_uploaded`) with no
/// payload; receivers refetch the image list when they see one. New variants
/// get new tags, and receivers dispatch on the tag, so existing subscribers
/// keep working when variants are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum GalleryEvent {
    /// A new image was persisted.
    ImageUploaded,
}

impl GalleryEvent {
    /// The wire tag for this event.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ImageUploaded => "image_uploaded",
        }
    }
}

impl fmt::Display for GalleryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Returned when a received tag does not name any known event.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown gallery event tag: {0:?}")]
pub struct EventParseError(pub String);

impl FromStr for GalleryEvent {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image_uploaded" => Ok(Self::ImageUploaded),
            other => Err(EventParseError(other.to_owned())),
        }
    }
}
