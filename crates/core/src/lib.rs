pub mod event;
pub mod image;
pub mod stored_name;

pub use event::{EventParseError, GalleryEvent};
pub use image::{ImageId, ImageRecord, NewImageRecord, ParseImageIdError};
pub use stored_name::{StoredName, StoredNameError};
