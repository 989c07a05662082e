pub mod content;
pub mod sections;

use thiserror::Error;

/// Class attribute of the "more" containers that link each job category from
/// the site root.
pub const CATEGORY_MARKER: Marker = Marker::Exact("more mt-4 mb-4");

/// Class carried by every per-posting "more" container on a category page.
pub const ITEM_MARKER: Marker = Marker::Class("more");

/// Class of the element holding a posting's body.
pub const CONTENT_CLASS: &str = "content";

/// How a container `div` is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// The whole class attribute equals this string.
    Exact(&'static str),
    /// The class list contains this single class.
    Class(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("container #{index} matching {marker:?} has no hyperlink")]
    MissingLink { marker: Marker, index: usize },
    #[error("hyperlink in container #{index} matching {marker:?} has no href")]
    MissingHref { marker: Marker, index: usize },
    #[error("no element with class \"{0}\" found")]
    ContentNotFound(&'static str),
}
