//! Xcursor file decoding and cursor theme resolution.
//!
//! [`decode`] and friends turn a single Xcursor file into a [`Cursor`]:
//! comments plus animation frames grouped by nominal size, with raw
//! premultiplied-ARGB pixel buffers left untouched for the caller's pixel
//! pipeline. [`load_theme`] resolves a named theme across the system
//! search paths, following `Inherits` declarations so that a theme's own
//! cursors shadow inherited ones.

pub mod cursor;
pub mod decode;
pub mod paths;
mod reader;
pub mod theme;

pub use cursor::{Comment, CommentKind, Cursor, Image, PixelBuffer, PixelFormat};
pub use decode::{DecodeError, decode, decode_bytes, decode_file, decode_seekable};
pub use theme::{Theme, load_theme, load_theme_from_dir, load_theme_with_paths};
