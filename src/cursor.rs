// Decoded cursor data types.

use std::collections::BTreeMap;
use std::time::Duration;

/// Pixel layout of a decoded frame. Xcursor files only ever carry
/// premultiplied 32-bit ARGB; the tag travels with the buffer so channel
/// conversion can stay outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Argb8888,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Argb8888 => 4,
        }
    }
}

/// Raw frame pixels as stored in the file, untouched by any channel math.
/// `width` and `height` come from the section header; `data` holds exactly
/// `width * height * bytes_per_pixel` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One animation frame at one nominal size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// The logical size this frame was designed for. May differ from the
    /// stored width/height.
    pub nominal_size: u32,
    /// Frame duration; zero for static cursors.
    pub delay: Duration,
    /// Hotspot in pixel coordinates. Not validated against the frame bounds.
    pub hotspot: (u32, u32),
    pub pixels: PixelBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Copyright,
    License,
    Other,
}

impl CommentKind {
    pub(crate) fn from_subtype(subtype: u32) -> Self {
        match subtype {
            1 => CommentKind::Copyright,
            2 => CommentKind::License,
            _ => CommentKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
}

/// A fully decoded cursor file: comments plus animation frames grouped by
/// nominal size, in file order within each group.
///
/// A cursor with no images is valid (a comment-only file decodes fine) but
/// has nothing to render; check [`Cursor::best_size`] before drawing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub comments: Vec<Comment>,
    pub images: BTreeMap<u32, Vec<Image>>,
}

impl Cursor {
    /// Picks the nominal size closest to `target`, preferring the larger
    /// size when two candidates are equally close. `None` if the cursor has
    /// no images.
    pub fn best_size(&self, target: u32) -> Option<u32> {
        self.images.keys().copied().reduce(|best, candidate| {
            let db = best.abs_diff(target);
            let dc = candidate.abs_diff(target);
            if dc < db || (dc == db && candidate > best) {
                candidate
            } else {
                best
            }
        })
    }

    /// The frame sequence for the best-matching size, if any.
    pub fn best_images(&self, target: u32) -> Option<&[Image]> {
        let size = self.best_size(target)?;
        self.images.get(&size).map(Vec::as_slice)
    }
}
