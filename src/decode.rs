// Xcursor binary decoding.
//
// An Xcursor file is a header, a table of contents, and a series of typed
// sections at absolute offsets. The TOC lists each section's type, subtype
// (comment kind or nominal image size) and position; each section repeats
// its type and subtype in its own sub-header, which the decoder checks
// against the TOC entry to catch truncated or reordered files.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

use crate::cursor::{Comment, CommentKind, Cursor, Image, PixelBuffer, PixelFormat};
use crate::reader::{Random, Reader, Source, Stream};

/// "Xcur", little-endian.
const FILE_MAGIC: u32 = 0x7275_6358;

const TOC_TYPE_COMMENT: u32 = 0xfffe_0001;
const TOC_TYPE_IMAGE: u32 = 0xfffd_0002;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input does not start with the Xcursor magic number. Callers
    /// scanning mixed directories treat this as "not a cursor file".
    #[error("bad magic")]
    BadMagic,
    #[error("section type mismatch: TOC declared {expected:#010x}, section declared {found:#010x}")]
    TypeMismatch { expected: u32, found: u32 },
    #[error("section subtype mismatch: TOC declared {expected}, section declared {found}")]
    SubtypeMismatch { expected: u32, found: u32 },
    #[error("unknown section type {0:#010x}")]
    UnknownSectionType(u32),
    #[error("backward seek: position {position}, target {target}")]
    InvalidSeek { position: u64, target: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Decodes a cursor from a sequential byte stream. Forward jumps between
/// sections are performed by discarding bytes, so pipes work.
pub fn decode(r: impl Read) -> Result<Cursor, DecodeError> {
    Decoder::new(Reader::new(Stream(r))).run()
}

/// Decodes a cursor from a seekable source, jumping between sections with
/// real seeks where that is cheaper than discarding.
pub fn decode_seekable(r: impl Read + Seek) -> Result<Cursor, DecodeError> {
    Decoder::new(Reader::new(Random(r))).run()
}

/// Decodes a cursor from an in-memory buffer.
pub fn decode_bytes(data: &[u8]) -> Result<Cursor, DecodeError> {
    decode_seekable(io::Cursor::new(data))
}

/// Opens and decodes a cursor file. The file handle is released on every
/// exit path, including decode failure.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Cursor, DecodeError> {
    let file = File::open(path)?;
    decode_seekable(file)
}

struct TocEntry {
    kind: u32,
    subtype: u32,
    position: u32,
}

struct Decoder<S> {
    r: Reader<S>,
}

impl<S: Source> Decoder<S> {
    fn new(r: Reader<S>) -> Self {
        Self { r }
    }

    fn run(mut self) -> Result<Cursor, DecodeError> {
        let toc = self.header()?;
        trace!(sections = toc.len(), "decoding cursor sections");

        let mut cursor = Cursor::default();
        for entry in toc {
            self.r.seek_to(entry.position as u64)?;
            self.section_header(&entry)?;
            match entry.kind {
                TOC_TYPE_COMMENT => {
                    let comment = self.comment(&entry)?;
                    cursor.comments.push(comment);
                }
                TOC_TYPE_IMAGE => {
                    let image = self.image(&entry)?;
                    // Group by the TOC's nominal size, not the stored
                    // dimensions; one nominal size may carry frames of
                    // several on-disk sizes.
                    cursor.images.entry(entry.subtype).or_default().push(image);
                }
                other => return Err(DecodeError::UnknownSectionType(other)),
            }
        }

        Ok(cursor)
    }

    fn header(&mut self) -> Result<Vec<TocEntry>, DecodeError> {
        let magic = self.r.read_u32()?;
        if magic != FILE_MAGIC {
            return Err(DecodeError::BadMagic);
        }
        self.r.read_u32()?; // header size
        self.r.read_u32()?; // version

        let ntoc = self.r.read_u32()?;
        let mut toc = Vec::with_capacity(ntoc as usize);
        for _ in 0..ntoc {
            toc.push(TocEntry {
                kind: self.r.read_u32()?,
                subtype: self.r.read_u32()?,
                position: self.r.read_u32()?,
            });
        }

        Ok(toc)
    }

    /// Reads a section's own sub-header and checks it against the TOC entry
    /// that pointed here.
    fn section_header(&mut self, entry: &TocEntry) -> Result<(), DecodeError> {
        self.r.read_u32()?; // section byte size

        let kind = self.r.read_u32()?;
        if kind != entry.kind {
            return Err(DecodeError::TypeMismatch {
                expected: entry.kind,
                found: kind,
            });
        }

        let subtype = self.r.read_u32()?;
        if subtype != entry.subtype {
            return Err(DecodeError::SubtypeMismatch {
                expected: entry.subtype,
                found: subtype,
            });
        }

        self.r.read_u32()?; // section version
        Ok(())
    }

    fn comment(&mut self, entry: &TocEntry) -> Result<Comment, DecodeError> {
        let length = self.r.read_u32()?;
        let mut buf = vec![0u8; length as usize];
        self.r.read_exact(&mut buf)?;

        Ok(Comment {
            kind: CommentKind::from_subtype(entry.subtype),
            text: String::from_utf8_lossy(&buf).into_owned(),
        })
    }

    fn image(&mut self, entry: &TocEntry) -> Result<Image, DecodeError> {
        let width = self.r.read_u32()?;
        let height = self.r.read_u32()?;
        let xhot = self.r.read_u32()?;
        let yhot = self.r.read_u32()?;
        let delay = self.r.read_u32()?;

        let len = width as usize * height as usize * PixelFormat::Argb8888.bytes_per_pixel();
        let mut data = vec![0u8; len];
        self.r.read_exact(&mut data)?;

        Ok(Image {
            nominal_size: entry.subtype,
            delay: Duration::from_millis(delay as u64),
            hotspot: (xhot, yhot),
            pixels: PixelBuffer {
                format: PixelFormat::Argb8888,
                width,
                height,
                data,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Section {
        kind: u32,
        subtype: u32,
        body: Vec<u8>,
    }

    fn comment_section(subtype: u32, text: &str) -> Section {
        let mut body = Vec::new();
        body.extend_from_slice(&(text.len() as u32).to_le_bytes());
        body.extend_from_slice(text.as_bytes());
        Section {
            kind: TOC_TYPE_COMMENT,
            subtype,
            body,
        }
    }

    fn image_section(size: u32, width: u32, height: u32, delay: u32, fill: u8) -> Section {
        let mut body = Vec::new();
        body.extend_from_slice(&width.to_le_bytes());
        body.extend_from_slice(&height.to_le_bytes());
        body.extend_from_slice(&(width / 2).to_le_bytes()); // xhot
        body.extend_from_slice(&(height / 2).to_le_bytes()); // yhot
        body.extend_from_slice(&delay.to_le_bytes());
        body.extend(std::iter::repeat_n(fill, (width * height * 4) as usize));
        Section {
            kind: TOC_TYPE_IMAGE,
            subtype: size,
            body,
        }
    }

    /// Assembles a well-formed file from sections, computing TOC offsets.
    fn build_file(sections: &[Section]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"Xcur");
        out.extend_from_slice(&16u32.to_le_bytes()); // header size
        out.extend_from_slice(&0x0001_0000u32.to_le_bytes()); // version
        out.extend_from_slice(&(sections.len() as u32).to_le_bytes());

        let mut position = 16 + sections.len() as u32 * 12;
        for s in sections {
            out.extend_from_slice(&s.kind.to_le_bytes());
            out.extend_from_slice(&s.subtype.to_le_bytes());
            out.extend_from_slice(&position.to_le_bytes());
            position += 16 + s.body.len() as u32;
        }

        for s in sections {
            out.extend_from_slice(&(16 + s.body.len() as u32).to_le_bytes());
            out.extend_from_slice(&s.kind.to_le_bytes());
            out.extend_from_slice(&s.subtype.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes()); // section version
            out.extend_from_slice(&s.body);
        }

        out
    }

    #[test]
    fn decodes_mixed_sections_in_file_order() {
        let data = build_file(&[
            comment_section(1, "made up for testing"),
            image_section(24, 24, 24, 0, 0x11),
            image_section(24, 24, 24, 50, 0x22),
            image_section(32, 32, 32, 0, 0x33),
            comment_section(2, "GPL"),
        ]);

        let cursor = decode_bytes(&data).unwrap();

        assert_eq!(cursor.comments.len(), 2);
        assert_eq!(cursor.comments[0].kind, CommentKind::Copyright);
        assert_eq!(cursor.comments[0].text, "made up for testing");
        assert_eq!(cursor.comments[1].kind, CommentKind::License);

        assert_eq!(cursor.images.len(), 2);
        let frames = &cursor.images[&24];
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].pixels.data[0], 0x11);
        assert_eq!(frames[1].pixels.data[0], 0x22);
        assert_eq!(frames[1].delay, Duration::from_millis(50));
        assert_eq!(cursor.images[&32].len(), 1);
    }

    #[test]
    fn decodes_image_fields() {
        let data = build_file(&[image_section(32, 16, 8, 120, 0xab)]);
        let cursor = decode_bytes(&data).unwrap();

        let img = &cursor.images[&32][0];
        assert_eq!(img.nominal_size, 32);
        assert_eq!(img.hotspot, (8, 4));
        assert_eq!(img.delay, Duration::from_millis(120));
        assert_eq!(img.pixels.width, 16);
        assert_eq!(img.pixels.height, 8);
        assert_eq!(img.pixels.format, PixelFormat::Argb8888);
        assert_eq!(img.pixels.data.len(), 16 * 8 * 4);
    }

    #[test]
    fn empty_toc_is_a_valid_empty_cursor() {
        let data = build_file(&[]);
        let cursor = decode_bytes(&data).unwrap();
        assert!(cursor.comments.is_empty());
        assert!(cursor.images.is_empty());
    }

    #[test]
    fn bad_magic() {
        let data = b"NOPE\x00\x00\x00\x00";
        assert!(matches!(decode_bytes(data), Err(DecodeError::BadMagic)));
    }

    #[test]
    fn short_pixel_buffer_fails() {
        let mut data = build_file(&[image_section(4, 4, 4, 0, 0xff)]);
        // Drop part of the pixel payload.
        data.truncate(data.len() - 20);

        assert!(matches!(decode_bytes(&data), Err(DecodeError::Io(_))));
    }

    #[test]
    fn section_type_mismatch_is_fatal() {
        let mut data = build_file(&[comment_section(1, "x")]);
        // The section starts at 28; its type field is 4 bytes in.
        data[32..36].copy_from_slice(&TOC_TYPE_IMAGE.to_le_bytes());

        assert!(matches!(
            decode_bytes(&data),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn section_subtype_mismatch_is_fatal() {
        let mut data = build_file(&[image_section(24, 4, 4, 0, 0)]);
        data[36..40].copy_from_slice(&32u32.to_le_bytes());

        assert!(matches!(
            decode_bytes(&data),
            Err(DecodeError::SubtypeMismatch {
                expected: 24,
                found: 32
            })
        ));
    }

    #[test]
    fn unknown_section_type_is_fatal() {
        let mut data = build_file(&[comment_section(1, "x")]);
        // Patch the same unknown type into both the TOC entry and the
        // section sub-header so the structural double-check passes.
        data[16..20].copy_from_slice(&0xdead_0001u32.to_le_bytes());
        data[32..36].copy_from_slice(&0xdead_0001u32.to_le_bytes());

        assert!(matches!(
            decode_bytes(&data),
            Err(DecodeError::UnknownSectionType(0xdead_0001))
        ));
    }

    #[test]
    fn backward_section_offset_is_fatal() {
        let mut data = build_file(&[comment_section(1, "x"), comment_section(1, "y")]);
        // Point the second TOC entry at the first section.
        data[36..40].copy_from_slice(&40u32.to_le_bytes());

        assert!(matches!(
            decode_bytes(&data),
            Err(DecodeError::InvalidSeek { .. })
        ));
    }

    #[test]
    fn truncated_toc_fails() {
        let mut data = Vec::new();
        data.extend_from_slice(b"Xcur");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes()); // claims 3 entries
        data.extend_from_slice(&TOC_TYPE_COMMENT.to_le_bytes()); // then ends

        assert!(matches!(decode_bytes(&data), Err(DecodeError::Io(_))));
    }

    #[test]
    fn streaming_decode_matches_seekable() {
        let data = build_file(&[
            comment_section(3, "note"),
            image_section(16, 16, 16, 0, 0x7f),
        ]);

        let from_stream = decode(&data[..]).unwrap();
        let from_bytes = decode_bytes(&data).unwrap();
        assert_eq!(from_stream, from_bytes);
    }

    #[test]
    fn decoding_is_idempotent() {
        let data = build_file(&[
            image_section(24, 24, 24, 16, 0x01),
            image_section(48, 48, 48, 16, 0x02),
        ]);

        assert_eq!(decode_bytes(&data).unwrap(), decode_bytes(&data).unwrap());
    }
}
