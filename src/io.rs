use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};

// ============================================================================
// ERRORS
// ============================================================================

/// Error type for snapshot capture / restore and export.
#[derive(Debug)]
pub enum SnapshotError {
    /// Serialising a surface failed.
    Encode(String),
    /// The stored bytes are not a decodable image.
    Decode(String),
    /// Nothing to decode (zero-length snapshot).
    Empty,
    Io(std::io::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Encode(e) => write!(f, "Encode error: {}", e),
            SnapshotError::Decode(e) => write!(f, "Decode error: {}", e),
            SnapshotError::Empty => write!(f, "Empty snapshot"),
            SnapshotError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(e: std::io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

// ============================================================================
// PNG SNAPSHOTS
// ============================================================================

/// A PNG-encoded full-frame copy of one surface.
///
/// The bytes sit behind an `Arc` so a history entry and an in-flight decode
/// job can share them without copying pixel data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl EncodedImage {
    /// Wrap raw bytes that claim to be a PNG of the given size.
    /// The bytes are not validated until decode.
    pub fn from_bytes(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            bytes: bytes.into(),
            width,
            height,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn memory_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn decode(&self) -> Result<RgbaImage, SnapshotError> {
        decode_png(&self.bytes)
    }
}

/// Encode an RGBA buffer as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<EncodedImage, SnapshotError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ColorType::Rgba8,
        )
        .map_err(|e| SnapshotError::Encode(e.to_string()))?;
    Ok(EncodedImage::from_bytes(buf, image.width(), image.height()))
}

/// Decode PNG bytes into a straight-alpha RGBA buffer.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, SnapshotError> {
    if bytes.is_empty() {
        return Err(SnapshotError::Empty);
    }
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| SnapshotError::Decode(e.to_string()))?;
    Ok(img.into_rgba8())
}

// ============================================================================
// EXPORT
// ============================================================================

/// A composited frame serialised for download.
#[derive(Clone, Debug)]
pub struct ExportedImage {
    pub filename: String,
    pub png: EncodedImage,
}

impl ExportedImage {
    pub fn new(prefix: &str, frame: &RgbaImage) -> Result<Self, SnapshotError> {
        Ok(Self {
            filename: export_filename(prefix, unix_millis()),
            png: encode_png(frame)?,
        })
    }

    /// Write the PNG into `dir` under its timestamped name.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, SnapshotError> {
        let path = dir.join(&self.filename);
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(self.png.bytes())?;
        writer.flush()?;
        Ok(path)
    }
}

pub fn export_filename(prefix: &str, millis: u64) -> String {
    format!("{}-{}.png", prefix, millis)
}

/// Milliseconds since the Unix epoch (0 if the clock is before 1970).
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
