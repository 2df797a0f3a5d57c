use image::codecs::png::PngEncoder;
use image::{ImageError, ImageFormat, RgbaImage};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Encoded image bytes (PNG, JPEG, ...). Cheap to clone; shared between the
/// session and any export running over it.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Arc<[u8]>,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: Arc::from(bytes) }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Container format sniffed from the leading bytes.
    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImagePayload({:?}, {} bytes)", self.format(), self.len())
    }
}

impl From<Vec<u8>> for ImagePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// DECODE / ENCODE
// ============================================================================

/// Decode any supported container into RGBA8.
pub fn decode_image(payload: &ImagePayload) -> Result<RgbaImage, ImageError> {
    Ok(image::load_from_memory(payload.bytes())?.into_rgba8())
}

/// Encode an RGBA image as PNG into memory.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Vec::with_capacity(image.as_raw().len() / 4);
    let encoder = PngEncoder::new(&mut out);
    #[allow(deprecated)]
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(out)
}

// ============================================================================
// FILE INPUT — "upload" path
// ============================================================================

/// Read a local file as a photo payload. Only files whose content sniffs as a
/// known image format are accepted, whatever their extension says.
pub fn read_photo_file(path: &Path) -> Result<ImagePayload, String> {
    let bytes = fs::read(path).map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    if image::guess_format(&bytes).is_err() {
        return Err(format!("'{}' is not an image", path.display()));
    }
    Ok(ImagePayload::new(bytes))
}

// ============================================================================
// DOWNLOAD ARTIFACT
// ============================================================================

/// `<app>-photobooth-<unix-ms>.png`
pub fn download_file_name(app_name: &str, timestamp_ms: u64) -> String {
    format!("{}-photobooth-{}.png", app_name, timestamp_ms)
}

/// Write exported PNG bytes into `dir` under the download naming scheme.
pub fn write_download(png: &[u8], dir: &Path, app_name: &str, timestamp_ms: u64) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(download_file_name(app_name, timestamp_ms));
    write_bytes(png, &path)?;
    Ok(path)
}

/// Write bytes to an explicit path, creating parent directories.
pub fn write_bytes(bytes: &[u8], path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()
}
