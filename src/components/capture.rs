// ============================================================================
// CAPTURE — camera stream, uploads and the printing hand-off
// ============================================================================

use std::fmt;
use std::path::Path;

use image::{ImageError, RgbaImage};
use uuid::Uuid;

use crate::io::{ImagePayload, encode_png, read_photo_file};
use crate::ops::layout::MAX_PHOTOS;
use crate::session::Photo;
use crate::{log_err, log_info, log_warn};

/// Printing progress added per tick.
pub const PRINT_STEP: u8 = 2;
pub const PRINT_DONE: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// What to ask the camera backend for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
    pub audio: bool,
}

impl Default for StreamRequest {
    /// Front camera, 1280x720, video only.
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            width: 1280,
            height: 720,
            audio: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    PermissionDenied,
    NotFound,
    Hardware(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::PermissionDenied => write!(f, "camera permission denied"),
            CameraError::NotFound => write!(f, "no camera found"),
            CameraError::Hardware(e) => write!(f, "camera failure: {}", e),
        }
    }
}

impl std::error::Error for CameraError {}

/// A live video stream.
pub trait CameraStream {
    /// Snapshot the current frame at the stream's native size.
    fn grab_frame(&mut self) -> Result<RgbaImage, CameraError>;

    /// Stop every track. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Opens camera streams (permission prompt included).
pub trait CameraBackend {
    fn open(&mut self, request: &StreamRequest) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// Owns the live stream; dropping it stops all tracks.
struct ActiveStream(Box<dyn CameraStream>);

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.0.stop();
        log_info!("Camera: tracks stopped");
    }
}

#[derive(Debug)]
pub enum CaptureError {
    /// Four photos already taken.
    Full,
    NoStream,
    NoPhotos,
    /// Printing is running; the photo set is frozen.
    Busy,
    Camera(CameraError),
    Encode(ImageError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Full => write!(f, "You can add up to {} photos", MAX_PHOTOS),
            CaptureError::NoStream => write!(f, "Camera is not running"),
            CaptureError::NoPhotos => write!(f, "Take or upload at least one photo first"),
            CaptureError::Busy => write!(f, "Printing in progress"),
            CaptureError::Camera(e) => write!(f, "Camera: {}", e),
            CaptureError::Encode(e) => write!(f, "Could not encode frame: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<CameraError> for CaptureError {
    fn from(e: CameraError) -> Self {
        CaptureError::Camera(e)
    }
}

impl From<ImageError> for CaptureError {
    fn from(e: ImageError) -> Self {
        CaptureError::Encode(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Choose,
    Camera,
    Upload,
    Printing { progress: u8 },
}

/// Collects up to four photos from the camera or from files, then plays the
/// printing progress before handing the set over.
#[derive(Default)]
pub struct CaptureController {
    mode: CaptureMode,
    photos: Vec<Photo>,
    stream: Option<ActiveStream>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn remaining(&self) -> usize {
        MAX_PHOTOS.saturating_sub(self.photos.len())
    }

    fn is_printing(&self) -> bool {
        matches!(self.mode, CaptureMode::Printing { .. })
    }

    /// Ask for the front camera. On failure no stream is kept and the mode
    /// does not change.
    pub fn start_camera(&mut self, backend: &mut dyn CameraBackend) -> Result<(), CaptureError> {
        if self.is_printing() {
            return Err(CaptureError::Busy);
        }
        self.stream = None;
        match backend.open(&StreamRequest::default()) {
            Ok(stream) => {
                self.stream = Some(ActiveStream(stream));
                self.mode = CaptureMode::Camera;
                log_info!("Camera: stream started");
                Ok(())
            }
            Err(e) => {
                log_err!("Camera: {}", e);
                Err(e.into())
            }
        }
    }

    /// Snapshot the live frame into a PNG photo.
    pub fn capture(&mut self) -> Result<Uuid, CaptureError> {
        if self.remaining() == 0 {
            return Err(CaptureError::Full);
        }
        let stream = self.stream.as_mut().ok_or(CaptureError::NoStream)?;
        let frame = match stream.0.grab_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log_err!("Camera: frame grab failed: {}", e);
                self.stream = None;
                return Err(e.into());
            }
        };
        let photo = Photo::new(ImagePayload::new(encode_png(&frame)?));
        let id = photo.id;
        self.photos.push(photo);
        log_info!("Capture: photo {}/{} taken", self.photos.len(), MAX_PHOTOS);
        Ok(id)
    }

    /// Add already-read files. Non-images are skipped; anything beyond the
    /// remaining capacity is ignored. Returns how many photos were added.
    pub fn upload_payloads(&mut self, payloads: impl IntoIterator<Item = ImagePayload>) -> usize {
        if self.is_printing() {
            return 0;
        }
        let mut added = 0;
        for payload in payloads {
            if self.remaining() == 0 {
                log_warn!("Upload: photo limit reached, ignoring remaining files");
                break;
            }
            if payload.format().is_none() {
                log_warn!("Upload: skipping a file that is not an image ({} bytes)", payload.len());
                continue;
            }
            self.photos.push(Photo::new(payload));
            added += 1;
        }
        if added > 0 && self.mode == CaptureMode::Choose {
            self.mode = CaptureMode::Upload;
        }
        added
    }

    /// Read files from disk and add them like [`Self::upload_payloads`].
    pub fn upload_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        let payloads = paths.iter().filter_map(|p| match read_photo_file(p.as_ref()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log_warn!("Upload: {}", e);
                None
            }
        });
        // Only read as many files as could still be added
        let remaining = self.remaining();
        let payloads: Vec<_> = payloads.take(remaining).collect();
        self.upload_payloads(payloads)
    }

    pub fn remove_photo(&mut self, id: Uuid) -> bool {
        if self.is_printing() {
            return false;
        }
        let before = self.photos.len();
        self.photos.retain(|p| p.id != id);
        self.photos.len() != before
    }

    /// Release the camera and start printing.
    pub fn finish(&mut self) -> Result<(), CaptureError> {
        if self.is_printing() {
            return Err(CaptureError::Busy);
        }
        if self.photos.is_empty() {
            return Err(CaptureError::NoPhotos);
        }
        self.stream = None;
        self.mode = CaptureMode::Printing { progress: 0 };
        Ok(())
    }

    /// Advance the printing animation. Returns the photo set once progress
    /// hits 100; the controller is then back in `Choose` and empty.
    pub fn tick(&mut self) -> Option<Vec<Photo>> {
        let CaptureMode::Printing { progress } = self.mode else {
            return None;
        };
        let progress = progress.saturating_add(PRINT_STEP).min(PRINT_DONE);
        if progress < PRINT_DONE {
            self.mode = CaptureMode::Printing { progress };
            return None;
        }
        self.mode = CaptureMode::Choose;
        log_info!("Capture: printing done");
        Some(std::mem::take(&mut self.photos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeStream {
        stopped: Rc<Cell<u32>>,
    }

    impl CameraStream for FakeStream {
        fn grab_frame(&mut self) -> Result<RgbaImage, CameraError> {
            Ok(RgbaImage::from_pixel(16, 9, Rgba([10, 20, 30, 255])))
        }

        fn stop(&mut self) {
            self.stopped.set(self.stopped.get() + 1);
        }
    }

    struct FakeCamera {
        deny: bool,
        stopped: Rc<Cell<u32>>,
        last_request: Option<StreamRequest>,
    }

    impl FakeCamera {
        fn new(deny: bool) -> Self {
            Self { deny, stopped: Rc::new(Cell::new(0)), last_request: None }
        }
    }

    impl CameraBackend for FakeCamera {
        fn open(&mut self, request: &StreamRequest) -> Result<Box<dyn CameraStream>, CameraError> {
            self.last_request = Some(*request);
            if self.deny {
                return Err(CameraError::PermissionDenied);
            }
            Ok(Box::new(FakeStream { stopped: self.stopped.clone() }))
        }
    }

    fn png_payload() -> ImagePayload {
        let img = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        ImagePayload::new(encode_png(&img).unwrap())
    }

    #[test]
    fn camera_request_is_front_facing_hd_without_audio() {
        let mut cam = FakeCamera::new(false);
        let mut c = CaptureController::new();
        c.start_camera(&mut cam).unwrap();
        let req = cam.last_request.unwrap();
        assert_eq!((req.facing, req.width, req.height, req.audio), (FacingMode::User, 1280, 720, false));
        assert_eq!(c.mode(), CaptureMode::Camera);
        assert!(c.has_stream());
    }

    #[test]
    fn denied_camera_stays_in_choose() {
        let mut cam = FakeCamera::new(true);
        let mut c = CaptureController::new();
        let err = c.start_camera(&mut cam).unwrap_err();
        assert!(matches!(err, CaptureError::Camera(CameraError::PermissionDenied)));
        assert_eq!(c.mode(), CaptureMode::Choose);
        assert!(!c.has_stream());
    }

    #[test]
    fn capture_stops_at_four() {
        let mut cam = FakeCamera::new(false);
        let mut c = CaptureController::new();
        c.start_camera(&mut cam).unwrap();
        for _ in 0..MAX_PHOTOS {
            c.capture().unwrap();
        }
        assert!(matches!(c.capture(), Err(CaptureError::Full)));
        assert_eq!(c.photos().len(), MAX_PHOTOS);
        assert_eq!(c.upload_payloads(vec![png_payload()]), 0);
        assert_eq!(c.photos().len(), MAX_PHOTOS);
    }

    #[test]
    fn upload_caps_and_skips_non_images() {
        let mut c = CaptureController::new();
        let batch = vec![
            png_payload(),
            ImagePayload::new(b"plain text".to_vec()),
            png_payload(),
            png_payload(),
            png_payload(),
            png_payload(),
        ];
        assert_eq!(c.upload_payloads(batch), 4);
        assert_eq!(c.mode(), CaptureMode::Upload);
    }

    #[test]
    fn finish_releases_stream_and_prints() {
        let mut cam = FakeCamera::new(false);
        let mut c = CaptureController::new();
        assert!(matches!(c.finish(), Err(CaptureError::NoPhotos)));

        c.start_camera(&mut cam).unwrap();
        let first = c.capture().unwrap();
        c.capture().unwrap();
        assert!(c.remove_photo(first));
        assert!(!c.remove_photo(first));

        c.finish().unwrap();
        assert_eq!(cam.stopped.get(), 1);
        assert!(!c.has_stream());
        assert_eq!(c.mode(), CaptureMode::Printing { progress: 0 });

        let mut ticks = 0;
        let photos = loop {
            ticks += 1;
            if let Some(photos) = c.tick() {
                break photos;
            }
        };
        assert_eq!(ticks, (PRINT_DONE / PRINT_STEP) as usize);
        assert_eq!(photos.len(), 1);
        assert_eq!(c.mode(), CaptureMode::Choose);
        assert!(c.tick().is_none());
    }

    #[test]
    fn dropping_the_controller_stops_the_camera() {
        let mut cam = FakeCamera::new(false);
        {
            let mut c = CaptureController::new();
            c.start_camera(&mut cam).unwrap();
        }
        assert_eq!(cam.stopped.get(), 1);
    }
}
