use crate::components::capture::{CameraBackend, CaptureController, CaptureError};
use crate::io::{now_ms, write_download};
use crate::ops::compose::StripInputs;
use crate::ops::export::{ExportError, ExportRequest, ExportedImage, export_strip};
use crate::ops::share::{SharePayload, ShareError, ShareTarget};
use crate::ops::text::Fonts;
use crate::session::{Session, Step};
use crate::settings::BoothSettings;
use crate::{log_err, log_info, log_warn};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CAMERA_DENIED_NOTICE: &str = "Unable to access camera. Please ensure you have granted camera permissions.";
pub const SHARE_UNSUPPORTED_NOTICE: &str = "Sharing not supported on this device. Downloading instead!";
pub const DOWNLOAD_FAILED_NOTICE: &str = "Failed to download image. Please try again.";
pub const SHARE_FAILED_NOTICE: &str = "Failed to share. Please try downloading instead.";

// ============================================================================
// NOTICES — blocking user-facing messages
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Error(m) => m,
        }
    }
}

/// Where notices go: a dialog, the terminal, or a list in tests.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

impl Notifier for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

/// Prints notices to stderr and mirrors them into the session log.
#[derive(Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&mut self, notice: Notice) {
        match &notice {
            Notice::Info(m) => {
                log_info!("Notice: {}", m);
            }
            Notice::Error(m) => {
                log_err!("Notice: {}", m);
            }
        }
        eprintln!("{}", notice.message());
    }
}

// ============================================================================
// DELIVERY — download and share results
// ============================================================================

#[derive(Debug)]
pub enum DeliveryError {
    Export(ExportError),
    Io(std::io::Error),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Export(e) => write!(f, "{}", e),
            DeliveryError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DeliveryError {}

impl From<ExportError> for DeliveryError {
    fn from(e: ExportError) -> Self {
        DeliveryError::Export(e)
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(e: std::io::Error) -> Self {
        DeliveryError::Io(e)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// The user dismissed the share sheet; nothing else happens.
    Cancelled,
    /// Sharing was unavailable or failed, so the strip was saved instead.
    Downloaded(PathBuf),
}

// ============================================================================
// BOOTH — owns the session and routes user actions
// ============================================================================

pub struct Booth<N: Notifier> {
    session: Session,
    capture: CaptureController,
    settings: BoothSettings,
    fonts: Fonts,
    notifier: N,
}

impl<N: Notifier> Booth<N> {
    pub fn new(settings: BoothSettings, fonts: Fonts, notifier: N) -> Self {
        let mut session = Session::new();
        session.set_strip_color(settings.strip_color);
        Self {
            session,
            capture: CaptureController::new(),
            settings,
            fonts,
            notifier,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn settings(&self) -> &BoothSettings {
        &self.settings
    }

    pub fn fonts(&self) -> &Fonts {
        &self.fonts
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn error(&mut self, message: &str) {
        self.notifier.notify(Notice::Error(message.to_string()));
    }

    /// Capture actions only apply while the session is on the capture step.
    fn capturing(&self, action: &str) -> bool {
        let step = self.session.step();
        if step != Step::Capture {
            log_warn!("Booth: {} ignored on the {:?} step", action, step);
            return false;
        }
        true
    }

    // --- capture step ---------------------------------------------------------

    /// Returns whether the camera is now live.
    pub fn start_camera(&mut self, backend: &mut dyn CameraBackend) -> bool {
        if !self.capturing("start camera") {
            return false;
        }
        match self.capture.start_camera(backend) {
            Ok(()) => true,
            Err(CaptureError::Camera(_)) => {
                self.error(CAMERA_DENIED_NOTICE);
                false
            }
            Err(e) => {
                log_warn!("Booth: {}", e);
                false
            }
        }
    }

    /// Take a photo. A full set makes this a no-op.
    pub fn capture_photo(&mut self) -> Option<Uuid> {
        if !self.capturing("capture") {
            return None;
        }
        match self.capture.capture() {
            Ok(id) => Some(id),
            Err(CaptureError::Full) => None,
            Err(CaptureError::Camera(_)) => {
                self.error(CAMERA_DENIED_NOTICE);
                None
            }
            Err(e) => {
                log_warn!("Booth: {}", e);
                None
            }
        }
    }

    pub fn upload_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        if !self.capturing("upload") {
            return 0;
        }
        self.capture.upload_files(paths)
    }

    pub fn remove_photo(&mut self, id: Uuid) -> bool {
        if !self.capturing("remove photo") {
            return false;
        }
        self.capture.remove_photo(id)
    }

    pub fn finish_capture(&mut self) -> bool {
        if !self.capturing("finish") {
            return false;
        }
        match self.capture.finish() {
            Ok(()) => true,
            Err(e) => {
                log_warn!("Booth: {}", e);
                false
            }
        }
    }

    /// Advance printing. Returns `true` on the tick that hands the photos to
    /// the session.
    pub fn tick(&mut self) -> bool {
        if self.session.step() != Step::Capture {
            return false;
        }
        match self.capture.tick() {
            Some(photos) => self.session.complete_capture(photos),
            None => false,
        }
    }

    // --- navigation -----------------------------------------------------------

    pub fn back_to_capture(&mut self) -> bool {
        if self.session.back_to_capture() {
            self.capture = CaptureController::new();
            true
        } else {
            false
        }
    }

    pub fn start_over(&mut self) {
        self.session.reset();
        self.capture = CaptureController::new();
    }

    // --- export ---------------------------------------------------------------

    /// Render the current session. Never mutates it.
    pub fn export(&self) -> Result<ExportedImage, ExportError> {
        let request = ExportRequest {
            strip: StripInputs::from_session(&self.session),
            notes: self.session.notes(),
        };
        export_strip(&request, &self.fonts, &self.settings.export_options())
    }

    fn save_png(&self, png: &[u8]) -> Result<PathBuf, DeliveryError> {
        let path = write_download(png, &self.settings.output_dir(), &self.settings.brand, now_ms())?;
        log_info!("Booth: saved {}", path.display());
        Ok(path)
    }

    /// Export and write `<brand>-photobooth-<ms>.png` to the output directory.
    pub fn download(&mut self) -> Result<PathBuf, DeliveryError> {
        let result = self
            .export()
            .map_err(DeliveryError::from)
            .and_then(|out| self.save_png(&out.png));
        if let Err(e) = &result {
            log_err!("Booth: download failed: {}", e);
            self.error(DOWNLOAD_FAILED_NOTICE);
        }
        result
    }

    /// Write an already exported PNG under the download name.
    pub fn save_download(&mut self, png: &[u8]) -> Result<PathBuf, DeliveryError> {
        let result = self.save_png(png);
        if let Err(e) = &result {
            log_err!("Booth: download failed: {}", e);
            self.error(DOWNLOAD_FAILED_NOTICE);
        }
        result
    }

    /// Share through `target`, falling back to a download when the target
    /// cannot take files or the share fails. Cancelling does nothing.
    pub fn share(&mut self, target: &mut dyn ShareTarget) -> Result<ShareOutcome, DeliveryError> {
        let exported = match self.export() {
            Ok(out) => out,
            Err(e) => {
                log_err!("Booth: share export failed: {}", e);
                self.error(SHARE_FAILED_NOTICE);
                return Err(e.into());
            }
        };

        if !target.can_share_files() {
            self.notifier.notify(Notice::Info(SHARE_UNSUPPORTED_NOTICE.to_string()));
            return self.save_download(&exported.png).map(ShareOutcome::Downloaded);
        }

        let payload = SharePayload::for_strip(&self.settings.brand, exported.png);
        match target.share(&payload) {
            Ok(()) => Ok(ShareOutcome::Shared),
            Err(ShareError::Cancelled) => {
                log_info!("Booth: share cancelled");
                Ok(ShareOutcome::Cancelled)
            }
            Err(e) => {
                log_warn!("Booth: {}; downloading instead", e);
                self.save_download(&payload.bytes).map(ShareOutcome::Downloaded)
            }
        }
    }

    pub fn step(&self) -> Step {
        self.session.step()
    }
}
