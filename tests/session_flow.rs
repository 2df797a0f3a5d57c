use std::path::PathBuf;

use image::{Rgba, RgbaImage};

use photobooth::app::{CAMERA_DENIED_NOTICE, SHARE_UNSUPPORTED_NOTICE};
use photobooth::components::capture::{CameraBackend, CameraError, CameraStream, CaptureMode, StreamRequest};
use photobooth::components::colors::{InkColor, StripColor};
use photobooth::ops::layout::MAX_PHOTOS;
use photobooth::ops::share::{ShareError, SharePayload, ShareTarget};
use photobooth::ops::text::Fonts;
use photobooth::{Booth, BoothSettings, Notice, ShareOutcome, Step};

struct StudioCamera;

struct StudioStream;

impl CameraStream for StudioStream {
    fn grab_frame(&mut self) -> Result<RgbaImage, CameraError> {
        Ok(RgbaImage::from_pixel(32, 18, Rgba([250, 200, 180, 255])))
    }

    fn stop(&mut self) {}
}

impl CameraBackend for StudioCamera {
    fn open(&mut self, _: &StreamRequest) -> Result<Box<dyn CameraStream>, CameraError> {
        Ok(Box::new(StudioStream))
    }
}

struct BrokenCamera;

impl CameraBackend for BrokenCamera {
    fn open(&mut self, _: &StreamRequest) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(CameraError::Hardware("device busy".into()))
    }
}

/// Share target with a scripted answer that records what it was given.
struct ScriptedShare {
    supports_files: bool,
    answer: Result<(), ShareError>,
    received: Vec<SharePayload>,
}

impl ScriptedShare {
    fn new(supports_files: bool, answer: Result<(), ShareError>) -> Self {
        Self { supports_files, answer, received: Vec::new() }
    }
}

impl ShareTarget for ScriptedShare {
    fn can_share_files(&self) -> bool {
        self.supports_files
    }

    fn share(&mut self, payload: &SharePayload) -> Result<(), ShareError> {
        self.received.push(payload.clone());
        self.answer.clone()
    }
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("photobooth-flow-{}", uuid::Uuid::new_v4()))
}

fn booth_in(dir: &PathBuf) -> Booth<Vec<Notice>> {
    let settings = BoothSettings {
        output_dir: dir.to_string_lossy().into_owned(),
        export_scale: 1.0,
        ..BoothSettings::default()
    };
    Booth::new(settings, Fonts::none(), Vec::new())
}

/// Take two photos and run printing to completion.
fn captured_booth(dir: &PathBuf) -> Booth<Vec<Notice>> {
    let mut booth = booth_in(dir);
    assert!(booth.start_camera(&mut StudioCamera));
    booth.capture_photo().unwrap();
    booth.capture_photo().unwrap();
    assert!(booth.finish_capture());
    while !booth.tick() {}
    booth
}

fn files_in(dir: &PathBuf) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn camera_failure_leaves_choose_mode_with_notice() {
    let dir = scratch_dir();
    let mut booth = booth_in(&dir);
    assert!(!booth.start_camera(&mut BrokenCamera));
    assert_eq!(booth.notifier(), &vec![Notice::Error(CAMERA_DENIED_NOTICE.to_string())]);
    assert_eq!(booth.capture().mode(), CaptureMode::Choose);
    assert!(!booth.capture().has_stream());

    // Retry works
    assert!(booth.start_camera(&mut StudioCamera));
    assert_eq!(booth.capture().mode(), CaptureMode::Camera);
}

#[test]
fn capture_is_capped_and_completes_into_strip_step() {
    let dir = scratch_dir();
    let mut booth = booth_in(&dir);
    booth.start_camera(&mut StudioCamera);
    for _ in 0..MAX_PHOTOS {
        assert!(booth.capture_photo().is_some());
    }
    assert!(booth.capture_photo().is_none());
    assert_eq!(booth.capture().photos().len(), MAX_PHOTOS);

    assert!(booth.finish_capture());
    assert!(!booth.capture().has_stream());
    let mut ticks = 0;
    while !booth.tick() {
        ticks += 1;
    }
    assert_eq!(ticks, 49);
    assert_eq!(booth.step(), Step::Strip);
    assert_eq!(booth.session().photos().len(), MAX_PHOTOS);
    assert!(booth.notifier().is_empty());
}

#[test]
fn capture_actions_wait_for_the_capture_step() {
    let dir = scratch_dir();
    let mut booth = captured_booth(&dir);
    assert_eq!(booth.step(), Step::Strip);

    std::fs::create_dir_all(&dir).unwrap();
    let extra = dir.join("late.png");
    RgbaImage::from_pixel(8, 6, Rgba([9, 9, 9, 255])).save(&extra).unwrap();

    assert_eq!(booth.upload_files(&[&extra]), 0);
    assert!(!booth.finish_capture());
    assert!(!booth.tick());
    assert!(!booth.start_camera(&mut StudioCamera));
    assert!(booth.capture_photo().is_none());
    assert!(booth.capture().photos().is_empty());
    assert_eq!(booth.capture().mode(), CaptureMode::Choose);
    assert_eq!(booth.step(), Step::Strip);
    assert_eq!(booth.session().photos().len(), 2);

    // Back on the capture step the same file is accepted
    assert!(booth.back_to_capture());
    assert_eq!(booth.upload_files(&[&extra]), 1);
    assert!(booth.finish_capture());
    while !booth.tick() {}
    assert_eq!(booth.session().photos().len(), 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decorate_then_start_over() {
    let dir = scratch_dir();
    let mut booth = captured_booth(&dir);
    let session = booth.session_mut();
    session.set_strip_color(StripColor::Lavender);

    let id = session.stickers_mut().add("🦋");
    for _ in 0..8 {
        session.stickers_mut().rotate(id);
    }
    for _ in 0..3 {
        session.stickers_mut().cycle_scale(id);
    }
    let sticker = session.stickers().get(id).unwrap();
    assert_eq!((sticker.rotation, sticker.scale), (0.0, 1.0));

    let board = session.drawing_mut();
    board.set_ink(InkColor::Purple);
    board.press((10.0, 10.0).into());
    board.move_to((200.0, 300.0).into());
    board.release();
    assert!(board.raster().is_some());

    assert!(session.next());
    session.set_notes("we did it");
    assert!(session.back());
    assert!(booth.back_to_capture());
    assert_eq!(booth.session().photos().len(), 2);
    assert_eq!(booth.capture().mode(), CaptureMode::Choose);

    booth.start_over();
    assert_eq!(booth.step(), Step::Capture);
    assert!(booth.session().photos().is_empty());
    assert!(booth.session().stickers().is_empty());
    assert!(booth.session().drawing().raster().is_none());
    assert_eq!(booth.session().notes(), "");
    assert_eq!(booth.session().strip_color(), StripColor::Lavender);
}

#[test]
fn download_writes_branded_png() {
    let dir = scratch_dir();
    let mut booth = captured_booth(&dir);
    let path = booth.download().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("fondairena-photobooth-") && name.ends_with(".png"), "{}", name);
    let img = image::open(&path).unwrap();
    assert_eq!(img.width(), 420);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn share_success_sends_branded_payload() {
    let dir = scratch_dir();
    let mut booth = captured_booth(&dir);
    let mut target = ScriptedShare::new(true, Ok(()));
    assert_eq!(booth.share(&mut target).unwrap(), ShareOutcome::Shared);
    assert_eq!(target.received.len(), 1);
    assert_eq!(target.received[0].file_name, "fondairena-photobooth.png");
    assert_eq!(target.received[0].title, "My Fondairena Photobooth");
    assert!(files_in(&dir).is_empty());
}

#[test]
fn share_unsupported_notifies_and_downloads() {
    let dir = scratch_dir();
    let mut booth = captured_booth(&dir);
    let mut target = ScriptedShare::new(false, Ok(()));
    let outcome = booth.share(&mut target).unwrap();
    assert!(matches!(outcome, ShareOutcome::Downloaded(_)));
    assert!(target.received.is_empty());
    assert_eq!(booth.notifier(), &vec![Notice::Info(SHARE_UNSUPPORTED_NOTICE.to_string())]);
    assert_eq!(files_in(&dir).len(), 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn share_cancel_is_silent() {
    let dir = scratch_dir();
    let mut booth = captured_booth(&dir);
    let mut target = ScriptedShare::new(true, Err(ShareError::Cancelled));
    assert_eq!(booth.share(&mut target).unwrap(), ShareOutcome::Cancelled);
    assert!(booth.notifier().is_empty());
    assert!(files_in(&dir).is_empty());
}

#[test]
fn share_failure_falls_back_to_download() {
    let dir = scratch_dir();
    let mut booth = captured_booth(&dir);
    let mut target = ScriptedShare::new(true, Err(ShareError::Failed("sheet crashed".into())));
    let outcome = booth.share(&mut target).unwrap();
    match outcome {
        ShareOutcome::Downloaded(path) => assert!(path.exists()),
        other => panic!("expected a download, got {:?}", other),
    }
    assert!(booth.notifier().is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}
