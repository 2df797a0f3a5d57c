// ============================================================================
// SHARE — hand the exported PNG to a share target (OS default handler)
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};

use crate::io::write_bytes;
use crate::log_info;

/// A file plus the title/text a share sheet shows next to it.
#[derive(Clone, Debug, PartialEq)]
pub struct SharePayload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    pub title: String,
    pub text: String,
}

impl SharePayload {
    /// Payload for an exported strip under `brand`.
    pub fn for_strip(brand: &str, png: Vec<u8>) -> Self {
        Self {
            file_name: format!("{}-photobooth.png", brand),
            mime: "image/png",
            bytes: png,
            title: format!("My {} Photobooth", capitalize(brand)),
            text: format!("Check out my photo strip! 📸 Created with @{}", brand),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The user dismissed the share sheet.
    Cancelled,
    Failed(String),
}

impl fmt::Display for ShareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareError::Cancelled => write!(f, "Share cancelled"),
            ShareError::Failed(e) => write!(f, "Share failed: {}", e),
        }
    }
}

impl std::error::Error for ShareError {}

impl From<std::io::Error> for ShareError {
    fn from(e: std::io::Error) -> Self {
        ShareError::Failed(e.to_string())
    }
}

/// Somewhere a finished strip can be sent.
pub trait ShareTarget {
    /// Whether this target accepts file attachments at all.
    fn can_share_files(&self) -> bool;

    fn share(&mut self, payload: &SharePayload) -> Result<(), ShareError>;
}

/// Writes the file into a staging directory and opens it with the OS
/// default handler.
pub struct OsShareTarget {
    dir: PathBuf,
}

impl OsShareTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for OsShareTarget {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ShareTarget for OsShareTarget {
    fn can_share_files(&self) -> bool {
        cfg!(any(target_os = "windows", target_os = "macos", target_os = "linux"))
    }

    fn share(&mut self, payload: &SharePayload) -> Result<(), ShareError> {
        let path = self.dir.join(&payload.file_name);
        write_bytes(&payload.bytes, &path)?;
        log_info!("Share: opening {}", path.display());
        open_with_os(&path).map_err(ShareError::Failed)
    }
}

#[cfg(target_os = "windows")]
fn open_with_os(path: &Path) -> Result<(), String> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use winapi::um::shellapi::ShellExecuteW;
    use winapi::um::winuser::SW_SHOWNORMAL;

    // UTF-16, null-terminated
    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let verb = to_wide(OsStr::new("open"));
    let file = to_wide(path.as_os_str());

    let result = unsafe {
        ShellExecuteW(
            std::ptr::null_mut(),
            verb.as_ptr(),
            file.as_ptr(),
            std::ptr::null(),
            std::ptr::null(),
            SW_SHOWNORMAL,
        )
    };

    // ShellExecuteW returns > 32 on success
    if result as usize > 32 {
        Ok(())
    } else {
        Err(format!("ShellExecuteW open failed (code {})", result as usize))
    }
}

#[cfg(target_os = "macos")]
fn open_with_os(path: &Path) -> Result<(), String> {
    std::process::Command::new("open")
        .arg(path)
        .spawn()
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn open_with_os(path: &Path) -> Result<(), String> {
    std::process::Command::new("xdg-open")
        .arg(path)
        .spawn()
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn open_with_os(path: &Path) -> Result<(), String> {
    Err(format!("No default handler for {} on this platform", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_payload_uses_brand() {
        let p = SharePayload::for_strip("fondairena", vec![1, 2, 3]);
        assert_eq!(p.file_name, "fondairena-photobooth.png");
        assert_eq!(p.mime, "image/png");
        assert_eq!(p.title, "My Fondairena Photobooth");
        assert_eq!(p.text, "Check out my photo strip! 📸 Created with @fondairena");
    }

    #[test]
    fn capitalize_handles_empty_and_unicode() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("émile"), "Émile");
    }
}
