// ============================================================================
// Photobooth CLI — build a photo strip headlessly from image files
// ============================================================================
//
// Usage examples:
//   photobooth -i a.jpg b.jpg c.jpg
//   photobooth -i "shots/*.png" --color mint --notes "summer '24" -o strip.png
//   photobooth -i me.jpg --sticker "💖@60,40,1.5,45" --sticker "🌸@200,300"
//   photobooth -i "shots/*.jpg" --design decor.json --output-dir out/ --share
//
// Photos go through the same capture, session and export path a GUI would
// use. Only the first four inputs are used.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::app::{Booth, ShareOutcome, StderrNotifier};
use crate::components::colors::StripColor;
use crate::components::stickers::Sticker;
use crate::design::Design;
use crate::ops::export::ExportReport;
use crate::ops::layout::MAX_PHOTOS;
use crate::ops::share::OsShareTarget;
use crate::ops::text::Fonts;
use crate::settings::BoothSettings;
use crate::io::write_bytes;
use crate::{log_info, log_warn};

/// Printing ticks before giving up; the animation needs 50.
const MAX_PRINT_TICKS: usize = 1_000;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Photobooth strip builder.
///
/// Lays out up to four photos on a coloured strip with stickers, a drawing
/// and a notes panel, then saves or shares the result as a PNG.
#[derive(Parser, Debug)]
#[command(
    name = "photobooth",
    about = "Build a photobooth strip from up to four photos",
    long_about = "Lay out up to four photos on a coloured strip, decorate it with emoji\n\
                  stickers and freehand strokes, add a note, and export a PNG.\n\n\
                  Example:\n  \
                  photobooth -i a.jpg b.jpg --color mint --notes \"hello\"\n  \
                  photobooth -i \"shots/*.png\" --design decor.json --share"
)]
pub struct CliArgs {
    /// Input photo(s). Glob patterns accepted (e.g. "shots/*.jpg").
    /// Only the first four images are used.
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Strip colour: pink, lavender, mint, peach, sky, lemon, rose, cream.
    #[arg(long, value_name = "COLOR", value_parser = parse_strip_color)]
    pub color: Option<StripColor>,

    /// Place a sticker, strip-local centre in pixels. Repeatable.
    #[arg(long = "sticker", value_name = "EMOJI@X,Y[,SCALE[,ROT]]", value_parser = parse_sticker)]
    pub stickers: Vec<Sticker>,

    /// JSON design file with stickers, strokes, colour and notes.
    #[arg(long, value_name = "FILE.json")]
    pub design: Option<PathBuf>,

    /// Note text (at most 300 characters are kept).
    #[arg(long, conflicts_with = "notes_file")]
    pub notes: Option<String>,

    /// Read the note text from a file.
    #[arg(long, value_name = "FILE")]
    pub notes_file: Option<PathBuf>,

    /// Output file path. Defaults to <brand>-photobooth-<ms>.png in the output directory.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for the default download name (overrides the settings file).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Export scale relative to the 420px-wide layout (default 2).
    #[arg(long, value_name = "N")]
    pub scale: Option<f32>,

    /// Hand the strip to the system share handler; falls back to saving.
    #[arg(long)]
    pub share: bool,

    /// Print layout details and timing; mirror the log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the CLI and return an OS exit code.
/// `0` = strip written or shared, `1` = anything failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }
    if inputs.len() > MAX_PHOTOS {
        eprintln!(
            "warning: {} inputs given; only the first {} are used.",
            inputs.len(),
            MAX_PHOTOS
        );
    }

    let start = Instant::now();
    match run_one(&args, &inputs) {
        Ok(outcome) => {
            match &outcome {
                Outcome::Saved(path, report) => {
                    println!("{}", path.display());
                    if args.verbose {
                        print_report(report);
                    }
                }
                Outcome::Shared(ShareOutcome::Shared) => println!("shared"),
                Outcome::Shared(ShareOutcome::Cancelled) => println!("share cancelled"),
                Outcome::Shared(ShareOutcome::Downloaded(path)) => println!("{}", path.display()),
            }
            if args.verbose {
                println!("done in {:.0}ms", start.elapsed().as_secs_f64() * 1000.0);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(log) = crate::logger::log_path() {
                eprintln!("see {}", log.display());
            }
            ExitCode::FAILURE
        }
    }
}

enum Outcome {
    Saved(PathBuf, ExportReport),
    Shared(ShareOutcome),
}

// ============================================================================
// Strip pipeline
// ============================================================================

fn run_one(args: &CliArgs, inputs: &[PathBuf]) -> Result<Outcome, String> {
    // -- Step 1: Settings + fonts ------------------------------------------
    let mut settings = BoothSettings::load();
    if let Some(dir) = &args.output_dir {
        settings.output_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(scale) = args.scale {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(format!("invalid --scale {}", scale));
        }
        settings.export_scale = scale;
    }
    let fonts = Fonts::load(settings.text_font(), settings.emoji_font());
    let mut booth = Booth::new(settings, fonts, StderrNotifier);

    // -- Step 2: Capture -----------------------------------------------------
    let added = booth.upload_files(inputs);
    if added == 0 {
        return Err("none of the inputs could be read as an image".to_string());
    }
    log_info!("CLI: {} photo(s) uploaded", added);
    if !booth.finish_capture() {
        return Err("capture could not be finished".to_string());
    }
    let mut ticks = 0;
    while !booth.tick() {
        ticks += 1;
        if ticks > MAX_PRINT_TICKS {
            return Err("printing never completed".to_string());
        }
    }

    // -- Step 3: Decorate ----------------------------------------------------
    if let Some(path) = &args.design {
        let design = Design::load(path).map_err(|e| format!("design '{}': {}", path.display(), e))?;
        design.apply(booth.session_mut());
    }
    if let Some(color) = args.color {
        booth.session_mut().set_strip_color(color);
    }
    for sticker in &args.stickers {
        booth.session_mut().stickers_mut().push(sticker.clone());
    }
    if let Some(text) = read_notes(args)? {
        if text.chars().count() > crate::session::MAX_NOTE_CHARS {
            log_warn!("CLI: notes truncated to {} characters", crate::session::MAX_NOTE_CHARS);
        }
        booth.session_mut().set_notes(&text);
    }
    booth.session_mut().next();

    // -- Step 4: Deliver -----------------------------------------------------
    if args.share {
        let mut target = OsShareTarget::default();
        return booth
            .share(&mut target)
            .map(Outcome::Shared)
            .map_err(|e| format!("share failed: {}", e));
    }

    match &args.output {
        Some(path) => {
            let exported = booth.export().map_err(|e| format!("export failed: {}", e))?;
            write_bytes(&exported.png, path).map_err(|e| format!("could not write '{}': {}", path.display(), e))?;
            Ok(Outcome::Saved(path.clone(), exported.report))
        }
        None => {
            let exported = booth.export().map_err(|e| format!("export failed: {}", e))?;
            let path = booth
                .save_download(&exported.png)
                .map_err(|e| format!("download failed: {}", e))?;
            Ok(Outcome::Saved(path, exported.report))
        }
    }
}

fn read_notes(args: &CliArgs) -> Result<Option<String>, String> {
    if let Some(text) = &args.notes {
        return Ok(Some(text.clone()));
    }
    match &args.notes_file {
        Some(path) => std::fs::read_to_string(path)
            .map(|t| Some(t.trim_end_matches(['\r', '\n']).to_string()))
            .map_err(|e| format!("could not read notes '{}': {}", path.display(), e)),
        None => Ok(None),
    }
}

fn print_report(report: &ExportReport) {
    println!(
        "  {}x{} px (scale {}), strip {}x{} logical",
        report.width, report.height, report.scale, report.layout.strip.w, report.layout.strip.h
    );
    println!(
        "  photos: {} drawn, {} skipped; stickers: {} drawn, {} skipped; drawing: {}",
        report.strip.photos_drawn,
        report.strip.photos_skipped,
        report.strip.stickers_drawn,
        report.strip.stickers_skipped,
        if report.strip.drawing_applied { "yes" } else { "no" }
    );
    println!("  notes: {:?}", report.notes);
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path, used as is
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

fn parse_strip_color(s: &str) -> Result<StripColor, String> {
    s.parse()
}

/// `EMOJI@X,Y[,SCALE[,ROT]]`, e.g. `💖@60,40` or `🌸@200,300,1.5,45`.
fn parse_sticker(s: &str) -> Result<Sticker, String> {
    let (emoji, nums) = s
        .rsplit_once('@')
        .ok_or_else(|| format!("expected EMOJI@X,Y[,SCALE[,ROT]], got '{}'", s))?;
    let emoji = emoji.trim();
    if emoji.is_empty() {
        return Err(format!("sticker '{}' has no emoji", s));
    }
    let values = nums
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| format!("'{}' is not a number in sticker '{}'", v.trim(), s))
        })
        .collect::<Result<Vec<f32>, String>>()?;
    if !(2..=4).contains(&values.len()) {
        return Err(format!("sticker '{}' needs X,Y and optionally SCALE and ROT", s));
    }

    let mut sticker = Sticker::new(emoji);
    sticker.x = values[0];
    sticker.y = values[1];
    if let Some(&scale) = values.get(2) {
        if scale <= 0.0 {
            return Err(format!("sticker '{}' has a non-positive scale", s));
        }
        sticker.scale = scale;
    }
    if let Some(&rotation) = values.get(3) {
        sticker.rotation = rotation.rem_euclid(360.0);
    }
    Ok(sticker)
}
