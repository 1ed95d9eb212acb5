//! Font loading for the PDF report.
//!
//! `genpdf` embeds TrueType fonts, so the binary ships no text rendering of
//! its own. Fonts are searched in order: the `SALES_INSIGHTS_FONTS_DIR`
//! environment variable, an `assets/fonts` directory next to the executable,
//! and the crate's own `assets/fonts` (see `assets/fonts/README.md`).

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{self, FontData, FontFamily};

const FONT_FAMILY_NAME: &str = "Roboto";

const FONT_FILES: &[&str] = &[
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(path) = env::var("SALES_INSIGHTS_FONTS_DIR") {
        if !path.trim().is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }
    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            candidates.push(bin_dir.join("assets/fonts"));
        }
    }
    candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));
    candidates
}

fn has_all_font_files(dir: &Path) -> bool {
    FONT_FILES.iter().all(|name| dir.join(name).is_file())
}

/// Load the report font family from the first usable candidate directory.
pub fn load_font_family() -> Result<FontFamily<FontData>, Error> {
    let candidates = font_directory_candidates();
    for candidate in &candidates {
        if candidate.is_dir() && has_all_font_files(candidate) {
            return fonts::from_files(candidate, FONT_FAMILY_NAME, None);
        }
    }
    let searched = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::new(
        format!(
            "Unable to locate the {} font files. Checked: {}. \
             See assets/fonts/README.md or set SALES_INSIGHTS_FONTS_DIR.",
            FONT_FAMILY_NAME, searched
        ),
        io::Error::new(io::ErrorKind::NotFound, "font directory not found"),
    ))
}
