//! ImageMagick installation detection.

use imagent_core::{ImagentError, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

const INSTALL_HINT: &str = "ImageMagick is not installed. Please install it:\n  \
    Ubuntu/Debian: sudo apt-get install imagemagick\n  \
    macOS: brew install imagemagick\n  \
    Windows: https://imagemagick.org/script/download.php";

/// The ImageMagick entry point found on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageMagickBinary {
    /// ImageMagick 7+ unified `magick` binary.
    Magick,
    /// ImageMagick 6 legacy tools (`convert`, `identify`, ...).
    Convert,
}

impl ImageMagickBinary {
    /// The command name used in generated commands and prompts.
    pub fn command_name(&self) -> &'static str {
        match self {
            ImageMagickBinary::Magick => "magick",
            ImageMagickBinary::Convert => "convert",
        }
    }

    /// Program and optional subcommand for the metadata-inspection entry point.
    pub(crate) fn identify_invocation(&self) -> (&'static str, Option<&'static str>) {
        match self {
            ImageMagickBinary::Magick => ("magick", Some("identify")),
            ImageMagickBinary::Convert => ("identify", None),
        }
    }

    /// Detects the installed binary using `lookup` to test for a program
    /// name. `magick` is preferred over `convert`.
    pub fn detect_with(lookup: impl Fn(&str) -> bool) -> Result<Self> {
        if lookup("magick") {
            return Ok(ImageMagickBinary::Magick);
        }
        if lookup("convert") {
            return Ok(ImageMagickBinary::Convert);
        }
        Err(ImagentError::config(INSTALL_HINT))
    }

    /// Detects the installed binary on the process `PATH`.
    pub fn detect() -> Result<Self> {
        Self::detect_with(|name| which::which(name).is_ok())
    }

    /// Detects the installed binary on an explicit search path.
    pub fn detect_in(search_path: &OsString, cwd: &Path) -> Result<Self> {
        Self::detect_with(|name| which::which_in(name, Some(search_path), cwd).is_ok())
    }
}

impl fmt::Display for ImageMagickBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_magick_v7() {
        let binary = ImageMagickBinary::detect_with(|cmd| cmd == "magick").unwrap();
        assert_eq!(binary, ImageMagickBinary::Magick);
    }

    #[test]
    fn test_detect_convert_v6() {
        let binary = ImageMagickBinary::detect_with(|cmd| cmd == "convert").unwrap();
        assert_eq!(binary, ImageMagickBinary::Convert);
        assert_eq!(binary.command_name(), "convert");
    }

    #[test]
    fn test_prefer_magick_over_convert() {
        let binary = ImageMagickBinary::detect_with(|_| true).unwrap();
        assert_eq!(binary, ImageMagickBinary::Magick);
    }

    #[test]
    fn test_not_installed_is_config_error() {
        let err = ImageMagickBinary::detect_with(|_| false).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ImageMagick is not installed"));
    }

    #[test]
    fn test_identify_invocation() {
        assert_eq!(
            ImageMagickBinary::Magick.identify_invocation(),
            ("magick", Some("identify"))
        );
        assert_eq!(
            ImageMagickBinary::Convert.identify_invocation(),
            ("identify", None)
        );
    }
}
