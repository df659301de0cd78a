//! Output-path sanitization.
//!
//! Generated commands sometimes name outputs like `outputs/result.jpg` or
//! `../parent/result.png`. All output is forced into the working directory by
//! keeping only the final path segment of the output argument.

use std::path::{Path, PathBuf};

/// Finds the index of the output-file token.
///
/// Scans right-to-left, skipping the subcommand and option flags, and picks the
/// first token containing a `.`. Commands with several positional images
/// (`composite`) may be misread; only the last such token is considered.
fn output_token_index(parts: &[&str]) -> Option<usize> {
    let base = parts.first()?;
    (1..parts.len()).rev().find(|&i| {
        let part = parts[i];
        !part.starts_with('-') && part != *base && part.contains('.')
    })
}

fn file_name_of(part: &str) -> Option<String> {
    Path::new(part)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Rewrites the output-file argument of `command` to its bare file name.
///
/// At most one token is rewritten; the tokens are then re-joined with single
/// spaces. Commands whose output token has no directory part, or that have no
/// qualifying token at all, are returned unchanged.
pub fn sanitize(command: &str) -> String {
    let parts: Vec<&str> = command.split_whitespace().collect();

    let Some(index) = output_token_index(&parts) else {
        return command.to_string();
    };

    let original = parts[index];
    let sanitized = file_name_of(original);
    match sanitized.as_deref() {
        Some(name) if name != original => {
            tracing::info!(
                original = %original,
                sanitized = %name,
                "Sanitized output path"
            );
            let mut owned: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
            owned[index] = name.to_string();
            owned.join(" ")
        }
        _ => command.to_string(),
    }
}

/// Extracts the output file of `command`, stripped of any directory part.
///
/// Uses the same heuristic as [`sanitize`]. The file is not required to exist.
pub fn extract_output_file(command: &str) -> Option<PathBuf> {
    let parts: Vec<&str> = command.split_whitespace().collect();
    let index = output_token_index(&parts)?;
    file_name_of(parts[index]).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directory() {
        assert_eq!(
            sanitize("magick input.jpg -resize 800x600 outputs/result.jpg"),
            "magick input.jpg -resize 800x600 result.jpg"
        );
    }

    #[test]
    fn test_sanitize_parent_traversal() {
        assert_eq!(
            sanitize("convert in.png -rotate 90 ../parent/result.png"),
            "convert in.png -rotate 90 result.png"
        );
    }

    #[test]
    fn test_sanitize_absolute_path() {
        assert_eq!(
            sanitize("magick in.png /tmp/out/final.webp"),
            "magick in.png final.webp"
        );
    }

    #[test]
    fn test_sanitize_identity_without_directories() {
        let command = "magick input.jpg output.jpg";
        assert_eq!(sanitize(command), command);
    }

    #[test]
    fn test_sanitize_only_rewrites_last_candidate() {
        assert_eq!(
            sanitize("composite overlays/logo.png photos/base.jpg out/result.jpg"),
            "composite overlays/logo.png photos/base.jpg result.jpg"
        );
    }

    #[test]
    fn test_sanitize_without_candidate_is_unchanged() {
        assert_eq!(sanitize("magick -version"), "magick -version");
        assert_eq!(sanitize("identify"), "identify");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_dotted_argument_shadows_input() {
        // `0x1.5` is the last dotted non-flag token, so nothing is rewritten
        let command = "magick dir/in.jpg -blur 0x1.5";
        assert_eq!(sanitize(command), command);
    }

    #[test]
    fn test_extract_simple_output() {
        assert_eq!(
            extract_output_file("magick input.jpg output.png"),
            Some(PathBuf::from("output.png"))
        );
    }

    #[test]
    fn test_extract_strips_directory() {
        assert_eq!(
            extract_output_file("magick input.jpg -quality 90 outputs/result.jpg"),
            Some(PathBuf::from("result.jpg"))
        );
    }

    #[test]
    fn test_extract_with_options() {
        assert_eq!(
            extract_output_file("magick input.jpg -resize 800x600 -quality 90 output.jpg"),
            Some(PathBuf::from("output.jpg"))
        );
    }

    #[test]
    fn test_extract_identify_points_at_input() {
        assert_eq!(
            extract_output_file("identify input.jpg"),
            Some(PathBuf::from("input.jpg"))
        );
    }

    #[test]
    fn test_extract_none_without_extension() {
        assert_eq!(extract_output_file("magick -list format"), None);
        assert_eq!(extract_output_file(""), None);
    }
}
