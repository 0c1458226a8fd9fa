//! Validation utilities shared across the classification core.
//!
//! Provides validation functions and regex patterns for common scenarios.

use crate::error::MediaButlerError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Video and subtitle extensions the core recognizes
pub const KNOWN_MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "flv", "webm", "ts", "m2ts", "srt", "sub", "ass",
    "vtt",
];

/// Separator run: dots, underscores, hyphens, whitespace
pub static SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[._\-\s]+").expect("Failed to compile separator regex"));

/// Validate a filename is non-empty after trimming
///
/// # Examples
///
/// ```
/// use media_butler_core::validation::validate_filename;
///
/// assert!(validate_filename("Breaking.Bad.S01E01.mkv").is_ok());
/// assert!(validate_filename("   ").is_err());
/// ```
pub fn validate_filename(filename: &str) -> Result<(), MediaButlerError> {
    if filename.trim().is_empty() {
        Err(MediaButlerError::InvalidFilename {
            reason: "filename is empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate a confidence value is within [0.0, 1.0]
///
/// # Examples
///
/// ```
/// use media_butler_core::validation::validate_confidence;
///
/// assert!(validate_confidence(0.85).is_ok());
/// assert!(validate_confidence(1.0).is_ok());
/// assert!(validate_confidence(-0.1).is_err());
/// assert!(validate_confidence(1.1).is_err());
/// ```
pub fn validate_confidence(confidence: f64) -> Result<(), MediaButlerError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(MediaButlerError::validation_field(
            format!("Confidence must be between 0.0 and 1.0, got {confidence}"),
            "confidence",
        ))
    }
}

/// Validate train/validation split ratios
///
/// # Examples
///
/// ```
/// use media_butler_core::validation::validate_split_ratios;
///
/// assert!(validate_split_ratios(0.7, 0.2).is_ok());
/// assert!(validate_split_ratios(0.8, 0.2).is_err());
/// assert!(validate_split_ratios(0.0, 0.2).is_err());
/// ```
pub fn validate_split_ratios(train: f64, validation: f64) -> Result<(), MediaButlerError> {
    if train > 0.0 && validation > 0.0 && train + validation < 1.0 {
        Ok(())
    } else {
        Err(MediaButlerError::InvalidRatios { train, validation })
    }
}

/// True when the extension (without dot) is a recognized media extension
///
/// # Examples
///
/// ```
/// use media_butler_core::validation::is_known_media_extension;
///
/// assert!(is_known_media_extension("mkv"));
/// assert!(is_known_media_extension("SRT"));
/// assert!(!is_known_media_extension("exe"));
/// ```
pub fn is_known_media_extension(extension: &str) -> bool {
    let lower = extension.to_ascii_lowercase();
    KNOWN_MEDIA_EXTENSIONS.contains(&lower.as_str())
}

/// Validate a string length is within bounds
pub fn validate_string_length(
    value: &str,
    field: &str,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), MediaButlerError> {
    let len = value.chars().count();

    if let Some(min_len) = min {
        if len < min_len {
            return Err(MediaButlerError::validation_field(
                format!("Field '{field}' must be at least {min_len} characters, got {len}"),
                field,
            ));
        }
    }

    if let Some(max_len) = max {
        if len > max_len {
            return Err(MediaButlerError::validation_field(
                format!("Field '{field}' must be at most {max_len} characters, got {len}"),
                field,
            ));
        }
    }

    Ok(())
}

/// Validate a slice is not empty
pub fn validate_not_empty<T>(values: &[T], field: &str) -> Result<(), MediaButlerError> {
    if values.is_empty() {
        Err(MediaButlerError::validation_field(
            format!("Field '{field}' must not be empty"),
            field,
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_validation() {
        assert!(validate_filename("show.mkv").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("  \t ").is_err());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(validate_confidence(0.0).is_ok());
        assert!(validate_confidence(0.5).is_ok());
        assert!(validate_confidence(1.0).is_ok());
        assert!(validate_confidence(1.000001).is_err());
        assert!(validate_confidence(-0.000001).is_err());
    }

    #[test]
    fn test_split_ratio_bounds() {
        assert!(validate_split_ratios(0.7, 0.2).is_ok());
        assert!(validate_split_ratios(0.5, 0.49).is_ok());
        assert!(validate_split_ratios(0.5, 0.5).is_err());
        assert!(validate_split_ratios(-0.1, 0.2).is_err());
        assert!(validate_split_ratios(0.7, 0.0).is_err());
    }

    #[test]
    fn test_known_extensions() {
        for ext in ["mkv", "mp4", "avi", "srt", "ass"] {
            assert!(is_known_media_extension(ext), "{ext} should be known");
        }
        assert!(is_known_media_extension("MKV"));
        assert!(!is_known_media_extension("txt"));
        assert!(!is_known_media_extension(""));
    }

    #[test]
    fn test_separator_regex() {
        let collapsed = SEPARATOR_REGEX.replace_all("a.b_c-d  e", " ");
        assert_eq!(collapsed, "a b c d e");
    }

    #[test]
    fn test_string_length_validation() {
        assert!(validate_string_length("hello", "test", Some(1), Some(10)).is_ok());
        assert!(validate_string_length("hi", "test", Some(5), None).is_err());
        assert!(validate_string_length("too long value", "test", None, Some(5)).is_err());
    }

    #[test]
    fn test_not_empty_validation() {
        assert!(validate_not_empty(&[1, 2, 3], "test").is_ok());
        let empty: Vec<i32> = vec![];
        assert!(validate_not_empty(&empty, "test").is_err());
    }
}
