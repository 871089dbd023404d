//! Stored-name derivation and path-segment helpers.
//!
//! A stored name is `{unix_ts}.{ext}`, or `{unix_ts}-{n}.{ext}` when an
//! earlier submission in the same second already took the plain name. It is
//! the natural key that ties a job row to its envelope and worker reports.

use crate::error::CoreError;

/// Upper bound on collision suffixes tried for a single submission.
pub const MAX_NAME_ATTEMPTS: u32 = 64;

/// Maximum accepted length of a file extension.
const MAX_EXTENSION_LEN: usize = 16;

/// Build the stored name for `attempt` (0 = no suffix).
pub fn stored_name(unix_ts: i64, extension: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{unix_ts}.{extension}")
    } else {
        format!("{unix_ts}-{attempt}.{extension}")
    }
}

/// Extract the lowercase extension of a client-supplied filename.
///
/// Only the final path component is considered, since browsers on some
/// platforms send full paths.
pub fn file_extension(original_name: &str) -> Result<String, CoreError> {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let (stem, ext) = base.rsplit_once('.').ok_or_else(|| {
        CoreError::Validation(format!("File '{original_name}' has no extension"))
    })?;

    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(CoreError::Validation(format!(
            "File '{original_name}' has an invalid extension"
        )));
    }

    Ok(ext.to_ascii_lowercase())
}

/// File name of the rendered result for a job: the full stored name plus
/// the result extension (`1700000000.blend` -> `1700000000.blend.png`).
///
/// Stored names differing only in extension keep separate results.
pub fn result_file_name(stored_name: &str, extension: &str) -> String {
    format!("{stored_name}.{extension}")
}

/// Encode a status name for use as a URL path segment (`in progress` -> `in-progress`).
pub fn encode_status_segment(status: &str) -> String {
    status.replace(' ', "-")
}

/// Decode a status path segment back to its vocabulary name.
pub fn decode_status_segment(segment: &str) -> String {
    segment.replace('-', " ")
}

/// Reject path segments that could escape their storage directory.
pub fn validate_path_segment(segment: &str) -> Result<&str, CoreError> {
    let unsafe_segment = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);

    if unsafe_segment {
        return Err(CoreError::Validation(format!(
            "Invalid path segment '{segment}'"
        )));
    }
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn first_attempt_has_no_suffix() {
        assert_eq!(stored_name(1_700_000_000, "blend", 0), "1700000000.blend");
        assert_eq!(stored_name(1_700_000_000, "blend", 2), "1700000000-2.blend");
    }

    #[test]
    fn extension_is_lowercased_last_component() {
        assert_eq!(file_extension("temp.blend").unwrap(), "blend");
        assert_eq!(file_extension("Scene.v2.BLEND").unwrap(), "blend");
        assert_eq!(file_extension(r"C:\scenes\room.blend").unwrap(), "blend");
    }

    #[test]
    fn extension_is_required() {
        assert_matches!(file_extension("README"), Err(CoreError::Validation(_)));
        assert_matches!(file_extension(".blend"), Err(CoreError::Validation(_)));
        assert_matches!(file_extension("scene."), Err(CoreError::Validation(_)));
        assert_matches!(file_extension("scene.bl/end"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn result_names_keep_the_input_extension() {
        assert_eq!(result_file_name("1700000000.blend", "png"), "1700000000.blend.png");
        assert_ne!(
            result_file_name("1700000000.blend", "png"),
            result_file_name("1700000000.obj", "png")
        );
    }

    #[test]
    fn status_segments_swap_spaces_and_dashes() {
        assert_eq!(encode_status_segment("in progress"), "in-progress");
        assert_eq!(decode_status_segment("in-queue"), "in queue");
        assert_eq!(decode_status_segment("success"), "success");
    }

    #[test]
    fn traversal_segments_are_rejected() {
        assert!(validate_path_segment("1700000000.blend").is_ok());
        for bad in ["", ".", "..", "a/b", r"a\b"] {
            assert_matches!(validate_path_segment(bad), Err(CoreError::Validation(_)));
        }
    }
}
