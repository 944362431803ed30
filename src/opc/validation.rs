//! OPC part name utilities

use crate::error::{Error, Result};

/// Validate OPC part name according to OPC specification constraints
pub(crate) fn validate_opc_part_name(part_name: &str) -> Result<()> {
    // Non-ASCII part names are accepted: the spec wants them percent-encoded
    // but Bambu Studio writes plain UTF-8 object names.

    if part_name.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidPackage(format!(
            "Part name cannot contain control characters: {}",
            part_name.escape_debug()
        )));
    }

    if part_name.contains('#') {
        return Err(Error::InvalidPackage(format!(
            "Part name cannot contain fragment identifier: {}",
            part_name
        )));
    }

    if part_name.contains('?') {
        return Err(Error::InvalidPackage(format!(
            "Part name cannot contain query string: {}",
            part_name
        )));
    }

    for (idx, segment) in part_name.split('/').enumerate() {
        if segment.is_empty() {
            // Allow leading slash (which creates empty first segment)
            if idx == 0 && part_name.starts_with('/') {
                continue;
            }
            return Err(Error::InvalidPackage(format!(
                "Part name cannot contain empty path segments: {}",
                part_name
            )));
        }

        if segment == "." || segment == ".." {
            return Err(Error::InvalidPackage(format!(
                "Part name cannot contain '.' or '..' segments: {}",
                part_name
            )));
        }

        if segment.ends_with('.') {
            return Err(Error::InvalidPackage(format!(
                "Part name segments cannot end with '.': {}",
                part_name
            )));
        }
    }

    Ok(())
}

/// Normalize OPC path by removing leading slash
pub(crate) fn normalize_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Key used to compare part names (OPC part names are ASCII case-insensitive)
pub(crate) fn part_key(path: &str) -> String {
    normalize_path(path).to_ascii_lowercase()
}
