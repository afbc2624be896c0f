use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Characters that cannot appear in a file name on at least one supported platform.
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Moves `source` to `destination`, replacing an existing destination file.
/// When a plain rename is not possible (e.g. across filesystems) the source is
/// copied next to the destination first, so a failed copy leaves the previous
/// destination in place.
pub fn relocate(source: &Path, destination: &Path) -> io::Result<()> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    let staging = staging_path(destination);
    if let Err(err) = fs::copy(source, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    if let Err(err) = fs::rename(&staging, destination) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    fs::remove_file(source)
}

fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.partial"))
}

/// `directory/file_name`, or `directory/stem (n).ext` for the first free `n`.
pub fn unique_destination(directory: &Path, file_name: &str) -> PathBuf {
    let candidate = directory.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = split_extension(file_name);
    (2..)
        .map(|n| directory.join(format!("{stem} ({n}){extension}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Replaces reserved and control characters so display text can be used as a
/// file name component.
pub fn sanitize_file_name(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|ch| {
            if RESERVED_CHARS.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();
    replaced.trim().trim_end_matches('.').to_string()
}

/// Extension of `path` including the leading dot, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(index) if index > 0 => file_name.split_at(index),
        _ => (file_name, ""),
    }
}
