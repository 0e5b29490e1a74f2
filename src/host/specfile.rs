//! Text edits on RPM spec files.

use crate::version::Version;

/// Value of the `Version:` tag, if present.
pub fn manifest_version(spec: &str) -> Option<&str> {
    spec.lines()
        .find_map(|line| line.strip_prefix("Version:"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Rewrite the tags that change with a version bump: `Version:`, a
/// non-autorelease `Release:` and the release-series directory in the
/// `Source:`/`Source0:` URL.
pub fn bump(spec: &str, old: &Version, new: &Version) -> String {
    let old_series = format!("/{}/", old.release_series());
    let new_series = format!("/{}/", new.release_series());

    spec.split_inclusive('\n')
        .map(|line| {
            if line.starts_with("Version:") {
                replace_value(line, &new.packaged())
            } else if line.starts_with("Release:") && !line.contains("autorelease") {
                replace_value(line, "0%{?dist}")
            } else if line.starts_with("Source:") || line.starts_with("Source0:") {
                line.replace(&old_series, &new_series)
            } else {
                line.to_string()
            }
        })
        .collect()
}

/// Replace the last whitespace-separated field, keeping the tag's alignment.
fn replace_value(line: &str, value: &str) -> String {
    let (body, ending) = match line.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (line, ""),
    };

    let split = body.rfind(' ').or_else(|| body.rfind('\t'));
    match split {
        Some(index) => format!("{}{value}{ending}", &body[..=index]),
        None => line.to_string(),
    }
}
