//! Command-line template expansion
//!
//! Turns a language's whitespace-delimited command template into an argv,
//! substituting the closed placeholder set `$CLASSPATH`, `$NAME`, `$EXT`.
//! There is deliberately no general interpolation mechanism and no escaping:
//! substituted values containing spaces are a known limitation.

use std::path::Path;

#[cfg(windows)]
const CLASSPATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const CLASSPATH_SEPARATOR: char = ':';

/// Expand a command template into an argument vector.
///
/// The template is split on whitespace into tokens; each token substitutes
/// literal occurrences of the placeholders. `extension` is the dotted form
/// (`".java"`, or `""`), so `$NAME$EXT` expands to the on-disk file name.
pub fn expand_template(
    template: &str,
    base_name: &str,
    extension: &str,
    classpath: &str,
) -> Vec<String> {
    template
        .split_whitespace()
        .map(|token| {
            token
                .replace("$CLASSPATH", classpath)
                .replace("$NAME", base_name)
                .replace("$EXT", extension)
        })
        .collect()
}

/// Build the classpath for a working directory: the directory itself (`.`)
/// plus every jar file directly inside it, joined with the platform path
/// separator.
///
/// Computed at stage launch, after any dependency stages have populated
/// the directory, so fetched jars are visible to `$CLASSPATH`.
pub async fn classpath_for(dir: &Path) -> String {
    let mut classpath = String::from(".");

    let mut jars = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.to_lowercase().ends_with(".jar") {
                jars.push(name.into_owned());
            }
        }
    }

    // Directory iteration order is platform-dependent; sort for a stable
    // classpath across runs.
    jars.sort_unstable();
    for jar in jars {
        classpath.push(CLASSPATH_SEPARATOR);
        classpath.push_str(&jar);
    }

    classpath
}
