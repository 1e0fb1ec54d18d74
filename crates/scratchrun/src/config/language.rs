use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Base name used when a language has no filename pattern or the pattern
/// finds nothing in the source.
pub const DEFAULT_BASE_NAME: &str = "Main";

/// Configuration for a programming language
///
/// A language is a plain data record: command-line templates for the
/// pipeline stages plus editor defaults. Loaded once into the registry at
/// startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "C++ (GCC)")
    pub name: String,

    /// File extension without dot; may be empty
    pub extension: FileExtension,

    /// Project initialization command template (None: no init stage)
    #[serde(default)]
    pub init_command: Option<String>,

    /// Dependency fetch command template, invoked once per dependency
    /// marker in the source with the identifier appended as the final
    /// argument (None: markers are ignored)
    #[serde(default)]
    pub dependency_command: Option<String>,

    /// Compilation command template (None for interpreted languages)
    #[serde(default)]
    pub compile_command: Option<String>,

    /// Execution command template
    pub run_command: String,

    /// Regex whose first capture group names the program's entry point;
    /// searched over the whole source text
    #[serde(default)]
    pub filename_pattern: Option<String>,

    /// Initial editor contents
    #[serde(default)]
    pub template: String,

    /// Default standard input text
    #[serde(default)]
    pub default_input: Option<String>,
}

impl Language {
    /// Check if the language has a compile stage
    pub fn is_compiled(&self) -> bool {
        self.compile_command.is_some()
    }

    /// The extension with its leading dot, or empty when the language has
    /// no extension. This is what `$EXT` expands to.
    pub fn dotted_extension(&self) -> String {
        if self.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", self.extension)
        }
    }

    /// On-disk file name for a source file with the given base name
    pub fn file_name(&self, base_name: &str) -> String {
        format!("{base_name}{}", self.dotted_extension())
    }

    /// Derive the program's base name from its source text.
    ///
    /// Applies `filename_pattern` as a first-match search and returns its
    /// first capture group. Falls back to [`DEFAULT_BASE_NAME`] when the
    /// language has no pattern, the pattern does not match, or it captures
    /// nothing. Patterns are validated at config load, so a pattern that
    /// fails to compile here behaves like a non-matching one.
    pub fn detect_base_name(&self, source: &str) -> String {
        self.filename_pattern
            .as_deref()
            .and_then(|pattern| Regex::new(pattern).ok())
            .and_then(|re| re.captures(source))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_owned())
            .unwrap_or_else(|| DEFAULT_BASE_NAME.to_owned())
    }
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
