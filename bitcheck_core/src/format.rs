//! Format code to validator profile mapping
//!
//! The mapping is a static table: supporting a new format means adding a
//! row to [`FORMAT_MODES`], not a branch.

use crate::model::FormatCode;
use serde::Serialize;
use std::fmt;

/// Analysis modes of the external validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    AudioInterchange,
    Gif,
    Html,
    Jpeg,
    Pdf,
    Tiff,
    Xml,
}

impl ValidationMode {
    /// Module name passed to the validator's `-m` flag
    pub fn module(self) -> &'static str {
        match self {
            ValidationMode::AudioInterchange => "aiff-hul",
            ValidationMode::Gif => "gif-hul",
            ValidationMode::Html => "html-hul",
            ValidationMode::Jpeg => "jpeg-hul",
            ValidationMode::Pdf => "pdf-hul",
            ValidationMode::Tiff => "tiff-hul",
            ValidationMode::Xml => "xml-hul",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module())
    }
}

/// Flag that selects the validator module
pub const MODE_FLAG: &str = "-m";

// 2, 5, 7, 38 and 39 sit with 16 under the audio-interchange module as the
// registry was found; they have not been checked against the format table.
pub const FORMAT_MODES: &[(i64, ValidationMode)] = &[
    (16, ValidationMode::AudioInterchange),
    (2, ValidationMode::AudioInterchange),
    (5, ValidationMode::AudioInterchange),
    (7, ValidationMode::AudioInterchange),
    (38, ValidationMode::AudioInterchange),
    (39, ValidationMode::AudioInterchange),
    (13, ValidationMode::Gif),
    (6, ValidationMode::Html),
    (12, ValidationMode::Jpeg),
    (3, ValidationMode::Pdf),
    (15, ValidationMode::Tiff),
    (4, ValidationMode::Xml),
];

/// Look up the validator mode for a declared format
///
/// Unknown codes and assets without a declared format both return `None`,
/// which means "let the validator auto-detect".
pub fn mode_for(code: Option<FormatCode>) -> Option<ValidationMode> {
    let code = code?;
    FORMAT_MODES
        .iter()
        .find(|(known, _)| *known == code.0)
        .map(|(_, mode)| *mode)
}

/// How to invoke the validator for one asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationProfile {
    /// `None` runs the validator's own auto-detection
    pub mode: Option<ValidationMode>,
    /// Mode-specific arguments, in order
    pub tool_args: Vec<String>,
}

impl ValidationProfile {
    /// Build the profile for a declared format code
    pub fn for_format(code: Option<FormatCode>) -> Self {
        match mode_for(code) {
            Some(mode) => Self {
                mode: Some(mode),
                tool_args: vec![MODE_FLAG.to_string(), mode.module().to_string()],
            },
            None => Self::default(),
        }
    }

    /// Whether the validator is left to auto-detect
    pub fn is_auto_detect(&self) -> bool {
        self.mode.is_none()
    }
}

impl fmt::Display for ValidationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Some(mode) => write!(f, "{mode}"),
            None => f.write_str("auto-detect"),
        }
    }
}
