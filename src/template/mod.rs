//! Container template names
//!
//! PVE ships LXC templates with names of the form
//! `<os>-<os_version>-<name>_<os_version2>_<arch><extension>`, for example
//! `debian-10.0-standard_10.0-1_amd64.tar.gz`. The create request needs the
//! components to rebuild the template's storage path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PveError, Result};

/// A template name split into its components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTemplate {
    pub os: String,
    pub os_version: String,
    pub name: String,
    pub os_version2: String,
    pub arch: String,
    /// Everything after the architecture, including the leading dot
    pub extension: String,
}

impl fmt::Display for ParsedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}_{}_{}{}",
            self.os, self.os_version, self.name, self.os_version2, self.arch, self.extension
        )
    }
}

impl std::str::FromStr for ParsedTemplate {
    type Err = PveError;

    fn from_str(s: &str) -> Result<Self> {
        parse_template(s)
    }
}

/// Parse a template file name or volume id (`templates:vztmpl/<file>`)
pub fn parse_template(input: &str) -> Result<ParsedTemplate> {
    let file = input.rsplit('/').next().unwrap_or(input);
    let invalid = || PveError::Validation(format!("not a template name: {}", input));

    let (os, rest) = file.split_once('-').ok_or_else(invalid)?;
    let (os_version, rest) = rest.split_once('-').ok_or_else(invalid)?;
    let (name, rest) = rest.split_once('_').ok_or_else(invalid)?;
    let (os_version2, rest) = rest.split_once('_').ok_or_else(invalid)?;
    let dot = rest.find('.').ok_or_else(invalid)?;
    let (arch, extension) = rest.split_at(dot);

    let parsed = ParsedTemplate {
        os: os.to_string(),
        os_version: os_version.to_string(),
        name: name.to_string(),
        os_version2: os_version2.to_string(),
        arch: arch.to_string(),
        extension: extension.to_string(),
    };

    let components = [
        &parsed.os,
        &parsed.os_version,
        &parsed.name,
        &parsed.os_version2,
        &parsed.arch,
    ];
    if components.iter().any(|c| c.is_empty()) || parsed.extension.len() < 2 {
        return Err(invalid());
    }

    Ok(parsed)
}

/// An entry of a storage content listing (templates, ISOs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageContent {
    pub content: String,
    pub volid: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub size: u64,
}

impl StorageContent {
    /// Parse the volume id as a template name
    pub fn parsed_template(&self) -> Result<ParsedTemplate> {
        parse_template(&self.volid)
    }
}
