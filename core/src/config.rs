//! Configuration.

use crate::Error;
use crate::ErrorSource;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

/// Filename of a genmethods config.
pub const FILENAME: &str = "Genmethods.toml";

/// Package to generate methods for when none is specified.
pub const DEFAULT_PACKAGE: &str = "github.com/jupiterrider/purego-sdl3/sdl";

static DEFAULT_RECEIVERS: &[&str] = &[
    "Camera", "Cursor", "Renderer", "Surface", "Texture", "Window",
];

static DEFAULT_RENAME: &[(&str, &str)] = &[
    // Camera methods
    ("AcquireCameraFrame", "AcquireFrame"),
    ("CloseCamera", "Close"),
    ("ReleaseCameraFrame", "ReleaseFrame"),
    // Cursor methods
    ("DestroyCursor", "Destroy"),
    // Renderer methods
    ("GetRendererName", "GetName"),
    ("DestroyRenderer", "Destroy"),
    ("RenderClear", "Clear"),
    ("RenderPresent", "Present"),
    ("SetRenderDrawColor", "SetDrawColor"),
    ("SetRenderVSync", "SetVSync"),
    // Surface methods
    ("BlitSurface", "Blit"),
    ("DestroySurface", "Destroy"),
    ("LockSurface", "Lock"),
    ("UnlockSurface", "Unlock"),
    // Texture methods
    ("DestroyTexture", "Destroy"),
    // Window methods
    ("DestroyWindow", "Destroy"),
    ("GetWindowSize", "GetSize"),
    ("GetWindowSurface", "GetSurface"),
    ("HideWindow", "Hide"),
    ("SetWindowSize", "SetSize"),
    ("ShowWindow", "Show"),
    ("UpdateWindowSurface", "UpdateSurface"),
];

/// `Genmethods.toml`.
///
/// Every field falls back to the tables for the purego-sdl3 bindings.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Go import path or directory of the package.
    pub package: String,

    /// Canonical types allowed as receivers, e.g. `*github.com/jupiterrider/purego-sdl3/sdl.Window`.
    pub receivers: BTreeSet<String>,

    /// Method names keyed by the names of the functions they wrap.
    pub rename: BTreeMap<String, String>,
}

impl Config {
    /// Reads config from filesystem.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| Error::new(path, ErrorSource::ReadConfig(err)))?;
        toml::from_str(&raw).map_err(|err| Error::new(path, ErrorSource::Config(err)))
    }

    /// Reads config from filesystem, or returns a default config if the file is not found.
    pub fn read_or_default(path: &Path) -> Result<Self, Error> {
        if path.is_file() {
            Self::read(path)
        } else {
            log::debug!("No config at `{}`, using defaults", path.display());
            Ok(Default::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package: DEFAULT_PACKAGE.into(),
            receivers: DEFAULT_RECEIVERS
                .iter()
                .map(|name| format!("*{}.{}", DEFAULT_PACKAGE, name))
                .collect(),
            rename: DEFAULT_RENAME
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}
