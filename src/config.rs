//! Loads the `wolfdog.json` manifest into a [`Manifest`], checks it against
//! the generator's [`Version`], and resolves it into a [`Config`] whose paths
//! are absolute and normalized.

use crate::guard;
use chrono::format::{Item, StrftimeItems};
use chrono::Locale;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// The manifest's file name inside a site directory.
pub const MANIFEST_FILE_NAME: &str = "wolfdog.json";

/// The site manifest as written on disk. Every field except `version` is
/// optional and falls back to a conventional default.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Manifest {
    pub version: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_static_assets_input_dir")]
    pub static_assets_input_dir: PathBuf,

    #[serde(default = "default_partial_templates_dir")]
    pub partial_templates_dir: PathBuf,

    #[serde(default = "default_additional_page_templates_dir")]
    pub additional_page_templates_dir: PathBuf,

    /// Opaque values handed to every template as `additionalValues`.
    #[serde(default = "default_additional_values")]
    pub additional_values: serde_json::Value,

    #[serde(default)]
    pub post_settings: PostSettings,
}

/// The `postSettings` group of the manifest.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PostSettings {
    pub post_input_dir: PathBuf,
    pub post_template: PathBuf,

    /// A template (same engine as the post template) rendered against each
    /// post to produce its path relative to the output directory.
    pub post_output_file_template: String,

    /// A chrono strftime string.
    pub pub_date_format: String,

    /// A POSIX locale name such as `en_US` or `fr_FR`.
    pub pub_date_locale: String,
}

impl Default for PostSettings {
    fn default() -> Self {
        PostSettings {
            post_input_dir: PathBuf::from("posts"),
            post_template: PathBuf::from("templates/post.html"),
            post_output_file_template: String::from("posts/{{.slug}}/index.html"),
            pub_date_format: String::from("%B %-d, %Y"),
            pub_date_locale: String::from("en_US"),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_static_assets_input_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_partial_templates_dir() -> PathBuf {
    PathBuf::from("templates/partials")
}

fn default_additional_page_templates_dir() -> PathBuf {
    PathBuf::from("templates/additionalPages")
}

fn default_additional_values() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl FromStr for Manifest {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl Manifest {
    /// Reads and parses the manifest at `path`.
    pub fn from_file(path: &Path) -> Result<Manifest> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Read {
            path: path.to_owned(),
            err,
        })?;
        contents.parse().map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })
    }

    /// Fails unless `generator` can build a site declaring this manifest's
    /// version.
    pub fn check_version(&self, generator: &Version) -> Result<Version> {
        let declared: Version = self.version.parse()?;
        match generator.accepts(&declared) {
            true => Ok(declared),
            false => Err(Error::IncompatibleVersion {
                manifest: declared,
                generator: *generator,
            }),
        }
    }
}

/// A `MAJOR.MINOR.REVISION` version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub revision: u64,
}

impl Version {
    /// The version of this generator.
    pub fn current() -> Result<Version> {
        env!("CARGO_PKG_VERSION").parse()
    }

    /// Returns whether a generator at this version can build a manifest
    /// declaring `manifest`. Majors must match; within a major, the generator
    /// must be at least as new as the manifest.
    pub fn accepts(&self, manifest: &Version) -> bool {
        self.major == manifest.major
            && (self.minor > manifest.minor
                || (self.minor == manifest.minor && self.revision >= manifest.revision))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::MalformedVersion(s.to_owned());
        let mut numbers = s.split('.').map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse::<u64>().map_err(|_| malformed())
        });

        let mut next = || numbers.next().unwrap_or_else(|| Err(malformed()));
        let version = Version {
            major: next()?,
            minor: next()?,
            revision: next()?,
        };
        match numbers.next() {
            None => Ok(version),
            Some(_) => Err(malformed()),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// A resolved site configuration. All paths are absolute and normalized
/// against the directory containing the manifest; they are not yet checked
/// for containment (see [`guard::validate`]).
#[derive(Debug, Clone)]
pub struct Config {
    pub project_root: PathBuf,
    pub output_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub partials_directory: PathBuf,
    pub pages_source_directory: PathBuf,
    pub posts_source_directory: PathBuf,
    pub posts_template: PathBuf,
    pub posts_output_template: String,
    pub pub_date_format: String,
    pub pub_date_locale: Locale,
    pub additional_values: serde_json::Value,
}

impl Config {
    /// Loads `wolfdog.json` from `dir` and resolves it, rejecting manifests
    /// that `generator` cannot build.
    pub fn from_directory(dir: &Path, generator: &Version) -> Result<Config> {
        let dir = std::path::absolute(dir).map_err(|err| Error::Read {
            path: dir.to_owned(),
            err,
        })?;
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        let manifest = Manifest::from_file(&manifest_path)?;
        let declared = manifest.check_version(generator)?;
        log::info!(
            "Loaded manifest '{}' (version {})",
            manifest_path.display(),
            declared
        );
        Config::from_manifest(&guard::normalize(&dir), manifest)
    }

    /// Resolves `manifest` against `project_root`, which must be absolute.
    pub fn from_manifest(project_root: &Path, manifest: Manifest) -> Result<Config> {
        let settings = manifest.post_settings;
        let pub_date_locale = Locale::try_from(settings.pub_date_locale.as_str())
            .map_err(|_| Error::InvalidField {
                field: "postSettings.pubDateLocale",
                message: format!("unknown locale '{}'", settings.pub_date_locale),
            })?;
        if StrftimeItems::new(&settings.pub_date_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidField {
                field: "postSettings.pubDateFormat",
                message: format!("invalid format string '{}'", settings.pub_date_format),
            });
        }

        let resolve = |path: &Path| guard::resolve(project_root, path);
        Ok(Config {
            project_root: project_root.to_owned(),
            output_directory: resolve(&manifest.output_dir),
            static_source_directory: resolve(&manifest.static_assets_input_dir),
            partials_directory: resolve(&manifest.partial_templates_dir),
            pages_source_directory: resolve(&manifest.additional_page_templates_dir),
            posts_source_directory: resolve(&settings.post_input_dir),
            posts_template: resolve(&settings.post_template),
            posts_output_template: settings.post_output_file_template,
            pub_date_format: settings.pub_date_format,
            pub_date_locale,
            additional_values: manifest.additional_values,
        })
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for loading a manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the manifest file can't be read.
    #[error("Reading manifest '{}': {}", .path.display(), .err)]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for malformed JSON, missing required fields, unknown keys,
    /// and values of the wrong type.
    #[error("Parsing manifest '{}': {}", .path.display(), .err)]
    Parse {
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },

    /// Returned for well-typed fields with unusable values.
    #[error("Invalid manifest field `{field}`: {message}")]
    InvalidField { field: &'static str, message: String },

    /// Returned for version strings that aren't three dot-separated
    /// non-negative integers.
    #[error("Malformed version '{0}': expected MAJOR.MINOR.REVISION")]
    MalformedVersion(String),

    /// Returned when the manifest requires a newer or different-major
    /// generator.
    #[error("Manifest version {manifest} is not compatible with wolfdog {generator}")]
    IncompatibleVersion { manifest: Version, generator: Version },
}
