//! Lexical path checks that keep every configured directory inside the
//! project root and out of the output directory. Nothing here touches the
//! file system: `..` and `.` are resolved purely by component arithmetic and
//! symlinks are not followed.

use crate::config::Config;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Resolves `.` and `..` components of `path` without consulting the file
/// system. A `..` directly below the root of an absolute path is dropped; a
/// leading `..` in a relative path is preserved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Joins `path` onto `root` (an absolute `path` replaces `root` entirely) and
/// normalizes the result.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    normalize(&root.join(path))
}

/// Joins a relative `path` onto `base`, returning `None` if `path` is empty,
/// absolute, or climbs out of `base`.
pub fn contained_join(base: &Path, path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() || path.has_root() {
        return None;
    }
    let base = normalize(base);
    let joined = normalize(&base.join(path));
    match joined.starts_with(&base) && joined != base {
        true => Some(joined),
        false => None,
    }
}

/// A single failed containment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The path resolves outside of the project root.
    OutsideProject { role: &'static str, path: PathBuf },

    /// The path resolves to, or inside of, the output directory.
    InsideOutput {
        role: &'static str,
        path: PathBuf,
        output: PathBuf,
    },

    /// The output directory resolves inside of the path.
    ContainsOutput {
        role: &'static str,
        path: PathBuf,
        output: PathBuf,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Violation::OutsideProject { role, path } => write!(
                f,
                "`{}` ('{}') is outside of the project directory",
                role,
                path.display()
            ),
            Violation::InsideOutput { role, path, output } => write!(
                f,
                "`{}` ('{}') is inside of the output directory '{}'",
                role,
                path.display(),
                output.display()
            ),
            Violation::ContainsOutput { role, path, output } => write!(
                f,
                "`{}` ('{}') contains the output directory '{}'",
                role,
                path.display(),
                output.display()
            ),
        }
    }
}

/// Checks `output` against `root`, then every entry of `paths` against both
/// `root` and `output`. An entry may neither sit inside `output` nor contain
/// it. All paths are checked; the returned list is empty only if everything
/// passed. Inputs are expected to be normalized.
pub fn check(
    root: &Path,
    output: (&'static str, &Path),
    paths: &[(&'static str, &Path)],
) -> Vec<Violation> {
    let (output_role, output) = output;
    let mut violations = Vec::new();
    if !output.starts_with(root) {
        violations.push(Violation::OutsideProject {
            role: output_role,
            path: output.to_owned(),
        });
    }

    for &(role, path) in paths {
        if !path.starts_with(root) {
            violations.push(Violation::OutsideProject {
                role,
                path: path.to_path_buf(),
            });
        }
        if path.starts_with(output) {
            violations.push(Violation::InsideOutput {
                role,
                path: path.to_path_buf(),
                output: output.to_owned(),
            });
        } else if output.starts_with(path) {
            violations.push(Violation::ContainsOutput {
                role,
                path: path.to_path_buf(),
                output: output.to_owned(),
            });
        }
    }
    violations
}

/// Validates every path in `config`, logging each violation. Fails if any
/// check failed.
pub fn validate(config: &Config) -> Result<()> {
    let violations = check(
        &config.project_root,
        ("outputDir", config.output_directory.as_path()),
        &[
            (
                "postSettings.postInputDir",
                config.posts_source_directory.as_path(),
            ),
            ("postSettings.postTemplate", config.posts_template.as_path()),
            (
                "staticAssetsInputDir",
                config.static_source_directory.as_path(),
            ),
            ("partialTemplatesDir", config.partials_directory.as_path()),
            (
                "additionalPageTemplatesDir",
                config.pages_source_directory.as_path(),
            ),
        ],
    );

    for violation in &violations {
        log::error!("{}", violation);
    }
    match violations.is_empty() {
        true => Ok(()),
        false => Err(Error(violations)),
    }
}

/// Returned when one or more configured paths fail validation.
#[derive(Debug, Error)]
#[error("{} configured path(s) failed validation", .0.len())]
pub struct Error(pub Vec<Violation>);

type Result<T> = std::result::Result<T, Error>;
