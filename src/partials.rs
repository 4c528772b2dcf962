//! Defines the [`Partials`] registry. Every file under the partials directory
//! becomes a named template fragment that any page or post template can
//! include with `{{template "name" .}}`, where `name` is the file's path
//! relative to the partials directory using `/` separators.
//!
//! The registry is built once per run and passed explicitly to everything
//! that compiles templates; there is no process-wide template state.

use gtmpl::Template;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Default, Clone)]
pub struct Partials {
    partials: BTreeMap<String, String>,
}

impl Partials {
    /// Loads every file under `dir`. A missing directory yields an empty
    /// registry.
    pub fn load(dir: &Path) -> Result<Partials> {
        let mut partials = Partials::default();
        if !dir.exists() {
            log::info!(
                "No partials directory at '{}'; registering no partials",
                dir.display()
            );
            return Ok(partials);
        }

        for result in WalkDir::new(dir).sort_by_file_name() {
            let entry = result?;
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            let name = partial_name(dir, path).ok_or_else(|| Error::Name(path.to_owned()))?;
            let body = std::fs::read_to_string(path).map_err(|err| Error::Read {
                path: path.to_owned(),
                err,
            })?;
            log::debug!("Registering partial '{}'", name);
            partials.register(name, body);
        }

        log::info!("Registered {} partial(s)", partials.len());
        Ok(partials)
    }

    /// Registers `body` under `name`, replacing any partial of the same name.
    pub fn register(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.partials.insert(name.into(), body.into());
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partials.keys().map(String::as_str)
    }

    /// Compiles `text` into a template that can reference every registered
    /// partial, including partials referenced only from other partials.
    pub fn compile(&self, text: &str) -> std::result::Result<Template, String> {
        let mut contents = String::new();
        for (name, body) in &self.partials {
            // Writing to a `String` can't fail.
            let _ = write!(
                contents,
                "{{{{define \"{}\"}}}}{}{{{{end}}}}",
                escape_name(name),
                body
            );
        }
        contents.push_str(text);

        let mut template = Template::default();
        template.parse(contents)?;
        Ok(template)
    }
}

/// The registered name of the partial at `path`: its path relative to `dir`
/// with `/` separators. `None` if the path isn't valid UTF-8.
fn partial_name(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()?;
    Some(segments.join("/"))
}

fn escape_name(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The result of a fallible partial-loading operation.
type Result<T> = std::result::Result<T, Error>;

/// The error type for loading partials.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the partials directory can't be walked.
    #[error("Walking partials directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Returned when a partial file can't be read.
    #[error("Reading partial '{}': {}", .path.display(), .err)]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for partial paths that aren't valid UTF-8.
    #[error("Partial path '{}' is not valid UTF-8", .0.display())]
    Name(PathBuf),
}
