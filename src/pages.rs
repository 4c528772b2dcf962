//! Walks the additional-pages directory and renders every template file in
//! it into the output tree, mirroring the directory structure. A file named
//! `about/index.html.tpl` is rendered to `<output>/about/index.html`. Files
//! without the template suffix are logged and skipped.

use crate::partials::Partials;
use crate::util::render;
use gtmpl::Value;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The suffix marking a file as a template. Compared case-insensitively.
pub const TEMPLATE_SUFFIX: &str = ".tpl";

/// An input path paired with the output path it mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageWalkTask {
    input: PathBuf,
    output: PathBuf,
}

/// Renders additional pages against a single shared scope.
pub struct PageWalker<'a> {
    partials: &'a Partials,

    /// The all-pages scope (`{allPosts, additionalValues, generatorTag}`).
    scope: &'a Value,
}

impl<'a> PageWalker<'a> {
    pub fn new(partials: &'a Partials, scope: &'a Value) -> PageWalker<'a> {
        PageWalker { partials, scope }
    }

    /// Renders every template under `input_root` into `output_root`,
    /// returning how many pages were written. A missing `input_root` yields
    /// zero pages. Siblings are visited in lexical order, breadth first.
    pub fn write_pages(&self, input_root: &Path, output_root: &Path) -> Result<usize> {
        if !input_root.exists() {
            log::info!(
                "No additional pages directory at '{}'; rendering no pages",
                input_root.display()
            );
            return Ok(0);
        }

        let mut rendered = 0;
        let mut queue = VecDeque::new();
        queue.extend(children(input_root, output_root)?);
        while let Some(task) = queue.pop_front() {
            let file_type = std::fs::symlink_metadata(&task.input)
                .map_err(|err| Error::Read {
                    path: task.input.clone(),
                    err,
                })?
                .file_type();

            if file_type.is_dir() {
                queue.extend(children(&task.input, &task.output)?);
            } else if file_type.is_file() || task.input.is_file() {
                if self.write_page(&task)? {
                    rendered += 1;
                }
            } else {
                log::warn!("Ignoring '{}': not a regular file", task.input.display());
            }
        }

        log::info!("Rendered {} additional page(s)", rendered);
        Ok(rendered)
    }

    /// Renders a single file if it carries the template suffix. Returns
    /// whether a page was written.
    fn write_page(&self, task: &PageWalkTask) -> Result<bool> {
        let output = match strip_template_suffix(&task.output) {
            Some(output) => output,
            None => {
                log::warn!(
                    "Ignoring '{}': not a `{}` template",
                    task.input.display(),
                    TEMPLATE_SUFFIX
                );
                return Ok(false);
            }
        };

        let text = std::fs::read_to_string(&task.input).map_err(|err| Error::Read {
            path: task.input.clone(),
            err,
        })?;
        let template = self
            .partials
            .compile(&text)
            .map_err(|message| Error::Template {
                path: task.input.clone(),
                message,
            })?;
        let page = render(&template, self.scope.clone()).map_err(|message| Error::Template {
            path: task.input.clone(),
            message,
        })?;

        let io_error = |err: std::io::Error| Error::Write {
            path: output.clone(),
            err,
        };
        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir).map_err(io_error)?;
        }
        std::fs::write(&output, page).map_err(io_error)?;
        log::debug!(
            "Rendered '{}' to '{}'",
            task.input.display(),
            output.display()
        );
        Ok(true)
    }
}

/// Lists the children of `input` as tasks mirrored under `output`, sorted by
/// file name.
fn children(input: &Path, output: &Path) -> Result<Vec<PageWalkTask>> {
    let read_error = |err: std::io::Error| Error::Read {
        path: input.to_owned(),
        err,
    };
    let mut names = std::fs::read_dir(input)
        .map_err(read_error)?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<std::io::Result<Vec<OsString>>>()
        .map_err(read_error)?;
    names.sort();

    Ok(names
        .into_iter()
        .map(|name| PageWalkTask {
            input: input.join(&name),
            output: output.join(&name),
        })
        .collect())
}

/// Strips [`TEMPLATE_SUFFIX`] from the file name of `path`, ignoring ASCII
/// case. Returns `None` if the suffix is absent or nothing would remain of
/// the file name.
pub fn strip_template_suffix(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let split = name.len().checked_sub(TEMPLATE_SUFFIX.len())?;
    let suffix = name.get(split..)?;
    match split > 0 && suffix.eq_ignore_ascii_case(TEMPLATE_SUFFIX) {
        true => Some(path.with_file_name(&name[..split])),
        false => None,
    }
}

/// The result of a fallible page-walking operation.
type Result<T> = std::result::Result<T, Error>;

/// The error type for rendering additional pages.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a directory or template file can't be read.
    #[error("Reading '{}': {}", .path.display(), .err)]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a page template fails to parse or render.
    #[error("Rendering page '{}': {message}", .path.display())]
    Template { path: PathBuf, message: String },

    /// Returned when a rendered page can't be written.
    #[error("Writing page '{}': {}", .path.display(), .err)]
    Write {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
