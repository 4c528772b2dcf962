//! Renders every [`SitePost`] through the post template and writes it to the
//! path produced by the output-path template.

use crate::guard;
use crate::partials::Partials;
use crate::post::SitePost;
use crate::util::render;
use crate::value::ScopeBuilder;
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Responsible for templating and writing post pages to disk.
pub struct Writer<'a> {
    /// The template for post pages, rendered against
    /// `{post, additionalValues, generatorTag}`.
    posts_template: Template,

    /// The template producing each post's output path, relative to
    /// `output_directory`, rendered against the per-post scope.
    output_path_template: Template,

    /// The root of the output tree.
    output_directory: &'a Path,

    scopes: &'a ScopeBuilder,
}

impl<'a> Writer<'a> {
    /// Compiles the post template at `posts_template` and the
    /// `output_path_template` string, both with access to `partials`.
    pub fn new(
        partials: &Partials,
        posts_template: &Path,
        output_path_template: &str,
        output_directory: &'a Path,
        scopes: &'a ScopeBuilder,
    ) -> Result<Writer<'a>> {
        let text = std::fs::read_to_string(posts_template).map_err(|err| {
            Error::OpenTemplateFile {
                path: posts_template.to_owned(),
                err,
            }
        })?;
        let posts_template_path = posts_template;
        let posts_template = partials.compile(&text).map_err(|message| Error::ParseTemplate {
            name: posts_template_path.display().to_string(),
            message,
        })?;
        let output_path_template =
            partials
                .compile(output_path_template)
                .map_err(|message| Error::ParseTemplate {
                    name: format!("postOutputFileTemplate ({})", output_path_template),
                    message,
                })?;

        Ok(Writer {
            posts_template,
            output_path_template,
            output_directory,
            scopes,
        })
    }

    /// Writes every post. `post_scopes` must line up with `posts` index for
    /// index (see [`ScopeBuilder::post_scopes`]). Stops at the first failure,
    /// including a post whose output path was already written by another.
    pub fn write_posts(&self, posts: &[SitePost], post_scopes: &[Value]) -> Result<usize> {
        // output path -> slug of the post written there
        let mut written: HashMap<PathBuf, String> = HashMap::new();
        for (post, scope) in posts.iter().zip(post_scopes) {
            self.write_post(post, scope, &mut written)?;
        }
        log::info!("Rendered {} post(s)", posts.len());
        Ok(posts.len())
    }

    /// Renders a single post and writes it to disk, recording its path in
    /// `written`.
    fn write_post(
        &self,
        post: &SitePost,
        scope: &Value,
        written: &mut HashMap<PathBuf, String>,
    ) -> Result<()> {
        let page = render(&self.posts_template, self.scopes.post_page_scope(scope)).map_err(
            |message| Error::Render {
                slug: post.slug.clone(),
                message,
            },
        )?;

        let relative = render(&self.output_path_template, scope.clone())
            .map_err(|message| Error::RenderPath {
                slug: post.slug.clone(),
                message,
            })
            .and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| Error::RenderPath {
                    slug: post.slug.clone(),
                    message: e.to_string(),
                })
            })?;
        let relative = relative.trim();
        let file_path = guard::contained_join(self.output_directory, Path::new(relative))
            .ok_or_else(|| Error::OutputPath {
                slug: post.slug.clone(),
                path: relative.to_owned(),
            })?;
        if let Some(other) = written.get(&file_path) {
            return Err(Error::DuplicateOutputPath {
                slug: post.slug.clone(),
                other: other.clone(),
                path: file_path,
            });
        }

        let io_error = |err: std::io::Error| Error::Io {
            slug: post.slug.clone(),
            path: file_path.clone(),
            err,
        };
        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir).map_err(io_error)?;
        }
        std::fs::write(&file_path, page).map_err(io_error)?;
        log::debug!("Wrote post '{}' to '{}'", post.slug, file_path.display());
        written.insert(file_path, post.slug.clone());
        Ok(())
    }
}

/// The result of a fallible post-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a post-writing operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the post template file can't be read.
    #[error("Opening template file '{}': {}", .path.display(), .err)]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a template doesn't parse.
    #[error("Parsing template {name}: {message}")]
    ParseTemplate { name: String, message: String },

    /// Returned when the post template fails to render for a post.
    #[error("Rendering post '{slug}': {message}")]
    Render { slug: String, message: String },

    /// Returned when the output-path template fails to render for a post.
    #[error("Rendering output path of post '{slug}': {message}")]
    RenderPath { slug: String, message: String },

    /// Returned when a rendered output path is empty, absolute, or leaves the
    /// output directory.
    #[error("Output path '{path}' of post '{slug}' is not inside the output directory")]
    OutputPath { slug: String, path: String },

    /// Returned when two posts render to the same output path.
    #[error("Post '{slug}' and post '{other}' both render to '{}'", .path.display())]
    DuplicateOutputPath {
        slug: String,
        other: String,
        path: PathBuf,
    },

    /// Returned when a post's output file or its directories can't be
    /// written.
    #[error("Writing post '{slug}' to '{}': {}", .path.display(), .err)]
    Io {
        slug: String,
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
