//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site, strictly in order:
//!
//! 1. Validating every configured path ([`crate::guard`])
//! 2. Copying the static assets into the output directory
//! 3. Parsing the posts ([`crate::parser`])
//! 4. Registering partials ([`crate::partials`])
//! 5. Rendering post pages ([`crate::write`])
//! 6. Rendering additional pages ([`crate::pages`])
//!
//! The pipeline isn't transactional: files written before a failure stay on
//! disk.

use crate::config::{Config, Error as ConfigError, Version};
use crate::guard::{self, Error as GuardError};
use crate::pages::{Error as PagesError, PageWalker};
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::partials::{Error as PartialsError, Partials};
use crate::value::{Error as ScopeError, ScopeBuilder};
use crate::write::{Error as WriteError, Writer};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Counts of what a successful build produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub static_files: usize,
    pub posts: usize,
    pub partials: usize,
    pub pages: usize,
}

/// Loads the manifest from `site_directory` and builds the site it
/// describes.
pub fn build_directory(site_directory: &Path) -> Result<Summary> {
    let config = Config::from_directory(site_directory, &Version::current()?)?;
    build_site(&config)
}

/// Builds the site from a [`Config`] object. Nothing is written unless every
/// configured path passes [`guard::validate`].
pub fn build_site(config: &Config) -> Result<Summary> {
    guard::validate(config)?;

    let static_files = copy_dir(&config.static_source_directory, &config.output_directory)?;

    // collect all posts
    let posts = PostParser::new(&config.posts_source_directory).parse_posts()?;

    // Partials must all be registered before any template is compiled.
    let partials = Partials::load(&config.partials_directory)?;

    let scopes = ScopeBuilder::new(config);
    let post_scopes = scopes.post_scopes(&posts)?;

    let writer = Writer::new(
        &partials,
        &config.posts_template,
        &config.posts_output_template,
        &config.output_directory,
        &scopes,
    )?;
    writer.write_posts(&posts, &post_scopes)?;

    let all_pages = scopes.all_pages_scope(&post_scopes);
    let pages = PageWalker::new(&partials, &all_pages)
        .write_pages(&config.pages_source_directory, &config.output_directory)?;

    Ok(Summary {
        static_files,
        posts: posts.len(),
        partials: partials.len(),
        pages,
    })
}

/// Mirrors every file under `src` into `dst`, returning the number of files
/// copied. A missing `src` copies nothing.
fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    if !src.exists() {
        log::info!(
            "No static assets directory at '{}'; copying nothing",
            src.display()
        );
        return Ok(0);
    }

    let mut copied = 0;
    for result in WalkDir::new(src).sort_by_file_name() {
        let entry = result?;
        // `strip_prefix` can't fail; every entry lives under `src`.
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        let copy_error = |err: std::io::Error| Error::Copy {
            src: entry.path().to_owned(),
            dst: target.clone(),
            err,
        };
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(copy_error)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(copy_error)?;
            copied += 1;
        }
    }

    log::info!("Copied {} static file(s)", copied);
    Ok(copied)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Each pipeline stage contributes its
/// own variant.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for manifest loading and version problems.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Returned when configured paths escape the project or overlap the
    /// output directory.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Returned for errors discovering, pairing, or parsing posts.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Returned for errors loading partials.
    #[error(transparent)]
    Partials(#[from] PartialsError),

    /// Returned for errors building template scopes.
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Returned for errors rendering or writing post pages.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Returned for errors rendering or writing additional pages.
    #[error(transparent)]
    Pages(#[from] PagesError),

    /// Returned when the static assets directory can't be walked.
    #[error("Walking static assets directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Returned when a static asset can't be copied.
    #[error("Copying '{}' to '{}': {}", .src.display(), .dst.display(), .err)]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_mirrors_tree() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("static");
        fs::create_dir_all(src.join("css/vendor")).unwrap();
        fs::write(src.join("robots.txt"), "ok").unwrap();
        fs::write(src.join("css/vendor/reset.css"), "*{}").unwrap();

        let dst = tmp.path().join("dist");
        assert_eq!(copy_dir(&src, &dst).unwrap(), 2);
        assert_eq!(fs::read_to_string(dst.join("robots.txt")).unwrap(), "ok");
        assert_eq!(
            fs::read_to_string(dst.join("css/vendor/reset.css")).unwrap(),
            "*{}"
        );
    }

    #[test]
    fn test_copy_dir_missing_source() {
        let tmp = TempDir::new().unwrap();
        let dst = tmp.path().join("dist");
        assert_eq!(copy_dir(&tmp.path().join("static"), &dst).unwrap(), 0);
        assert!(!dst.exists());
    }
}
