//! Builds the post corpus: walks the posts directory, pairs content files with
//! metadata files by slug, parses the metadata, and orders the result newest
//! first. Pairing problems are collected exhaustively into a
//! [`PairingReport`] so a single run shows every orphaned, unrecognized, or
//! colliding file.

use crate::post::{PostMetadata, SitePost};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// The extension of post content files.
pub const CONTENT_EXTENSION: &str = "html";

/// The extension of post metadata files.
pub const METADATA_EXTENSION: &str = "json";

/// Parses [`SitePost`] objects from a posts directory.
pub struct Parser<'a> {
    /// The directory to scan, recursively. Subdirectories only organize
    /// files; they don't namespace slugs.
    posts_directory: &'a Path,
}

/// The files discovered for one slug, in discovery order.
#[derive(Debug, Default)]
struct PostFiles {
    slug: String,
    content: Vec<PathBuf>,
    metadata: Vec<PathBuf>,
}

impl<'a> Parser<'a> {
    pub fn new(posts_directory: &'a Path) -> Parser<'a> {
        Parser { posts_directory }
    }

    /// Discovers, validates, and parses every post, returning them sorted by
    /// publication date, most recent first. Posts with equal dates keep their
    /// discovery order.
    pub fn parse_posts(&self) -> Result<Vec<SitePost>> {
        let (groups, mut report) = self.discover()?;
        let pairs = pair(self.posts_directory, groups, &mut report);
        if !report.is_empty() {
            return Err(Error::Pairing(report));
        }

        let mut posts = pairs
            .into_iter()
            .map(|(slug, content_path, metadata_path)| {
                let metadata = parse_metadata(&slug, &metadata_path)?;
                Ok(SitePost {
                    slug,
                    content_path,
                    metadata_path,
                    metadata,
                })
            })
            .collect::<Result<Vec<SitePost>>>()?;

        // `sort_by` is stable, so ties keep discovery order.
        posts.sort_by(|a, b| b.metadata.pub_date.cmp(&a.metadata.pub_date));
        log::info!(
            "Found {} post(s) in '{}'",
            posts.len(),
            self.posts_directory.display()
        );
        Ok(posts)
    }

    /// Walks the posts directory in file-name order, grouping content and
    /// metadata files by slug. Files with any other extension go straight
    /// into the report.
    fn discover(&self) -> Result<(Vec<PostFiles>, PairingReport)> {
        let mut groups: Vec<PostFiles> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut report = PairingReport::default();

        for result in WalkDir::new(self.posts_directory).sort_by_file_name() {
            let entry = result?;
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            let relative = path
                .strip_prefix(self.posts_directory)
                .unwrap_or(path)
                .to_owned();

            let is_content = has_extension(path, CONTENT_EXTENSION);
            let is_metadata = has_extension(path, METADATA_EXTENSION);
            let slug = path.file_stem().and_then(|stem| stem.to_str());
            let slug = match (slug, is_content || is_metadata) {
                (Some(slug), true) => slug,
                _ => {
                    report.unrecognized.push(relative);
                    continue;
                }
            };

            let i = *index.entry(slug.to_owned()).or_insert_with(|| {
                groups.push(PostFiles {
                    slug: slug.to_owned(),
                    ..PostFiles::default()
                });
                groups.len() - 1
            });
            match is_content {
                true => groups[i].content.push(path.to_owned()),
                false => groups[i].metadata.push(path.to_owned()),
            }
        }

        Ok((groups, report))
    }
}

/// Reduces each group to a `(slug, content, metadata)` triple, recording
/// orphans and collisions in `report` relative to `base`.
fn pair(
    base: &Path,
    groups: Vec<PostFiles>,
    report: &mut PairingReport,
) -> Vec<(String, PathBuf, PathBuf)> {
    let relative = |path: &Path| path.strip_prefix(base).unwrap_or(path).to_owned();
    let mut pairs = Vec::with_capacity(groups.len());
    for mut group in groups {
        if group.content.len() > 1 || group.metadata.len() > 1 {
            let files = group
                .content
                .iter()
                .chain(group.metadata.iter())
                .map(|path| relative(path))
                .collect();
            report.collisions.push((group.slug, files));
            continue;
        }
        match (group.content.pop(), group.metadata.pop()) {
            (Some(content), Some(metadata)) => pairs.push((group.slug, content, metadata)),
            (Some(content), None) => report.missing_metadata.push(relative(&content)),
            (None, Some(metadata)) => report.missing_content.push(relative(&metadata)),
            (None, None) => {}
        }
    }
    pairs
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().map_or(false, |ext| ext == extension)
}

fn parse_metadata(slug: &str, path: &Path) -> Result<PostMetadata> {
    let contents = std::fs::read_to_string(path).map_err(|err| Error::Read {
        path: path.to_owned(),
        err,
    })?;
    contents.parse().map_err(|err| Error::Metadata {
        slug: slug.to_owned(),
        path: path.to_owned(),
        err,
    })
}

/// Every problem found while pairing post files, grouped by category.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PairingReport {
    /// Content files with no metadata file.
    pub missing_metadata: Vec<PathBuf>,

    /// Metadata files with no content file.
    pub missing_content: Vec<PathBuf>,

    /// Files that are neither content nor metadata.
    pub unrecognized: Vec<PathBuf>,

    /// Slugs claimed by more than one content or metadata file.
    pub collisions: Vec<(String, Vec<PathBuf>)>,
}

impl PairingReport {
    pub fn is_empty(&self) -> bool {
        self.missing_metadata.is_empty()
            && self.missing_content.is_empty()
            && self.unrecognized.is_empty()
            && self.collisions.is_empty()
    }
}

impl fmt::Display for PairingReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn section(f: &mut fmt::Formatter, title: &str, paths: &[PathBuf]) -> fmt::Result {
            if paths.is_empty() {
                return Ok(());
            }
            writeln!(f, "{}:", title)?;
            for path in paths {
                writeln!(f, "  {}", path.display())?;
            }
            Ok(())
        }

        section(
            f,
            &format!("Content files without a .{} file", METADATA_EXTENSION),
            &self.missing_metadata,
        )?;
        section(
            f,
            &format!("Metadata files without a .{} file", CONTENT_EXTENSION),
            &self.missing_content,
        )?;
        section(f, "Unrecognized files", &self.unrecognized)?;
        if !self.collisions.is_empty() {
            writeln!(f, "Slug collisions:")?;
            for (slug, paths) in &self.collisions {
                writeln!(f, "  {}:", slug)?;
                for path in paths {
                    writeln!(f, "    {}", path.display())?;
                }
            }
        }
        Ok(())
    }
}

/// The result of a fallible corpus-building operation.
type Result<T> = std::result::Result<T, Error>;

/// The error type for building the post corpus.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the posts directory can't be walked.
    #[error("Walking posts directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Returned when a metadata file can't be read.
    #[error("Reading post metadata '{}': {}", .path.display(), .err)]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when any file fails to pair up. Carries every problem found.
    #[error("Post files are not paired correctly:\n{0}")]
    Pairing(PairingReport),

    /// Returned when a metadata file doesn't match the metadata schema.
    #[error("Invalid metadata for post '{slug}' ('{}'): {}", .path.display(), .err)]
    Metadata {
        slug: String,
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },
}
