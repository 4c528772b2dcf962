//! Converts posts and manifest values into the [`Value`]s templates render
//! against.
//!
//! The post template sees `{post, additionalValues, generatorTag}` where
//! `post` is a per-post scope:
//!
//! ```text
//! {slug, title, pubDate, pubDateIso, pubDateRfc, content, additionalValues, generatorTag}
//! ```
//!
//! Additional pages see `{allPosts, additionalValues, generatorTag}` with
//! `allPosts` holding every per-post scope, newest first.

use crate::config::Config;
use crate::post::{ShowPubDate, SitePost};
use chrono::Locale;
use gtmpl_value::Value;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Converts arbitrary JSON into a template value without interpreting it.
/// Objects become [`Value::Map`] so templates can both index and `range`
/// over them.
pub fn from_json(json: &serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Value::from(i),
            (None, Some(u), _) => Value::from(u),
            (None, None, Some(f)) => Value::from(f),
            (None, None, None) => Value::String(n.to_string()),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), from_json(value)))
                .collect(),
        ),
    }
}

/// Builds template scopes. Holds the manifest-wide values shared by every
/// scope.
pub struct ScopeBuilder {
    pub pub_date_format: String,
    pub pub_date_locale: Locale,
    pub additional_values: Value,
    pub generator_tag: String,
}

impl ScopeBuilder {
    pub fn new(config: &Config) -> ScopeBuilder {
        ScopeBuilder {
            pub_date_format: config.pub_date_format.clone(),
            pub_date_locale: config.pub_date_locale,
            additional_values: from_json(&config.additional_values),
            generator_tag: generator_tag(),
        }
    }

    /// Builds the per-post scope for `post`, reading its content from disk.
    pub fn post_scope(&self, post: &SitePost) -> Result<Value> {
        let content = std::fs::read(&post.content_path).map_err(|err| Error::ReadContent {
            slug: post.slug.clone(),
            path: post.content_path.clone(),
            err,
        })?;
        let content = String::from_utf8(content).map_err(|err| Error::ContentEncoding {
            slug: post.slug.clone(),
            path: post.content_path.clone(),
            err,
        })?;

        let metadata = &post.metadata;
        let pub_date = match &metadata.show_pub_date {
            Some(ShowPubDate::Hidden) => Value::Nil,
            Some(ShowPubDate::Text(text)) => Value::String(text.clone()),
            None => Value::String(self.format_pub_date(post)?),
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("slug".to_owned(), Value::String(post.slug.clone()));
        m.insert("title".to_owned(), Value::String(metadata.title.clone()));
        m.insert("pubDate".to_owned(), pub_date);
        m.insert(
            "pubDateIso".to_owned(),
            Value::String(metadata.pub_date.to_rfc3339()),
        );
        m.insert(
            "pubDateRfc".to_owned(),
            Value::String(metadata.pub_date.to_rfc2822()),
        );
        m.insert("content".to_owned(), Value::String(content));
        m.insert(
            "additionalValues".to_owned(),
            from_json(&metadata.additional_values),
        );
        m.insert(
            "generatorTag".to_owned(),
            Value::String(self.generator_tag.clone()),
        );
        Ok(Value::Object(m))
    }

    /// Builds every per-post scope in parallel. The result lines up with
    /// `posts` index for index.
    pub fn post_scopes(&self, posts: &[SitePost]) -> Result<Vec<Value>> {
        posts.par_iter().map(|post| self.post_scope(post)).collect()
    }

    /// Wraps a per-post scope for the post template.
    pub fn post_page_scope(&self, post_scope: &Value) -> Value {
        self.shared_scope("post", post_scope.clone())
    }

    /// Builds the scope for additional pages from every per-post scope.
    pub fn all_pages_scope(&self, post_scopes: &[Value]) -> Value {
        self.shared_scope("allPosts", Value::Array(post_scopes.to_vec()))
    }

    fn shared_scope(&self, key: &str, value: Value) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(key.to_owned(), value);
        m.insert("additionalValues".to_owned(), self.additional_values.clone());
        m.insert(
            "generatorTag".to_owned(),
            Value::String(self.generator_tag.clone()),
        );
        Value::Object(m)
    }

    fn format_pub_date(&self, post: &SitePost) -> Result<String> {
        let mut formatted = String::new();
        write!(
            formatted,
            "{}",
            post.metadata
                .pub_date
                .format_localized(&self.pub_date_format, self.pub_date_locale)
        )
        .map_err(|_| Error::DateFormat {
            slug: post.slug.clone(),
            format: self.pub_date_format.clone(),
        })?;
        Ok(formatted)
    }
}

/// The `<meta>` tag identifying this generator in rendered pages.
pub fn generator_tag() -> String {
    format!(
        r#"<meta name="generator" content="wolfdog {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// The result of a fallible scope-building operation.
type Result<T> = std::result::Result<T, Error>;

/// The error type for building template scopes.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a post's content file can't be read.
    #[error("Reading content of post '{slug}' ('{}'): {}", .path.display(), .err)]
    ReadContent {
        slug: String,
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a post's content file isn't valid UTF-8.
    #[error("Content of post '{slug}' ('{}') is not valid UTF-8: {}", .path.display(), .err)]
    ContentEncoding {
        slug: String,
        path: PathBuf,
        #[source]
        err: std::string::FromUtf8Error,
    },

    /// Returned when the publication date can't be rendered with the
    /// configured format.
    #[error("Formatting publication date of post '{slug}' with '{format}'")]
    DateFormat { slug: String, format: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostMetadata;
    use tempfile::TempDir;

    fn builder() -> ScopeBuilder {
        ScopeBuilder {
            pub_date_format: String::from("%B %-d, %Y"),
            pub_date_locale: Locale::en_US,
            additional_values: from_json(&serde_json::json!({"siteName": "Howl"})),
            generator_tag: generator_tag(),
        }
    }

    fn post(dir: &TempDir, slug: &str, metadata: &str) -> SitePost {
        let content_path = dir.path().join(format!("{}.html", slug));
        std::fs::write(&content_path, "<p>Hi</p>").unwrap();
        SitePost {
            slug: slug.to_owned(),
            content_path,
            metadata_path: dir.path().join(format!("{}.json", slug)),
            metadata: metadata.parse::<PostMetadata>().unwrap(),
        }
    }

    fn field<'v>(value: &'v Value, key: &str) -> &'v Value {
        match value {
            Value::Object(m) | Value::Map(m) => &m[key],
            other => panic!("expected an object, found {:?}", other),
        }
    }

    fn string(value: &Value) -> &str {
        match value {
            Value::String(s) => s,
            other => panic!("expected a string, found {:?}", other),
        }
    }

    #[test]
    fn test_post_scope_fields() {
        let tmp = TempDir::new().unwrap();
        let post = post(
            &tmp,
            "hello",
            r#"{"title": "Hello", "pubDate": "2021-06-15T10:00:00Z", "additionalValues": {"mood": "good"}}"#,
        );
        let scope = builder().post_scope(&post).unwrap();

        assert_eq!(string(field(&scope, "slug")), "hello");
        assert_eq!(string(field(&scope, "title")), "Hello");
        assert_eq!(string(field(&scope, "pubDate")), "June 15, 2021");
        assert_eq!(
            string(field(&scope, "pubDateIso")),
            "2021-06-15T10:00:00+00:00"
        );
        assert_eq!(
            string(field(&scope, "pubDateRfc")),
            "Tue, 15 Jun 2021 10:00:00 +0000"
        );
        assert_eq!(string(field(&scope, "content")), "<p>Hi</p>");
        assert_eq!(
            string(field(field(&scope, "additionalValues"), "mood")),
            "good"
        );
        assert!(string(field(&scope, "generatorTag")).contains("wolfdog"));
    }

    #[test]
    fn test_show_pub_date_overrides() {
        let tmp = TempDir::new().unwrap();
        let text = post(
            &tmp,
            "text",
            r#"{"title": "t", "pubDate": "2021-06-01", "showPubDate": "Someday"}"#,
        );
        let hidden = post(
            &tmp,
            "hidden",
            r#"{"title": "t", "pubDate": "2021-06-01", "showPubDate": false}"#,
        );
        let builder = builder();

        let scope = builder.post_scope(&text).unwrap();
        assert_eq!(string(field(&scope, "pubDate")), "Someday");
        let scope = builder.post_scope(&hidden).unwrap();
        assert!(matches!(field(&scope, "pubDate"), Value::Nil));
        assert_eq!(string(field(&scope, "pubDateIso")), "2021-06-01T00:00:00+00:00");
    }

    #[test]
    fn test_localized_pub_date() {
        let tmp = TempDir::new().unwrap();
        let post = post(&tmp, "fr", r#"{"title": "t", "pubDate": "2021-06-01"}"#);
        let builder = ScopeBuilder {
            pub_date_format: String::from("%-d %B %Y"),
            pub_date_locale: Locale::fr_FR,
            ..builder()
        };
        let scope = builder.post_scope(&post).unwrap();
        assert_eq!(string(field(&scope, "pubDate")), "1 juin 2021");
    }

    #[test]
    fn test_post_scopes_keep_order() {
        let tmp = TempDir::new().unwrap();
        let posts: Vec<SitePost> = (0..16)
            .map(|i| {
                post(
                    &tmp,
                    &format!("post{}", i),
                    r#"{"title": "t", "pubDate": "2021-06-01"}"#,
                )
            })
            .collect();
        let scopes = builder().post_scopes(&posts).unwrap();
        for (i, scope) in scopes.iter().enumerate() {
            assert_eq!(string(field(scope, "slug")), format!("post{}", i));
        }
    }

    #[test]
    fn test_missing_content_names_the_slug() {
        let tmp = TempDir::new().unwrap();
        let mut post = post(&tmp, "gone", r#"{"title": "t", "pubDate": "2021-06-01"}"#);
        post.content_path = tmp.path().join("nope.html");
        match builder().post_scope(&post) {
            Err(Error::ReadContent { slug, .. }) => assert_eq!(slug, "gone"),
            other => panic!("expected a read error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_utf8_content_names_the_slug() {
        let tmp = TempDir::new().unwrap();
        let post = post(&tmp, "latin1", r#"{"title": "t", "pubDate": "2021-06-01"}"#);
        std::fs::write(&post.content_path, b"caf\xe9").unwrap();
        match builder().post_scope(&post) {
            Err(Error::ContentEncoding { slug, .. }) => assert_eq!(slug, "latin1"),
            other => panic!("expected an encoding error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_wrappers() {
        let builder = builder();
        let post = Value::String(String::from("p"));
        let page = builder.post_page_scope(&post);
        assert_eq!(string(field(&page, "post")), "p");
        assert_eq!(
            string(field(field(&page, "additionalValues"), "siteName")),
            "Howl"
        );

        let all = builder.all_pages_scope(&[post.clone(), post]);
        match field(&all, "allPosts") {
            Value::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected an array, found {:?}", other),
        }
    }

    #[test]
    fn test_from_json() {
        let value = from_json(&serde_json::json!({
            "n": 3, "f": 1.5, "b": true, "z": null, "list": ["a", 2]
        }));
        assert!(matches!(field(&value, "b"), Value::Bool(true)));
        assert!(matches!(field(&value, "z"), Value::Nil));
        assert!(matches!(field(&value, "n"), Value::Number(_)));
        assert!(matches!(field(&value, "f"), Value::Number(_)));
        match field(&value, "list") {
            Value::Array(items) => assert_eq!(string(&items[0]), "a"),
            other => panic!("expected an array, found {:?}", other),
        }
    }
}
