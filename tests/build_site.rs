use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wolfdog::build::{build_directory, Error, Summary};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn manifest(extra: &str) -> String {
    format!(
        r#"{{"version": "{}", "additionalValues": {{"siteName": "Howl"}}{}}}"#,
        env!("CARGO_PKG_VERSION"),
        extra
    )
}

/// Lays out a small but complete site using every default location.
fn site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "wolfdog.json", &manifest(""));

    write(root, "posts/first.html", "<p>first</p>");
    write(
        root,
        "posts/first.json",
        r#"{"title": "First", "pubDate": "2020-01-01"}"#,
    );
    write(root, "posts/2021/second.html", "<p>second</p>");
    write(
        root,
        "posts/2021/second.json",
        r#"{"title": "Second", "pubDate": "2021-06-01T08:30:00+02:00", "additionalValues": {"mood": "sunny"}}"#,
    );
    write(root, "posts/third.html", "<p>third</p>");
    write(
        root,
        "posts/third.json",
        r#"{"title": "Third", "pubDate": "2020-06-01", "showPubDate": false}"#,
    );

    write(
        root,
        "templates/post.html",
        r#"{{template "head.html" .}}<h1>{{.post.title}}</h1>{{if .post.pubDate}}<time>{{.post.pubDate}}</time>{{end}}{{.post.content}}"#,
    );
    write(
        root,
        "templates/partials/head.html",
        r#"<head>{{.generatorTag}}<title>{{.additionalValues.siteName}}</title></head>"#,
    );
    write(
        root,
        "templates/additionalPages/index.html.tpl",
        r#"{{range .allPosts}}[{{.slug}}]{{end}}"#,
    );
    write(
        root,
        "templates/additionalPages/feeds/all.txt.tpl",
        r#"{{.additionalValues.siteName}}"#,
    );
    write(root, "templates/additionalPages/feeds/README.md", "not a template");
    write(root, "static/css/site.css", "body {}");
    tmp
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            (
                entry.path().strip_prefix(dir).unwrap().to_owned(),
                fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_build_site() {
    let tmp = site();
    let summary = build_directory(tmp.path()).unwrap();
    assert_eq!(
        summary,
        Summary {
            static_files: 1,
            posts: 3,
            partials: 1,
            pages: 2,
        }
    );

    let dist = tmp.path().join("dist");
    let first = fs::read_to_string(dist.join("posts/first/index.html")).unwrap();
    assert!(first.contains("<title>Howl</title>"), "{}", first);
    assert!(first.contains(r#"<meta name="generator""#), "{}", first);
    assert!(first.contains("<h1>First</h1>"), "{}", first);
    assert!(first.contains("<time>January 1, 2020</time>"), "{}", first);
    assert!(first.ends_with("<p>first</p>"), "{}", first);

    let third = fs::read_to_string(dist.join("posts/third/index.html")).unwrap();
    assert!(!third.contains("<time>"), "{}", third);

    assert_eq!(
        fs::read_to_string(dist.join("index.html")).unwrap(),
        "[second][third][first]"
    );
    assert_eq!(fs::read_to_string(dist.join("feeds/all.txt")).unwrap(), "Howl");
    assert!(!dist.join("feeds/README.md").exists());
    assert_eq!(
        fs::read_to_string(dist.join("css/site.css")).unwrap(),
        "body {}"
    );
}

#[test]
fn test_build_is_idempotent() {
    let tmp = site();
    build_directory(tmp.path()).unwrap();
    let first = snapshot(&tmp.path().join("dist"));
    build_directory(tmp.path()).unwrap();
    let second = snapshot(&tmp.path().join("dist"));
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_custom_output_path_template() {
    let tmp = site();
    write(
        tmp.path(),
        "wolfdog.json",
        &manifest(r#", "postSettings": {"postOutputFileTemplate": "blog/{{.slug}}.html"}"#),
    );
    build_directory(tmp.path()).unwrap();
    assert!(tmp.path().join("dist/blog/second.html").exists());
    assert!(!tmp.path().join("dist/posts").exists());
}

#[test]
fn test_bad_paths_write_nothing() {
    let tmp = site();
    write(
        tmp.path(),
        "wolfdog.json",
        &manifest(r#", "staticAssetsInputDir": "dist/raw", "partialTemplatesDir": "../partials""#),
    );
    match build_directory(tmp.path()) {
        Err(Error::Guard(err)) => assert_eq!(err.0.len(), 2),
        other => panic!("expected a path error, got {:?}", other),
    }
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn test_input_dir_containing_output_is_rejected() {
    let tmp = site();
    write(
        tmp.path(),
        "wolfdog.json",
        &manifest(r#", "staticAssetsInputDir": ".""#),
    );
    match build_directory(tmp.path()) {
        Err(Error::Guard(err)) => assert_eq!(err.0.len(), 1),
        other => panic!("expected a path error, got {:?}", other),
    }
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn test_incompatible_version_is_rejected() {
    let tmp = site();
    write(tmp.path(), "wolfdog.json", r#"{"version": "999.0.0"}"#);
    let err = build_directory(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("999.0.0"), "{}", err);
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn test_orphaned_post_fails_the_build() {
    let tmp = site();
    write(tmp.path(), "posts/orphan.html", "<p>alone</p>");
    match build_directory(tmp.path()) {
        Err(Error::Parse(err)) => assert!(err.to_string().contains("orphan.html"), "{}", err),
        other => panic!("expected a pairing error, got {:?}", other),
    }
    assert!(!tmp.path().join("dist/posts").exists());
}

#[test]
fn test_missing_manifest() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(build_directory(tmp.path()), Err(Error::Config(_))));
}
