//! Event classification: extension allow-list and root-relative paths.

use std::path::{Component, Path, PathBuf};

use crate::ChangeEvent;

/// Decides which change events produce a broadcast and what the payload is.
#[derive(Clone, Debug)]
pub struct ChangeFilter {
    root: PathBuf,
    /// Lowercase suffixes including the dot (e.g. `.css`).
    suffixes: Vec<String>,
}

impl ChangeFilter {
    /// Create a filter for `root` accepting the given extensions.
    ///
    /// Extensions are matched case-insensitively and may be given with or
    /// without a leading dot.
    pub fn new<S: AsRef<str>>(root: PathBuf, extensions: &[S]) -> Self {
        let suffixes = extensions
            .iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();
        Self { root, suffixes }
    }

    /// Watch root this filter resolves paths against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an event to its broadcast payload.
    ///
    /// Returns `None` for directories, files outside the allow-list, and
    /// paths that cannot be expressed relative to the root.
    pub fn resolve(&self, event: &ChangeEvent) -> Option<String> {
        if event.is_dir || !self.is_allowed(&event.path) {
            return None;
        }
        self.relative_path(&event.path)
    }

    /// Check the file name against the extension allow-list.
    pub fn is_allowed(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// Path relative to the root, joined with `/`.
    ///
    /// Fails for paths outside the root, the root itself, and paths with
    /// non-UTF-8 or non-normal components.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                _ => return None,
            }
        }

        (!segments.is_empty()).then(|| segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filter() -> ChangeFilter {
        ChangeFilter::new(PathBuf::from("/site"), &["css", "js"])
    }

    fn file(path: &str) -> ChangeEvent {
        ChangeEvent {
            path: PathBuf::from(path),
            is_dir: false,
        }
    }

    #[test]
    fn test_resolve_nested_css() {
        assert_eq!(
            filter().resolve(&file("/site/css/app.css")),
            Some("css/app.css".to_owned())
        );
    }

    #[test]
    fn test_resolve_top_level_js() {
        assert_eq!(
            filter().resolve(&file("/site/main.js")),
            Some("main.js".to_owned())
        );
    }

    #[test]
    fn test_resolve_deeply_nested() {
        assert_eq!(
            filter().resolve(&file("/site/wp-content/themes/child/assets/style.css")),
            Some("wp-content/themes/child/assets/style.css".to_owned())
        );
    }

    #[test]
    fn test_resolve_rejects_html() {
        assert_eq!(filter().resolve(&file("/site/index.html")), None);
    }

    #[test]
    fn test_resolve_rejects_directory_even_with_asset_name() {
        let event = ChangeEvent {
            path: PathBuf::from("/site/vendor.js"),
            is_dir: true,
        };
        assert_eq!(filter().resolve(&event), None);
    }

    #[test]
    fn test_resolve_rejects_outside_root() {
        assert_eq!(filter().resolve(&file("/elsewhere/app.css")), None);
    }

    #[test]
    fn test_resolve_rejects_sibling_with_common_prefix() {
        assert_eq!(filter().resolve(&file("/site-old/app.css")), None);
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(
            filter().resolve(&file("/site/css/APP.CSS")),
            Some("css/APP.CSS".to_owned())
        );
    }

    #[test]
    fn test_extension_suffix_only() {
        let filter = filter();
        assert!(filter.is_allowed(Path::new("/site/bundle.min.js")));
        assert!(!filter.is_allowed(Path::new("/site/app.css.map")));
        assert!(!filter.is_allowed(Path::new("/site/app.json")));
        assert!(!filter.is_allowed(Path::new("/site/styles.scss")));
    }

    #[test]
    fn test_extensions_with_leading_dot() {
        let filter = ChangeFilter::new(PathBuf::from("/site"), &[".SCSS", ".mjs"]);
        assert!(filter.is_allowed(Path::new("/site/a.scss")));
        assert!(filter.is_allowed(Path::new("/site/b.mjs")));
        assert!(!filter.is_allowed(Path::new("/site/c.css")));
    }

    #[test]
    fn test_empty_extensions_are_ignored() {
        let filter = ChangeFilter::new(PathBuf::from("/site"), &["", "."]);
        assert!(!filter.is_allowed(Path::new("/site/README")));
        assert!(!filter.is_allowed(Path::new("/site/a.css")));
    }

    #[test]
    fn test_relative_path_of_root_is_none() {
        assert_eq!(filter().relative_path(Path::new("/site")), None);
    }

    #[test]
    fn test_relative_path_rejects_parent_components() {
        assert_eq!(
            filter().relative_path(Path::new("/site/../etc/app.css")),
            None
        );
    }

    #[test]
    fn test_root_accessor() {
        assert_eq!(filter().root(), Path::new("/site"));
    }
}
