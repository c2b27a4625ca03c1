//! Schema and document discovery.
//!
//! Walks the project root once with `walkdir`, following symlinks and
//! skipping `.git`, `node_modules` and gqlet's own output and cache
//! directories, then matches project-relative paths (forward slashes) against
//! the configured globs. `*` never crosses a `/`; `**` does. Results are
//! sorted for deterministic runs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::config::{Config, Globs};
use crate::error::{io_err, DiscoverError};
use crate::types::{DocumentPath, SchemaName};

const ALWAYS_SKIPPED: &[&str] = &[".git", "node_modules"];
const GITIGNORE: &str = ".gitignore";

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Globs translated from `.gitignore` files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    pub excludes: Vec<String>,
    /// From negated entries (`!keep.graphql`).
    pub reincludes: Vec<String>,
}

/// Compiled include/exclude globs plus ignore rules.
#[derive(Debug, Clone)]
pub struct Matcher {
    include: GlobSet,
    exclude: GlobSet,
    ignored: GlobSet,
    reincluded: GlobSet,
}

impl Matcher {
    pub fn new(globs: &Globs, ignore: &IgnoreRules) -> Result<Self, DiscoverError> {
        Ok(Matcher {
            include: compile_set(globs.includes())?,
            exclude: compile_set(globs.excludes())?,
            ignored: compile_set(ignore.excludes.iter().map(String::as_str))?,
            reincluded: compile_set(ignore.reincludes.iter().map(String::as_str))?,
        })
    }

    pub fn is_match(&self, rel: &str) -> bool {
        self.include.is_match(rel)
            && !self.exclude.is_match(rel)
            && !(self.ignored.is_match(rel) && !self.reincluded.is_match(rel))
    }
}

fn compile(pattern: &str) -> Result<Glob, DiscoverError> {
    let trimmed = pattern.trim_start_matches("./");
    GlobBuilder::new(trimmed)
        .literal_separator(true)
        .build()
        .map_err(|source| DiscoverError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

fn compile_set<'p>(patterns: impl Iterator<Item = &'p str>) -> Result<GlobSet, DiscoverError> {
    let mut builder = GlobSetBuilder::new();
    let mut all = Vec::new();
    for pattern in patterns {
        builder.add(compile(pattern)?);
        all.push(pattern);
    }
    builder.build().map_err(|source| DiscoverError::InvalidGlob {
        pattern: all.join(", "),
        source,
    })
}

// ---------------------------------------------------------------------------
// .gitignore
// ---------------------------------------------------------------------------

/// Collect the `.gitignore` files among `files` into [`IgnoreRules`].
///
/// Patterns are scoped to the directory of the file that holds them.
/// A negated entry re-includes what it matches wherever it appears, even
/// under an ignored directory.
pub fn gitignore_rules(root: &Path, files: &[DocumentPath]) -> Result<IgnoreRules, DiscoverError> {
    let mut rules = IgnoreRules::default();
    for file in files {
        let Some(dir) = file.as_str().strip_suffix(GITIGNORE) else {
            continue;
        };
        if !(dir.is_empty() || dir.ends_with('/')) {
            continue;
        }
        let dir = dir.trim_end_matches('/');
        let path = file.resolve(root);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        for line in contents.lines().map(str::trim) {
            match line.strip_prefix('!') {
                Some(negated) => rules.reincludes.extend(gitignore_line(dir, negated)),
                None => rules.excludes.extend(gitignore_line(dir, line)),
            }
        }
    }
    Ok(rules)
}

fn gitignore_line(dir: &str, line: &str) -> Vec<String> {
    if line.is_empty() || line.starts_with('#') {
        return vec![];
    }
    let dir_only = line.ends_with('/');
    let body = line.trim_end_matches('/');
    let anchored = body.starts_with('/') || body.contains('/');
    let body = body.trim_start_matches('/');
    if body.is_empty() {
        return vec![];
    }
    let base = match (anchored, dir.is_empty()) {
        (true, true) => body.to_string(),
        (true, false) => format!("{dir}/{body}"),
        (false, true) => format!("**/{body}"),
        (false, false) => format!("{dir}/**/{body}"),
    };
    if dir_only {
        vec![format!("{base}/**")]
    } else {
        vec![base.clone(), format!("{base}/**")]
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Every file under `root` as a project-relative path, sorted.
///
/// Symlinks are followed. Directories in `skip` (project-relative) are not
/// entered.
pub fn walk(root: &Path, skip: &[PathBuf]) -> Result<Vec<DocumentPath>, DiscoverError> {
    walk_from(root, root, None, skip)
}

fn walk_from(
    root: &Path,
    start: &Path,
    max_depth: Option<usize>,
    skip: &[PathBuf],
) -> Result<Vec<DocumentPath>, DiscoverError> {
    let mut walker = WalkDir::new(start).follow_links(true).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut out = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| !is_skipped(root, e, skip)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.loop_ancestor().is_some() => {
                tracing::warn!("skipping symlink loop at {}", error_path(&err).display());
                continue;
            }
            Err(err)
                if err.depth() > 0
                    && err.io_error().is_some_and(|e| e.kind() == ErrorKind::NotFound) =>
            {
                tracing::warn!("skipping dangling symlink {}", error_path(&err).display());
                continue;
            }
            Err(err) => {
                let path = error_path(&err);
                return Err(io_err(path, err.into()));
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(doc) = entry
            .path()
            .strip_prefix(root)
            .ok()
            .and_then(DocumentPath::from_relative)
        {
            out.push(doc);
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn is_skipped(root: &Path, entry: &DirEntry, skip: &[PathBuf]) -> bool {
    if !entry.file_type().is_dir() || entry.path() == root {
        return false;
    }
    if ALWAYS_SKIPPED.iter().any(|s| entry.file_name() == *s) {
        return true;
    }
    entry
        .path()
        .strip_prefix(root)
        .is_ok_and(|rel| skip.iter().any(|s| s == rel))
}

fn error_path(err: &walkdir::Error) -> PathBuf {
    err.path().map(Path::to_path_buf).unwrap_or_default()
}

/// Literal directory prefix of a glob, and how many levels below it the
/// glob reaches (`None` once `**` appears).
fn glob_base(pattern: &str) -> (PathBuf, Option<usize>) {
    let segments: Vec<&str> = pattern
        .trim_start_matches("./")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let literal = segments
        .iter()
        .take_while(|s| !s.contains(['*', '?', '[', '{']))
        .count();
    let rest = &segments[literal..];
    let depth = if rest.iter().any(|s| s.contains("**")) {
        None
    } else {
        Some(rest.len())
    };
    (segments[..literal].iter().collect(), depth)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Project files gqlet may read, with output and cache directories skipped
/// and (when enabled) `.gitignore` rules applied to documents.
#[derive(Debug, Clone)]
pub struct Discovery {
    files: Vec<DocumentPath>,
    ignore: IgnoreRules,
}

impl Discovery {
    /// Walk `root` once for the given config.
    pub fn scan(root: &Path, config: &Config) -> Result<Self, DiscoverError> {
        let files = walk(root, &config.skipped_dirs())?;
        let ignore = if config.respect_gitignore {
            gitignore_rules(root, &files)?
        } else {
            IgnoreRules::default()
        };
        Ok(Discovery { files, ignore })
    }

    /// Walk only the directories `globs` can reach. Enough to resolve one
    /// schema; carries no `.gitignore` rules.
    pub fn scan_globs(root: &Path, config: &Config, globs: &Globs) -> Result<Self, DiscoverError> {
        let skip = config.skipped_dirs();
        let mut files = Vec::new();
        for (base, depth) in globs.includes().map(glob_base) {
            let start = root.join(&base);
            if start.exists() {
                files.extend(walk_from(root, &start, depth, &skip)?);
            }
        }
        files.sort();
        files.dedup();
        Ok(Discovery {
            files,
            ignore: IgnoreRules::default(),
        })
    }

    pub fn files(&self) -> &[DocumentPath] {
        &self.files
    }

    pub fn ignore_rules(&self) -> &IgnoreRules {
        &self.ignore
    }

    /// Files matching `globs`. Schema globs ignore `.gitignore`.
    pub fn schema_files(&self, globs: &Globs) -> Result<Vec<DocumentPath>, DiscoverError> {
        let matcher = Matcher::new(globs, &IgnoreRules::default())?;
        Ok(self
            .files
            .iter()
            .filter(|f| matcher.is_match(f.as_str()))
            .cloned()
            .collect())
    }

    /// Documents paired with the schema they bind to. The first binding
    /// (projects before the top-level schema) whose globs match wins.
    pub fn documents(
        &self,
        config: &Config,
    ) -> Result<Vec<(DocumentPath, SchemaName)>, DiscoverError> {
        let bindings = config.bindings();
        let mut matchers = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            matchers.push((
                binding.schema_name(),
                Matcher::new(binding.documents, &self.ignore)?,
            ));
        }
        let mut out = Vec::new();
        for file in &self.files {
            if let Some((name, _)) = matchers.iter().find(|(_, m)| m.is_match(file.as_str())) {
                out.push((file.clone(), name.clone()));
            }
        }
        Ok(out)
    }
}

/// Schema binding for a document supplied from outside a scan (single-document
/// mode). Falls back to the top-level schema when no glob matches.
pub fn binding_for(
    config: &Config,
    document: &DocumentPath,
) -> Result<SchemaName, DiscoverError> {
    for binding in config.bindings() {
        if Matcher::new(binding.documents, &IgnoreRules::default())?.is_match(document.as_str()) {
            return Ok(binding.schema_name());
        }
    }
    Ok(SchemaName::default_schema())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn star_does_not_cross_directories() {
        let m = Matcher::new(&Globs(vec!["*.graphql".to_string()]), &IgnoreRules::default()).unwrap();
        assert!(m.is_match("a.graphql"));
        assert!(!m.is_match("dir/a.graphql"));

        let m = Matcher::new(&Globs(vec!["**/*.graphql".to_string()]), &IgnoreRules::default()).unwrap();
        assert!(m.is_match("a.graphql"));
        assert!(m.is_match("dir/deep/a.graphql"));
    }

    #[test]
    fn excludes_win_over_includes() {
        let globs = Globs(vec!["**/*.graphql".to_string(), "!broken/**".to_string()]);
        let m = Matcher::new(&globs, &IgnoreRules::default()).unwrap();
        assert!(m.is_match("ok/a.graphql"));
        assert!(!m.is_match("broken/a.graphql"));
    }

    #[test]
    fn invalid_glob_reports_pattern() {
        let err = Matcher::new(&Globs(vec!["a/[".to_string()]), &IgnoreRules::default()).unwrap_err();
        assert!(err.to_string().contains("a/["), "got: {err}");
    }

    #[test]
    fn gitignore_lines_translate() {
        assert_eq!(gitignore_line("", "dist/"), vec!["**/dist/**"]);
        assert_eq!(gitignore_line("", "/build"), vec!["build", "build/**"]);
        assert_eq!(gitignore_line("", "a/b"), vec!["a/b", "a/b/**"]);
        assert_eq!(gitignore_line("", "*.log"), vec!["**/*.log", "**/*.log/**"]);
        assert!(gitignore_line("", "# comment").is_empty());
    }

    #[test]
    fn nested_gitignore_lines_are_scoped_to_their_directory() {
        assert_eq!(gitignore_line("web", "dist/"), vec!["web/**/dist/**"]);
        assert_eq!(gitignore_line("web", "/tmp.graphql"), vec!["web/tmp.graphql", "web/tmp.graphql/**"]);
        assert_eq!(gitignore_line("web/app", "a/b"), vec!["web/app/a/b", "web/app/a/b/**"]);
    }

    #[test]
    fn glob_base_keeps_the_literal_prefix() {
        assert_eq!(glob_base("src/**/*.graphql"), (PathBuf::from("src"), None));
        assert_eq!(glob_base("./schema/*.graphqls"), (PathBuf::from("schema"), Some(1)));
        assert_eq!(glob_base("schema.graphqls"), (PathBuf::from("schema.graphqls"), Some(0)));
        assert_eq!(glob_base("*.graphqls"), (PathBuf::new(), Some(1)));
        assert_eq!(glob_base("{a,b}/x.graphqls"), (PathBuf::new(), Some(2)));
    }

    #[test]
    fn scan_skips_output_cache_and_vendor_dirs() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/a.graphql");
        touch(tmp.path(), "__generated__/src/a.graphql.tsx");
        touch(tmp.path(), ".gqlet/manifest.json");
        touch(tmp.path(), "node_modules/pkg/b.graphql");

        let config = Config::new("schema.graphqls", "**/*");
        let discovery = Discovery::scan(tmp.path(), &config).unwrap();
        let docs: Vec<_> = discovery
            .documents(&config)
            .unwrap()
            .into_iter()
            .map(|(d, _)| d.0)
            .collect();
        assert_eq!(docs, vec!["src/a.graphql"]);
    }

    #[test]
    fn gitignored_documents_are_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "keep/a.graphql");
        touch(tmp.path(), "ignored/b.graphql");
        fs::write(tmp.path().join(".gitignore"), "ignored/\n").unwrap();

        let mut config = Config::new("schema.graphqls", "**/*.graphql");
        let discovery = Discovery::scan(tmp.path(), &config).unwrap();
        assert_eq!(discovery.documents(&config).unwrap().len(), 1);

        config.respect_gitignore = false;
        let discovery = Discovery::scan(tmp.path(), &config).unwrap();
        assert_eq!(discovery.documents(&config).unwrap().len(), 2);
    }

    #[test]
    fn documents_bind_to_first_matching_project() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "admin/users.graphql");
        touch(tmp.path(), "app/viewer.graphql");

        let mut config = Config::new("schema.graphqls", "**/*.graphql");
        config.projects.push(ProjectConfig {
            name: "admin".to_string(),
            schema: Globs(vec!["admin.graphqls".to_string()]),
            documents: Globs(vec!["admin/**/*.graphql".to_string()]),
        });
        let discovery = Discovery::scan(tmp.path(), &config).unwrap();
        let docs = discovery.documents(&config).unwrap();
        assert_eq!(
            docs,
            vec![
                (DocumentPath::from("admin/users.graphql"), SchemaName::from("admin")),
                (DocumentPath::from("app/viewer.graphql"), SchemaName::default_schema()),
            ]
        );
        assert_eq!(
            binding_for(&config, &DocumentPath::from("elsewhere/x.graphql")).unwrap(),
            SchemaName::default_schema()
        );
    }

    #[test]
    fn gitignore_negations_and_nested_files_apply() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.graphql");
        touch(tmp.path(), "keep.graphql");
        touch(tmp.path(), "web/draft.graphql");
        touch(tmp.path(), "web/live.graphql");
        touch(tmp.path(), "other/draft.graphql");
        fs::write(tmp.path().join(".gitignore"), "*.graphql\n!keep.graphql\n").unwrap();
        fs::write(tmp.path().join("web/.gitignore"), "draft.graphql\n!live.graphql\n").unwrap();

        let config = Config::new("schema.graphqls", "**/*.graphql");
        let discovery = Discovery::scan(tmp.path(), &config).unwrap();
        let docs: Vec<_> = discovery
            .documents(&config)
            .unwrap()
            .into_iter()
            .map(|(d, _)| d.0)
            .collect();
        assert_eq!(docs, vec!["keep.graphql", "web/live.graphql"]);
        assert!(discovery
            .ignore_rules()
            .excludes
            .contains(&"web/**/draft.graphql".to_string()));
    }

    #[test]
    fn dot_prefixed_output_dir_is_still_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "pages/index.tsx");
        touch(tmp.path(), "__generated__/src/a.graphql.tsx");

        let mut config = Config::new("schema.graphqls", "**/*.tsx");
        config.generated_dir = PathBuf::from("./__generated__");
        let discovery = Discovery::scan(tmp.path(), &config).unwrap();
        let docs: Vec<_> = discovery
            .documents(&config)
            .unwrap()
            .into_iter()
            .map(|(d, _)| d.0)
            .collect();
        assert_eq!(docs, vec!["pages/index.tsx"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_documents_are_discovered() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "shared/viewer.graphql");
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("shared/viewer.graphql"),
            tmp.path().join("src/linked.graphql"),
        )
        .unwrap();
        std::os::unix::fs::symlink(tmp.path().join("shared"), tmp.path().join("src/dir")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("missing"), tmp.path().join("src/dangling")).unwrap();

        let config = Config::new("schema.graphqls", "src/**/*.graphql");
        let discovery = Discovery::scan(tmp.path(), &config).unwrap();
        let docs: Vec<_> = discovery
            .documents(&config)
            .unwrap()
            .into_iter()
            .map(|(d, _)| d.0)
            .collect();
        assert_eq!(docs, vec!["src/dir/viewer.graphql", "src/linked.graphql"]);
    }

    #[test]
    fn scan_globs_only_walks_reachable_dirs() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "schema.graphqls");
        touch(tmp.path(), "schema/extra.graphqls");
        touch(tmp.path(), "src/a.graphql");

        let config = Config::new("schema.graphqls", "src/**/*.graphql");
        let discovery = Discovery::scan_globs(tmp.path(), &config, &config.schema).unwrap();
        let files: Vec<_> = discovery.files().iter().map(|d| d.0.as_str()).collect();
        assert_eq!(files, vec!["schema.graphqls"]);

        let globs = Globs(vec!["schema/*.graphqls".to_string(), "missing/**".to_string()]);
        let discovery = Discovery::scan_globs(tmp.path(), &config, &globs).unwrap();
        assert_eq!(
            discovery.schema_files(&globs).unwrap(),
            vec![DocumentPath::from("schema/extra.graphqls")]
        );
    }
}
