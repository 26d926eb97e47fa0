// Theme loading and inheritance resolution.

use anyhow::{Context, Result, bail};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::cursor::Cursor;
use crate::decode::{DecodeError, decode_file};
use crate::paths;

/// A named cursor theme: every cursor file found for the theme and its
/// ancestors, keyed by file name. The first cursor loaded under a name
/// keeps it, so a theme's own cursors shadow inherited ones.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub cursors: HashMap<String, Cursor>,
}

/// Loads the named theme from the system search paths (see
/// [`paths::search_paths`]). Themes named by an `Inherits` line in the
/// theme's `index.theme` are resolved recursively and merged in after the
/// theme's own cursors. An empty name loads the theme named `default`.
pub fn load_theme(name: &str) -> Result<Theme> {
    load_theme_with_paths(name, &paths::search_paths())
}

/// Like [`load_theme`], but searching an explicit list of root directories
/// instead of the system search paths.
pub fn load_theme_with_paths(name: &str, search: &[PathBuf]) -> Result<Theme> {
    let name = if name.is_empty() { "default" } else { name };
    debug!(theme = name, roots = search.len(), "loading cursor theme");

    let mut theme = Theme {
        name: name.to_owned(),
        cursors: HashMap::new(),
    };
    let mut resolving = HashSet::new();
    load_into(&mut theme, name, search, &mut resolving)?;
    Ok(theme)
}

/// Loads a self-contained theme from a single directory, without search
/// paths or inheritance. The theme is named after the directory.
pub fn load_theme_from_dir(path: impl AsRef<Path>) -> Result<Theme> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut theme = Theme {
        name,
        cursors: HashMap::new(),
    };
    load_dir_into(&mut theme, path)?;
    Ok(theme)
}

/// Merges the named theme into `theme`: the first search root with a
/// usable `cursors` directory supplies the theme's own cursors and its
/// `index.theme` names the ancestors, which are resolved against the full
/// search path again. `resolving` holds the names currently on the
/// recursion stack so inheritance cycles fail instead of recursing forever.
fn load_into(
    theme: &mut Theme,
    name: &str,
    search: &[PathBuf],
    resolving: &mut HashSet<String>,
) -> Result<()> {
    if !resolving.insert(name.to_owned()) {
        bail!("theme {name:?} inherits itself");
    }

    for root in search {
        let dir = root.join(name).join("cursors");
        if !dir.is_dir() {
            continue;
        }

        // Own cursors first; first-wins keeps them over inherited ones.
        load_dir_into(theme, &dir)?;

        let index = root.join(name).join("index.theme");
        for ancestor in read_inherits(&index)? {
            load_into(theme, &ancestor, search, resolving)
                .with_context(|| format!("load inherited theme {ancestor:?}"))?;
        }
        break;
    }

    resolving.remove(name);
    Ok(())
}

/// Loads every cursor file in `dir` into the theme, keyed by file name.
/// Names already present are left alone. Files that are not in the
/// Xcursor format are skipped; anything else that fails aborts the load.
fn load_dir_into(theme: &mut Theme, dir: &Path) -> Result<()> {
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("scan cursor directory {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if theme.cursors.contains_key(&name) {
            continue;
        }

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        match decode_file(path) {
            Ok(cursor) => {
                theme.cursors.insert(name, cursor);
            }
            Err(DecodeError::BadMagic) => {
                debug!(path = %path.display(), "not a cursor file, skipping");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("load cursor {}", path.display()));
            }
        }
    }

    Ok(())
}

/// Ancestor theme names declared by an `index.theme` file. A missing file
/// means no ancestors.
fn read_inherits(index: &Path) -> Result<Vec<String>> {
    let contents = match fs::read_to_string(index) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("read {}", index.display()));
        }
    };
    Ok(parse_inherits(&contents))
}

/// The first `Inherits = a, b` line wins; values are split on commas and
/// colons and trimmed.
fn parse_inherits(contents: &str) -> Vec<String> {
    for line in contents.lines() {
        if !line.starts_with("Inherits") {
            continue;
        }
        let Some((_, value)) = line.split_once('=') else {
            continue;
        };
        return value
            .split([',', ':'])
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();
    }
    Vec::new()
}
