// Cursor theme search-path resolution.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Fallback roots searched after the per-user icon directory, in order.
/// `~` entries are dropped when no home directory can be determined.
const DEFAULT_PATHS: &[&str] = &[
    "~/.icons",
    "/usr/share/icons",
    "/usr/share/pixmaps",
    "~/.cursors",
    "/usr/share/cursors/xorg-x11",
    "/usr/X11R6/lib/X11/icons",
];

/// Ordered list of directories to search for themes.
///
/// `XCURSOR_PATH` overrides everything when set; its value is a list in the
/// platform's path-list syntax. Otherwise the per-user icon directory
/// (`$XDG_DATA_HOME/icons`, or `~/.local/share/icons` when `XDG_DATA_HOME`
/// is unset or not absolute) comes first, followed by the fixed default
/// list.
pub fn search_paths() -> Vec<PathBuf> {
    paths_from(
        env::var_os("XCURSOR_PATH"),
        env::var_os("XDG_DATA_HOME"),
        dirs::home_dir(),
    )
}

fn paths_from(
    xcursor_path: Option<OsString>,
    xdg_data_home: Option<OsString>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    if let Some(list) = xcursor_path {
        return env::split_paths(&list).collect();
    }

    let home = home.as_deref();
    let mut paths = Vec::new();

    let data_home = xdg_data_home
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| home.map(|h| h.join(".local/share")));
    if let Some(data_home) = data_home {
        paths.push(data_home.join("icons"));
    }

    paths.extend(DEFAULT_PATHS.iter().filter_map(|entry| expand(entry, home)));
    paths
}

fn expand(entry: &str, home: Option<&Path>) -> Option<PathBuf> {
    match entry.strip_prefix("~/") {
        Some(rest) => home.map(|home| home.join(rest)),
        None => Some(PathBuf::from(entry)),
    }
}
