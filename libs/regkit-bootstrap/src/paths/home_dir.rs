use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Errors for resolving the home directory
#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("HOME environment variable is not set")]
    HomeMissing,
    #[error("APPDATA environment variable is not set")]
    AppDataMissing,
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalize and resolve the home directory path based on platform rules.
///
/// - A configured value may start with `~`, which expands to the user home
///   (`HOME`, or `USERPROFILE` on Windows). The expanded path must be absolute.
/// - Without a configured value the platform base is used:
///   `%APPDATA%/<default_subdir>` on Windows, `$HOME/<default_subdir>` elsewhere.
///
/// If `create` is true, the directory is created if missing.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = resolve_with_base(config_home, default_subdir, user_home(), platform_base())?;
    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

#[cfg(target_os = "windows")]
fn user_home() -> Option<PathBuf> {
    env::var_os("USERPROFILE")
        .or_else(|| env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(not(target_os = "windows"))]
fn user_home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

#[cfg(target_os = "windows")]
fn platform_base() -> Result<PathBuf, HomeDirError> {
    env::var_os("APPDATA")
        .map(PathBuf::from)
        .ok_or(HomeDirError::AppDataMissing)
}

#[cfg(not(target_os = "windows"))]
fn platform_base() -> Result<PathBuf, HomeDirError> {
    user_home().ok_or(HomeDirError::HomeMissing)
}

/// Pure resolution step; environment lookups are done by the caller.
fn resolve_with_base(
    config_home: Option<String>,
    default_subdir: &str,
    user_home: Option<PathBuf>,
    platform_base: Result<PathBuf, HomeDirError>,
) -> Result<PathBuf, HomeDirError> {
    let Some(raw) = config_home else {
        return Ok(platform_base?.join(default_subdir));
    };

    let expanded = match raw.strip_prefix('~') {
        Some(rest) => {
            let home = user_home.ok_or(HomeDirError::HomeMissing)?;
            let rest = rest.trim_start_matches(['/', '\\']);
            if rest.is_empty() {
                home
            } else {
                Path::new(&home).join(rest)
            }
        }
        None => PathBuf::from(&raw),
    };

    if !expanded.is_absolute() {
        return Err(HomeDirError::AbsoluteRequired(
            expanded.to_string_lossy().into(),
        ));
    }
    Ok(expanded)
}
