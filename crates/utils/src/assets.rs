use std::{io, path::PathBuf};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
pub const ASSET_DIR_ENV: &str = "TASKS_ASSET_DIR";

/// Data directory for local state, created on first use.
///
/// A non-blank `override_dir` wins; debug builds otherwise use `dev_assets`
/// at the workspace root, release builds the platform data directory.
pub fn asset_dir_from(override_dir: Option<&str>) -> io::Result<PathBuf> {
    let path = match override_dir.map(str::trim).filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None if cfg!(debug_assertions) => PathBuf::from(PROJECT_ROOT).join("../../dev_assets"),
        None => ProjectDirs::from("dev", "tasks", "task-tracker")
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?
            .data_dir()
            .to_path_buf(),
    };

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
        tracing::debug!(path = %path.display(), "Created asset directory");
    }
    Ok(path)
}

pub fn sqlite_path(dir: &std::path::Path) -> PathBuf {
    dir.join("tasks.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_dir_is_created() {
        let dir = std::env::temp_dir().join(format!("tasks-assets-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let resolved = asset_dir_from(dir.to_str()).unwrap();
        assert_eq!(resolved, dir);
        assert!(dir.is_dir());
        assert_eq!(sqlite_path(&dir), dir.join("tasks.sqlite"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
