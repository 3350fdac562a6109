//! Plugin library discovery.

use crate::bundler::{Error, Result, settings::StandaloneSettings};
use std::path::PathBuf;

/// Plugin libraries to embed, in record order.
///
/// With a manifest the listed names are used in manifest order, relative to
/// the plugin directory. Without one every file with the platform's
/// dynamic-library extension in the plugin directory is used, sorted by path.
/// No plugin directory and no manifest means no plugins.
///
/// # Errors
///
/// [`Error::Configuration`] when a manifest entry does not exist; glob and
/// I/O failures while scanning.
pub fn resolve_plugins(settings: &StandaloneSettings) -> Result<Vec<PathBuf>> {
    if let Some(manifest) = &settings.plugin_manifest {
        return manifest
            .iter()
            .map(|name| {
                let path = match &settings.plugin_dir {
                    Some(dir) => dir.join(name),
                    None => PathBuf::from(name),
                };
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(Error::Configuration(format!(
                        "plugin listed in manifest not found: {}",
                        path.display()
                    )))
                }
            })
            .collect();
    }

    let Some(dir) = &settings.plugin_dir else {
        return Ok(Vec::new());
    };

    let pattern = dir.join(format!("*.{}", std::env::consts::DLL_EXTENSION));
    let mut plugins = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = entry.map_err(|e| Error::ResourceIo {
            context: "scanning plugin directory".into(),
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            plugins.push(path);
        }
    }
    plugins.sort();
    log::debug!("Found {} plugin(s) in {}", plugins.len(), dir.display());
    Ok(plugins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::consts::DLL_EXTENSION;
    use tempfile::TempDir;

    fn plugin_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            std::fs::write(dir.path().join(format!("{name}.{DLL_EXTENSION}")), name).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        dir
    }

    #[test]
    fn scans_directory_sorted() {
        let dir = plugin_dir();
        let settings = StandaloneSettings {
            plugin_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let names: Vec<_> = resolve_plugins(&settings)
            .unwrap()
            .iter()
            .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn manifest_order_wins() {
        let dir = plugin_dir();
        let settings = StandaloneSettings {
            plugin_dir: Some(dir.path().to_path_buf()),
            plugin_manifest: Some(vec![
                format!("zeta.{DLL_EXTENSION}"),
                format!("alpha.{DLL_EXTENSION}"),
            ]),
            ..Default::default()
        };
        let plugins = resolve_plugins(&settings).unwrap();
        assert_eq!(plugins.len(), 2);
        assert!(plugins[0].ends_with(format!("zeta.{DLL_EXTENSION}")));
    }

    #[test]
    fn missing_manifest_entry_is_a_configuration_error() {
        let dir = plugin_dir();
        let settings = StandaloneSettings {
            plugin_dir: Some(dir.path().to_path_buf()),
            plugin_manifest: Some(vec!["ghost.bin".into()]),
            ..Default::default()
        };
        assert!(matches!(
            resolve_plugins(&settings),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn nothing_configured_means_no_plugins() {
        assert!(resolve_plugins(&StandaloneSettings::default()).unwrap().is_empty());
    }
}
