//! Configuration loading and path resolution.
//!
//! YAML file first, then `TENGEN_*` environment variables on top
//! (`TENGEN_API__PORT=9000` overrides `api.port`). Relative paths in the
//! file resolve against the file's own directory, so a config shipped
//! next to its models works from any working directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};

use tengen_core::config::AppConfig;
use tengen_core::domain::ModelArtifact;

const ENV_PREFIX: &str = "TENGEN_";

/// Load and validate the application configuration.
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.is_file() {
        bail!("config file not found: {}", path.display());
    }

    let mut config: AppConfig = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    resolve_paths(&mut config, &base_dir);
    validate(&config)?;
    Ok(config)
}

fn resolve_paths(config: &mut AppConfig, base_dir: &Path) {
    let engine = &mut config.katago;
    engine.path = resolve(base_dir, &engine.path);
    engine.config_path = resolve(base_dir, &engine.config_path);
    resolve_artifact(base_dir, &mut engine.model);
    if let Some(ref mut human) = engine.human_model {
        resolve_artifact(base_dir, human);
    }
    for dir in &mut engine.ld_library_paths {
        *dir = resolve(base_dir, dir);
    }
}

fn resolve_artifact(base_dir: &Path, artifact: &mut ModelArtifact) {
    artifact.path = resolve(base_dir, &artifact.path);
}

fn resolve(base_dir: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base_dir.join(value)
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.katago.path.as_os_str().is_empty() {
        bail!("katago.path must not be empty");
    }
    if config.katago.config_path.as_os_str().is_empty() {
        bail!("katago.config_path must not be empty");
    }
    for artifact in config.katago.artifacts() {
        if artifact.auto_fetch && artifact.url.is_none() {
            bail!(
                "auto_fetch enabled for {} but no url configured",
                artifact.path.display()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        path
    }

    #[test]
    fn relative_paths_resolve_against_the_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r"
katago:
  path: bin/katago
  config_path: /etc/katago/analysis.cfg
  model:
    path: models/model.bin.gz
  ld_library_paths:
    - libs
",
        );

        let config = load(&path).unwrap();
        assert_eq!(config.katago.path, dir.path().join("bin/katago"));
        assert_eq!(
            config.katago.config_path,
            PathBuf::from("/etc/katago/analysis.cfg")
        );
        assert_eq!(
            config.katago.model.path,
            dir.path().join("models/model.bin.gz")
        );
        assert_eq!(config.katago.ld_library_paths, vec![dir.path().join("libs")]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn auto_fetch_without_url_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r"
katago:
  path: /usr/bin/katago
  config_path: /etc/katago/analysis.cfg
  model:
    path: /models/model.bin.gz
    auto_fetch: true
",
        );

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("no url configured"));
    }
}
