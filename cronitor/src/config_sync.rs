//! Declarative monitor configuration kept in YAML files

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info};

use crate::client::Cronitor;
use crate::error::{ConfigError, CronitorError, Result};
use crate::transport::{ApiRequest, RequestBody};

impl Cronitor {
    /// Resolve an explicit path or fall back to the configured one
    fn config_file(&self, path: Option<&Path>, operation: &str) -> Result<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(|| self.api.config.config_path.clone())
            .ok_or_else(|| {
                ConfigError::MissingField {
                    field: format!("config_path (required by {})", operation),
                }
                .into()
            })
    }

    /// Read and parse a YAML monitor configuration file
    pub async fn read_config(&self, path: Option<&Path>) -> Result<serde_yaml::Value> {
        let path = self.config_file(path, "read_config")?;
        let content = fs::read_to_string(&path).await.map_err(|e| {
            error!("Error reading Cronitor config file {}: {}", path.display(), e);
            CronitorError::from(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            })
        })?;

        Ok(serde_yaml::from_str(&content)?)
    }

    /// Sync the monitors in a YAML file to the account. With `rollback`
    /// the service validates the file without applying it.
    pub async fn apply_config(&self, path: Option<&Path>, rollback: bool) -> Result<()> {
        let mut document = self.read_config(path).await?;

        if rollback {
            match document.as_mapping_mut() {
                Some(mapping) => {
                    mapping.insert("rollback".into(), true.into());
                }
                None => {
                    return Err(CronitorError::MonitorNotCreated(
                        "Config file must contain a mapping of monitors.".to_string(),
                    ))
                }
            }
        }

        let body = serde_yaml::to_string(&document)?;
        let request = ApiRequest::put(self.api.monitor_url(None), RequestBody::Yaml(body));

        match self.api.transport.send(request).await {
            Ok(_) => {
                info!("Cronitor config {} successfully.", if rollback { "validated" } else { "applied" });
                Ok(())
            }
            Err(e) => {
                error!("Error applying config: {}", e);
                Err(CronitorError::MonitorNotCreated(e.to_string()))
            }
        }
    }

    /// Check a YAML file against the service without applying it
    pub async fn validate_config(&self, path: Option<&Path>) -> Result<()> {
        self.apply_config(path, true).await
    }

    /// Download the account's monitors as YAML into `path`, optionally
    /// limited to one group
    pub async fn generate_config(&self, path: Option<&Path>, group: Option<&str>) -> Result<()> {
        let path = self.config_file(path, "generate_config")?;

        let mut request = ApiRequest::get(format!("{}.yaml", self.api.monitor_url(None)));
        if let Some(group) = group {
            request = request.with_query(vec![("group".to_string(), group.to_string())]);
        }

        let response = self.api.transport.send(request).await?;
        fs::write(&path, response.body).await?;

        info!("Cronitor config written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::fs as std_fs;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_config() {
        let file = NamedTempFile::new().unwrap();
        std_fs::write(file.path(), "jobs:\n  nightly-backup:\n    schedule: '0 0 * * *'\n").unwrap();

        let client = Cronitor::new(ClientConfig::new("abc123")).unwrap();
        let config = client.read_config(Some(file.path())).await.unwrap();

        assert_eq!(config["jobs"]["nightly-backup"]["schedule"].as_str(), Some("0 0 * * *"));
    }

    #[tokio::test]
    async fn test_read_config_uses_configured_path() {
        let file = NamedTempFile::new().unwrap();
        std_fs::write(file.path(), "heartbeats:\n  ping-me: {}\n").unwrap();

        let client = Cronitor::new(ClientConfig::new("abc123").with_config_path(file.path())).unwrap();
        let config = client.read_config(None).await.unwrap();
        assert!(config.get("heartbeats").is_some());
    }

    #[tokio::test]
    async fn test_read_config_requires_path() {
        let client = Cronitor::new(ClientConfig::new("abc123")).unwrap();
        let result = client.read_config(None).await;
        assert!(matches!(result, Err(CronitorError::Config(ConfigError::MissingField { .. }))));
    }

    #[tokio::test]
    async fn test_read_config_missing_file() {
        let client = Cronitor::new(ClientConfig::new("abc123")).unwrap();
        let result = client.read_config(Some(Path::new("/nonexistent/cronitor.yaml"))).await;
        assert!(matches!(result, Err(CronitorError::Config(ConfigError::FileNotFound { .. }))));
    }
}
