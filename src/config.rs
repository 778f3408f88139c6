//! Configuration manager for otpflow.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Seconds to wait before a one-time code may be resent.
    #[serde(default = "default_resend_interval")]
    pub resend_interval: u32,
    /// Country code prefilled in signup forms.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to the verification provider widget.
    #[serde(default)]
    pub provider: Provider,
    /// Related to the backend session API.
    #[serde(skip_serializing)]
    pub backend: Option<Backend>,
}

/// Verification provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    /// Element id the anti-abuse widget attaches to.
    pub mount_point: String,
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            mount_point: "recaptcha-container".into(),
        }
    }
}

/// Backend session API configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    /// Base URL of the session API.
    pub url: String,
}

fn default_resend_interval() -> u32 {
    30 // seconds.
}

fn default_country_code() -> String {
    "+1".to_owned()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            resend_interval: default_resend_interval(),
            default_country_code: default_country_code(),
            version: String::default(),
            path: PathBuf::default(),
            provider: Provider::default(),
            backend: None,
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();

                // normalize URLs.
                config.backend = config
                    .backend
                    .map(|b| {
                        self.normalize_url(&b.url)
                            .map(|url| Backend { url })
                    })
                    .transpose()?;

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}
