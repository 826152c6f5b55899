use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{MemberId, TimelineScale};
use crate::store::{FileStore, HttpStore, InMemoryStore, ProjectDirectory, TaskStore};

/// Where tasks come from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backend {
    /// In-memory sample project, lost on exit.
    #[default]
    Demo,
    /// Local JSON data file.
    File { path: PathBuf },
    /// teamworks REST API.
    Http { api_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: Backend,
    pub project_id: String,
    /// Current user. Without one the chart is read-only.
    pub user_id: Option<MemberId>,
    pub default_scale: TimelineScale,
    /// How long banners stay up.
    pub banner_seconds: u64,
    pub request_timeout_secs: u64,
}

/// Owner of the sample project.
const DEMO_USER: &str = "u-ada";

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Demo,
            project_id: "demo".to_string(),
            user_id: None,
            default_scale: TimelineScale::Week,
            banner_seconds: 4,
            request_timeout_secs: 15,
        }
    }
}

pub type Stores = (Arc<dyn TaskStore>, Arc<dyn ProjectDirectory>);

impl Settings {
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "teamworks-gantt")
            .context("Cannot determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or the default location. A missing file yields the
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let settings: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(settings)
    }

    /// The configured user. The demo backend falls back to its sample owner;
    /// other backends stay anonymous and therefore read-only.
    pub fn current_user(&self) -> Option<MemberId> {
        match (&self.user_id, &self.backend) {
            (Some(user), _) => Some(user.clone()),
            (None, Backend::Demo) => Some(DEMO_USER.to_string()),
            (None, _) => None,
        }
    }

    pub fn banner_ttl(&self) -> Duration {
        Duration::from_secs(self.banner_seconds)
    }

    /// Build the task store and project directory for the configured backend.
    pub fn open_stores(&self) -> Result<Stores> {
        match &self.backend {
            Backend::Demo => {
                Ok(shared(InMemoryStore::demo()))
            }
            Backend::File { path } => {
                let store = FileStore::open(path)
                    .with_context(|| format!("Failed to open data file {}", path.display()))?;
                Ok(shared(store))
            }
            Backend::Http { api_url } => {
                let store = HttpStore::new(
                    api_url,
                    self.current_user(),
                    Duration::from_secs(self.request_timeout_secs),
                )
                .context("Failed to build HTTP client")?;
                Ok(shared(store))
            }
        }
    }
}

fn shared<S: TaskStore + ProjectDirectory>(store: S) -> Stores {
    let store = Arc::new(store);
    let tasks: Arc<dyn TaskStore> = store.clone();
    let directory: Arc<dyn ProjectDirectory> = store;
    (tasks, directory)
}

#[derive(Debug, Parser)]
#[command(name = "teamworks-gantt", version)]
#[command(about = "Interactive Gantt timeline for teamworks projects")]
pub struct Cli {
    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Project to open
    #[arg(long)]
    pub project: Option<String>,
    /// Act as this user
    #[arg(long)]
    pub user: Option<String>,
    /// Use the REST API at this base URL
    #[arg(long, conflicts_with_all = ["data_file", "demo"])]
    pub api_url: Option<String>,
    /// Use a local JSON data file
    #[arg(long, conflicts_with = "demo")]
    pub data_file: Option<PathBuf>,
    /// Use the in-memory sample project
    #[arg(long)]
    pub demo: bool,
}

impl Cli {
    /// Overlay command-line flags on loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.api_url {
            settings.backend = Backend::Http {
                api_url: url.clone(),
            };
        } else if let Some(path) = &self.data_file {
            settings.backend = Backend::File { path: path.clone() };
        } else if self.demo {
            settings.backend = Backend::Demo;
        }
        if let Some(project) = &self.project {
            settings.project_id = project.clone();
        }
        if let Some(user) = &self.user {
            settings.user_id = Some(user.clone()).filter(|u| !u.trim().is_empty());
        }
    }
}
