//! Application context for handing the configuration to the rest of a program.

use std::sync::Arc;

use crate::config::ConfigManager;
use crate::Error;

/// Central application context holding the configuration manager.
///
/// The context is cheap to clone; every clone shares the same manager, so a
/// manager built once at startup can be passed to each component instead of
/// living in a global.
///
/// ## Example
///
/// ```no_run
/// use dragon_config::{AppContext, ConfigManager, EnvSource};
///
/// let ctx = AppContext::builder()
///     .with_config(
///         ConfigManager::builder("basic.yml")
///             .with_source(EnvSource::new().with_prefix("MYAPP_"))
///             .build()?,
///     )
///     .build()?;
///
/// let port: u16 = ctx.config().get_as("port")?;
/// # Ok::<(), dragon_config::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AppContext {
    config: Arc<ConfigManager>,
}

impl AppContext {
    /// Creates a new builder for constructing an `AppContext`.
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder { config: None }
    }

    /// Returns the configuration manager.
    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// Returns a shared handle to the configuration manager.
    pub fn config_handle(&self) -> Arc<ConfigManager> {
        Arc::clone(&self.config)
    }
}

/// Builder for constructing an [`AppContext`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct AppContextBuilder {
    config: Option<Arc<ConfigManager>>,
}

impl AppContextBuilder {
    /// Attaches a configuration manager to the application context.
    pub fn with_config(self, config: ConfigManager) -> Self {
        self.with_shared_config(Arc::new(config))
    }

    /// Attaches a manager that is already shared elsewhere.
    pub fn with_shared_config(mut self, config: Arc<ConfigManager>) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the `AppContext`.
    ///
    /// Returns an error if no configuration manager was provided.
    pub fn build(self) -> Result<AppContext, Error> {
        Ok(AppContext {
            config: self.config.ok_or(Error::MissingConfig)?,
        })
    }
}
