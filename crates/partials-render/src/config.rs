//! Registration configuration.
//!
//! [`PartialsConfig`] is passed explicitly when an environment is built or
//! registered. There is no process-wide registration state.
//!
//! # YAML
//!
//! ```yaml
//! function_name: render_partial
//! markup: true
//! max_workers: 8
//! strict_undefined: false
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::is_identifier;
use crate::error::RenderError;

/// Name under which the renderer is exposed to templates by default.
pub const DEFAULT_FUNCTION_NAME: &str = "render_partial";

/// Upper bound for the computed default worker count.
const MAX_DEFAULT_WORKERS: usize = 32;

/// Configuration for registering the partial renderer.
///
/// # Example
///
/// ```rust
/// use partials_render::PartialsConfig;
///
/// let config = PartialsConfig::default()
///     .with_markup(false)
///     .with_max_workers(4);
///
/// assert_eq!(config.function_name, "render_partial");
/// assert_eq!(config.resolved_max_workers(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialsConfig {
    /// Global name templates call the renderer by.
    pub function_name: String,

    /// Mark rendered fragments as safe so the parent does not escape them.
    pub markup: bool,

    /// Size of the render worker pool used when rendering from inside an
    /// async runtime. `None` picks a default from the CPU count.
    pub max_workers: Option<usize>,

    /// Make access to undefined variables an error instead of rendering empty.
    pub strict_undefined: bool,
}

impl Default for PartialsConfig {
    fn default() -> Self {
        Self {
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
            markup: true,
            max_workers: None,
            strict_undefined: false,
        }
    }
}

impl PartialsConfig {
    /// Parses a configuration from YAML and validates it.
    pub fn from_yaml(yaml: &str) -> Result<Self, RenderError> {
        // An empty document deserializes to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    pub fn with_markup(mut self, markup: bool) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    pub fn with_strict_undefined(mut self, strict: bool) -> Self {
        self.strict_undefined = strict;
        self
    }

    /// Worker count the render pool will be created with.
    pub fn resolved_max_workers(&self) -> usize {
        self.max_workers.unwrap_or_else(default_max_workers)
    }

    /// Checks that the function name is usable from templates and that the
    /// worker count is positive.
    pub fn validate(&self) -> Result<(), RenderError> {
        if !is_identifier(&self.function_name) {
            return Err(RenderError::Config(format!(
                "function name {:?} is not a valid template identifier",
                self.function_name
            )));
        }
        if self.max_workers == Some(0) {
            return Err(RenderError::Config(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default pool size: CPU count plus a few threads for renders that block,
/// capped at 32.
pub fn default_max_workers() -> usize {
    (num_cpus::get() + 4).min(MAX_DEFAULT_WORKERS)
}
