//! Application-level template collections.
//!
//! [`Templates`] is what a web application keeps in its state: a shared
//! minijinja environment with `render_partial` registered, the render bridge
//! that keeps renders off async runtime threads, and the configuration both
//! were built from. Cloning is cheap; all clones share one environment and one
//! worker pool.
//!
//! # Template Sources
//!
//! 1. Inline strings via [`TemplatesBuilder::template`]
//! 2. Filesystem directories via [`TemplatesBuilder::directory`], searched in
//!    registration order (first directory that has the file wins)
//!
//! Names are paths relative to a directory, extension included:
//! `"home/index.html"` resolves to `<dir>/home/index.html`. Auto-escaping
//! follows the engine's defaults (on for `.html`, `.htm` and `.xml`).
//!
//! # Example
//!
//! ```rust
//! use partials_render::Templates;
//!
//! let templates = Templates::builder()
//!     .template("card.html", "<b>{{ name }}</b>")
//!     .template("page.html", "<div>{{ render_partial('card.html', name=name) }}</div>")
//!     .max_workers(2)
//!     .build()
//!     .unwrap();
//!
//! let html = templates
//!     .render("page.html", minijinja::context! { name => "Ada" })
//!     .unwrap();
//! assert_eq!(html, "<div><b>Ada</b></div>");
//! ```
//!
//! # Lifecycle
//!
//! The worker pool starts the first time a render needs it and stops on
//! [`Templates::shutdown`] or when the last clone and the last in-flight
//! render are gone.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{path_loader, Environment, Error};
use serde::Serialize;
use tracing::debug;

use crate::bridge::RenderBridge;
use crate::config::PartialsConfig;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::extension::{EnvironmentExt, Extension};
use crate::fragment::Fragment;
use crate::register::register_with_bridge;

/// A shared template environment with partial rendering registered.
#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
    bridge: Arc<RenderBridge>,
    config: Arc<PartialsConfig>,
}

impl Templates {
    /// Loads templates from `dir` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory doesn't exist or isn't a directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, RenderError> {
        Self::builder().directory(dir.as_ref()).build()
    }

    pub fn builder() -> TemplatesBuilder {
        TemplatesBuilder::default()
    }

    /// The underlying environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    pub fn shared_environment(&self) -> Arc<Environment<'static>> {
        Arc::clone(&self.env)
    }

    pub fn config(&self) -> &PartialsConfig {
        &self.config
    }

    pub fn bridge(&self) -> &RenderBridge {
        &self.bridge
    }

    /// Checks if a template with the given name resolves.
    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Renders a page on the calling thread.
    ///
    /// Partials the page calls still go through the bridge, so calling this
    /// from async code only blocks for the page's own evaluation.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, RenderError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(ctx)?)
    }

    /// Renders a page on the worker pool and awaits it.
    ///
    /// `ctx` must serialize to a map of variables.
    pub async fn render_async<S: Serialize + ?Sized>(
        &self,
        name: &str,
        ctx: &S,
    ) -> Result<String, RenderError> {
        let ctx = RenderContext::from_serialize(ctx)?;
        self.bridge
            .render(self.shared_environment(), name, ctx)
            .await
    }

    /// Renders a single partial from Rust code, with the configured markup mode.
    ///
    /// Safe to call from inside an async runtime: the render is moved to the
    /// pool and this call waits for it.
    pub fn render_partial<S: Serialize + ?Sized>(
        &self,
        name: &str,
        ctx: &S,
    ) -> Result<Fragment, RenderError> {
        let ctx = RenderContext::from_serialize(ctx)?;
        let html = self.bridge.render_blocking(&self.env, name, &ctx)?;
        Ok(Fragment::new(html, self.config.markup))
    }

    /// Stops the worker pool. Renders after this run on the calling thread.
    pub fn shutdown(&self) {
        self.bridge.shutdown();
    }
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templates")
            .field("config", &self.config)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Templates`].
///
/// The configuration given here is the registration: it is applied once, when
/// [`build`](Self::build) creates the environment.
#[derive(Default)]
pub struct TemplatesBuilder {
    dirs: Vec<PathBuf>,
    inline: Vec<(String, String)>,
    config: PartialsConfig,
    extensions: Vec<Box<dyn Extension>>,
    env: Option<Environment<'static>>,
}

impl TemplatesBuilder {
    /// Adds a directory to load templates from.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.push(path.into());
        self
    }

    /// Adds a named inline template.
    pub fn template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.inline.push((name.into(), source.into()));
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: PartialsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn markup(mut self, markup: bool) -> Self {
        self.config.markup = markup;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = Some(workers);
        self
    }

    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.config.function_name = name.into();
        self
    }

    pub fn strict_undefined(mut self, strict: bool) -> Self {
        self.config.strict_undefined = strict;
        self
    }

    /// Adds an extension, applied before the partial renderer is registered.
    pub fn extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Starts from an existing environment (filters, globals, syntax) instead
    /// of a fresh one. Its loader is replaced if directories were added.
    pub fn environment(mut self, env: Environment<'static>) -> Self {
        self.env = Some(env);
        self
    }

    /// Builds the environment and registers the partial renderer.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Config`] if the configuration is invalid
    /// - [`RenderError::Io`] if a directory is missing or not a directory
    /// - [`RenderError::Template`] if an inline template does not compile
    pub fn build(self) -> Result<Templates, RenderError> {
        self.config.validate()?;
        for dir in &self.dirs {
            check_directory(dir)?;
        }

        let mut env = self.env.unwrap_or_else(Environment::new);
        if !self.dirs.is_empty() {
            env.set_loader(chained_loader(self.dirs.clone()));
        }
        for (name, source) in self.inline {
            env.add_template_owned(name, source)?;
        }
        for extension in &self.extensions {
            env.add_extension(extension.as_ref());
        }

        let bridge = Arc::new(RenderBridge::from_config(&self.config));
        register_with_bridge(&mut env, &self.config, Arc::clone(&bridge))?;

        let env = Arc::new(env);
        bridge.bind(&env);

        debug!(
            directories = self.dirs.len(),
            function = %self.config.function_name,
            max_workers = bridge.max_workers(),
            "built template collection"
        );

        Ok(Templates {
            env,
            bridge,
            config: Arc::new(self.config),
        })
    }
}

fn check_directory(path: &Path) -> Result<(), RenderError> {
    if !path.exists() {
        return Err(RenderError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("template directory does not exist: {}", path.display()),
        )));
    }
    if !path.is_dir() {
        return Err(RenderError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path is not a directory: {}", path.display()),
        )));
    }
    Ok(())
}

/// Loader that asks each directory in order.
fn chained_loader(
    dirs: Vec<PathBuf>,
) -> impl Fn(&str) -> Result<Option<String>, Error> + Send + Sync + 'static {
    let loaders: Vec<_> = dirs.into_iter().map(|dir| path_loader(dir)).collect();
    move |name| {
        for loader in &loaders {
            if let Some(source) = loader(name)? {
                return Ok(Some(source));
            }
        }
        Ok(None)
    }
}
