//! Declarative environment extensions.
//!
//! An [`Extension`] bundles the setup a library wants applied to an
//! environment. Extensions are listed once, at environment construction, with
//! [`EnvironmentExt::add_extension`] or
//! [`TemplatesBuilder::extension`](crate::TemplatesBuilder::extension), instead
//! of calling registration functions by hand.
//!
//! ```rust
//! use minijinja::Environment;
//! use partials_render::{EnvironmentExt, PartialsExtension};
//!
//! let mut env = Environment::new();
//! env.add_template("footer.html", "<p>&copy; {{ year }}</p>").unwrap();
//! env.add_extension(&PartialsExtension);
//!
//! let html = env.render_str("{{ render_partial('footer.html', year=2024) }}", ()).unwrap();
//! assert_eq!(html, "<p>&copy; 2024</p>");
//! ```

use minijinja::Environment;

use crate::register::register_extensions;

/// Setup applied to an environment when it is built.
pub trait Extension: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Applies the extension.
    fn register(&self, env: &mut Environment<'_>);
}

/// Installs `render_partial` in markup mode, rendering directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialsExtension;

impl Extension for PartialsExtension {
    fn name(&self) -> &str {
        "partials"
    }

    fn register(&self, env: &mut Environment<'_>) {
        register_extensions(env);
    }
}

/// Adds extension support to [`Environment`].
pub trait EnvironmentExt {
    fn add_extension(&mut self, extension: &dyn Extension) -> &mut Self;
}

impl EnvironmentExt for Environment<'_> {
    fn add_extension(&mut self, extension: &dyn Extension) -> &mut Self {
        tracing::debug!(extension = extension.name(), "applying template extension");
        extension.register(self);
        self
    }
}
