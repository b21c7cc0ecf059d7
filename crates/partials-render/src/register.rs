//! Installing the partial renderer into an environment.
//!
//! Registration puts a [`PartialFunction`] into the environment's globals under
//! [`PartialsConfig::function_name`], so every template the environment renders
//! can call it.
//!
//! | Function | Use When |
//! |----------|----------|
//! | [`register_extensions`] | Defaults: `render_partial`, markup mode, direct rendering |
//! | [`register_environment`] | Explicit config, direct rendering (synchronous apps) |
//! | [`register_with_bridge`] | Explicit config, renders moved off async runtime threads |
//!
//! [`Templates`](crate::Templates) performs bridged registration for you, and
//! [`PartialsExtension`](crate::PartialsExtension) is the declarative form.

use std::sync::Arc;

use minijinja::{Environment, UndefinedBehavior};
use tracing::debug;

use crate::bridge::RenderBridge;
use crate::config::{PartialsConfig, DEFAULT_FUNCTION_NAME};
use crate::error::RenderError;
use crate::renderer::PartialFunction;

/// Registers `render_partial` with default settings (markup mode).
///
/// # Example
///
/// ```rust
/// use minijinja::Environment;
///
/// let mut env = Environment::new();
/// env.add_template("card.html", "<b>{{ name }}</b>").unwrap();
/// env.add_template("page.html", "<div>{{ render_partial('card.html', name='Ada') }}</div>").unwrap();
/// partials_render::register_extensions(&mut env);
///
/// let html = env.get_template("page.html").unwrap().render(()).unwrap();
/// assert_eq!(html, "<div><b>Ada</b></div>");
/// ```
pub fn register_extensions(env: &mut Environment<'_>) {
    install(env, DEFAULT_FUNCTION_NAME, PartialFunction::direct(true));
}

/// Registers the renderer as described by `config`, rendering directly on the
/// calling thread.
///
/// # Errors
///
/// [`RenderError::Config`] if the configuration does not validate.
pub fn register_environment(
    env: &mut Environment<'_>,
    config: &PartialsConfig,
) -> Result<(), RenderError> {
    config.validate()?;
    apply_undefined_behavior(env, config);
    install(
        env,
        &config.function_name,
        PartialFunction::direct(config.markup),
    );
    Ok(())
}

/// Registers the renderer with a [`RenderBridge`], so partial calls made while
/// an async runtime drives the current thread render on the bridge's pool.
///
/// The bridge must be [bound](RenderBridge::bind) to the environment once it is
/// shared in an `Arc`; until then partials render directly.
pub fn register_with_bridge(
    env: &mut Environment<'_>,
    config: &PartialsConfig,
    bridge: Arc<RenderBridge>,
) -> Result<(), RenderError> {
    config.validate()?;
    apply_undefined_behavior(env, config);
    install(
        env,
        &config.function_name,
        PartialFunction::bridged(config.markup, bridge),
    );
    Ok(())
}

fn apply_undefined_behavior(env: &mut Environment<'_>, config: &PartialsConfig) {
    if config.strict_undefined {
        env.set_undefined_behavior(UndefinedBehavior::Strict);
    }
}

fn install(env: &mut Environment<'_>, name: &str, function: PartialFunction) {
    debug!(function = name, markup = function.markup(), "registered partial renderer");
    env.add_global(name.to_string(), function.into_value());
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::ErrorKind;

    fn env() -> Environment<'static> {
        let mut env = Environment::new();
        env.add_template("card.html", "<b>{{ name }}</b>").unwrap();
        env.add_template(
            "page.html",
            "<div>{{ render_partial('card.html', name=name) }}</div>",
        )
        .unwrap();
        env.add_template("custom.html", "{{ partial('card.html', name='x') }}")
            .unwrap();
        env
    }

    #[test]
    fn test_unregistered_function_errors() {
        let env = env();
        let result = env.get_template("page.html").unwrap().render(());
        assert!(result.is_err());
    }

    #[test]
    fn test_register_extensions_markup() {
        let mut env = env();
        register_extensions(&mut env);
        let html = env
            .get_template("page.html")
            .unwrap()
            .render(minijinja::context! { name => "Ada" })
            .unwrap();
        assert_eq!(html, "<div><b>Ada</b></div>");
    }

    #[test]
    fn test_register_environment_plain_is_escaped_once() {
        let mut env = env();
        let config = PartialsConfig::default().with_markup(false);
        register_environment(&mut env, &config).unwrap();
        let html = env
            .get_template("page.html")
            .unwrap()
            .render(minijinja::context! { name => "Ada" })
            .unwrap();
        assert!(html.starts_with("<div>&lt;b&gt;Ada&lt;"));
        assert!(!html.contains("<b>"));
        assert!(!html.contains("&amp;lt;"));
    }

    #[test]
    fn test_register_custom_name() {
        let mut env = env();
        let config = PartialsConfig::default().with_function_name("partial");
        register_environment(&mut env, &config).unwrap();
        let html = env.get_template("custom.html").unwrap().render(()).unwrap();
        assert_eq!(html, "<b>x</b>");
        assert!(env.get_template("page.html").unwrap().render(()).is_err());
    }

    #[test]
    fn test_register_rejects_invalid_config() {
        let mut env = env();
        let config = PartialsConfig::default().with_function_name("1bad");
        assert!(matches!(
            register_environment(&mut env, &config),
            Err(RenderError::Config(_))
        ));
    }

    #[test]
    fn test_strict_undefined() {
        let mut env = env();
        let config = PartialsConfig::default().with_strict_undefined(true);
        register_environment(&mut env, &config).unwrap();
        let err = env
            .render_str("{{ render_partial('card.html') }}", ())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedError);
    }

    #[test]
    fn test_bridged_without_binding_renders_directly() {
        let mut env = env();
        let bridge = Arc::new(RenderBridge::new(1));
        register_with_bridge(&mut env, &PartialsConfig::default(), Arc::clone(&bridge)).unwrap();
        let html = env
            .get_template("page.html")
            .unwrap()
            .render(minijinja::context! { name => "Ada" })
            .unwrap();
        assert_eq!(html, "<div><b>Ada</b></div>");
        assert!(!bridge.is_started());
    }
}
