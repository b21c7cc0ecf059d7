//! The partial renderer.
//!
//! Rendering a partial is a thin call into the host environment: resolve the
//! template by name, render it with the given [`RenderContext`] as its whole
//! variable set, and tag the result as markup or text. Errors from the engine
//! are passed through untouched.
//!
//! The same logic is exposed to templates through [`PartialFunction`], a
//! callable object installed into an environment's globals by the
//! [`register`](crate::register) functions:
//!
//! ```jinja
//! <div>{{ render_partial('card.html', name='Ada') }}</div>
//! {{ render_partial('card.html', {'name': 'Ada'}, size='small') }}
//! ```
//!
//! The optional positional argument is a map of variables; keyword arguments
//! are applied on top of it.
//!
//! Every partial renders in a fresh engine state, so the engine's own
//! recursion limit does not see partials nested inside partials. Nesting is
//! counted here instead and capped at [`MAX_PARTIAL_DEPTH`]; a partial that
//! renders itself fails the page with an `InvalidOperation` error.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use minijinja::value::{from_args, Kwargs, Object, ObjectRepr, Value};
use minijinja::{Environment, Error, ErrorKind, State};
use tracing::trace;

use crate::bridge::RenderBridge;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::fragment::Fragment;

/// Renders template `name` with exactly the variables in `ctx`.
///
/// With `markup` set the fragment is marked safe, so interpolating it into an
/// auto-escaping parent does not escape it a second time.
///
/// # Example
///
/// ```rust
/// use minijinja::Environment;
/// use partials_render::{render_partial, RenderContext};
///
/// let mut env = Environment::new();
/// env.add_template("card.html", "<b>{{ name }}</b>").unwrap();
///
/// let mut ctx = RenderContext::new();
/// ctx.insert("name", "Ada").unwrap();
///
/// let fragment = render_partial(&env, "card.html", &ctx, true).unwrap();
/// assert_eq!(fragment.as_str(), "<b>Ada</b>");
/// assert!(fragment.is_safe());
/// ```
///
/// # Errors
///
/// [`RenderError::TemplateNotFound`] if the name does not resolve, and
/// [`RenderError::Template`] for syntax or evaluation errors.
pub fn render_partial(
    env: &Environment<'_>,
    name: &str,
    ctx: &RenderContext,
    markup: bool,
) -> Result<Fragment, RenderError> {
    let html = render_raw(env, name, ctx)?;
    Ok(Fragment::new(html, markup))
}

/// Deepest chain of partials rendering partials.
pub const MAX_PARTIAL_DEPTH: usize = 32;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Partial levels currently open on this thread.
pub(crate) fn current_depth() -> usize {
    DEPTH.with(Cell::get)
}

pub(crate) fn render_raw(
    env: &Environment<'_>,
    name: &str,
    ctx: &RenderContext,
) -> Result<String, Error> {
    render_nested(env, name, ctx, current_depth())
}

/// Renders below `parent` open partial levels, which may belong to another
/// thread when the render was handed to a worker.
pub(crate) fn render_nested(
    env: &Environment<'_>,
    name: &str,
    ctx: &RenderContext,
    parent: usize,
) -> Result<String, Error> {
    if parent >= MAX_PARTIAL_DEPTH {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("recursion limit exceeded rendering partial {}", name),
        ));
    }
    let _depth = DepthGuard::enter(parent + 1);
    trace!(template = name, vars = ctx.len(), depth = parent + 1, "rendering partial");
    let template = env.get_template(name)?;
    template.render(ctx.vars())
}

struct DepthGuard {
    previous: usize,
}

impl DepthGuard {
    fn enter(depth: usize) -> Self {
        Self {
            previous: DEPTH.with(|d| d.replace(depth)),
        }
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(self.previous));
    }
}

/// Template-callable partial renderer.
///
/// Direct functions render on the calling thread. Bridged functions hand the
/// render to a [`RenderBridge`], which moves it off threads driven by an async
/// runtime.
#[derive(Debug)]
pub struct PartialFunction {
    markup: bool,
    bridge: Option<Arc<RenderBridge>>,
}

impl PartialFunction {
    pub fn direct(markup: bool) -> Self {
        Self {
            markup,
            bridge: None,
        }
    }

    pub fn bridged(markup: bool, bridge: Arc<RenderBridge>) -> Self {
        Self {
            markup,
            bridge: Some(bridge),
        }
    }

    pub fn markup(&self) -> bool {
        self.markup
    }

    pub fn into_value(self) -> Value {
        Value::from_object(self)
    }
}

impl Object for PartialFunction {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call(self: &Arc<Self>, state: &State<'_, '_>, args: &[Value]) -> Result<Value, Error> {
        let (name, context, kwargs): (&str, Option<Value>, Kwargs) = from_args(args)?;
        let ctx = RenderContext::from_call_args(context.as_ref(), &kwargs)?;
        let html = match &self.bridge {
            Some(bridge) => bridge.render_in_template(state.env(), name, &ctx)?,
            None => render_raw(state.env(), name, &ctx)?,
        };
        Ok(Fragment::new(html, self.markup).into_value())
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<partial renderer>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::{context, ErrorKind};

    fn env_with(markup: bool) -> Environment<'static> {
        let mut env = Environment::new();
        env.add_template("card.html", "<b>{{ name }}</b>").unwrap();
        env.add_template("pair.html", "{{ a }}-{{ b }}").unwrap();
        env.add_global("render_partial", PartialFunction::direct(markup).into_value());
        env
    }

    #[test]
    fn test_render_partial_direct() {
        let env = env_with(true);
        let ctx = RenderContext::from_serialize(&context! { name => "Ada" }).unwrap();
        let fragment = render_partial(&env, "card.html", &ctx, false).unwrap();
        assert_eq!(fragment.as_str(), "<b>Ada</b>");
        assert!(!fragment.is_safe());
    }

    #[test]
    fn test_render_partial_missing() {
        let env = env_with(true);
        let err = render_partial(&env, "nope.html", &RenderContext::new(), true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_call_with_kwargs() {
        let env = env_with(true);
        let out = env
            .render_str("{{ render_partial('pair.html', a=1, b=2) }}", ())
            .unwrap();
        assert_eq!(out, "1-2");
    }

    #[test]
    fn test_call_with_positional_map_and_override() {
        let env = env_with(true);
        let out = env
            .render_str("{{ render_partial('pair.html', {'a': 1, 'b': 2}, b=3) }}", ())
            .unwrap();
        assert_eq!(out, "1-3");
    }

    #[test]
    fn test_call_rejects_non_map_positional() {
        let env = env_with(true);
        let err = env
            .render_str("{{ render_partial('pair.html', [1, 2]) }}", ())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_call_without_name() {
        let env = env_with(true);
        assert!(env.render_str("{{ render_partial() }}", ()).is_err());
    }

    fn escaping_env(markup: bool) -> Environment<'static> {
        let mut env = env_with(markup);
        env.add_template(
            "override.html",
            "<div>{{ render_partial('card.html', {'name': 'A&B'}, name='C&D') }}</div>",
        )
        .unwrap();
        env
    }

    #[test]
    fn test_kwargs_override_positional_in_markup_mode() {
        let env = escaping_env(true);
        let html = env.get_template("override.html").unwrap().render(()).unwrap();
        assert_eq!(html, "<div><b>C&amp;D</b></div>");
    }

    #[test]
    fn test_kwargs_override_positional_in_plain_mode() {
        let env = escaping_env(false);
        let html = env.get_template("override.html").unwrap().render(()).unwrap();
        assert!(html.starts_with("<div>&lt;b&gt;C&amp;amp;D&lt;"));
        assert!(!html.contains("A&amp;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_call_with_none_positional_and_kwargs() {
        let env = env_with(true);
        let out = env
            .render_str("{{ render_partial('pair.html', none, a=5) }}", ())
            .unwrap();
        assert_eq!(out, "5-");
    }

    #[test]
    fn test_self_recursive_partial_is_an_error() {
        let mut env = env_with(true);
        env.add_template("loop.html", "x{{ render_partial('loop.html') }}")
            .unwrap();
        let err = env.get_template("loop.html").unwrap().render(()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(current_depth(), 0);
    }

    #[test]
    fn test_mutually_recursive_partials_are_an_error() {
        let mut env = env_with(true);
        env.add_template("ping.html", "{{ render_partial('pong.html') }}")
            .unwrap();
        env.add_template("pong.html", "{{ render_partial('ping.html') }}")
            .unwrap();
        let err = render_partial(&env, "ping.html", &RenderContext::new(), true).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn test_depth_at_limit() {
        let env = env_with(true);
        let err = render_nested(&env, "card.html", &RenderContext::new(), MAX_PARTIAL_DEPTH)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        let ctx = RenderContext::new();
        assert!(render_nested(&env, "card.html", &ctx, MAX_PARTIAL_DEPTH - 1).is_ok());
        assert_eq!(current_depth(), 0);
    }

    #[test]
    fn test_call_missing_template_kind_unchanged() {
        let env = env_with(true);
        let err = env
            .render_str("{{ render_partial('nope.html') }}", ())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
    }
}
