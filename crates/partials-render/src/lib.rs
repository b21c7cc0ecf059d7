//! # Partials Render - Reusable HTML Fragments for MiniJinja
//!
//! `partials-render` lets templates render other templates as partials: a
//! named sub-template rendered with its own, isolated variables, spliced into
//! the calling template's output.
//!
//! ```jinja
//! <div class="items">
//! {% for item in items %}
//!     {{ render_partial('shared/item.html', item=item) }}
//! {% endfor %}
//! </div>
//! ```
//!
//! This crate is the core of the `partials` facade, which adds web-framework
//! integration, but can be used with any minijinja [`Environment`].
//!
//! ## Core Concepts
//!
//! - [`render_partial`]: Render one template with an explicit [`RenderContext`]
//! - [`Fragment`]: Rendered output, marked as safe markup or plain text
//! - [`PartialsConfig`]: Function name, markup mode, worker count, strictness
//! - [`register_environment`] / [`register_extensions`]: Install
//!   `render_partial` into an environment
//! - [`PartialsExtension`]: Declarative registration through [`EnvironmentExt`]
//! - [`Templates`]: Shared, application-level environment with the renderer
//!   registered and a [`RenderBridge`] for async applications
//!
//! ## Quick Start
//!
//! ```rust
//! use minijinja::{context, Environment};
//!
//! let mut env = Environment::new();
//! env.add_template("card.html", "<b>{{ name }}</b>").unwrap();
//! env.add_template("page.html", "<div>{{ render_partial('card.html', name=name) }}</div>").unwrap();
//! partials_render::register_extensions(&mut env);
//!
//! let html = env
//!     .get_template("page.html")
//!     .unwrap()
//!     .render(context! { name => "Ada" })
//!     .unwrap();
//! assert_eq!(html, "<div><b>Ada</b></div>");
//! ```
//!
//! ## Markup Mode
//!
//! In markup mode (the default) a partial's output is returned as a safe
//! string, so an auto-escaping parent inserts it as-is. With markup off the
//! output is a plain string, which the parent escapes once.
//!
//! ## Async Applications
//!
//! Rendering is synchronous. [`Templates::render_async`] runs a page on a
//! bounded worker pool and awaits it; partials called while a tokio runtime
//! drives the current thread are moved to the same pool. See [`bridge`].
//!
//! ## Errors
//!
//! Engine errors are never swallowed. Inside templates the engine's own error
//! propagates; from Rust it arrives as [`RenderError::TemplateNotFound`] or
//! [`RenderError::Template`] with the original error attached.

pub mod bridge;
mod config;
pub mod context;
mod error;
mod extension;
mod fragment;
mod register;
mod renderer;
pub mod templates;

pub use minijinja::Environment;

pub use bridge::{RenderBridge, RenderPool};
pub use config::{default_max_workers, PartialsConfig, DEFAULT_FUNCTION_NAME};
pub use context::RenderContext;
pub use error::RenderError;
pub use extension::{EnvironmentExt, Extension, PartialsExtension};
pub use fragment::Fragment;
pub use register::{register_environment, register_extensions, register_with_bridge};
pub use renderer::{render_partial, PartialFunction, MAX_PARTIAL_DEPTH};
pub use templates::{Templates, TemplatesBuilder};
