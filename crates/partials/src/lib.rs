//! # Partials - Reusable HTML Fragments for Web Applications
//!
//! `partials` adds a `render_partial` function to minijinja templates, so a
//! page can be composed from small, self-contained templates:
//!
//! ```jinja
//! {% extends "shared/_layout.html" %}
//! {% block main_content %}
//! <ul>
//! {% for video in videos %}
//!     {{ render_partial('shared/video_item.html', video=video) }}
//! {% endfor %}
//! </ul>
//! {% endblock %}
//! ```
//!
//! A partial sees only the variables passed to it, never the caller's. Its
//! output is returned as safe markup, so the calling template inserts it
//! without escaping it a second time.
//!
//! ## Setup
//!
//! Register once, when the application builds its template environment:
//!
//! ```rust
//! use partials::Templates;
//!
//! let templates = Templates::builder()
//!     .template("card.html", "<b>{{ name }}</b>")
//!     .template("page.html", "<div>{{ render_partial('card.html', name=name) }}</div>")
//!     .build()
//!     .unwrap();
//!
//! let html = templates
//!     .render("page.html", minijinja::context! { name => "Ada" })
//!     .unwrap();
//! assert_eq!(html, "<div><b>Ada</b></div>");
//! ```
//!
//! An existing environment works too, through [`register_extensions`],
//! [`register_environment`] or the [`PartialsExtension`].
//!
//! ## Configuration
//!
//! [`PartialsConfig`] controls the function name, markup mode, worker count
//! and undefined-variable strictness. It can be loaded from YAML:
//!
//! ```rust
//! use partials::PartialsConfig;
//!
//! let config = PartialsConfig::from_yaml("markup: false\nmax_workers: 4\n").unwrap();
//! assert!(!config.markup);
//! assert_eq!(config.resolved_max_workers(), 4);
//! ```
//!
//! ## Async Applications
//!
//! [`Templates::render_async`] renders a page on a bounded worker pool, off
//! the async runtime's threads. The [`web`] module wires a [`Templates`] into
//! an axum router and stops the pool on graceful shutdown.

pub mod web;

// Rendering core (from partials-render)
pub use partials_render::bridge;
pub use partials_render::context;
pub use partials_render::templates;

// Error type (from partials-render)
pub use partials_render::RenderError;

// Registration (from partials-render)
// `Extension` is renamed so it does not collide with `axum::Extension`.
pub use partials_render::Extension as TemplateExtension;
pub use partials_render::{
    register_environment, register_extensions, register_with_bridge, EnvironmentExt,
    PartialsExtension,
};

// Rendering (from partials-render)
pub use partials_render::{
    render_partial, Fragment, PartialFunction, RenderBridge, RenderContext, RenderPool,
    Templates, TemplatesBuilder, MAX_PARTIAL_DEPTH,
};

// Configuration (from partials-render)
pub use partials_render::{default_max_workers, PartialsConfig, DEFAULT_FUNCTION_NAME};

// Template engine
pub use minijinja;
pub use minijinja::Environment;

// Web framework integration
pub use web::{register_axum_extensions, render_page, shutdown_on, PageError};
