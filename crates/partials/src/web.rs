//! axum integration.
//!
//! [`register_axum_extensions`] makes a [`Templates`] available to every
//! handler as an [`Extension`]. Handlers render with [`render_page`], which
//! runs the page on the worker pool and maps failures to [`PageError`], a 500
//! response.
//!
//! ```rust,no_run
//! use axum::{response::Html, routing::get, Extension, Router};
//! use partials::web::{register_axum_extensions, render_page, shutdown_on, PageError};
//! use partials::Templates;
//!
//! async fn index(Extension(templates): Extension<Templates>) -> Result<Html<String>, PageError> {
//!     render_page(&templates, "home/index.html", &minijinja::context! { items => Vec::<String>::new() }).await
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let templates = Templates::new("templates")?;
//! let app = register_axum_extensions(Router::new().route("/", get(index)), &templates);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(shutdown_on(templates, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Router};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use partials_render::{RenderError, Templates};

/// Adds `templates` to the router as a request extension.
///
/// Handlers extract it with `Extension<Templates>`. The clone shares the
/// environment and worker pool with the caller's copy.
pub fn register_axum_extensions<S>(router: Router<S>, templates: &Templates) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(Extension(templates.clone()))
}

/// Renders `name` with `ctx` for an HTTP response.
pub async fn render_page<S: Serialize + ?Sized>(
    templates: &Templates,
    name: &str,
    ctx: &S,
) -> Result<Html<String>, PageError> {
    let html = templates.render_async(name, ctx).await?;
    Ok(Html(html))
}

/// A page that failed to render.
///
/// Responds with `500 Internal Server Error`. The details are logged, not
/// sent to the client.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct PageError(#[from] RenderError);

impl PageError {
    pub fn render_error(&self) -> &RenderError {
        &self.0
    }

    pub fn into_inner(self) -> RenderError {
        self.0
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!(error = %self.0, not_found = self.0.is_not_found(), "page render failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

/// Waits for `signal`, then stops the template worker pool.
///
/// Meant for `axum::serve(..).with_graceful_shutdown(..)`. Requests still in
/// flight once the pool is stopped render on their own thread.
pub fn shutdown_on<F>(templates: Templates, signal: F) -> impl Future<Output = ()> + Send + 'static
where
    F: Future<Output = ()> + Send + 'static,
{
    async move {
        signal.await;
        debug!("shutdown signal received, stopping template workers");
        // Joining the workers blocks.
        let stopped = tokio::task::spawn_blocking(move || templates.shutdown()).await;
        if let Err(e) = stopped {
            error!(error = %e, "failed to stop template workers");
        }
    }
}
