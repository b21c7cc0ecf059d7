//! Bridging synchronous renders out of async runtimes.
//!
//! Template rendering is synchronous. When it happens on a thread that a tokio
//! runtime is driving, a slow render stalls every other task scheduled on that
//! thread. [`RenderBridge`] moves such renders onto a bounded [`RenderPool`]:
//!
//! - [`RenderBridge::render`] awaits the result, so the runtime keeps running
//!   other tasks while a worker renders.
//! - Partials called from a template rendered on a runtime thread are
//!   submitted to the pool and the template evaluation blocks until the
//!   fragment is ready (`block_in_place` on multi-thread runtimes, so the
//!   runtime can move its other tasks elsewhere).
//! - Outside a runtime, renders run directly on the calling thread.
//!
//! Pool workers never have a runtime context, so partials nested inside a
//! pooled render run directly on the worker. A pool of any size cannot
//! deadlock on nested partials.
//!
//! # Lifecycle
//!
//! The pool is created on first use and sized by
//! [`PartialsConfig::max_workers`](crate::PartialsConfig::max_workers). Call
//! [`RenderBridge::shutdown`] when the owning application stops; otherwise the
//! pool is stopped when the bridge is dropped. After shutdown every render
//! takes the direct path.

mod pool;

pub use pool::RenderPool;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crossbeam::channel;
use minijinja::{Environment, Error, ErrorKind};
use once_cell::sync::OnceCell;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::PartialsConfig;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::renderer::{current_depth, render_nested, render_raw};

/// Runs partial renders on a lazily started worker pool when called from
/// inside an async runtime.
pub struct RenderBridge {
    max_workers: usize,
    pool: OnceCell<RenderPool>,
    env: OnceCell<Weak<Environment<'static>>>,
    closed: AtomicBool,
}

impl RenderBridge {
    /// Creates a bridge whose pool will have `max_workers` threads.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            pool: OnceCell::new(),
            env: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &PartialsConfig) -> Self {
        Self::new(config.resolved_max_workers())
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Binds the environment that in-template partial calls render against.
    ///
    /// Only a weak reference is kept: the environment owns the function that
    /// owns this bridge. Returns `false` if a different environment was bound
    /// first.
    pub fn bind(&self, env: &Arc<Environment<'static>>) -> bool {
        let weak = self.env.get_or_init(|| Arc::downgrade(env));
        Weak::ptr_eq(weak, &Arc::downgrade(env))
    }

    /// Whether the worker pool has been started.
    pub fn is_started(&self) -> bool {
        self.pool.get().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops the worker pool, if it was started. Idempotent.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(pool) = self.pool.get() {
            pool.shutdown();
        }
        debug!("partial render bridge shut down");
    }

    /// Renders `name` on the worker pool and awaits the result.
    ///
    /// After [`shutdown`](Self::shutdown) the render runs on the calling thread.
    pub async fn render(
        &self,
        env: Arc<Environment<'static>>,
        name: &str,
        ctx: RenderContext,
    ) -> Result<String, RenderError> {
        let Some(pool) = self.pool()? else {
            warn!(template = name, "render pool is shut down, rendering inline");
            return Ok(render_raw(&env, name, &ctx)?);
        };

        let (tx, rx) = oneshot::channel();
        let template = name.to_string();
        pool.execute(move || {
            let _ = tx.send(render_raw(&env, &template, &ctx));
        })?;

        let rendered = rx
            .await
            .map_err(|_| RenderError::Worker(format!("render of {} was dropped", name)))?;
        Ok(rendered?)
    }

    /// Renders `name` from synchronous code.
    ///
    /// Inside a runtime the render runs on the pool and this call blocks until
    /// it completes. Outside a runtime it runs directly.
    pub fn render_blocking(
        &self,
        env: &Arc<Environment<'static>>,
        name: &str,
        ctx: &RenderContext,
    ) -> Result<String, RenderError> {
        let Ok(handle) = Handle::try_current() else {
            return Ok(render_raw(env, name, ctx)?);
        };
        let depth = current_depth();
        match self.submit_and_wait(&handle, Arc::clone(env), name, ctx, depth)? {
            Some(rendered) => Ok(rendered?),
            None => Ok(render_raw(env, name, ctx)?),
        }
    }

    /// Entry point for `render_partial(...)` calls during template evaluation.
    pub(crate) fn render_in_template(
        &self,
        env: &Environment<'_>,
        name: &str,
        ctx: &RenderContext,
    ) -> Result<String, Error> {
        let Ok(handle) = Handle::try_current() else {
            return render_raw(env, name, ctx);
        };
        let Some(shared) = self.bound_to(env) else {
            return render_raw(env, name, ctx);
        };
        let depth = current_depth();
        match self.submit_and_wait(&handle, shared, name, ctx, depth) {
            Ok(Some(rendered)) => rendered,
            Ok(None) => render_raw(env, name, ctx),
            Err(err) => Err(Error::new(
                ErrorKind::InvalidOperation,
                "could not hand partial to a render worker",
            )
            .with_source(err)),
        }
    }

    /// Returns `None` when the bridge is closed.
    fn pool(&self) -> Result<Option<&RenderPool>, RenderError> {
        if self.is_closed() {
            return Ok(None);
        }
        self.pool
            .get_or_try_init(|| RenderPool::new(self.max_workers))
            .map(Some)
    }

    fn bound_to(&self, env: &Environment<'_>) -> Option<Arc<Environment<'static>>> {
        let shared = self.env.get()?.upgrade()?;
        let same = std::ptr::eq(
            Arc::as_ptr(&shared) as *const (),
            env as *const Environment<'_> as *const (),
        );
        same.then_some(shared)
    }

    /// Runs the render on the pool and blocks for the result. `Ok(None)` means
    /// the bridge is closed and the caller should render directly.
    ///
    /// `depth` is the caller's partial nesting, carried over to the worker.
    fn submit_and_wait(
        &self,
        handle: &Handle,
        env: Arc<Environment<'static>>,
        name: &str,
        ctx: &RenderContext,
        depth: usize,
    ) -> Result<Option<Result<String, Error>>, RenderError> {
        let Some(pool) = self.pool()? else {
            warn!(template = name, "render pool is shut down, rendering inline");
            return Ok(None);
        };

        let (tx, rx) = channel::bounded(1);
        let template = name.to_string();
        let ctx = ctx.clone();
        pool.execute(move || {
            let _ = tx.send(render_nested(&env, &template, &ctx, depth));
        })?;

        let received = match handle.runtime_flavor() {
            RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| rx.recv()),
            _ => rx.recv(),
        };
        received
            .map(Some)
            .map_err(|_| RenderError::Worker(format!("render of {} was dropped", name)))
    }
}

impl Drop for RenderBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for RenderBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderBridge")
            .field("max_workers", &self.max_workers)
            .field("pool", &self.pool.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}
