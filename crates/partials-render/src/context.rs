//! Isolated render contexts for partials.
//!
//! A partial sees exactly the variables it is given. [`RenderContext`] is that
//! variable set: a mapping from identifier to [`minijinja::Value`], built from
//! a serializable value, from explicit inserts, or from the arguments of a
//! `render_partial(...)` call inside a template.
//!
//! # Isolation
//!
//! Nothing from the calling template leaks into the partial. A parent that
//! wants its `user` visible in a partial must pass it:
//!
//! ```jinja
//! {{ render_partial('user/card.html', user=user) }}
//! ```
//!
//! # Example
//!
//! ```rust
//! use partials_render::RenderContext;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Card { name: String, age: u32 }
//!
//! let mut ctx = RenderContext::from_serialize(&Card { name: "Ada".into(), age: 36 }).unwrap();
//! ctx.insert("active", true).unwrap();
//!
//! assert_eq!(ctx.len(), 3);
//! assert!(ctx.get("name").is_some());
//! ```

use std::collections::BTreeMap;

use minijinja::value::{Kwargs, Value, ValueKind};
use minijinja::{Error, ErrorKind};
use serde::Serialize;

use crate::error::RenderError;

/// The complete variable set a partial is rendered with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    vars: BTreeMap<String, Value>,
}

impl RenderContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from any value that serializes to a map (structs,
    /// maps, `serde_json::Value::Object`). Unit and `None` give an empty
    /// context.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Context`] if the value is not a map or has a key
    /// that is not a valid identifier.
    pub fn from_serialize<S: Serialize + ?Sized>(data: &S) -> Result<Self, RenderError> {
        Self::from_value(&Value::from_serialize(data))
    }

    /// Builds a context from a template value. Same rules as
    /// [`from_serialize`](Self::from_serialize).
    pub fn from_value(value: &Value) -> Result<Self, RenderError> {
        let mut vars = BTreeMap::new();
        collect_map(value, &mut vars).map_err(RenderError::Context)?;
        Ok(Self { vars })
    }

    /// Builds a context from the arguments of a template call: an optional
    /// positional map, then keyword arguments on top of it.
    ///
    /// Errors are engine errors so they surface inside the calling template
    /// like any other call error.
    pub fn from_call_args(positional: Option<&Value>, kwargs: &Kwargs) -> Result<Self, Error> {
        let mut vars = BTreeMap::new();
        if let Some(value) = positional {
            collect_map(value, &mut vars)
                .map_err(|msg| Error::new(ErrorKind::InvalidOperation, msg))?;
        }
        for name in kwargs.args() {
            let value: Value = kwargs.get(name)?;
            vars.insert(name.to_string(), value);
        }
        kwargs.assert_all_used()?;
        Ok(Self { vars })
    }

    /// Inserts a variable, replacing any previous value under that name.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Context`] if `name` is not a valid identifier.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), RenderError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(RenderError::Context(invalid_name(&name)));
        }
        self.vars.insert(name, value.into());
        Ok(())
    }

    /// Gets a variable by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// The context as a template map value.
    pub fn to_value(&self) -> Value {
        Value::from_serialize(&self.vars)
    }

    pub(crate) fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }
}

/// Whether `name` can be used as a template variable: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid_name(name: &str) -> String {
    format!("{:?} is not a valid variable name", name)
}

fn collect_map(value: &Value, vars: &mut BTreeMap<String, Value>) -> Result<(), String> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(()),
        ValueKind::Map => {
            let keys = value.try_iter().map_err(|e| e.to_string())?;
            for key in keys {
                let name = key
                    .as_str()
                    .ok_or_else(|| format!("variable names must be strings, got {}", key.kind()))?;
                if !is_identifier(name) {
                    return Err(invalid_name(name));
                }
                let item = value.get_item(&key).map_err(|e| e.to_string())?;
                vars.insert(name.to_string(), item);
            }
            Ok(())
        }
        kind => Err(format!("expected a map of variables, got {}", kind)),
    }
}
