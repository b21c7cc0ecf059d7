//! Rendered partial output.

use std::fmt;

use minijinja::Value;

/// The output of a partial render.
///
/// A fragment is either safe markup, which an auto-escaping parent inserts
/// verbatim, or plain text, which the parent escapes once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    html: String,
    safe: bool,
}

impl Fragment {
    pub fn new(html: String, safe: bool) -> Self {
        Self { html, safe }
    }

    /// A fragment marked as pre-escaped markup.
    pub fn markup(html: impl Into<String>) -> Self {
        Self::new(html.into(), true)
    }

    /// A fragment the embedding template will escape.
    pub fn text(html: impl Into<String>) -> Self {
        Self::new(html.into(), false)
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    /// Converts to the value handed back to the calling template.
    pub fn into_value(self) -> Value {
        if self.safe {
            Value::from_safe_string(self.html)
        } else {
            Value::from(self.html)
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

impl From<Fragment> for Value {
    fn from(fragment: Fragment) -> Self {
        fragment.into_value()
    }
}

impl From<Fragment> for String {
    fn from(fragment: Fragment) -> Self {
        fragment.html
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_value_is_safe() {
        let value = Fragment::markup("<b>Ada</b>").into_value();
        assert!(value.is_safe());
        assert_eq!(value.as_str(), Some("<b>Ada</b>"));
    }

    #[test]
    fn test_text_value_is_not_safe() {
        let value = Fragment::text("<b>Ada</b>").into_value();
        assert!(!value.is_safe());
        assert_eq!(value.as_str(), Some("<b>Ada</b>"));
    }

    #[test]
    fn test_display() {
        let fragment = Fragment::markup("<p>hi</p>");
        assert_eq!(fragment.to_string(), "<p>hi</p>");
        assert!(fragment.is_safe());
        assert_eq!(String::from(fragment), "<p>hi</p>");
    }
}
