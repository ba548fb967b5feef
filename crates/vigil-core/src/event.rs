//! The event shape handed from sources to the sink.

use std::fmt;

use serde::Serialize;

/// A short symbolic tag plus ordered key/value parameters.
///
/// Tags are fixed tokens chosen by the formatter, so they are never empty.
/// Parameter values are plain text; encoding happens when the dispatcher
/// builds the outbound URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    tag: &'static str,
    params: Vec<(&'static str, String)>,
}

impl NotificationEvent {
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        debug_assert!(!tag.is_empty(), "notification tags must not be empty");
        Self {
            tag,
            params: Vec::new(),
        }
    }

    /// Append a parameter, keeping insertion order.
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    #[must_use]
    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    #[must_use]
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Value of the first parameter named `key`.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Human-readable one-line summary, used for the status label.
    #[must_use]
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag)?;
        for (key, value) in &self.params {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_keep_insertion_order() {
        let event = NotificationEvent::new("accel")
            .with("x", 1)
            .with("y", 2)
            .with("z", 3);
        let keys: Vec<_> = event.params().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
        assert_eq!(event.param("y"), Some("2"));
        assert_eq!(event.param("w"), None);
    }

    #[test]
    fn test_summary() {
        let event = NotificationEvent::new("didRangeBeacon").with("range", "near");
        assert_eq!(event.summary(), "didRangeBeacon range=near");
        assert_eq!(NotificationEvent::new("RESIGN_ACTIVE").summary(), "RESIGN_ACTIVE");
    }
}
