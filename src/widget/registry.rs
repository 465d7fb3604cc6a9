//! Per-page widget bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::instance::{DEFAULT_REPLY_DELAY, Widget};

/// Default retention for idle widgets (30 minutes).
const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 60);

/// What an activation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// First activation for this page key: the widget was created.
    Created,
    /// The widget existed and was hidden; it is now shown.
    Shown,
    /// The widget existed and was visible; it is now hidden.
    Hidden,
}

/// Thread-safe registry holding at most one widget per page key.
#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    widgets: RwLock<HashMap<String, Widget>>,
    /// Reply delay injected into every widget this registry creates.
    reply_delay: Duration,
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRegistry {
    /// Create a registry whose widgets use the default reply delay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reply_delay(DEFAULT_REPLY_DELAY)
    }

    /// Create a registry whose widgets use a custom reply delay.
    #[must_use]
    pub fn with_reply_delay(reply_delay: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                widgets: RwLock::new(HashMap::new()),
                reply_delay,
            }),
        }
    }

    /// Activate the widget for a page key.
    ///
    /// Creates the widget on first activation; afterwards each call toggles
    /// visibility. Never creates a duplicate for a key that already has one.
    pub fn activate(&self, page_id: &str) -> (Widget, Activation) {
        // Fast path for the common toggle case.
        if let Some(widget) = self.get(page_id) {
            let outcome = if widget.toggle() {
                Activation::Shown
            } else {
                Activation::Hidden
            };
            return (widget, outcome);
        }

        // Create under the write lock so concurrent first activations for
        // the same key still yield a single instance.
        let mut guard = self.inner.widgets.write().unwrap();
        if let Some(widget) = guard.get(page_id) {
            let widget = widget.clone();
            drop(guard);
            let outcome = if widget.toggle() {
                Activation::Shown
            } else {
                Activation::Hidden
            };
            return (widget, outcome);
        }

        let widget = Widget::with_reply_delay(page_id, self.inner.reply_delay);
        guard.insert(page_id.to_string(), widget.clone());
        (widget, Activation::Created)
    }

    /// Get the widget for a page key.
    #[must_use]
    pub fn get(&self, page_id: &str) -> Option<Widget> {
        let guard = self.inner.widgets.read().unwrap();
        guard.get(page_id).cloned()
    }

    /// Remove the widget for a page key.
    pub fn remove(&self, page_id: &str) -> Option<Widget> {
        let mut guard = self.inner.widgets.write().unwrap();
        guard.remove(page_id)
    }

    /// Number of live widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.widgets.read().unwrap().len()
    }

    /// Check if there are no widgets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List all page keys.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.inner.widgets.read().unwrap().keys().cloned().collect()
    }

    /// Drop widgets idle past the default retention.
    ///
    /// Returns the number of widgets removed.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_with_retention(DEFAULT_RETENTION)
    }

    /// Drop widgets that have seen no activity for `retention`.
    pub fn sweep_idle_with_retention(&self, retention: Duration) -> usize {
        let mut guard = self.inner.widgets.write().unwrap();
        let before = guard.len();
        guard.retain(|_, widget| !widget.is_idle_for(retention));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::message::GREETING;

    #[test]
    fn test_first_activation_creates_visible_widget() {
        let registry = WidgetRegistry::new();

        let (widget, outcome) = registry.activate("page-1");
        assert_eq!(outcome, Activation::Created);
        assert!(widget.is_visible());
        assert_eq!(widget.message_count(), 1);
        assert_eq!(widget.messages()[0].text, GREETING);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_repeated_activation_toggles_without_duplicating() {
        let registry = WidgetRegistry::new();

        let (first, _) = registry.activate("page-1");
        let (second, outcome) = registry.activate("page-1");
        assert_eq!(outcome, Activation::Hidden);
        assert!(!second.is_visible());

        let (third, outcome) = registry.activate("page-1");
        assert_eq!(outcome, Activation::Shown);
        assert!(third.is_visible());

        // Still one instance, still one greeting.
        assert_eq!(registry.len(), 1);
        assert_eq!(first.message_count(), 1);
    }

    #[test]
    fn test_pages_are_independent() {
        let registry = WidgetRegistry::new();

        registry.activate("page-1");
        registry.activate("page-2");
        assert_eq!(registry.len(), 2);

        let (widget, outcome) = registry.activate("page-1");
        assert_eq!(outcome, Activation::Hidden);
        assert!(!widget.is_visible());
        assert!(registry.get("page-2").unwrap().is_visible());
    }

    #[test]
    fn test_sweep_drops_only_idle_widgets() {
        let registry = WidgetRegistry::new();

        registry.activate("page-1");
        assert_eq!(registry.sweep_idle_with_retention(Duration::from_secs(60)), 0);
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.sweep_idle_with_retention(Duration::ZERO), 1);
        assert!(registry.is_empty());
    }
}
