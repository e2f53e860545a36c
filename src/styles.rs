//! Stylesheet rule tracking
//!
//! Components rendered behind an encapsulation boundary cannot see the
//! document's stylesheets, so they pull the rules that mention their class
//! names and embed them. [`StylesTracker`] answers "which rules select
//! `.myclass`" from a per-class cache, and tells interested listeners when a
//! stylesheet change invalidates what they pulled.
//!
//! Stylesheets live in a [`StyleRegistry`]. The tracker subscribes to it and
//! receives a [`StyleChange`] for every added or removed sheet; the registry
//! holds only a weak handle back to the tracker.
//!
//! # Locking
//!
//! No lock is held while a callback runs, so listeners may call back into
//! the tracker or the registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use regex::Regex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Prefix of generated listener ids.
pub const LISTENER_PREFIX: &str = "styles-listener-";

type Callback = Arc<dyn Fn() + Send + Sync>;
type Subscriber = Arc<dyn Fn(&StyleChange) + Send + Sync>;

// =============================================================================
// StyleSheet
// =============================================================================

/// Identifier of a stylesheet, increasing in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SheetId(u64);

/// A stylesheet split into top-level rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    id: SheetId,
    rules: Vec<String>,
}

impl StyleSheet {
    fn parse(id: SheetId, css: &str) -> Self {
        Self {
            id,
            rules: split_rules(css),
        }
    }

    pub fn id(&self) -> SheetId {
        self.id
    }

    /// Top-level rules in source order, trimmed.
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// All rules joined by single spaces.
    pub fn css_text(&self) -> String {
        self.rules.join(" ")
    }

    fn selects(&self, pattern: &Regex) -> bool {
        self.rules.iter().any(|rule| pattern.is_match(rule))
    }
}

/// Split CSS text at closing braces that end a top-level block.
///
/// Nested blocks (`@media`, `@supports`) stay one rule. Text after the last
/// block is dropped.
fn split_rules(css: &str) -> Vec<String> {
    let mut rules = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, c) in css.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let rule = css[start..=pos].trim();
                    if !rule.is_empty() {
                        rules.push(rule.to_string());
                    }
                    start = pos + 1;
                }
            }
            _ => {}
        }
    }
    rules
}

/// Pattern matching a rule that selects `.class`.
///
/// The class must be followed by `[`, ` >`, `:`, ` .`, ` {` or ` #`.
fn class_pattern(class: &str) -> Option<Regex> {
    Regex::new(&format!(r"\.{}(\[|\s>|:|\s\.|\s\{{|\s#)", regex::escape(class))).ok()
}

// =============================================================================
// StyleRegistry
// =============================================================================

/// Stylesheets added to or removed from a registry.
#[derive(Debug, Clone, Default)]
pub struct StyleChange {
    pub added: Vec<Arc<StyleSheet>>,
    pub removed: Vec<Arc<StyleSheet>>,
}

impl StyleChange {
    fn sheets(&self) -> impl Iterator<Item = &Arc<StyleSheet>> {
        self.added.iter().chain(&self.removed)
    }
}

/// Handle of a registry subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

/// Ordered set of stylesheets with change subscriptions.
///
/// Plays the part of a document head: sheets are kept in insertion order
/// and every insertion or removal is announced to subscribers.
#[derive(Default)]
pub struct StyleRegistry {
    sheets: RwLock<Vec<Arc<StyleSheet>>>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_sheet: AtomicUsize,
    next_subscription: AtomicUsize,
}

impl fmt::Debug for StyleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleRegistry")
            .field("sheets", &self.sheets.read().len())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl StyleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a stylesheet at the end.
    pub fn insert(&self, css: &str) -> SheetId {
        let id = SheetId(self.next_sheet.fetch_add(1, Ordering::Relaxed) as u64);
        let sheet = Arc::new(StyleSheet::parse(id, css));
        self.sheets.write().push(Arc::clone(&sheet));
        trace!(sheet = id.0, rules = sheet.rules.len(), "stylesheet added");
        self.publish(&StyleChange {
            added: vec![sheet],
            removed: Vec::new(),
        });
        id
    }

    /// Remove a stylesheet. `None` when it is not registered.
    pub fn remove(&self, id: SheetId) -> Option<Arc<StyleSheet>> {
        let sheet = {
            let mut sheets = self.sheets.write();
            let pos = sheets.iter().position(|sheet| sheet.id == id)?;
            sheets.remove(pos)
        };
        trace!(sheet = id.0, "stylesheet removed");
        self.publish(&StyleChange {
            added: Vec::new(),
            removed: vec![Arc::clone(&sheet)],
        });
        Some(sheet)
    }

    /// Current stylesheets in insertion order.
    pub fn sheets(&self) -> Vec<Arc<StyleSheet>> {
        self.sheets.read().clone()
    }

    pub fn len(&self) -> usize {
        self.sheets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `callback` after every change.
    pub fn subscribe(&self, callback: impl Fn(&StyleChange) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|(sub, _)| *sub != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn publish(&self, change: &StyleChange) {
        let subscribers: SmallVec<[Subscriber; 4]> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in subscribers {
            callback(change);
        }
    }
}

// =============================================================================
// StylesTracker
// =============================================================================

/// Handle of a registered listener, `styles-listener-<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(String);

impl ListenerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct TrackerState {
    listeners: FxHashMap<ListenerId, Callback>,
    /// Class name -> sheets with a rule selecting it
    cache: FxHashMap<String, Vec<Arc<StyleSheet>>>,
    /// Listener -> class names it last asked for
    interests: FxHashMap<ListenerId, Vec<String>>,
    /// Class name -> listeners interested in it
    class_listeners: FxHashMap<String, Vec<ListenerId>>,
}

impl TrackerState {
    fn set_interests(&mut self, listener: &ListenerId, classes: &[String]) {
        let previous = self.interests.remove(listener).unwrap_or_default();
        for class in previous.iter().filter(|class| !classes.contains(class)) {
            if let Some(ids) = self.class_listeners.get_mut(class) {
                ids.retain(|id| id != listener);
                if ids.is_empty() {
                    self.class_listeners.remove(class);
                }
            }
        }
        for class in classes.iter().filter(|class| !previous.contains(class)) {
            self.class_listeners
                .entry(class.clone())
                .or_default()
                .push(listener.clone());
        }
        self.interests.insert(listener.clone(), classes.to_vec());
    }

    fn forget(&mut self, listener: &ListenerId) {
        self.set_interests(listener, &[]);
        self.interests.remove(listener);
    }
}

/// Per-class stylesheet rule cache with change listeners.
pub struct StylesTracker {
    registry: Arc<StyleRegistry>,
    subscription: SubscriptionId,
    state: Mutex<TrackerState>,
    next_listener: AtomicUsize,
}

impl fmt::Debug for StylesTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StylesTracker")
            .field("listeners", &state.listeners.len())
            .field("cached_classes", &state.cache.len())
            .finish()
    }
}

impl StylesTracker {
    /// Track the stylesheets of `registry`.
    pub fn new(registry: &Arc<StyleRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = registry.subscribe(move |change| {
                if let Some(tracker) = weak.upgrade() {
                    tracker.notify(change);
                }
            });
            Self {
                registry: Arc::clone(registry),
                subscription,
                state: Mutex::new(TrackerState::default()),
                next_listener: AtomicUsize::new(1),
            }
        })
    }

    /// Register a callback run when styles a listener pulled may have changed.
    pub fn register_listener(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let n = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let id = ListenerId(format!("{LISTENER_PREFIX}{n}"));
        self.state.lock().listeners.insert(id.clone(), Arc::new(callback));
        id
    }

    /// Drop a listener and its interests. Unknown ids are ignored.
    pub fn unregister_listener(&self, id: &ListenerId) {
        let mut state = self.state.lock();
        state.listeners.remove(id);
        state.forget(id);
    }

    /// Rules of every stylesheet selecting one of `class_names`.
    ///
    /// Entries may hold several space separated names. Sheets are listed
    /// once, in registry order, their rules joined by single spaces. With a
    /// registered `listener`, its interest set becomes exactly these names.
    pub fn get_styles<'a, I>(&self, class_names: I, listener: Option<&ListenerId>) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut classes: Vec<String> = Vec::new();
        for class in class_names.into_iter().flat_map(str::split_whitespace) {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }

        let mut state = self.state.lock();
        if let Some(listener) = listener
            && state.listeners.contains_key(listener)
        {
            state.set_interests(listener, &classes);
        }

        let mut selected: BTreeMap<SheetId, Arc<StyleSheet>> = BTreeMap::new();
        for class in &classes {
            if !state.cache.contains_key(class) {
                let sheets = self.scan(class);
                state.cache.insert(class.clone(), sheets);
            }
            for sheet in state.cache.get(class).into_iter().flatten() {
                selected.insert(sheet.id, Arc::clone(sheet));
            }
        }

        selected
            .values()
            .map(|sheet| sheet.css_text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Invalidate the classes a change touches and call their listeners.
    pub fn notify(&self, change: &StyleChange) {
        let callbacks: Vec<Callback> = {
            let mut state = self.state.lock();
            let mut tracked: Vec<&String> = state.cache.keys().collect();
            tracked.extend(state.class_listeners.keys().filter(|c| !state.cache.contains_key(*c)));

            let affected: Vec<String> = tracked
                .into_iter()
                .filter(|class| {
                    class_pattern(class)
                        .is_some_and(|pattern| change.sheets().any(|sheet| sheet.selects(&pattern)))
                })
                .cloned()
                .collect();
            if affected.is_empty() {
                return;
            }
            debug!(classes = ?affected, "stylesheet change invalidates cached classes");

            let mut to_call: Vec<ListenerId> = Vec::new();
            for class in &affected {
                state.cache.remove(class);
                for id in state.class_listeners.get(class).into_iter().flatten() {
                    if !to_call.contains(id) {
                        to_call.push(id.clone());
                    }
                }
            }
            to_call
                .iter()
                .filter_map(|id| state.listeners.get(id).cloned())
                .collect()
        };

        for callback in callbacks {
            callback();
        }
    }

    /// Sheets of the registry with a rule selecting `class`.
    fn scan(&self, class: &str) -> Vec<Arc<StyleSheet>> {
        let Some(pattern) = class_pattern(class) else {
            return Vec::new();
        };
        self.registry
            .sheets()
            .into_iter()
            .filter(|sheet| sheet.selects(&pattern))
            .collect()
    }
}

impl Drop for StylesTracker {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.subscription);
    }
}

// =============================================================================
// Tests
// =============================================================================
