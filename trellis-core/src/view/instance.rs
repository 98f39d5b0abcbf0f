//! View instances.
//!
//! # Resolution
//!
//! A key is looked up in the view's own state, then in its properties, then
//! along the owner chain. Reads use the first container holding the key.
//! Writes always go to the view's own state; a child never writes through
//! to its owner.
//!
//! # Lifecycle
//!
//! ```text
//! construct ── created ── process hook ── text bindings ── ready ── construct (class)
//!                                          └─ on error: drop bindings, mark destroyed
//! mount     ── mount ── bind
//! unmount   ── unmount ── unbind          (only when attached)
//! destroy   ── destroy ── unmount ── drop bindings and instance listeners
//! ```
//!
//! A view whose text bindings fail to resolve is never handed out. Any
//! bindings it already made are released and it reports itself destroyed
//! to whoever captured it from `created`.
//!
//! Every event runs the class listeners first and the instance listeners
//! second, both with the view as receiver.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::accessor::PropAccessor;
use super::class::ViewClass;
use super::options::{into_map, ViewOptions};
use crate::config::{FilterScope, LookupPolicy, PropsMode};
use crate::dom::Node;
use crate::error::{Result, ViewError};
use crate::events::{Emitter, Events};
use crate::interpolate::{Filters, Template};
use crate::model::{Change, Keys, Model, SubscriberId, Unbind};

static VIEW_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of a view instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        Self(VIEW_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) struct ViewInner {
    id: ViewId,
    class: ViewClass,
    el: Node,
    state: Model,
    props: Model,
    owner: Option<Weak<ViewInner>>,
    root: Weak<ViewInner>,
    events: Emitter<View>,
    /// Set when the class uses [`FilterScope::Snapshot`].
    filters: Option<Filters>,
    bindings: Mutex<Vec<(SubscriberId, Unbind)>>,
    destroyed: AtomicBool,
}

/// A live view: an element plus the state and properties behind it.
///
/// Cloning yields another handle to the same view.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

impl View {
    pub(crate) fn construct(class: &ViewClass, data: Value, options: ViewOptions) -> Result<View> {
        let ViewOptions {
            owner,
            state,
            template,
            props,
            data: fallback,
        } = options;
        let config = class.config();

        let seed = if data.is_null() { props.or(fallback) } else { Some(data) };
        let props = Model::new(class.props_schema().clone(), into_map("props", seed)?);
        match config.props {
            PropsMode::Frozen => props.freeze(),
            PropsMode::Sealed => props.seal(),
            PropsMode::Mutable => {}
        }
        let state = Model::new(class.state_schema().clone(), into_map("state", state)?);

        let markup = template.as_deref().unwrap_or(class.template());
        let el = class.renderer().render(markup)?;

        let filters = match config.filters {
            FilterScope::Shared => None,
            FilterScope::Snapshot => Some(class.filters()),
        };

        let inner = Arc::new_cyclic(|me: &Weak<ViewInner>| ViewInner {
            id: ViewId::next(),
            class: class.clone(),
            el,
            state,
            props,
            owner: owner.as_ref().map(|owner| Arc::downgrade(&owner.inner)),
            root: owner
                .as_ref()
                .map_or_else(|| me.clone(), |owner| owner.inner.root.clone()),
            events: Emitter::new(),
            filters,
            bindings: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        });
        let view = View { inner };

        for (event, listener) in class.instance_events() {
            view.inner.events.register(&event, listener, false);
        }

        debug!(
            view = %view.id(),
            owner = ?owner.as_ref().map(View::id),
            "view constructed"
        );
        view.fire("created", &[]);
        if let Some(hook) = class.process_hook() {
            hook(&view);
        }
        if config.text_bindings {
            if let Err(err) = view.bind_text() {
                view.abandon();
                return Err(err);
            }
        }
        view.fire("ready", &[]);
        class.emit(&view, "construct", &[]);

        Ok(view)
    }

    pub fn id(&self) -> ViewId {
        self.inner.id
    }

    /// The view's element.
    pub fn el(&self) -> &Node {
        &self.inner.el
    }

    /// Local state. Computed keys of the class live here.
    pub fn state(&self) -> &Model {
        &self.inner.state
    }

    /// Properties handed in at construction.
    pub fn props(&self) -> &Model {
        &self.inner.props
    }

    pub fn class(&self) -> &ViewClass {
        &self.inner.class
    }

    pub fn owner(&self) -> Option<View> {
        self.inner.owner.as_ref()?.upgrade().map(|inner| View { inner })
    }

    /// Top of the owner chain. A view without an owner is its own root.
    pub fn root(&self) -> Option<View> {
        self.inner.root.upgrade().map(|inner| View { inner })
    }

    pub fn is_root(&self) -> bool {
        self.inner.owner.is_none()
    }

    /// Whether the element currently has a parent.
    pub fn is_mounted(&self) -> bool {
        self.inner.el.parent().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Whether both handles refer to the same view.
    pub fn ptr_eq(&self, other: &View) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The container that answers reads of `key`.
    ///
    /// When no container in the chain has the key, lenient lookup falls back
    /// to this view's own state and strict lookup fails.
    pub fn lookup(&self, key: &str) -> Result<Model> {
        if let Some(model) = self.find(key) {
            return Ok(model);
        }
        match self.inner.class.config().lookup {
            LookupPolicy::Lenient => Ok(self.inner.state.clone()),
            LookupPolicy::Strict => Err(ViewError::PropertyNotFound { key: key.to_owned() }),
        }
    }

    fn find(&self, key: &str) -> Option<Model> {
        if self.inner.state.has(key) {
            return Some(self.inner.state.clone());
        }
        if self.inner.props.has(key) {
            return Some(self.inner.props.clone());
        }
        self.owner()?.find(key)
    }

    /// Read `key` from the container [`lookup`](Self::lookup) picks.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lookup(key)?.get(key))
    }

    /// Read several keys, each resolved on its own.
    pub fn get_many(&self, keys: impl Into<Keys>) -> Result<IndexMap<String, Option<Value>>> {
        let keys: Keys = keys.into();
        keys.iter()
            .map(|key| self.get(key).map(|value| (key.to_owned(), value)))
            .collect()
    }

    /// Write `key` to local state.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> &Self {
        self.inner.state.set(key, value);
        self
    }

    /// Write every entry of an object to local state in one batch.
    pub fn set_many(&self, values: Value) -> Result<&Self> {
        let values = into_map("set", Some(values))?;
        self.inner.state.set_many(values);
        Ok(self)
    }

    /// Remove `key` from local state.
    pub fn unset(&self, key: &str) -> &Self {
        self.inner.state.unset(key);
        self
    }

    /// Watch `keys` wherever they resolve.
    ///
    /// Keys living in different containers get one subscription per
    /// container. The returned handle drops all of them, and so does
    /// [`destroy`](Self::destroy).
    pub fn change<F>(&self, keys: impl Into<Keys>, handler: F) -> Result<Unbind>
    where
        F: Fn(&[Change]) + Send + Sync + 'static,
    {
        if self.is_destroyed() {
            return Err(ViewError::Destroyed(self.id()));
        }

        let keys: Keys = keys.into();
        let mut groups: Vec<(Model, Keys)> = Vec::new();
        for key in keys.iter() {
            let model = self.lookup(key)?;
            match groups.iter().position(|(existing, _)| existing.ptr_eq(&model)) {
                Some(index) => groups[index].1.push(key),
                None => groups.push((model, Keys::from(key))),
            }
        }

        let handler = Arc::new(handler);
        let handles = groups
            .into_iter()
            .map(|(model, keys)| {
                trace!(view = %self.id(), model = model.id(), ?keys, "watching");
                let handler = handler.clone();
                model.change(keys, move |changes: &[Change]| handler(changes))
            })
            .collect();

        let id = SubscriberId::new();
        let handles = Unbind::all(handles);
        self.inner.bindings.lock().push((id, handles.clone()));

        let view = Arc::downgrade(&self.inner);
        Ok(Unbind::new(move || {
            handles.unbind();
            if let Some(inner) = view.upgrade() {
                inner.bindings.lock().retain(|(binding, _)| *binding != id);
            }
        }))
    }

    /// Number of live subscriptions made through [`change`](Self::change)
    /// and [`interpolate`](Self::interpolate).
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.lock().len()
    }

    /// Render `source` now and again whenever a key it references changes.
    ///
    /// `handler` receives the rendered text each time.
    pub fn interpolate<F>(&self, source: &str, handler: F) -> Result<Unbind>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let template = Template::parse(source);
        handler(&self.render(&template)?);
        if template.is_static() {
            return Ok(Unbind::noop());
        }

        let keys = template.keys().clone();
        let view = Arc::downgrade(&self.inner);
        self.change(keys, move |_: &[Change]| {
            let Some(inner) = view.upgrade() else {
                return;
            };
            let view = View { inner };
            match view.render(&template) {
                Ok(text) => handler(&text),
                Err(err) => warn!(view = %view.id(), error = %err, "interpolation failed"),
            }
        })
    }

    fn render(&self, template: &Template) -> Result<String> {
        let values = self.get_many(template.keys().clone())?;
        Ok(template.render(&values, &self.filters()))
    }

    /// Filters visible to this view's interpolations.
    pub fn filters(&self) -> Filters {
        match &self.inner.filters {
            Some(filters) => filters.clone(),
            None => self.inner.class.filters(),
        }
    }

    fn bind_text(&self) -> Result<()> {
        for node in self.inner.el.text_nodes() {
            let source = node.text_content();
            if !source.contains("{{") {
                continue;
            }
            self.interpolate(&source, move |text| node.set_text(text))?;
        }
        Ok(())
    }

    /// Accessor for a declared property.
    pub fn accessor(&self, name: &str) -> Option<PropAccessor<'_>> {
        self.inner
            .class
            .is_declared(name)
            .then(|| PropAccessor::new(self, name))
    }

    /// Accessors for every declared property, in declaration order.
    pub fn accessors(&self) -> Vec<PropAccessor<'_>> {
        self.inner
            .class
            .declared_props()
            .iter()
            .map(|name| PropAccessor::new(self, name))
            .collect()
    }

    /// Attach the element under `target`, then emit `mount` and `bind`.
    ///
    /// `mount` listeners get the target as `{"tag": .., "id": ..}`.
    pub fn mount(&self, target: &Node) -> Result<&Self> {
        self.ensure_alive()?;
        target.append_child(&self.inner.el)?;
        debug!(view = %self.id(), "view mounted");
        self.fire("mount", &[describe(target)]);
        self.fire("bind", &[]);
        Ok(self)
    }

    /// Put the element where `target` is, then emit `mount` and `bind`.
    /// The `mount` argument describes the replaced target.
    ///
    /// Fails with [`ViewError::DetachedTarget`] when `target` has no parent.
    pub fn mount_replace(&self, target: &Node) -> Result<&Self> {
        self.ensure_alive()?;
        let parent = target.parent().ok_or(ViewError::DetachedTarget)?;
        let replaced = describe(target);
        parent.replace_child(&self.inner.el, target)?;
        debug!(view = %self.id(), "view mounted in place of target");
        self.fire("mount", &[replaced]);
        self.fire("bind", &[]);
        Ok(self)
    }

    /// Detach the element. Emits `unmount` and `unbind` only when the
    /// element was attached.
    pub fn unmount(&self) -> &Self {
        if self.inner.el.detach() {
            debug!(view = %self.id(), "view unmounted");
            self.fire("unmount", &[]);
            self.fire("unbind", &[]);
        }
        self
    }

    /// Emit `bind`.
    pub fn bind(&self) -> &Self {
        self.fire("bind", &[]);
        self
    }

    /// Emit `unbind`.
    pub fn unbind(&self) -> &Self {
        self.fire("unbind", &[]);
        self
    }

    /// Tear the view down. Later calls do nothing.
    ///
    /// Emits `destroy`, unmounts, drops every change subscription made
    /// through this view and removes the instance listeners. Watchers on
    /// the view's own models go too.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.fire("destroy", &[]);
        self.unmount();
        let count = self.release();
        debug!(view = %self.id(), bindings = count, "view destroyed");
    }

    /// Mark a half-built view destroyed and drop whatever it subscribed to
    /// so far. No lifecycle events fire.
    fn abandon(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);
        let count = self.release();
        debug!(view = %self.id(), bindings = count, "construction aborted");
    }

    fn release(&self) -> usize {
        let bindings = std::mem::take(&mut *self.inner.bindings.lock());
        let count = bindings.len();
        for (_, binding) in bindings {
            binding.unbind();
        }
        self.inner.state.clear_watchers();
        self.inner.props.clear_watchers();
        self.inner.events.clear();
        count
    }

    /// Run the instance listeners of `event`. Class listeners are not
    /// involved; use [`ViewClass::emit`] for those.
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        self.inner.events.emit(self, event, args)
    }

    fn fire(&self, event: &str, args: &[Value]) {
        trace!(view = %self.id(), event, "lifecycle event");
        self.inner.class.emit(self, event, args);
        self.inner.events.emit(self, event, args);
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(ViewError::Destroyed(self.id()))
        } else {
            Ok(())
        }
    }
}

/// Listener argument naming a mount target.
fn describe(target: &Node) -> Value {
    serde_json::json!({ "tag": target.tag(), "id": target.id() })
}

impl Events for View {
    type Receiver = View;

    fn emitter(&self) -> &Emitter<View> {
        &self.inner.events
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for View {}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.inner.id)
            .field("el", &self.inner.el.tag())
            .field("owner", &self.owner().map(|owner| owner.id()))
            .field("mounted", &self.is_mounted())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
