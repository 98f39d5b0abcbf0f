//! View classes.
//!
//! A [`ViewClass`] is what the factory produces for a template: it knows
//! how to build instances and carries everything instances of that
//! template share. That includes class-level listeners, declared
//! properties, filters, and the two schemas behind instance state and
//! properties. Nothing here is shared between classes, even classes built
//! from identical templates.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use serde_json::Value;

use super::instance::View;
use super::options::ViewOptions;
use crate::config::ViewConfig;
use crate::dom::{Domify, Renderer};
use crate::error::Result;
use crate::events::{Emitter, Events, Listener};
use crate::interpolate::Filters;
use crate::model::{Keys, Schema};

/// Per-instance setup run during construction with the new view.
pub type ProcessHook = Arc<dyn Fn(&View) + Send + Sync>;

pub(crate) struct ClassInner {
    template: String,
    config: ViewConfig,
    renderer: Arc<dyn Renderer>,
    process: Option<ProcessHook>,
    state_schema: Arc<Schema>,
    props_schema: Arc<Schema>,
    events: Emitter<View>,
    instance_events: RwLock<Vec<(String, Listener<View>)>>,
    declared: RwLock<IndexSet<String>>,
    filters: RwLock<Filters>,
}

/// A view constructor bound to one template.
///
/// Cloning yields another handle to the same class.
///
/// # Example
///
/// ```rust,ignore
/// let cards = ViewClass::new("<div class=\"card\">{{ title }}</div>");
/// cards.computed("title", ["name"], |args| {
///     json!(format!("Card: {}", args[0].as_ref().and_then(Value::as_str).unwrap_or("")))
/// });
/// cards.on("mount", |view, _| tracing::info!(view = %view.id(), "card shown"));
///
/// let card = cards.construct(json!({ "name": "Inbox" }), ViewOptions::default())?;
/// card.mount(&body)?;
/// ```
#[derive(Clone)]
pub struct ViewClass {
    inner: Arc<ClassInner>,
}

/// Builder for a [`ViewClass`] with a custom config, renderer or process
/// hook.
pub struct ViewClassBuilder {
    template: String,
    config: ViewConfig,
    renderer: Arc<dyn Renderer>,
    process: Option<ProcessHook>,
}

impl ViewClassBuilder {
    pub fn config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the element builder.
    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Run `hook` once for every new instance.
    pub fn process<F>(mut self, hook: F) -> Self
    where
        F: Fn(&View) + Send + Sync + 'static,
    {
        self.process = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> ViewClass {
        ViewClass {
            inner: Arc::new(ClassInner {
                template: self.template,
                config: self.config,
                renderer: self.renderer,
                process: self.process,
                state_schema: Arc::new(Schema::new()),
                props_schema: Arc::new(Schema::new()),
                events: Emitter::new(),
                instance_events: RwLock::new(Vec::new()),
                declared: RwLock::new(IndexSet::new()),
                filters: RwLock::new(Filters::new()),
            }),
        }
    }
}

impl ViewClass {
    /// Create a class for `template` with the default config.
    pub fn new(template: impl Into<String>) -> Self {
        Self::builder(template).build()
    }

    pub fn builder(template: impl Into<String>) -> ViewClassBuilder {
        ViewClassBuilder {
            template: template.into(),
            config: ViewConfig::default(),
            renderer: Arc::new(Domify),
            process: None,
        }
    }

    pub fn template(&self) -> &str {
        &self.inner.template
    }

    pub fn config(&self) -> &ViewConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same class.
    pub fn ptr_eq(&self, other: &ViewClass) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run a plugin against this class.
    pub fn use_plugin<F>(&self, plugin: F) -> &Self
    where
        F: FnOnce(&ViewClass),
    {
        plugin(self);
        self
    }

    /// Add a computed state key shared by every instance of this class.
    ///
    /// `derive` receives the values of `deps`, which may be dotted paths.
    pub fn computed<F>(&self, key: impl Into<String>, deps: impl Into<Keys>, derive: F) -> &Self
    where
        F: Fn(&[Option<Value>]) -> Value + Send + Sync + 'static,
    {
        self.inner.state_schema.computed(key, deps, derive);
        self
    }

    /// Declare a property. Instances expose an accessor for every declared
    /// name through [`View::accessor`].
    pub fn prop(&self, name: impl Into<String>) -> &Self {
        self.inner.declared.write().insert(name.into());
        self
    }

    /// Declared property names in declaration order.
    pub fn declared_props(&self) -> Vec<String> {
        self.inner.declared.read().iter().cloned().collect()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.inner.declared.read().contains(name)
    }

    /// Register a filter for interpolation expressions.
    pub fn filter<F>(&self, name: impl Into<String>, filter: F) -> &Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.inner.filters.write().insert(name, filter);
        self
    }

    /// Copy of the class filter registry.
    pub fn filters(&self) -> Filters {
        self.inner.filters.read().clone()
    }

    /// Attach `handler` to the `name` event of every instance constructed
    /// from now on.
    ///
    /// Unlike [`Events::on`], the handler lives on the instance and goes
    /// away when the instance is destroyed.
    pub fn event<F>(&self, name: &str, handler: F) -> &Self
    where
        F: Fn(&View, &[Value]) + Send + Sync + 'static,
    {
        self.inner
            .instance_events
            .write()
            .push((name.to_owned(), Arc::new(handler)));
        self
    }

    /// Construct a view.
    ///
    /// `data` seeds the properties; `null` defers to `options.props` and
    /// then `options.data`.
    pub fn construct(&self, data: Value, options: ViewOptions) -> Result<View> {
        View::construct(self, data, options)
    }

    /// Construct a view with no data and default options.
    pub fn new_view(&self) -> Result<View> {
        self.construct(Value::Null, ViewOptions::default())
    }

    /// Construct a view from named options.
    pub fn create(&self, options: ViewOptions) -> Result<View> {
        self.construct(Value::Null, options)
    }

    /// Run the class-level listeners of `event` with `view` as receiver.
    pub fn emit(&self, view: &View, event: &str, args: &[Value]) -> usize {
        self.inner.events.emit(view, event, args)
    }

    pub(crate) fn renderer(&self) -> &dyn Renderer {
        self.inner.renderer.as_ref()
    }

    pub(crate) fn process_hook(&self) -> Option<ProcessHook> {
        self.inner.process.clone()
    }

    pub(crate) fn state_schema(&self) -> &Arc<Schema> {
        &self.inner.state_schema
    }

    pub(crate) fn props_schema(&self) -> &Arc<Schema> {
        &self.inner.props_schema
    }

    pub(crate) fn instance_events(&self) -> Vec<(String, Listener<View>)> {
        self.inner.instance_events.read().clone()
    }
}

impl Events for ViewClass {
    type Receiver = View;

    fn emitter(&self) -> &Emitter<View> {
        &self.inner.events
    }
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewClass")
            .field("template", &self.inner.template)
            .field("config", &self.inner.config)
            .field("computed", &self.inner.state_schema)
            .field("props", &*self.inner.declared.read())
            .field("filters", &*self.inner.filters.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Node, TemplateError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn classes_do_not_share_computed_keys() {
        let a = ViewClass::new("<div></div>");
        let b = ViewClass::new("<div></div>");
        a.computed("answer", Keys::new(), |_| json!(42));

        let view_a = a.new_view().unwrap();
        let view_b = b.new_view().unwrap();
        assert_eq!(view_a.get("answer").unwrap(), Some(json!(42)));
        assert_eq!(view_b.get("answer").unwrap(), None);
    }

    #[test]
    fn use_plugin_receives_the_class_and_chains() {
        let class = ViewClass::new("<div></div>");
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        class
            .use_plugin(|c| {
                c.prop("title");
            })
            .use_plugin(move |_| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(class.declared_props(), vec!["title".to_owned()]);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn declared_props_keep_order_without_duplicates() {
        let class = ViewClass::new("<div></div>");
        class.prop("b").prop("a").prop("b");
        assert_eq!(class.declared_props(), vec!["b".to_owned(), "a".to_owned()]);
        assert!(class.is_declared("a"));
        assert!(!class.is_declared("c"));
    }

    #[test]
    fn process_hook_runs_per_instance() {
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        let class = ViewClass::builder("<div></div>")
            .process(move |view| {
                runs_clone.fetch_add(1, Ordering::SeqCst);
                view.set("processed", true);
            })
            .build();

        let view = class.new_view().unwrap();
        class.new_view().unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(view.get("processed").unwrap(), Some(json!(true)));
    }

    #[test]
    fn custom_renderer_builds_elements() {
        struct Fixed;
        impl Renderer for Fixed {
            fn render(&self, markup: &str) -> std::result::Result<Node, TemplateError> {
                let node = Node::element("pre");
                node.set_text(markup);
                Ok(node)
            }
        }

        let class = ViewClass::builder("raw <markup>").renderer(Fixed).build();
        let view = class.new_view().unwrap();
        assert_eq!(view.el().tag(), Some("pre"));
        assert_eq!(view.el().text_content(), "raw <markup>");
    }

    #[test]
    fn malformed_template_fails_construction() {
        let class = ViewClass::new("<div>");
        assert!(matches!(
            class.new_view(),
            Err(crate::ViewError::Template(TemplateError::Unclosed { .. }))
        ));
    }
}
