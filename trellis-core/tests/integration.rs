//! Integration Tests for Views
//!
//! These tests drive view classes and instances through the public API:
//! construction, lookup, state, owners, lifecycle events and teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use trellis_core::{
    Events, LookupPolicy, Node, PropsMode, View, ViewClass, ViewConfig, ViewError, ViewOptions,
};

fn plain() -> ViewClass {
    ViewClass::new("<div></div>")
}

fn join(args: &[Option<Value>]) -> Value {
    let parts: Vec<&str> = args
        .iter()
        .map(|arg| arg.as_ref().and_then(Value::as_str).unwrap_or(""))
        .collect();
    json!(parts.join(" "))
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (count.clone(), count)
}

/// A view constructs with no data at all.
#[test]
fn constructs_without_data() {
    let view = plain().new_view().unwrap();
    assert_eq!(view.el().tag(), Some("div"));
    assert!(view.state().snapshot().is_empty());
    assert!(view.props().snapshot().is_empty());
}

/// Positional data becomes the view's properties.
#[test]
fn constructs_with_properties() {
    let view = plain().construct(json!({ "foo": "bar" }), ViewOptions::new()).unwrap();
    assert_eq!(view.get("foo").unwrap(), Some(json!("bar")));
    assert_eq!(view.props().get("foo"), Some(json!("bar")));
}

/// Mounting attaches the element and fires `mount` with the view as
/// receiver.
#[test]
fn mount_attaches_and_fires_event() {
    let body = Node::element("body");
    let view = plain().new_view().unwrap();
    let (calls, seen) = counter();

    let target = body.clone();
    view.on("mount", move |view, _| {
        assert!(target.contains(view.el()));
        seen.fetch_add(1, Ordering::SeqCst);
    });
    view.mount(&body).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(view.is_mounted());
}

/// Unmounting detaches the element and fires `unmount`.
#[test]
fn unmount_detaches_and_fires_event() {
    let body = Node::element("body");
    let view = plain().new_view().unwrap();
    let (calls, seen) = counter();

    view.mount(&body).unwrap();
    view.on("unmount", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    view.unmount();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!body.contains(view.el()));
}

/// Unmounting a view that was never mounted fires nothing.
#[test]
fn unmount_without_parent_is_silent() {
    let view = plain().new_view().unwrap();
    let (calls, seen) = counter();
    view.on("unmount", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    view.unmount();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Mount fires `mount` then `bind`; unmount fires `unmount` then `unbind`.
#[test]
fn mount_and_unmount_event_order() {
    let class = plain();
    let log = Arc::new(Mutex::new(Vec::new()));
    for event in ["mount", "bind", "unmount", "unbind"] {
        let log = log.clone();
        class.on(event, move |_, _| log.lock().push(format!("class:{event}")));
    }
    let view = class.new_view().unwrap();
    for event in ["mount", "unmount"] {
        let log = log.clone();
        view.on(event, move |_, _| log.lock().push(format!("view:{event}")));
    }

    view.mount(&Node::element("body")).unwrap();
    view.unmount();

    assert_eq!(
        *log.lock(),
        vec![
            "class:mount",
            "view:mount",
            "class:bind",
            "class:unmount",
            "view:unmount",
            "class:unbind",
        ]
    );
}

/// State wins over properties.
#[test]
fn get_prefers_state() {
    let view = plain().construct(json!({ "foo": "bar" }), ViewOptions::new()).unwrap();
    view.state().set("foo", "baz");
    assert_eq!(view.get("foo").unwrap(), Some(json!("baz")));
}

/// Properties answer once state no longer has the key.
#[test]
fn get_falls_back_to_props() {
    let view = plain().construct(json!({ "one": "prop" }), ViewOptions::new()).unwrap();
    view.state().set("one", "state");
    view.state().unset("one");
    assert_eq!(view.get("one").unwrap(), Some(json!("prop")));
}

/// The owner answers keys the view does not have.
#[test]
fn get_falls_back_to_owner() {
    let class = plain();
    let parent = class.construct(json!({ "one": "one" }), ViewOptions::new()).unwrap();
    let child = class.construct(Value::Null, ViewOptions::new().owner(&parent)).unwrap();

    child.set("foo", "bar");
    assert_eq!(child.get("foo").unwrap(), Some(json!("bar")));
    assert_eq!(child.get("one").unwrap(), Some(json!("one")));
    assert_eq!(parent.get("foo").unwrap(), None);
}

/// Values resolve through any number of owners.
#[test]
fn get_reads_through_grandparents() {
    let class = plain();
    let parent = class.construct(json!({ "foo": "bar" }), ViewOptions::new()).unwrap();
    let child = class.create(ViewOptions::new().owner(&parent)).unwrap();
    let grandchild = class.create(ViewOptions::new().owner(&child)).unwrap();

    assert_eq!(grandchild.get("foo").unwrap(), Some(json!("bar")));
}

/// `owner` and `root` follow the construction chain.
#[test]
fn owner_and_root() {
    let class = plain();
    let parent = class.new_view().unwrap();
    let child = class.create(ViewOptions::new().owner(&parent)).unwrap();
    let grandchild = class.create(ViewOptions::new().owner(&child)).unwrap();

    assert_eq!(child.owner(), Some(parent.clone()));
    assert_eq!(child.root(), Some(parent.clone()));
    assert_eq!(grandchild.owner(), Some(child.clone()));
    assert_eq!(grandchild.root(), Some(parent.clone()));
}

/// Writes to state are visible through the state model.
#[test]
fn sets_state() {
    let view = plain().new_view().unwrap();
    view.state().set("foo", "bar");
    assert_eq!(view.state().get("foo"), Some(json!("bar")));
}

/// Computed keys follow their dependencies.
#[test]
fn computed_properties() {
    let class = plain();
    class.computed("fullname", ["firstname", "lastname"], join);
    let view = class
        .create(ViewOptions::new().state(json!({ "firstname": "Bruce", "lastname": "Willis" })))
        .unwrap();

    assert_eq!(view.state().get("fullname"), Some(json!("Bruce Willis")));
    view.state().set("firstname", "Danny");
    assert_eq!(view.state().get("fullname"), Some(json!("Danny Willis")));
}

/// Computed keys may depend on nested paths.
#[test]
fn computed_properties_with_nested_dependencies() {
    let class = plain();
    class.computed("fullname", ["names.first", "names.last"], join);
    let view = class
        .create(ViewOptions::new().state(json!({ "names": { "first": "Bruce", "last": "Willis" } })))
        .unwrap();

    assert_eq!(view.get("fullname").unwrap(), Some(json!("Bruce Willis")));
    view.set_many(json!({ "names": { "first": "Jet", "last": "Li" } }))
        .unwrap();
    assert_eq!(view.get("fullname").unwrap(), Some(json!("Jet Li")));
}

/// A watched computed key reports its change in the write's batch.
#[test]
fn watched_computed_key_reports_change() {
    let class = plain();
    class.computed("fullname", ["first", "last"], join);
    let view = class
        .create(ViewOptions::new().state(json!({ "first": "Bruce", "last": "Willis" })))
        .unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    view.change("fullname", move |changes| {
        for change in changes {
            sink.lock().push((change.previous.clone(), change.current.clone()));
        }
    })
    .unwrap();
    view.set("first", "Danny");

    assert_eq!(
        *seen.lock(),
        vec![(Some(json!("Bruce Willis")), Some(json!("Danny Willis")))]
    );
}

/// State watchers run on writes to their key.
#[test]
fn watches_for_changes() {
    let view = plain().new_view().unwrap();
    let (calls, seen) = counter();
    view.state().change("foo", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    view.state().set("foo", "bar");
    view.state().set("foo", "bar");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// A class `created` listener can seed default state.
#[test]
fn default_state_from_created() {
    let class = plain();
    class.on("created", |view, _| {
        view.set_many(json!({ "first": "Fred", "last": "Flintstone" }))
            .unwrap();
    });

    let view = class.new_view().unwrap();
    view.set("first", "Wilma");
    assert_eq!(view.get("first").unwrap(), Some(json!("Wilma")));
    assert_eq!(view.get("last").unwrap(), Some(json!("Flintstone")));
}

/// Properties are fixed once the view exists.
#[test]
fn props_are_frozen_by_default() {
    let view = plain().construct(json!({ "foo": "bar" }), ViewOptions::new()).unwrap();
    view.props().set("bar", "foo");
    view.props().set("foo", "baz");

    assert_eq!(view.props().get("bar"), None);
    assert_eq!(view.props().get("foo"), Some(json!("bar")));
}

/// Sealed properties accept updates to existing keys only.
#[test]
fn sealed_props_accept_existing_keys() {
    let class = ViewClass::builder("<div></div>")
        .config(ViewConfig::default().with_props(PropsMode::Sealed))
        .build();
    let view = class.construct(json!({ "foo": "bar" }), ViewOptions::new()).unwrap();
    view.props().set("bar", "foo");
    view.props().set("foo", "baz");

    assert_eq!(view.props().get("bar"), None);
    assert_eq!(view.props().get("foo"), Some(json!("baz")));
}

/// Lifecycle listeners receive the instance as receiver.
#[test]
fn lifecycle_listeners_receive_the_instance() {
    for event in ["created", "ready", "mount", "unmount"] {
        let class = plain();
        class.on(event, |view, _| {
            view.set("foo", "bar");
        });

        let view = class.new_view().unwrap();
        view.mount(&Node::element("body")).unwrap();
        view.unmount();
        assert_eq!(view.get("foo").unwrap(), Some(json!("bar")), "event {event}");
    }
}

/// Construction fires `created`, `ready` and then the class-only
/// `construct`.
#[test]
fn construction_event_order() {
    let class = plain();
    let log = Arc::new(Mutex::new(Vec::new()));
    for event in ["created", "ready", "construct"] {
        let log = log.clone();
        class.on(event, move |_, _| log.lock().push(event));
    }
    let instance_log = log.clone();
    class.event("ready", move |_, _| instance_log.lock().push("instance:ready"));

    class.new_view().unwrap();
    assert_eq!(
        *log.lock(),
        vec!["created", "ready", "instance:ready", "construct"]
    );
}

/// `mount` appends under the target; `unmount` removes it again.
#[test]
fn mounting_and_unmounting() {
    let body = Node::element("body");
    let view = plain().new_view().unwrap();

    view.mount(&body).unwrap();
    assert!(body.contains(view.el()));
    view.unmount();
    assert!(!body.contains(view.el()));
}

/// Replacing mount takes the target's position.
#[test]
fn mount_replacing_target() {
    let body = Node::element("body");
    let before = Node::element("header");
    let placeholder = Node::element("span");
    let after = Node::element("footer");
    for node in [&before, &placeholder, &after] {
        body.append_child(node).unwrap();
    }

    let view = plain().new_view().unwrap();
    view.mount_replace(&placeholder).unwrap();

    let children = body.children();
    assert_eq!(children.len(), 3);
    assert!(children[1].ptr_eq(view.el()));
    assert!(!body.contains(&placeholder));
}

/// The `template` option overrides the class template for one instance.
#[test]
fn template_override() {
    let view = plain()
        .construct(Value::Null, ViewOptions::new().template("<div id=\"hooray\"></div>"))
        .unwrap();
    assert_eq!(view.el().id().as_deref(), Some("hooray"));
}

/// `create` takes everything as named options.
#[test]
fn create_syntax() {
    let class = plain();
    let parent = class.new_view().unwrap();
    let view = class
        .create(
            ViewOptions::new()
                .state(json!({ "foo": "bar" }))
                .template("<div id=\"created\"></div>")
                .owner(&parent),
        )
        .unwrap();

    assert_eq!(view.get("foo").unwrap(), Some(json!("bar")));
    assert_eq!(view.el().id().as_deref(), Some("created"));
    assert_eq!(view.owner(), Some(parent.clone()));
    assert_eq!(view.root(), Some(parent));
}

/// `create` reads properties from `props`, then from `data`.
#[test]
fn create_props_and_data() {
    let class = plain();
    let from_data = class.create(ViewOptions::new().data(json!({ "a": 1 }))).unwrap();
    let from_props = class
        .create(ViewOptions::new().props(json!({ "a": 2 })).data(json!({ "a": 1 })))
        .unwrap();

    assert_eq!(from_data.props().get("a"), Some(json!(1)));
    assert_eq!(from_props.props().get("a"), Some(json!(2)));
}

/// Plugins can attach class listeners.
#[test]
fn plugins() {
    let class = plain();
    class.use_plugin(|child| {
        child.on("ready", |view, _| {
            view.set("foo", "bar");
        });
    });

    let view = class.new_view().unwrap();
    assert_eq!(view.get("foo").unwrap(), Some(json!("bar")));
}

/// Destroying a mounted view unmounts it.
#[test]
fn destroy_unmounts() {
    let body = Node::element("body");
    let view = plain().new_view().unwrap();
    view.mount(&body).unwrap();

    view.destroy();
    assert!(!body.contains(view.el()));
}

/// Destroying removes instance listeners.
#[test]
fn destroy_removes_event_listeners() {
    let view = plain().new_view().unwrap();
    let (calls, seen) = counter();
    view.on("foo", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    view.destroy();
    assert_eq!(view.emit("foo", &[]), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Destroying removes change listeners registered through the view,
/// including those living on the owner's models.
#[test]
fn destroy_removes_change_listeners() {
    let class = plain();
    let parent = class.construct(json!({ "shared": 1 }), ViewOptions::new()).unwrap();
    let view = class
        .construct(json!({ "foo": "bar" }), ViewOptions::new().owner(&parent))
        .unwrap();
    let (calls, seen) = counter();

    let on_change = seen.clone();
    view.change("foo", move |_| {
        on_change.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    view.change("shared", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert_eq!(parent.props().watcher_count(), 1);

    view.destroy();
    view.set("foo", "baz");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(parent.props().watcher_count(), 0);
}

/// Destroy runs once and fires `destroy` on class then instance.
#[test]
fn destroy_once() {
    let class = plain();
    let log = Arc::new(Mutex::new(Vec::new()));
    let class_log = log.clone();
    class.on("destroy", move |_, _| class_log.lock().push("class"));
    let view = class.new_view().unwrap();
    let instance_log = log.clone();
    view.on("destroy", move |_, _| instance_log.lock().push("instance"));

    view.destroy();
    view.destroy();
    assert_eq!(*log.lock(), vec!["class", "instance"]);
    assert!(matches!(
        view.mount(&Node::element("body")),
        Err(ViewError::Destroyed(id)) if id == view.id()
    ));
}

/// Class `event` handlers go to each instance and die with it.
#[test]
fn class_event_handlers_are_per_instance() {
    let class = plain();
    let (calls, seen) = counter();
    class.event("ping", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let a = class.new_view().unwrap();
    let b = class.new_view().unwrap();

    a.emit("ping", &[]);
    b.emit("ping", &[]);
    b.destroy();
    b.emit("ping", &[]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Text bound to a computed key through a filter follows state.
#[test]
fn text_bindings_with_computed_and_filters() {
    let class = ViewClass::new("<h1>{{ fullname | upper }}</h1>");
    class
        .computed("fullname", ["first", "last"], join)
        .filter("upper", |value| {
            json!(value.as_str().unwrap_or_default().to_uppercase())
        });

    let view = class
        .create(ViewOptions::new().state(json!({ "first": "jet", "last": "li" })))
        .unwrap();
    assert_eq!(view.el().text_content(), "JET LI");

    view.set("first", "bruce");
    assert_eq!(view.el().text_content(), "BRUCE LI");
}

/// A child's bound text follows its owner's properties.
#[test]
fn text_bindings_through_owner() {
    let parent_class = ViewClass::builder("<div></div>")
        .config(ViewConfig::default().with_props(PropsMode::Mutable))
        .build();
    let parent = parent_class
        .construct(json!({ "title": "Inbox" }), ViewOptions::new())
        .unwrap();
    let child = ViewClass::new("<span>{{ title }}</span>")
        .create(ViewOptions::new().owner(&parent))
        .unwrap();
    assert_eq!(child.el().text_content(), "Inbox");

    parent.props().set("title", "Archive");
    assert_eq!(child.el().text_content(), "Archive");
}

/// A text binding that fails halfway leaves no watchers behind on the
/// owner, and the half-built view is marked destroyed.
#[test]
fn failed_text_binding_releases_earlier_bindings() {
    let parent = plain()
        .create(ViewOptions::new().state(json!({ "a": "x" })))
        .unwrap();
    let class = ViewClass::builder("<p><b>{{ a }}</b><i>{{ missing }}</i></p>")
        .config(ViewConfig::default().with_lookup(LookupPolicy::Strict))
        .build();
    let built: Arc<Mutex<Option<View>>> = Arc::new(Mutex::new(None));
    let built_clone = built.clone();
    class.on("created", move |view, _| {
        *built_clone.lock() = Some(view.clone());
    });

    let result = class.create(ViewOptions::new().owner(&parent));
    assert!(matches!(result, Err(ViewError::PropertyNotFound { key }) if key == "missing"));
    assert_eq!(parent.state().watcher_count(), 0);

    let view = built.lock().take().unwrap();
    assert!(view.is_destroyed());
    assert_eq!(view.binding_count(), 0);
    parent.set("a", "y");
    assert_eq!(view.el().children()[0].text_content(), "x");
}

/// Config deserializes from JSON.
#[test]
fn config_from_json() {
    let config = ViewConfig::from_json(r#"{ "lookup": "strict", "props": "mutable" }"#).unwrap();
    let class = ViewClass::builder("<div></div>").config(config).build();
    let view = class.construct(json!({ "a": 1 }), ViewOptions::new()).unwrap();

    view.props().set("a", 2);
    assert_eq!(view.get("a").unwrap(), Some(json!(2)));
    assert!(matches!(view.get("b"), Err(ViewError::PropertyNotFound { .. })));
}
