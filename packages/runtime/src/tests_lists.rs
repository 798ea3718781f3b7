/// List-bound regions: full-replace materialization and dependency re-keying
use crate::dependency::Dependency;
use crate::external::ExternalChildren;
use crate::memory_surface::{MemorySurface, SurfaceNode};
use crate::node_key::{InstanceId, NodeKey};
use crate::runtime::{InsertPosition, Runtime};
use crate::store::{Variable, VariableStore};
use pretty_assertions::assert_eq;

fn main_id() -> InstanceId {
    InstanceId::new("main")
}

fn todo_page() -> Vec<SurfaceNode> {
    vec![SurfaceNode::element("div")
        .with_id("page:main")
        .with_child(SurfaceNode::element("p").with_id("raw:main"))
        .with_child(
            SurfaceNode::element("ul").with_id("todos:main").with_child(
                SurfaceNode::element("li")
                    .with_id("todo:dummy:main")
                    .with_style("display", "none")
                    .with_child(SurfaceNode::element("span").with_text("- $loop$")),
            ),
        )]
}

fn todo_runtime(initial: &str) -> Runtime<MemorySurface> {
    let store = VariableStore::new().with_variable(
        "todos",
        Variable::new(initial)
            .with_dependency("todo:dummy", vec![Dependency::Value])
            .with_dependency("raw", vec![Dependency::Value]),
    );
    let mut runtime = Runtime::new(MemorySurface::from_roots(todo_page()));
    runtime.init(main_id(), store, ExternalChildren::new());
    runtime
}

fn table_keys(runtime: &Runtime<MemorySurface>) -> Vec<String> {
    runtime
        .instance(&main_id())
        .and_then(|instance| instance.store().get("todos"))
        .map(|variable| variable.dependencies.keys().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn test_array_value_materializes_one_clone_per_item() {
    let mut runtime = todo_runtime("[]");
    let id = main_id();

    let outcome = runtime.set_string(&id, "todos", r#"["p","q"]"#);

    let report = outcome.report().unwrap();
    assert_eq!(
        report.materialized,
        vec![NodeKey::new("todo,0:new", &id), NodeKey::new("todo,1:new", &id)]
    );
    let surface = runtime.surface();
    assert_eq!(
        surface.child_ids("todos:main"),
        vec!["todo:dummy:main", "todo,0:new:main", "todo,1:new:main"]
    );
    assert_eq!(surface.text_of("todo,0:new:main").as_deref(), Some("- p"));
    assert_eq!(surface.text_of("todo,1:new:main").as_deref(), Some("- q"));
    assert_eq!(surface.style_of("todo,0:new:main", "display"), None);
    assert_eq!(surface.style_of("todo:dummy:main", "display").as_deref(), Some("none"));
    assert_eq!(table_keys(&runtime), vec!["todo,0:new", "todo,1:new", "todo:dummy", "raw"]);
}

#[test]
fn test_rewrite_destroys_previous_clones() {
    let mut runtime = todo_runtime("[]");
    let id = main_id();

    runtime.set_string(&id, "todos", r#"["p","q","r"]"#);
    let live_before = runtime.surface().live_count();

    runtime.set_string(&id, "todos", r#"["x"]"#);

    let surface = runtime.surface();
    assert_eq!(surface.child_ids("todos:main"), vec!["todo:dummy:main", "todo,0:new:main"]);
    assert_eq!(surface.text_of("todo,0:new:main").as_deref(), Some("- x"));
    assert!(surface.find("todo,1:new:main").is_none());
    assert!(surface.find("todo,2:new:main").is_none());
    // Each clone is an li plus its span
    assert_eq!(surface.live_count(), live_before - 4);
    assert_eq!(table_keys(&runtime), vec!["todo,0:new", "todo:dummy", "raw"]);
}

#[test]
fn test_other_dependents_still_fire() {
    let mut runtime = todo_runtime("[]");
    let id = main_id();

    runtime.set_string(&id, "todos", r#"["p"]"#);
    runtime.set_string(&id, "todos", r#"["p","q"]"#);

    assert_eq!(runtime.surface().text_of("raw:main").as_deref(), Some(r#"["p","q"]"#));
}

#[test]
fn test_empty_list_removes_everything() {
    let mut runtime = todo_runtime("[]");
    let id = main_id();

    runtime.set_string(&id, "todos", r#"["p","q"]"#);
    let outcome = runtime.set_string(&id, "todos", "[]");

    assert!(outcome.report().unwrap().materialized.is_empty());
    assert_eq!(runtime.surface().child_ids("todos:main"), vec!["todo:dummy:main"]);
    assert_eq!(table_keys(&runtime), vec!["todo:dummy", "raw"]);
}

#[test]
fn test_non_json_value_is_one_verbatim_item() {
    let mut runtime = todo_runtime("");
    let id = main_id();

    runtime.set_string(&id, "todos", "just one");

    let surface = runtime.surface();
    assert_eq!(surface.child_ids("todos:main"), vec!["todo:dummy:main", "todo,0:new:main"]);
    assert_eq!(surface.text_of("todo,0:new:main").as_deref(), Some("- just one"));
}

#[test]
fn test_structured_items_are_serialized() {
    let mut runtime = todo_runtime("[]");

    runtime.set_string(&main_id(), "todos", r#"[{"title":"a"},3,null]"#);

    let surface = runtime.surface();
    assert_eq!(surface.text_of("todo,0:new:main").as_deref(), Some(r#"- {"title":"a"}"#));
    assert_eq!(surface.text_of("todo,1:new:main").as_deref(), Some("- 3"));
    assert_eq!(surface.text_of("todo,2:new:main").as_deref(), Some("- null"));
}

#[test]
fn test_insert_and_clear_drive_the_list() {
    let mut runtime = todo_runtime(r#"["a"]"#);
    let id = main_id();

    runtime.insert(&id, "todos", Some("b"), InsertPosition::End);
    runtime.insert(&id, "todos", Some("z"), InsertPosition::Start);

    let surface = runtime.surface();
    assert_eq!(surface.text_of("todo,0:new:main").as_deref(), Some("- z"));
    assert_eq!(surface.text_of("todo,1:new:main").as_deref(), Some("- a"));
    assert_eq!(surface.text_of("todo,2:new:main").as_deref(), Some("- b"));

    runtime.clear(&id, "todos");
    assert_eq!(runtime.get_value(&id, "todos"), Some("[]"));
    assert_eq!(runtime.surface().child_ids("todos:main"), vec!["todo:dummy:main"]);
}

#[test]
fn test_custom_loop_placeholder() {
    let roots = vec![SurfaceNode::element("ul").with_id("tags:main").with_child(
        SurfaceNode::element("li")
            .with_id("tag:dummy:main")
            .with_style("display", "none")
            .with_text("#{{item}}"),
    )];
    let store = VariableStore::new().with_variable(
        "tags",
        Variable::new("[]").with_dependency("tag:dummy", vec![Dependency::Value]),
    );
    let options = crate::options::RuntimeOptions {
        loop_placeholder: "{{item}}".into(),
        ..Default::default()
    };
    let mut runtime = Runtime::new(MemorySurface::from_roots(roots)).with_options(options);
    runtime.init(main_id(), store, ExternalChildren::new());

    runtime.set_string(&main_id(), "tags", r#"["rust"]"#);
    assert_eq!(runtime.surface().text_of("tag,0:new:main").as_deref(), Some("#rust"));
}

#[test]
fn test_detached_anchor_is_reported() {
    let anchor = SurfaceNode::element("li")
        .with_id("todo:dummy:main")
        .with_style("display", "none")
        .with_text("$loop$");
    let store = VariableStore::new().with_variable(
        "todos",
        Variable::new("[]").with_dependency("todo:dummy", vec![Dependency::Value]),
    );
    let mut runtime = Runtime::new(MemorySurface::from_roots(vec![anchor]));
    runtime.init(main_id(), store, ExternalChildren::new());

    let outcome = runtime.set_string(&main_id(), "todos", r#"["a"]"#);

    let report = outcome.report().unwrap();
    assert_eq!(report.detached_anchors, vec![NodeKey::new("todo:dummy", &main_id())]);
    assert!(report.materialized.is_empty());
    assert!(!report.is_clean());
    assert_eq!(runtime.surface().live_count(), 1);
    assert_eq!(table_keys(&runtime), vec!["todo:dummy"]);
}
