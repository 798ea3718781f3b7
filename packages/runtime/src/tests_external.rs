/// External children: placement after writes, monotonic per instance
use crate::dependency::{Condition, Dependency};
use crate::external::{ExternalChildRegistration, ExternalChildren};
use crate::memory_surface::{MemorySurface, SurfaceNode};
use crate::node_key::InstanceId;
use crate::runtime::Runtime;
use crate::store::{Variable, VariableStore};
use pretty_assertions::assert_eq;

fn menu_page(instance: &str) -> SurfaceNode {
    SurfaceNode::element("div")
        .with_id(format!("root:{instance}"))
        .with_child(
            SurfaceNode::element("nav")
                .with_id(format!("menu:{instance}"))
                .with_style("display", "none")
                .with_child(SurfaceNode::element("div").with_id(format!("menu-slot:{instance}"))),
        )
        .with_child(SurfaceNode::element("aside").with_id(format!("sidebar:{instance}")))
        .with_child(
            SurfaceNode::element("p")
                .with_id(format!("popup-a:{instance}"))
                .with_ext_id(format!("popup:{instance}"))
                .with_text("first"),
        )
        .with_child(
            SurfaceNode::element("p")
                .with_id(format!("popup-b:{instance}"))
                .with_ext_id(format!("popup:{instance}"))
                .with_text("second"),
        )
}

fn menu_store() -> VariableStore {
    VariableStore::new().with_variable(
        "open",
        Variable::new("false").with_dependency(
            "menu",
            vec![Dependency::Visible {
                condition: Condition::Equals("true".into()),
            }],
        ),
    )
}

fn menu_children() -> ExternalChildren {
    ExternalChildren::new()
        .with_registration(ExternalChildRegistration::new("popup", "menu-slot").when_visible("menu"))
}

#[test]
fn test_placed_once_condition_holds() {
    let mut runtime = Runtime::new(MemorySurface::from_roots(vec![menu_page("main")]));
    let id = InstanceId::new("main");
    runtime.init(id.clone(), menu_store(), menu_children());

    assert!(runtime.refresh_external_children(&id).is_empty());
    assert_eq!(runtime.surface().parent_id("popup-a:main").as_deref(), Some("root:main"));

    let outcome = runtime.set_boolean(&id, "open", true);

    assert_eq!(outcome.report().unwrap().placed, vec!["popup"]);
    assert_eq!(
        runtime.surface().child_ids("menu-slot:main"),
        vec!["popup-a:main", "popup-b:main"]
    );
    assert!(runtime.instance(&id).unwrap().external_children().is_placed("popup"));
}

#[test]
fn test_placement_is_monotonic() {
    let mut runtime = Runtime::new(MemorySurface::from_roots(vec![menu_page("main")]));
    let id = InstanceId::new("main");
    runtime.init(id.clone(), menu_store(), menu_children());

    runtime.set_boolean(&id, "open", true);
    runtime.set_boolean(&id, "open", false);
    let outcome = runtime.set_boolean(&id, "open", true);

    assert!(outcome.report().unwrap().placed.is_empty());
    assert_eq!(
        runtime.surface().child_ids("menu-slot:main"),
        vec!["popup-a:main", "popup-b:main"]
    );
}

#[test]
fn test_first_satisfied_slot_wins() {
    let mut runtime = Runtime::new(MemorySurface::from_roots(vec![menu_page("main")]));
    let id = InstanceId::new("main");
    let registry = r#"{
        "popup": [
            {"condition": ["menu"], "set_at": "menu-slot"},
            {"condition": [], "set_at": "sidebar"}
        ]
    }"#;
    let variables = r#"{
        "open": {
            "value": false,
            "dependencies": {
                "menu": "[{\"dependency_type\": \"Visible\", \"condition\": true}]"
            }
        }
    }"#;
    runtime.init_json(id.clone(), variables, Some(registry)).unwrap();

    // The unconditional slot is satisfied first; opening the menu later changes nothing
    assert_eq!(runtime.refresh_external_children(&id), vec!["popup"]);
    runtime.set_boolean(&id, "open", true);

    assert_eq!(runtime.surface().child_ids("sidebar:main"), vec!["popup-a:main", "popup-b:main"]);
    assert!(runtime.surface().child_ids("menu-slot:main").is_empty());
}

#[test]
fn test_placement_is_per_instance() {
    let mut runtime = Runtime::new(MemorySurface::from_roots(vec![menu_page("one"), menu_page("two")]));
    let one = InstanceId::new("one");
    let two = InstanceId::new("two");
    runtime.init(one.clone(), menu_store(), menu_children());
    runtime.init(two.clone(), menu_store(), menu_children());

    runtime.set_boolean(&one, "open", true);

    assert_eq!(runtime.surface().parent_id("popup-a:one").as_deref(), Some("menu-slot:one"));
    assert_eq!(runtime.surface().parent_id("popup-a:two").as_deref(), Some("root:two"));
    assert!(!runtime.instance(&two).unwrap().external_children().is_placed("popup"));

    let outcomes = runtime.set_boolean_for_all("open", true);
    assert_eq!(outcomes[0].report().unwrap().placed, Vec::<String>::new());
    assert_eq!(outcomes[1].report().unwrap().placed, vec!["popup"]);
}
