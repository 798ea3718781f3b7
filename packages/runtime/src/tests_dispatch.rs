/// Interaction scenarios driven through `handle_interaction` with the JSON
/// action lists pages ship.
use crate::dispatcher::ActionOutcome;
use crate::error::{HandlerError, RuntimeError};
use crate::external::ExternalChildren;
use crate::memory_surface::{MemorySurface, SurfaceNode};
use crate::node_key::InstanceId;
use crate::propagator::SkipReason;
use crate::runtime::Runtime;
use crate::store::{Variable, VariableStore};
use crate::dependency::Dependency;
use serde_json::Value;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

fn main_id() -> InstanceId {
    InstanceId::new("main")
}

fn runtime(variables: &[(&str, &str)]) -> Runtime<MemorySurface> {
    let store = variables.iter().fold(VariableStore::new(), |store, (name, value)| {
        store.with_variable(*name, Variable::new(*value))
    });
    let mut runtime = Runtime::new(MemorySurface::new());
    runtime.init(main_id(), store, ExternalChildren::new());
    runtime
}

fn step(action: &str, target: &str, clamp: &[&str]) -> String {
    let clamp: Vec<String> = clamp
        .iter()
        .map(|bound| format!(r#"{{"value": "{bound}", "reference": null}}"#))
        .collect();
    format!(
        r#"[{{"action": "{action}", "target": "{target}", "parameters": {{"clamp": [{}]}}}}]"#,
        clamp.join(",")
    )
}

#[test]
fn test_toggle_flips_boolean() {
    let mut runtime = runtime(&[("open", "false")]);
    let id = main_id();
    let toggle = r#"[{"action": "toggle", "target": "open"}]"#;

    runtime.handle_interaction(&id, toggle, None).unwrap();
    assert_eq!(runtime.get_value(&id, "open"), Some("true"));

    runtime.handle_interaction(&id, toggle, None).unwrap();
    assert_eq!(runtime.get_value(&id, "open"), Some("false"));
}

#[test]
fn test_increment_wraps_at_max() {
    let mut runtime = runtime(&[("slide", "3")]);
    let id = main_id();

    runtime.handle_interaction(&id, &step("increment", "slide", &["0", "3"]), None).unwrap();
    assert_eq!(runtime.get_value(&id, "slide"), Some("0"));

    runtime.handle_interaction(&id, &step("increment", "slide", &["0", "3"]), None).unwrap();
    assert_eq!(runtime.get_value(&id, "slide"), Some("1"));
}

#[test]
fn test_decrement_wraps_at_min() {
    let mut runtime = runtime(&[("slide", "0")]);
    let id = main_id();

    runtime.handle_interaction(&id, &step("decrement", "slide", &["0", "3"]), None).unwrap();
    assert_eq!(runtime.get_value(&id, "slide"), Some("3"));
}

#[test]
fn test_single_clamp_is_max_with_zero_min() {
    let mut runtime = runtime(&[("page", "4")]);
    let id = main_id();

    runtime.handle_interaction(&id, &step("increment", "page", &["4"]), None).unwrap();
    assert_eq!(runtime.get_value(&id, "page"), Some("0"));
}

#[test]
fn test_single_clamp_decrement_wraps_to_max() {
    let mut runtime = runtime(&[("page", "0")]);
    let id = main_id();

    runtime.handle_interaction(&id, &step("decrement", "page", &["4"]), None).unwrap();
    assert_eq!(runtime.get_value(&id, "page"), Some("4"));

    runtime.handle_interaction(&id, &step("decrement", "page", &["4"]), None).unwrap();
    assert_eq!(runtime.get_value(&id, "page"), Some("3"));
}

#[test]
fn test_increment_by_reference() {
    let mut runtime = runtime(&[("count", "10"), ("stride", "5")]);
    let id = main_id();
    let actions = r#"[{"action": "increment", "target": "count", "parameters": {
        "by": [{"value": "1", "reference": "stride"}]
    }}]"#;

    runtime.handle_interaction(&id, actions, None).unwrap();
    assert_eq!(runtime.get_value(&id, "count"), Some("15"));

    let actions = r#"[{"action": "decrement", "target": "count", "parameters": {
        "by": [{"value": "3", "reference": null}]
    }}]"#;
    runtime.handle_interaction(&id, actions, None).unwrap();
    assert_eq!(runtime.get_value(&id, "count"), Some("12"));
}

#[test]
fn test_increment_non_numeric_is_skipped() {
    let mut runtime = runtime(&[("label", "abc")]);
    let id = main_id();

    let report = runtime
        .handle_interaction(&id, r#"[{"action": "increment", "target": "label"}]"#, None)
        .unwrap();

    let write = report.writes().next().unwrap();
    assert!(matches!(write.skip_reason(), Some(SkipReason::NotANumber { .. })));
    assert_eq!(runtime.get_value(&id, "label"), Some("abc"));
}

#[test]
fn test_set_value_coerces_declared_type() {
    let mut runtime = runtime(&[("count", "0"), ("flag", "false"), ("ratio", "0")]);
    let id = main_id();
    let actions = r#"[
        {"action": "set-value", "target": "count", "parameters": {"value": [
            {"value": "5", "reference": null}, {"value": "integer", "reference": null}
        ]}},
        {"action": "set-value", "target": "flag", "parameters": {"value": [
            {"value": "true", "reference": null}, {"value": "boolean", "reference": null}
        ]}},
        {"action": "set-value", "target": "ratio", "parameters": {"value": [
            {"value": "0.25", "reference": null}, {"value": "decimal", "reference": null}
        ]}}
    ]"#;

    let report = runtime.handle_interaction(&id, actions, None).unwrap();

    assert_eq!(report.writes().filter(|w| w.is_applied()).count(), 3);
    assert_eq!(runtime.get_value(&id, "count"), Some("5"));
    assert_eq!(runtime.get_value(&id, "flag"), Some("true"));
    assert_eq!(runtime.get_value(&id, "ratio"), Some("0.25"));
}

#[test]
fn test_set_value_from_event_context() {
    let mut runtime = runtime(&[("query", "")]);
    let id = main_id();
    let actions = r#"[{"action": "set-value", "target": "query", "parameters": {
        "value": [{"value": "$VALUE", "reference": null}]
    }}]"#;

    runtime.handle_interaction(&id, actions, Some("typed text")).unwrap();
    assert_eq!(runtime.get_value(&id, "query"), Some("typed text"));
}

#[test]
fn test_insert_at_start_and_blank_noop() {
    let mut runtime = runtime(&[("items", r#"["a","b"]"#)]);
    let id = main_id();
    let insert_c = r#"[{"action": "insert", "target": "items", "parameters": {
        "value": [{"value": "c", "reference": null}],
        "at": [{"value": "start", "reference": null}]
    }}]"#;

    runtime.handle_interaction(&id, insert_c, None).unwrap();
    assert_eq!(runtime.get_value(&id, "items"), Some(r#"["c","a","b"]"#));

    let insert_blank = r#"[{"action": "insert", "target": "items", "parameters": {
        "value": [{"value": " ", "reference": null}]
    }}]"#;
    let report = runtime.handle_interaction(&id, insert_blank, None).unwrap();
    assert_eq!(
        report.writes().next().and_then(|w| w.skip_reason()),
        Some(&SkipReason::NothingToInsert)
    );
    assert_eq!(runtime.get_value(&id, "items"), Some(r#"["c","a","b"]"#));
}

#[test]
fn test_insert_appends_by_default() {
    let mut runtime = runtime(&[("items", "[]"), ("draft", "hello")]);
    let id = main_id();
    let actions = r#"[{"action": "insert", "target": "items", "parameters": {
        "value": [{"value": "", "reference": "draft"}]
    }}]"#;

    runtime.handle_interaction(&id, actions, None).unwrap();
    runtime.handle_interaction(&id, actions, None).unwrap();
    assert_eq!(runtime.get_value(&id, "items"), Some(r#"["hello","hello"]"#));
}

#[test]
fn test_insert_into_non_list_is_skipped() {
    let mut runtime = runtime(&[("title", "plain text")]);
    let id = main_id();
    let actions = r#"[{"action": "insert", "target": "title", "parameters": {
        "value": [{"value": "x", "reference": null}]
    }}]"#;

    let report = runtime.handle_interaction(&id, actions, None).unwrap();
    assert!(matches!(
        report.writes().next().and_then(|w| w.skip_reason()),
        Some(SkipReason::NotAList { .. })
    ));
    assert_eq!(runtime.get_value(&id, "title"), Some("plain text"));
}

#[test]
fn test_clear_resets_by_encoding() {
    let mut runtime = runtime(&[("items", r#"["a"]"#), ("name", "Ada")]);
    let id = main_id();
    let actions = r#"[
        {"action": "clear", "target": "items"},
        {"action": "clear", "target": "name"}
    ]"#;

    runtime.handle_interaction(&id, actions, None).unwrap();
    assert_eq!(runtime.get_value(&id, "items"), Some("[]"));
    assert_eq!(runtime.get_value(&id, "name"), Some(""));
}

#[test]
fn test_event_flags_and_unknown_actions() {
    let mut runtime = runtime(&[("open", "false")]);
    let id = main_id();
    let actions = r#"[
        {"action": "stop-propagation"},
        {"action": "launch-rocket", "target": "open"},
        {"action": "clear"},
        {"action": "prevent-default"},
        {"action": "toggle", "target": "open"}
    ]"#;

    let report = runtime.handle_interaction(&id, actions, None).unwrap();

    assert!(report.stop_propagation);
    assert!(report.prevent_default);
    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.outcomes[1], ActionOutcome::Unknown("launch-rocket".into()));
    assert!(matches!(report.outcomes[2], ActionOutcome::Invalid(_)));
    assert_eq!(runtime.get_value(&id, "open"), Some("true"));
}

#[test]
fn test_message_host_with_payload() {
    let roots = vec![SurfaceNode::element("p").with_id("status:main")];
    let store = VariableStore::new()
        .with_variable("draft", Variable::new("hello"))
        .with_variable("status", Variable::new("").with_dependency("status", vec![Dependency::Value]));
    let mut runtime = Runtime::new(MemorySurface::from_roots(roots));
    runtime.init(main_id(), store, ExternalChildren::new());

    let received: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = received.clone();
    runtime.register_handler("save_draft", move |runtime, call| {
        if let Some(payload) = call.payload {
            sink.borrow_mut().push(payload.clone());
        }
        // Handlers may write back synchronously
        runtime.set_string(call.instance, "status", "saved");
        Ok(())
    });

    let actions = r#"[{"action": "message-host", "parameters": {"data": [{
        "value": "{\"function\": \"save-draft\", \"text\": \"\", \"source\": \"$VALUE\"}",
        "reference": "{\"text\": \"draft\"}"
    }]}}]"#;
    let report = runtime.handle_interaction(&main_id(), actions, Some("button")).unwrap();

    assert_eq!(
        report.outcomes,
        vec![ActionOutcome::HostMessage {
            handler: "save_draft".into(),
            result: Ok(()),
        }]
    );
    let received = received.borrow();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["text"], "hello");
    assert_eq!(received[0]["source"], "button");
    assert_eq!(runtime.surface().text_of("status:main").as_deref(), Some("saved"));
}

#[test]
fn test_message_host_by_target() {
    let mut runtime = runtime(&[("calls", "0")]);
    runtime.register_handler("bump_calls", |runtime, call| {
        runtime.increment(call.instance, "calls", 1, None, None);
        Ok(())
    });

    let actions = r#"[{"action": "message-host", "target": " bump-calls "}]"#;
    runtime.handle_interaction(&main_id(), actions, None).unwrap();
    runtime.handle_interaction(&main_id(), actions, None).unwrap();

    assert_eq!(runtime.get_value(&main_id(), "calls"), Some("2"));
}

#[test]
fn test_message_host_failures_are_reported() {
    let mut runtime = runtime(&[]);
    runtime.register_handler("explode", |_, call| {
        Err(HandlerError::Failed {
            name: call.name.to_string(),
            message: "boom".into(),
        })
    });
    let actions = r#"[
        {"action": "message-host", "target": "nobody-home"},
        {"action": "message-host", "target": "explode"},
        {"action": "message-host", "parameters": {"data": [{"value": "{\"x\": 1}", "reference": null}]}}
    ]"#;

    let report = runtime.handle_interaction(&main_id(), actions, None).unwrap();

    assert_eq!(
        report.outcomes,
        vec![
            ActionOutcome::HostMessage {
                handler: "nobody_home".into(),
                result: Err(HandlerError::NotRegistered("nobody_home".into())),
            },
            ActionOutcome::HostMessage {
                handler: "explode".into(),
                result: Err(HandlerError::Failed {
                    name: "explode".into(),
                    message: "boom".into(),
                }),
            },
            ActionOutcome::HostMessage {
                handler: String::new(),
                result: Err(HandlerError::MissingFunction),
            },
        ]
    );
}

#[test]
fn test_console_print_is_builtin() {
    let mut runtime = runtime(&[("name", "Ada")]);
    let actions = r#"[{"action": "message-host", "parameters": {"data": [{
        "value": "{\"function\": \"console-print\", \"who\": \"\"}",
        "reference": "{\"who\": \"name\"}"
    }]}}]"#;

    let report = runtime.handle_interaction(&main_id(), actions, None).unwrap();
    assert_eq!(
        report.outcomes,
        vec![ActionOutcome::HostMessage {
            handler: "console_print".into(),
            result: Ok(()),
        }]
    );
}

#[test]
fn test_boundary_errors() {
    let mut runtime = runtime(&[]);

    let err = runtime.handle_interaction(&main_id(), "not json", None).unwrap_err();
    assert!(matches!(err, RuntimeError::MalformedActions(_)));

    let err = runtime
        .handle_interaction(&InstanceId::new("ghost"), "[]", None)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownInstance(_)));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn test_boundary_errors_are_logged() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut runtime = runtime(&[]);
        let err = runtime
            .handle_interaction(&InstanceId::new("ghost"), "[]", None)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownInstance(_)));
        assert!(runtime.handle_interaction(&main_id(), "{", None).is_err());
    });

    let text = logs.text();
    assert!(text.contains("WARN"), "{text}");
    assert!(text.contains("Interaction for unknown instance"), "{text}");
    assert!(text.contains("instance=ghost"), "{text}");
    assert!(text.contains("Malformed action list"), "{text}");
}
