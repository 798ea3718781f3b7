//! Recorded pages and interaction scripts.
//!
//! A page file captures what the browser held right after bootstrap: the
//! rendered tree and, per instance, the variable table and the
//! external-children map. A script is the ordered list of host calls to
//! replay against it.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use weave_runtime::{
    ActionDescriptor, ExternalChildren, InsertPosition, InstanceId, MemorySurface, Runtime,
    RuntimeOptions, SurfaceNode, VariableStore, WriteOutcome,
};

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} declares no instances")]
    NoInstances(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub tree: Vec<SurfaceNode>,
    pub instances: Vec<PageInstance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInstance {
    pub id: InstanceId,
    #[serde(default)]
    pub variables: VariableStore,
    #[serde(default)]
    pub external_children: ExternalChildren,
}

impl Page {
    pub fn load(path: &Path) -> Result<Self, PageError> {
        let page: Page = read_json(path)?;
        if page.instances.is_empty() {
            return Err(PageError::NoInstances(path.to_path_buf()));
        }
        Ok(page)
    }

    /// Mount the tree and register every instance
    pub fn into_runtime(self, options: RuntimeOptions) -> Runtime<MemorySurface> {
        let mut runtime = Runtime::new(MemorySurface::from_roots(self.tree)).with_options(options);
        for instance in self.instances {
            runtime.init(instance.id, instance.variables, instance.external_children);
        }
        runtime
    }

    pub fn default_instance(&self) -> Option<&InstanceId> {
        self.instances.first().map(|instance| &instance.id)
    }
}

/// One host call of a replay script
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScriptStep {
    Interaction {
        #[serde(default)]
        instance: Option<InstanceId>,
        actions: Vec<ActionDescriptor>,
        #[serde(default)]
        context: Option<String>,
    },
    SetString {
        #[serde(default)]
        instance: Option<InstanceId>,
        variable: String,
        value: String,
    },
    SetBoolean {
        #[serde(default)]
        instance: Option<InstanceId>,
        variable: String,
        value: bool,
    },
    #[serde(rename_all = "camelCase")]
    Increment {
        #[serde(default)]
        instance: Option<InstanceId>,
        variable: String,
        #[serde(default = "default_step")]
        by: i64,
        #[serde(default)]
        clamp_min: Option<i64>,
        #[serde(default)]
        clamp_max: Option<i64>,
    },
    Insert {
        #[serde(default)]
        instance: Option<InstanceId>,
        variable: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        at: Option<String>,
    },
    SetBooleanForAll {
        variable: String,
        value: bool,
    },
    SetStringForAll {
        variable: String,
        value: String,
    },
    Teardown {
        instance: InstanceId,
    },
}

fn default_step() -> i64 {
    1
}

/// What replaying one step produced
#[derive(Debug)]
pub enum StepResult {
    Interaction(weave_runtime::InteractionReport),
    Writes(Vec<WriteOutcome>),
    TornDown(bool),
}

impl ScriptStep {
    pub fn label(&self) -> String {
        match self {
            ScriptStep::Interaction { actions, .. } => {
                let kinds: Vec<&str> = actions.iter().map(|a| a.action.as_str()).collect();
                format!("interaction [{}]", kinds.join(", "))
            }
            ScriptStep::SetString { variable, value, .. } => format!("set-string {variable} = {value:?}"),
            ScriptStep::SetBoolean { variable, value, .. } => format!("set-boolean {variable} = {value}"),
            ScriptStep::Increment { variable, by, .. } => format!("increment {variable} by {by}"),
            ScriptStep::Insert { variable, value, .. } => {
                format!("insert {variable} <- {}", value.as_deref().unwrap_or("<none>"))
            }
            ScriptStep::SetBooleanForAll { variable, value } => format!("set-boolean-for-all {variable} = {value}"),
            ScriptStep::SetStringForAll { variable, value } => {
                format!("set-string-for-all {variable} = {value:?}")
            }
            ScriptStep::Teardown { instance } => format!("teardown {instance}"),
        }
    }

    /// Run the step; steps without an instance target `fallback`
    pub fn apply(self, runtime: &mut Runtime<MemorySurface>, fallback: &InstanceId) -> anyhow::Result<StepResult> {
        let target = |instance: Option<InstanceId>| instance.unwrap_or_else(|| fallback.clone());

        let result = match self {
            ScriptStep::Interaction {
                instance,
                actions,
                context,
            } => {
                let id = target(instance);
                if runtime.instance(&id).is_none() {
                    anyhow::bail!("Unknown instance '{id}'");
                }
                StepResult::Interaction(runtime.dispatch(&id, actions, context.as_deref()))
            }
            ScriptStep::SetString {
                instance,
                variable,
                value,
            } => StepResult::Writes(vec![runtime.set_string(&target(instance), &variable, &value)]),
            ScriptStep::SetBoolean {
                instance,
                variable,
                value,
            } => StepResult::Writes(vec![runtime.set_boolean(&target(instance), &variable, value)]),
            ScriptStep::Increment {
                instance,
                variable,
                by,
                clamp_min,
                clamp_max,
            } => StepResult::Writes(vec![runtime.increment(
                &target(instance),
                &variable,
                by,
                clamp_min,
                clamp_max,
            )]),
            ScriptStep::Insert {
                instance,
                variable,
                value,
                at,
            } => {
                let position = at
                    .as_deref()
                    .map(InsertPosition::from_marker)
                    .unwrap_or_default();
                StepResult::Writes(vec![runtime.insert(
                    &target(instance),
                    &variable,
                    value.as_deref(),
                    position,
                )])
            }
            ScriptStep::SetBooleanForAll { variable, value } => {
                StepResult::Writes(runtime.set_boolean_for_all(&variable, value))
            }
            ScriptStep::SetStringForAll { variable, value } => {
                StepResult::Writes(runtime.set_string_for_all(&variable, &value))
            }
            ScriptStep::Teardown { instance } => StepResult::TornDown(runtime.teardown(&instance)),
        };
        Ok(result)
    }
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>, PageError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PageError> {
    let content = fs::read_to_string(path).map_err(|source| PageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| PageError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Indented text rendering of a surface snapshot
pub fn render_tree(nodes: &[SurfaceNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &SurfaceNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.tag);
    if let Some(id) = &node.id {
        out.push('#');
        out.push_str(id);
    }
    if let Some(ext_id) = &node.ext_id {
        out.push_str(&format!(" (ext {ext_id})"));
    }
    if !node.styles.is_empty() {
        let styles: Vec<String> = node.styles.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        out.push_str(&format!(" {{{}}}", styles.join("; ")));
    }
    if !node.text.is_empty() {
        out.push_str(&format!(" {:?}", node.text));
    }
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
