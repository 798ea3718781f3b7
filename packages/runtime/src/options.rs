use serde::{Deserialize, Serialize};

pub const DEFAULT_LOOP_PLACEHOLDER: &str = "$loop$";

/// Tunables of the write path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeOptions {
    /// Text in a list template replaced by each item's value
    #[serde(default = "default_loop_placeholder")]
    pub loop_placeholder: String,

    /// Style parameters reset to `0px` when a non-matching descriptor has no default
    #[serde(default = "default_zero_width_parameters")]
    pub zero_width_parameters: Vec<String>,
}

fn default_loop_placeholder() -> String {
    DEFAULT_LOOP_PLACEHOLDER.to_string()
}

fn default_zero_width_parameters() -> Vec<String> {
    [
        "border-left-width",
        "border-right-width",
        "border-top-width",
        "border-bottom-width",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl RuntimeOptions {
    pub fn resets_to_zero(&self, parameter: &str) -> bool {
        self.zero_width_parameters.iter().any(|p| p == parameter)
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            loop_placeholder: default_loop_placeholder(),
            zero_width_parameters: default_zero_width_parameters(),
        }
    }
}
