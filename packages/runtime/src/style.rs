//! Style effectors.
//!
//! A `Style` dependency speaks in logical parameters. Most map one-to-one to
//! an inline CSS property, a few expand into several properties or edit one
//! component of a composite property. [`StyleEffector`] is the seam; the
//! propagator never looks inside it.

use crate::surface::RenderSurface;

pub trait StyleEffector {
    /// Apply `value` for `parameter` on `node`, or clear it when `value` is `None`
    fn apply<S: RenderSurface>(
        &self,
        surface: &mut S,
        node: &S::Node,
        parameter: &str,
        value: Option<&str>,
        important: bool,
    );
}

/// Writes logical parameters as inline CSS
#[derive(Debug, Clone, Copy, Default)]
pub struct CssStyleEffector;

impl StyleEffector for CssStyleEffector {
    fn apply<S: RenderSurface>(
        &self,
        surface: &mut S,
        node: &S::Node,
        parameter: &str,
        value: Option<&str>,
        important: bool,
    ) {
        if let Some(component) = ShadowComponent::from_parameter(parameter) {
            let current = surface.style(node, "box-shadow").unwrap_or_default();
            let mut shadow = BoxShadow::parse(&current);
            shadow.set(component, value);
            surface.set_style(node, "box-shadow", shadow.to_css().as_deref(), false);
            return;
        }

        match parameter {
            "align" | "position" => apply_align(surface, node, value),
            "line-clamp" => apply_line_clamp(surface, node, value),
            "background-image" => apply_background_image(surface, node, value),
            "background-repeat" => apply_background_repeat(surface, node, value),
            _ => surface.set_style(node, parameter, value, important),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShadowComponent {
    OffsetX,
    OffsetY,
    Blur,
    Size,
    Color,
}

impl ShadowComponent {
    fn from_parameter(parameter: &str) -> Option<Self> {
        match parameter {
            "shadow-offset-x" => Some(ShadowComponent::OffsetX),
            "shadow-offset-y" => Some(ShadowComponent::OffsetY),
            "shadow-blur" => Some(ShadowComponent::Blur),
            "shadow-size" => Some(ShadowComponent::Size),
            "shadow-color" => Some(ShadowComponent::Color),
            _ => None,
        }
    }
}

const ZERO_LENGTH: &str = "0px";

/// `box-shadow` split into its color and four lengths
#[derive(Debug, Clone, PartialEq)]
struct BoxShadow {
    color: Option<String>,
    lengths: [String; 4],
}

impl BoxShadow {
    fn parse(css: &str) -> Self {
        let css = css.trim();
        let (color, rest) = match css.rfind(") ") {
            Some(index) => (Some(css[..=index].to_string()), &css[index + 2..]),
            None => {
                let first = css.split_whitespace().next().unwrap_or_default();
                if !first.is_empty() && !is_length(first) {
                    (Some(first.to_string()), css[first.len()..].trim_start())
                } else {
                    (None, css)
                }
            }
        };

        let mut lengths: [String; 4] = Default::default();
        let mut tokens = rest.split_whitespace();
        for slot in lengths.iter_mut() {
            *slot = tokens.next().unwrap_or(ZERO_LENGTH).to_string();
        }
        Self { color, lengths }
    }

    fn set(&mut self, component: ShadowComponent, value: Option<&str>) {
        let index = match component {
            ShadowComponent::Color => {
                self.color = value.map(str::to_string);
                return;
            }
            ShadowComponent::OffsetX => 0,
            ShadowComponent::OffsetY => 1,
            ShadowComponent::Blur => 2,
            ShadowComponent::Size => 3,
        };
        self.lengths[index] = value.unwrap_or(ZERO_LENGTH).to_string();
    }

    /// `None` for a colorless all-zero shadow
    fn to_css(&self) -> Option<String> {
        if self.color.is_none() && self.lengths.iter().all(|l| is_zero(l)) {
            return None;
        }
        let mut parts: Vec<&str> = Vec::with_capacity(5);
        if let Some(color) = &self.color {
            parts.push(color);
        }
        parts.extend(self.lengths.iter().map(String::as_str));
        Some(parts.join(" "))
    }
}

fn is_length(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

fn is_zero(length: &str) -> bool {
    length == "0" || length == ZERO_LENGTH
}

const POSITIONED_PROPERTIES: [&str; 5] = ["left", "top", "transform", "right", "bottom"];
const FLOW_PROPERTIES: [&str; 4] = ["align-self", "margin-bottom", "margin-top", "margin-left"];

/// Placement of an absolutely or fixed positioned node
fn positioned_preset(value: &str) -> &'static [(&'static str, &'static str)] {
    match value {
        "center" => &[("left", "50%"), ("top", "50%"), ("transform", "translate(-50%,-50%)")],
        "top" => &[("left", "50%"), ("top", "0"), ("transform", "translateX(-50%)")],
        "left" => &[("left", "0"), ("top", "50%"), ("transform", "translateY(-50%)")],
        "right" => &[("right", "0"), ("top", "50%"), ("transform", "translate(-50%)")],
        "bottom" => &[("left", "50%"), ("bottom", "0"), ("transform", "translateX(-50%)")],
        "top-left" => &[("left", "0"), ("top", "0")],
        "top-right" => &[("right", "0"), ("top", "0")],
        "bottom-left" => &[("left", "0"), ("bottom", "0")],
        "bottom-right" => &[("right", "0"), ("bottom", "0")],
        _ => &[],
    }
}

/// Placement of an in-flow node inside a flex parent
fn flow_preset(value: &str) -> &'static [(&'static str, &'static str)] {
    match value {
        "center" => &[("align-self", "center"), ("margin-bottom", "auto"), ("margin-top", "auto")],
        "top" => &[("align-self", "center"), ("margin-bottom", "auto")],
        "left" => &[("align-self", "flex-start"), ("margin-bottom", "auto"), ("margin-top", "auto")],
        "right" => &[
            ("align-self", "flex-end"),
            ("margin-bottom", "auto"),
            ("margin-top", "auto"),
            ("margin-left", "auto"),
        ],
        "bottom" => &[("align-self", "center"), ("margin-bottom", "0"), ("margin-top", "auto")],
        "top-left" => &[("align-self", "flex-start")],
        "top-right" => &[("align-self", "flex-end"), ("margin-left", "auto")],
        "bottom-left" => &[("align-self", "flex-start"), ("margin-bottom", "0"), ("margin-top", "auto")],
        "bottom-right" => &[
            ("align-self", "flex-end"),
            ("margin-bottom", "0"),
            ("margin-top", "auto"),
            ("margin-left", "auto"),
        ],
        _ => &[],
    }
}

fn apply_align<S: RenderSurface>(surface: &mut S, node: &S::Node, value: Option<&str>) {
    let positioned = matches!(surface.style(node, "position").as_deref(), Some("fixed" | "absolute"));
    let value = value.unwrap_or_default();
    let (reset, preset) = if positioned {
        (&POSITIONED_PROPERTIES[..], positioned_preset(value))
    } else {
        (&FLOW_PROPERTIES[..], flow_preset(value))
    };

    for property in reset {
        surface.set_style(node, property, None, false);
    }
    for &(property, css) in preset {
        surface.set_style(node, property, Some(css), false);
    }
}

fn apply_line_clamp<S: RenderSurface>(surface: &mut S, node: &S::Node, value: Option<&str>) {
    match value {
        Some(lines) => {
            surface.set_style(node, "display", Some("-webkit-box"), false);
            surface.set_style(node, "overflow", Some("hidden"), false);
            surface.set_style(node, "-webkit-line-clamp", Some(lines), false);
            surface.set_style(node, "-webkit-box-orient", Some("vertical"), false);
        }
        None => {
            for property in ["display", "overflow", "-webkit-line-clamp", "-webkit-box-orient"] {
                surface.set_style(node, property, None, false);
            }
        }
    }
}

fn apply_background_image<S: RenderSurface>(surface: &mut S, node: &S::Node, value: Option<&str>) {
    match value {
        Some(url) => {
            let repeating = surface.has_style(node, "background-repeat");
            surface.set_style(node, "background-image", Some(&format!("url({url})")), false);
            if !repeating {
                surface.set_style(node, "background-size", Some("cover"), false);
                surface.set_style(node, "background-position", Some("center"), false);
            }
        }
        None => {
            for property in ["background-image", "background-size", "background-position"] {
                surface.set_style(node, property, None, false);
            }
        }
    }
}

fn apply_background_repeat<S: RenderSurface>(surface: &mut S, node: &S::Node, value: Option<&str>) {
    match value {
        Some(_) => {
            surface.set_style(node, "background-repeat", Some("repeat"), false);
            surface.set_style(node, "background-size", None, false);
            surface.set_style(node, "background-position", None, false);
        }
        None => {
            surface.set_style(node, "background-repeat", None, false);
            surface.set_style(node, "background-size", Some("cover"), false);
            surface.set_style(node, "background-position", Some("center"), false);
        }
    }
}
