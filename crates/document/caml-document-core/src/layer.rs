//! The layer tree.
//!
//! A [`LayerNode`] owns everything below it: contents, states, transitions,
//! animations and its sublayers, keyed by id in document order. There are no
//! parent links; lookups walk downward from whichever node they start at.

use indexmap::IndexMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::elements::{Animation, Content, LayerState, StateTransition};
use crate::error::{CamlError, Result};
use crate::xml::XmlElement;

pub const BASE_LAYER_CLASS: &str = "CALayer";
pub const TEXT_LAYER_CLASS: &str = "CATextLayer";

const DEFAULT_POSITION: &str = "0 0";
const DEFAULT_BOUNDS: &str = "0 0 0 0";
const DEFAULT_ANCHOR_POINT: &str = "0.5 0.5";
const DEFAULT_OPACITY: &str = "1.0";
const DEFAULT_Z_POSITION: &str = "0";
const DEFAULT_CORNER_RADIUS: &str = "0";

/// Extra attributes of `CATextLayer`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextAttributes {
    pub string: Option<String>,
    pub font_size: Option<String>,
    pub font_family: Option<String>,
    pub alignment_mode: Option<String>,
    pub color: Option<String>,
}

impl TextAttributes {
    fn parse(element: &XmlElement) -> Self {
        Self {
            string: owned(element, "string"),
            font_size: owned(element, "fontSize"),
            font_family: owned(element, "fontFamily"),
            alignment_mode: owned(element, "alignmentMode"),
            color: owned(element, "color"),
        }
    }

    fn write(&self, element: &mut XmlElement) {
        set_opt(element, "string", &self.string);
        set_opt(element, "fontSize", &self.font_size);
        set_opt(element, "fontFamily", &self.font_family);
        set_opt(element, "alignmentMode", &self.alignment_mode);
        set_opt(element, "color", &self.color);
    }
}

/// Layer class discriminant plus whatever the class adds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LayerClass {
    #[default]
    Base,
    Text(TextAttributes),
    /// Any other class; only the shared attributes are modeled.
    Other(String),
}

impl LayerClass {
    pub fn name(&self) -> &str {
        match self {
            Self::Base => BASE_LAYER_CLASS,
            Self::Text(_) => TEXT_LAYER_CLASS,
            Self::Other(name) => name,
        }
    }

    fn parse(name: &str, element: &XmlElement) -> Self {
        match name {
            BASE_LAYER_CLASS => Self::Base,
            TEXT_LAYER_CLASS => Self::Text(TextAttributes::parse(element)),
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerNode {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Raw tokens, `x y`.
    pub position: Vec<String>,
    /// Raw tokens, `x y width height`.
    pub bounds: Vec<String>,
    /// Raw tokens, `x y`.
    pub anchor_point: Vec<String>,
    pub transform: Option<String>,
    pub opacity: String,
    pub z_position: String,
    pub background_color: Option<String>,
    pub corner_radius: String,
    pub hidden: bool,
    pub geometry_flipped: bool,
    pub class: LayerClass,
    pub contents: Option<Content>,
    /// Keyed by state name; a later duplicate replaces the earlier one.
    pub states: IndexMap<String, LayerState>,
    pub state_transitions: Vec<StateTransition>,
    pub animations: Vec<Animation>,
    sublayers: IndexMap<String, LayerNode>,
}

impl Default for LayerNode {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            position: tokens(DEFAULT_POSITION),
            bounds: tokens(DEFAULT_BOUNDS),
            anchor_point: tokens(DEFAULT_ANCHOR_POINT),
            transform: None,
            opacity: DEFAULT_OPACITY.into(),
            z_position: DEFAULT_Z_POSITION.into(),
            background_color: None,
            corner_radius: DEFAULT_CORNER_RADIUS.into(),
            hidden: false,
            geometry_flipped: false,
            class: LayerClass::Base,
            contents: None,
            states: IndexMap::new(),
            state_transitions: Vec::new(),
            animations: Vec::new(),
            sublayers: IndexMap::new(),
        }
    }
}

fn tokens(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn owned(element: &XmlElement, key: &str) -> Option<String> {
    element.attr(key).map(str::to_string)
}

fn set_opt(element: &mut XmlElement, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        element.set_attr(key, v.as_str());
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

impl LayerNode {
    /// Empty base layer with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Build a layer and its whole subtree from `element`.
    ///
    /// Fails only when there is no element. Anything recoverable below it is
    /// recorded in `diagnostics`.
    pub fn parse(element: Option<&XmlElement>, diagnostics: &mut Diagnostics) -> Result<Self> {
        let element = element
            .ok_or_else(|| CamlError::invalid_element("layer cannot be built without an element"))?;
        Ok(Self::from_element(element, diagnostics))
    }

    fn from_element(element: &XmlElement, diagnostics: &mut Diagnostics) -> Self {
        let class_name = element
            .attr("class")
            .or(Some(element.name.as_str()))
            .filter(|c| !c.is_empty())
            .unwrap_or(BASE_LAYER_CLASS);

        let mut node = Self {
            id: owned(element, "id"),
            name: owned(element, "name"),
            position: tokens(element.attr("position").unwrap_or(DEFAULT_POSITION)),
            bounds: tokens(element.attr("bounds").unwrap_or(DEFAULT_BOUNDS)),
            anchor_point: tokens(element.attr("anchorPoint").unwrap_or(DEFAULT_ANCHOR_POINT)),
            transform: owned(element, "transform"),
            opacity: element.attr("opacity").unwrap_or(DEFAULT_OPACITY).to_string(),
            z_position: element.attr("zPosition").unwrap_or(DEFAULT_Z_POSITION).to_string(),
            background_color: owned(element, "backgroundColor"),
            corner_radius: element
                .attr("cornerRadius")
                .unwrap_or(DEFAULT_CORNER_RADIUS)
                .to_string(),
            hidden: element.attr("hidden") == Some("1"),
            geometry_flipped: element.attr("geometryFlipped") == Some("1"),
            class: LayerClass::parse(class_name, element),
            contents: element.child("contents").and_then(Content::parse),
            ..Self::default()
        };

        if let Some(sublayers) = element.child("sublayers") {
            for child in sublayers.elements() {
                let layer = Self::from_element(child, diagnostics);
                match layer.id.clone().filter(|id| !id.is_empty()) {
                    Some(id) => {
                        if node.sublayers.insert(id.clone(), layer).is_some() {
                            diagnostics.push(
                                DiagnosticKind::DuplicateSublayerId,
                                format!("Duplicate sublayer id '{id}'; keeping the later one."),
                            );
                        }
                    }
                    None => diagnostics.push(
                        DiagnosticKind::SublayerMissingId,
                        format!(
                            "Sublayer <{}> found without an 'id' attribute. Skipping.",
                            child.name
                        ),
                    ),
                }
            }
        }

        if let Some(states) = element.child("states") {
            for child in states.elements() {
                match LayerState::parse(child) {
                    Some(state) => {
                        node.states.insert(state.name.clone(), state);
                    }
                    None => diagnostics.push(
                        DiagnosticKind::StateMissingName,
                        "State found without a 'name' attribute. Skipping.",
                    ),
                }
            }
        }

        if let Some(transitions) = element.child("stateTransitions") {
            node.state_transitions = transitions.elements().map(StateTransition::parse).collect();
        }

        if let Some(animations) = element.child("animations") {
            node.animations = animations
                .elements()
                .filter_map(|child| Animation::parse_entry(child, diagnostics))
                .collect();
        }

        node
    }

    /// Pre-order search from this node. With duplicate ids the first match in
    /// document order wins. An empty id never matches.
    pub fn find_layer(&self, id: &str) -> Option<&LayerNode> {
        if id.is_empty() {
            return None;
        }
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.sublayers.values().find_map(|child| child.find_layer(id))
    }

    pub fn find_layer_mut(&mut self, id: &str) -> Option<&mut LayerNode> {
        if id.is_empty() {
            return None;
        }
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.sublayers
            .values_mut()
            .find_map(|child| child.find_layer_mut(id))
    }

    /// First animation on this node (not its sublayers) targeting `key_path`.
    pub fn find_animation(&self, key_path: &str) -> Option<&Animation> {
        if key_path.is_empty() {
            return None;
        }
        self.animations
            .iter()
            .find(|a| a.key_path() == Some(key_path))
    }

    pub fn sublayers(&self) -> &IndexMap<String, LayerNode> {
        &self.sublayers
    }

    pub fn sublayer(&self, id: &str) -> Option<&LayerNode> {
        self.sublayers.get(id)
    }

    pub fn sublayer_mut(&mut self, id: &str) -> Option<&mut LayerNode> {
        self.sublayers.get_mut(id)
    }

    /// Child ids in document order.
    pub fn sublayer_ids(&self) -> impl Iterator<Item = &str> {
        self.sublayers.keys().map(String::as_str)
    }

    pub fn sublayers_mut(&mut self) -> impl Iterator<Item = &mut LayerNode> {
        self.sublayers.values_mut()
    }

    /// Append `layer`, or replace the existing child with the same id in
    /// place. Returns the replaced child.
    pub fn add_sublayer(&mut self, layer: LayerNode) -> Result<Option<LayerNode>> {
        let id = layer
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CamlError::invalid_element("sublayer has no id"))?;
        Ok(self.sublayers.insert(id, layer))
    }

    /// Remove a direct child, keeping the order of the others.
    pub fn remove_sublayer(&mut self, id: &str) -> Option<LayerNode> {
        self.sublayers.shift_remove(id)
    }

    /// Move a direct child to `index` (clamped). Returns false if `id` is not
    /// a child.
    pub fn move_sublayer(&mut self, id: &str, index: usize) -> bool {
        let Some(from) = self.sublayers.get_index_of(id) else {
            return false;
        };
        let to = index.min(self.sublayers.len() - 1);
        self.sublayers.move_index(from, to);
        true
    }

    /// This node and every descendant, pre-order.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Write this layer and its subtree back to an element.
    pub fn to_element(&self) -> XmlElement {
        let mut e = XmlElement::new(self.class.name());

        set_opt(&mut e, "id", &self.id);
        set_opt(&mut e, "name", &self.name);
        e.set_attr("position", self.position.join(" "));
        e.set_attr("bounds", self.bounds.join(" "));
        e.set_attr("hidden", flag(self.hidden));
        set_opt(&mut e, "transform", &self.transform);
        e.set_attr("anchorPoint", self.anchor_point.join(" "));
        e.set_attr("geometryFlipped", flag(self.geometry_flipped));
        e.set_attr("opacity", self.opacity.as_str());
        e.set_attr("zPosition", self.z_position.as_str());
        set_opt(&mut e, "backgroundColor", &self.background_color);
        e.set_attr("cornerRadius", self.corner_radius.as_str());
        if self.class != LayerClass::Base {
            e.set_attr("class", self.class.name());
        }
        if let LayerClass::Text(text) = &self.class {
            text.write(&mut e);
        }

        if let Some(contents) = self.contents.as_ref().and_then(Content::to_element) {
            e.push(contents);
        }
        if !self.sublayers.is_empty() {
            let mut sublayers = XmlElement::new("sublayers");
            for layer in self.sublayers.values() {
                sublayers.push(layer.to_element());
            }
            e.push(sublayers);
        }
        if !self.states.is_empty() {
            let mut states = XmlElement::new("states");
            for state in self.states.values() {
                states.push(state.to_element());
            }
            e.push(states);
        }
        if !self.state_transitions.is_empty() {
            let mut transitions = XmlElement::new("stateTransitions");
            for transition in &self.state_transitions {
                transitions.push(transition.to_element());
            }
            e.push(transitions);
        }
        if !self.animations.is_empty() {
            let mut animations = XmlElement::new("animations");
            for animation in &self.animations {
                animations.push(animation.to_element());
            }
            e.push(animations);
        }
        e
    }
}

/// Pre-order iterator over a layer subtree.
pub struct Walk<'a> {
    stack: Vec<&'a LayerNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a LayerNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.sublayers.values().rev());
        Some(node)
    }
}
