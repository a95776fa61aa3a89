//! Entries of a layer's `<animations>` list.
//!
//! The `type` attribute selects the variant. Types this crate does not model
//! become [`Animation::Generic`] so they still round-trip; only an element
//! that cannot describe an animation at all is rejected.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::xml::XmlElement;

pub const ANIMATION_ELEMENT: &str = "animation";
pub const KEYFRAME_TYPE: &str = "CAKeyframeAnimation";
pub const MATCH_MOVE_TYPE: &str = "CAMatchMoveAnimation";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    #[error("expected <animation>, found <{found}>")]
    NotAnAnimation { found: String },

    #[error("{kind} requires a keyPath")]
    MissingKeyPath { kind: &'static str },
}

/// Discriminant read from the `type` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnimationType {
    Keyframe,
    MatchMove,
    Unrecognized(Option<String>),
}

impl AnimationType {
    pub fn from_discriminant(kind: Option<&str>) -> Self {
        match kind {
            Some(KEYFRAME_TYPE) => Self::Keyframe,
            Some(MATCH_MOVE_TYPE) => Self::MatchMove,
            other => Self::Unrecognized(other.map(str::to_string)),
        }
    }
}

/// Keyframe animation of a single key path. `values` and `keyTimes` stay in
/// the carried element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyframeAnimation {
    pub key_path: String,
    pub duration: Option<String>,
    pub calculation_mode: Option<String>,
    body: XmlElement,
}

/// Animation that pins a layer to points of another layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchMoveAnimation {
    pub key_path: Option<String>,
    pub source_layer: Option<String>,
    body: XmlElement,
}

/// Any other animation type, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericAnimation {
    pub kind: Option<String>,
    pub key_path: Option<String>,
    body: XmlElement,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Animation {
    Keyframe(KeyframeAnimation),
    MatchMove(MatchMoveAnimation),
    Generic(GenericAnimation),
}

fn owned(element: &XmlElement, key: &str) -> Option<String> {
    element.attr(key).map(str::to_string)
}

impl Animation {
    pub fn from_element(element: &XmlElement) -> Result<Self, AnimationError> {
        if element.name != ANIMATION_ELEMENT {
            return Err(AnimationError::NotAnAnimation {
                found: element.name.clone(),
            });
        }
        let body = element.clone();
        Ok(match AnimationType::from_discriminant(element.attr("type")) {
            AnimationType::Keyframe => Self::Keyframe(KeyframeAnimation {
                key_path: owned(element, "keyPath")
                    .filter(|k| !k.is_empty())
                    .ok_or(AnimationError::MissingKeyPath {
                        kind: KEYFRAME_TYPE,
                    })?,
                duration: owned(element, "duration"),
                calculation_mode: owned(element, "calculationMode"),
                body,
            }),
            AnimationType::MatchMove => Self::MatchMove(MatchMoveAnimation {
                key_path: owned(element, "keyPath"),
                source_layer: owned(element, "sourceLayer"),
                body,
            }),
            AnimationType::Unrecognized(kind) => Self::Generic(GenericAnimation {
                kind,
                key_path: owned(element, "keyPath"),
                body,
            }),
        })
    }

    /// Keep `element` verbatim, whatever its type.
    pub fn generic(element: &XmlElement) -> Self {
        Self::Generic(GenericAnimation {
            kind: owned(element, "type"),
            key_path: owned(element, "keyPath"),
            body: element.clone(),
        })
    }

    /// Build one list entry, recording what had to be degraded or dropped.
    ///
    /// Unknown types, and known types missing what they need, fall back to
    /// [`Animation::Generic`]. Only elements that are not animations at all
    /// are omitted.
    pub fn parse_entry(element: &XmlElement, diagnostics: &mut Diagnostics) -> Option<Self> {
        match Self::from_element(element) {
            Ok(Self::Generic(g)) => {
                diagnostics.push(
                    DiagnosticKind::UnrecognizedAnimation,
                    format!(
                        "Unsupported animation type '{}'. Creating generic animation.",
                        g.kind.as_deref().unwrap_or("<none>")
                    ),
                );
                Some(Self::Generic(g))
            }
            Ok(anim) => Some(anim),
            Err(e @ AnimationError::MissingKeyPath { .. }) => {
                diagnostics.push(
                    DiagnosticKind::UnrecognizedAnimation,
                    format!("Could not build animation ({e}). Creating generic animation."),
                );
                Some(Self::generic(element))
            }
            Err(e @ AnimationError::NotAnAnimation { .. }) => {
                diagnostics.push(
                    DiagnosticKind::AnimationSkipped,
                    format!("Failed to initialize animation: {e}"),
                );
                None
            }
        }
    }

    pub fn animation_type(&self) -> AnimationType {
        match self {
            Self::Keyframe(_) => AnimationType::Keyframe,
            Self::MatchMove(_) => AnimationType::MatchMove,
            Self::Generic(g) => AnimationType::Unrecognized(g.kind.clone()),
        }
    }

    /// The raw `type` discriminant.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Keyframe(_) => Some(KEYFRAME_TYPE),
            Self::MatchMove(_) => Some(MATCH_MOVE_TYPE),
            Self::Generic(g) => g.kind.as_deref(),
        }
    }

    pub fn key_path(&self) -> Option<&str> {
        match self {
            Self::Keyframe(k) => Some(k.key_path.as_str()),
            Self::MatchMove(m) => m.key_path.as_deref(),
            Self::Generic(g) => g.key_path.as_deref(),
        }
    }

    pub fn element(&self) -> &XmlElement {
        match self {
            Self::Keyframe(k) => &k.body,
            Self::MatchMove(m) => &m.body,
            Self::Generic(g) => &g.body,
        }
    }

    pub fn element_mut(&mut self) -> &mut XmlElement {
        match self {
            Self::Keyframe(k) => &mut k.body,
            Self::MatchMove(m) => &mut m.body,
            Self::Generic(g) => &mut g.body,
        }
    }

    /// The carried element with modeled attributes written over it.
    pub fn to_element(&self) -> XmlElement {
        let mut el = self.element().clone();
        el.set_optional_attr("type", self.type_name());
        el.set_optional_attr("keyPath", self.key_path());
        match self {
            Self::Keyframe(k) => {
                el.set_optional_attr("duration", k.duration.as_deref());
                el.set_optional_attr("calculationMode", k.calculation_mode.as_deref());
            }
            Self::MatchMove(m) => {
                el.set_optional_attr("sourceLayer", m.source_layer.as_deref());
            }
            Self::Generic(_) => {}
        }
        el
    }
}
