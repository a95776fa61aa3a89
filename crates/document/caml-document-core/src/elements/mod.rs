//! Leaf entities hanging off a layer.
//!
//! Each one reads itself from an [`XmlElement`](crate::xml::XmlElement) and
//! writes itself back. Only the discriminating attributes are modeled; the
//! rest of the element is carried through as-is.

pub mod animation;
pub mod content;
pub mod state;

pub use animation::{
    Animation, AnimationError, GenericAnimation, KeyframeAnimation, MatchMoveAnimation,
};
pub use content::Content;
pub use state::{LayerState, StateTransition};
