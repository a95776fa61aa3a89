//! `<contents>` of a layer.

use crate::xml::XmlElement;

pub const IMAGE_CONTENT_TYPE: &str = "CGImage";

/// Layer contents. Only image references are modeled; any other
/// `<contents type=…>` is dropped on load.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Content {
    /// Image stored in the bundle, `src` relative to the bundle directory.
    Image { src: String },
}

impl Content {
    pub fn image(src: impl Into<String>) -> Self {
        Self::Image { src: src.into() }
    }

    /// `None` for unmodeled types and for images without a source.
    pub fn parse(element: &XmlElement) -> Option<Self> {
        match (element.attr("type"), element.attr("src")) {
            (Some(IMAGE_CONTENT_TYPE), Some(src)) if !src.is_empty() => Some(Self::image(src)),
            _ => None,
        }
    }

    pub fn src(&self) -> Option<&str> {
        match self {
            Self::Image { src } => Some(src.as_str()),
        }
    }

    /// `None` when there is nothing worth emitting.
    pub fn to_element(&self) -> Option<XmlElement> {
        match self {
            Self::Image { src } if !src.is_empty() => Some(
                XmlElement::new("contents")
                    .with_attr("type", IMAGE_CONTENT_TYPE)
                    .with_attr("src", src.as_str()),
            ),
            Self::Image { .. } => None,
        }
    }
}
