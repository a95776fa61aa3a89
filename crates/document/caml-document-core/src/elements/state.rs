//! Named layer states and the transitions between them.

use crate::xml::XmlElement;

/// One entry of `<states>`, keyed by `name`. The state's body (its set-value
/// elements) is kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerState {
    pub name: String,
    body: XmlElement,
}

impl LayerState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: XmlElement::new("LKState"),
        }
    }

    /// `None` when the element has no usable `name`.
    pub fn parse(element: &XmlElement) -> Option<Self> {
        let name = element.attr("name").filter(|n| !n.is_empty())?;
        Some(Self {
            name: name.to_string(),
            body: element.clone(),
        })
    }

    pub fn element(&self) -> &XmlElement {
        &self.body
    }

    pub fn element_mut(&mut self) -> &mut XmlElement {
        &mut self.body
    }

    pub fn to_element(&self) -> XmlElement {
        let mut el = self.body.clone();
        el.set_attr("name", self.name.as_str());
        el
    }
}

/// One entry of `<stateTransitions>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTransition {
    pub from_state: Option<String>,
    pub to_state: Option<String>,
    body: XmlElement,
}

impl StateTransition {
    pub fn parse(element: &XmlElement) -> Self {
        Self {
            from_state: element.attr("fromState").map(str::to_string),
            to_state: element.attr("toState").map(str::to_string),
            body: element.clone(),
        }
    }

    pub fn element(&self) -> &XmlElement {
        &self.body
    }

    pub fn element_mut(&mut self) -> &mut XmlElement {
        &mut self.body
    }

    pub fn to_element(&self) -> XmlElement {
        let mut el = self.body.clone();
        el.set_optional_attr("fromState", self.from_state.as_deref());
        el.set_optional_attr("toState", self.to_state.as_deref());
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_keeps_body_and_tracks_renames() {
        let mut body = XmlElement::new("LKState").with_attr("name", "Pressed");
        body.push(XmlElement::new("elements"));
        let mut state = LayerState::parse(&body).unwrap();
        state.name = "Released".into();

        let out = state.to_element();
        assert_eq!(out.attr("name"), Some("Released"));
        assert!(out.child("elements").is_some());
    }

    #[test]
    fn unnamed_state_is_rejected() {
        assert!(LayerState::parse(&XmlElement::new("LKState")).is_none());
    }

    #[test]
    fn transition_clears_removed_endpoints() {
        let el = XmlElement::new("LKStateTransition")
            .with_attr("fromState", "*")
            .with_attr("toState", "Pressed");
        let mut t = StateTransition::parse(&el);
        assert_eq!(t.from_state.as_deref(), Some("*"));
        t.from_state = None;
        let out = t.to_element();
        assert_eq!(out.attr("fromState"), None);
        assert_eq!(out.attr("toState"), Some("Pressed"));
    }
}
