use std::collections::BTreeMap;

pub const CHILDREN_COMBINATION_MODE_ATTRIBUTE: &str = "combine.children";
pub const CHILDREN_COMBINATION_APPEND: &str = "append";
pub const SELF_COMBINATION_MODE_ATTRIBUTE: &str = "combine.self";
pub const SELF_COMBINATION_OVERRIDE: &str = "override";

/// A free-form configuration element, the way plugins and executions carry their settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub value: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: &str) -> XmlNode {
        XmlNode {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: &str) -> XmlNode {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> XmlNode {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> XmlNode {
        self.children.push(child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn has_value(&self) -> bool {
        self.value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
    }

    /// Merges `recessive` into `dominant`. Values and attributes of the dominant node win, children
    ///  are matched by element name and merged recursively.
    ///
    /// `combine.self="override"` on the dominant node suppresses the merge entirely,
    ///  `combine.children="append"` puts the recessive children in front of the dominant ones
    ///  instead of matching them up.
    pub fn merge(dominant: &mut XmlNode, recessive: &XmlNode) {
        if dominant.attributes.get(SELF_COMBINATION_MODE_ATTRIBUTE).map(|s| s.as_str()) == Some(SELF_COMBINATION_OVERRIDE) {
            return;
        }

        if !dominant.has_value() && recessive.has_value() {
            dominant.value = recessive.value.clone();
        }

        for (name, value) in &recessive.attributes {
            dominant.attributes.entry(name.clone()).or_insert_with(|| value.clone());
        }

        if recessive.children.is_empty() {
            return;
        }

        let append = dominant.attributes.get(CHILDREN_COMBINATION_MODE_ATTRIBUTE).map(|s| s.as_str()) == Some(CHILDREN_COMBINATION_APPEND);
        if append {
            let mut children = recessive.children.clone();
            children.append(&mut dominant.children);
            dominant.children = children;
            return;
        }

        // only the dominant node's own children are candidates, so repeated recessive
        //  elements that have no dominant counterpart are all carried over
        let own_children = dominant.children.len();
        for recessive_child in &recessive.children {
            match dominant.children[..own_children].iter_mut().find(|c| c.name == recessive_child.name) {
                Some(dominant_child) => XmlNode::merge(dominant_child, recessive_child),
                None => dominant.children.push(recessive_child.clone()),
            }
        }
    }

    /// Merges two optional configurations, `dominant` taking precedence.
    pub fn merge_optional(dominant: Option<&XmlNode>, recessive: Option<&XmlNode>) -> Option<XmlNode> {
        match (dominant, recessive) {
            (Some(d), Some(r)) => {
                let mut merged = d.clone();
                XmlNode::merge(&mut merged, r);
                Some(merged)
            }
            (Some(d), None) => Some(d.clone()),
            (None, r) => r.cloned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn includes(values: &[&str]) -> XmlNode {
        values.iter().fold(XmlNode::new("includes"), |node, v| node.with_child(XmlNode::new("include").with_value(v)))
    }

    #[test]
    fn test_dominant_value_wins() {
        let mut dominant = XmlNode::new("configuration")
            .with_child(XmlNode::new("source").with_value("17"));
        let recessive = XmlNode::new("configuration")
            .with_child(XmlNode::new("source").with_value("1.8"))
            .with_child(XmlNode::new("target").with_value("1.8"));

        XmlNode::merge(&mut dominant, &recessive);

        assert_eq!(dominant.child("source").unwrap().value.as_deref(), Some("17"));
        assert_eq!(dominant.child("target").unwrap().value.as_deref(), Some("1.8"));
    }

    #[test]
    fn test_dominant_list_is_not_extended() {
        let mut dominant = XmlNode::new("configuration").with_child(includes(&["a"]));
        let recessive = XmlNode::new("configuration").with_child(includes(&["b", "c"]));

        XmlNode::merge(&mut dominant, &recessive);

        assert_eq!(dominant.child("includes").unwrap().children.len(), 1);
    }

    #[test]
    fn test_append_children() {
        let mut dominant = XmlNode::new("configuration").with_child(
            includes(&["a"]).with_attribute(CHILDREN_COMBINATION_MODE_ATTRIBUTE, CHILDREN_COMBINATION_APPEND)
        );
        let recessive = XmlNode::new("configuration").with_child(includes(&["b"]));

        XmlNode::merge(&mut dominant, &recessive);

        let values: Vec<_> = dominant.child("includes").unwrap().children.iter()
            .map(|c| c.value.clone().unwrap())
            .collect();
        assert_eq!(values, vec!["b", "a"]);
    }

    #[test]
    fn test_override_self() {
        let mut dominant = XmlNode::new("configuration")
            .with_attribute(SELF_COMBINATION_MODE_ATTRIBUTE, SELF_COMBINATION_OVERRIDE);
        let recessive = XmlNode::new("configuration").with_child(XmlNode::new("skip").with_value("true"));

        XmlNode::merge(&mut dominant, &recessive);

        assert!(dominant.children.is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut dominant = XmlNode::new("configuration");
        let recessive = XmlNode::new("configuration").with_child(includes(&["a", "b"]));
        XmlNode::merge(&mut dominant, &recessive);
        let once = dominant.clone();
        XmlNode::merge(&mut dominant, &recessive);
        assert_eq!(dominant, once);
    }
}
