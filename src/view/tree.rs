//! Static UI tree.
//!
//! A [`Node`] is a plain value: tag, class, attributes, an optional click
//! action and children. Rendering produces a fresh tree; nothing here holds
//! state or performs I/O.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// Action
// ============================================================================

/// What an interactive node does when clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Start a greeter chain.
    Greet,
}

impl Action {
    /// Returns the action name used in markup.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Greet => "greet",
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// One element of the UI tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Element tag (`div`, `button`, ...).
    pub tag: String,

    /// CSS class, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Attributes in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,

    /// Click hook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_click: Option<Action>,

    /// Child elements.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

// ============================================================================
// Constructors
// ============================================================================

impl Node {
    /// Creates an empty element.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            class: None,
            attributes: Vec::new(),
            on_click: None,
            children: Vec::new(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Node {
    /// Sets the class.
    #[inline]
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Appends an attribute.
    #[inline]
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Attaches a click action.
    #[inline]
    #[must_use]
    pub fn with_on_click(mut self, action: Action) -> Self {
        self.on_click = Some(action);
        self
    }

    /// Appends a child.
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Node {
    /// Returns `true` if this node has a click action.
    #[inline]
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.on_click.is_some()
    }

    /// Returns the value of attribute `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns every node in the tree, parents before children.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Returns the first node with `tag`, depth-first.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Option<&Node> {
        self.descendants().into_iter().find(|n| n.tag == tag)
    }

    /// Counts nodes matching `predicate`.
    #[must_use]
    pub fn count_where(&self, predicate: impl Fn(&Node) -> bool) -> usize {
        self.descendants().into_iter().filter(|n| predicate(n)).count()
    }

    /// Counts nodes with a click action.
    #[inline]
    #[must_use]
    pub fn interactive_count(&self) -> usize {
        self.count_where(Node::is_interactive)
    }

    /// Counts `img` nodes.
    #[inline]
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.count_where(|n| n.tag == "img")
    }
}

// ============================================================================
// Tests
// ============================================================================
