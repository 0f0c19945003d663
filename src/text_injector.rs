//! Text injector - in-place replacement of a typed trigger
//!
//! Two kinds of editing surface are supported:
//! - **Plain**: one linear value with a caret (inputs, textareas)
//! - **Rich**: a tree of text-bearing nodes where the caret sits inside one
//!   node (content-editable regions)
//!
//! Carets are character offsets, not byte offsets. Only the occurrence of
//! the trigger nearest to (and ending at or before) the caret is replaced.
//! When the trigger cannot be found the surface is left untouched.

use tracing::debug;

/// A linear text value with a single caret
pub trait PlainSurface {
    fn text(&self) -> String;
    /// Caret position in characters
    fn caret(&self) -> usize;
    fn set_text_and_caret(&mut self, text: String, caret: usize);
    /// Let dependent listeners observe a programmatic change
    fn dispatch_input(&mut self);
}

/// A single text node of a rich surface, the one holding the caret
pub trait RichSurface {
    /// Text of the node containing the caret, `None` if the caret is not
    /// inside a text-bearing node
    fn node_text(&self) -> Option<String>;
    /// Caret offset in characters within that node
    fn caret_offset(&self) -> Option<usize>;
    fn set_node_text_and_caret(&mut self, text: String, caret: usize);
}

/// The surface an edit event happened on
pub enum Surface<'a> {
    Plain(&'a mut dyn PlainSurface),
    Rich(&'a mut dyn RichSurface),
}

impl Surface<'_> {
    /// All text strictly before the caret in the current line or node
    pub fn left_context(&self) -> Option<String> {
        match self {
            Surface::Plain(surface) => {
                let text = surface.text();
                let left = prefix_chars(&text, surface.caret());
                // A plain value may span lines; triggers never do
                Some(left.rsplit('\n').next().unwrap_or(left).to_string())
            }
            Surface::Rich(surface) => {
                let text = surface.node_text()?;
                let caret = surface.caret_offset()?;
                Some(prefix_chars(&text, caret).to_string())
            }
        }
    }

    /// Replace `trigger` with `output`, see [`replace_plain`] / [`replace_rich`]
    pub fn replace(&mut self, trigger: &str, output: &str) -> bool {
        match self {
            Surface::Plain(surface) => replace_plain(&mut **surface, trigger, output),
            Surface::Rich(surface) => replace_rich(&mut **surface, trigger, output),
        }
    }
}

/// Replace the last occurrence of `trigger` at or before the caret
///
/// On success the caret sits right after the inserted text and an input
/// notification is dispatched.
pub fn replace_plain(surface: &mut dyn PlainSurface, trigger: &str, output: &str) -> bool {
    let text = surface.text();
    let Some((new_text, caret)) = splice_before_caret(&text, surface.caret(), trigger, output)
    else {
        debug!(trigger = %trigger, "Trigger not found before caret in plain surface");
        return false;
    };

    surface.set_text_and_caret(new_text, caret);
    surface.dispatch_input();
    debug!(trigger = %trigger, caret, "Replaced trigger in plain surface");
    true
}

/// Replace the last occurrence of `trigger` within the caret's text node
pub fn replace_rich(surface: &mut dyn RichSurface, trigger: &str, output: &str) -> bool {
    let (Some(text), Some(offset)) = (surface.node_text(), surface.caret_offset()) else {
        debug!("Caret is not inside a text node");
        return false;
    };
    let Some((new_text, caret)) = splice_before_caret(&text, offset, trigger, output) else {
        debug!(trigger = %trigger, "Trigger not found before caret in text node");
        return false;
    };

    surface.set_node_text_and_caret(new_text, caret);
    debug!(trigger = %trigger, caret, "Replaced trigger in rich surface");
    true
}

/// Splice `output` over the last `trigger` ending at or before `caret`
///
/// Returns the new text and the caret (in characters) after the insertion.
fn splice_before_caret(
    text: &str,
    caret: usize,
    trigger: &str,
    output: &str,
) -> Option<(String, usize)> {
    if trigger.is_empty() {
        return None;
    }
    let left = prefix_chars(text, caret);
    let start = left.rfind(trigger)?;
    let end = start + trigger.len();

    let mut new_text = String::with_capacity(text.len() - trigger.len() + output.len());
    new_text.push_str(&text[..start]);
    new_text.push_str(output);
    new_text.push_str(&text[end..]);

    let caret = text[..start].chars().count() + output.chars().count();
    Some((new_text, caret))
}

/// The first `chars` characters of `text` (all of it if shorter)
fn prefix_chars(text: &str, chars: usize) -> &str {
    let end = text
        .char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

// ============================================================================
// In-memory surfaces
// ============================================================================

/// A plain input field held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextField {
    text: String,
    caret: usize,
    /// Number of input notifications dispatched
    input_events: usize,
}

impl TextField {
    /// Field with the caret at the end of `text`
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let caret = text.chars().count();
        Self {
            text,
            caret,
            input_events: 0,
        }
    }

    pub fn with_caret(mut self, caret: usize) -> Self {
        self.caret = caret.min(self.text.chars().count());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn input_events(&self) -> usize {
        self.input_events
    }

    /// Simulate typing one character at the caret
    pub fn type_char(&mut self, c: char) {
        let at = prefix_chars(&self.text, self.caret).len();
        self.text.insert(at, c);
        self.caret += 1;
    }

    /// Simulate typing a string character by character
    pub fn type_str(&mut self, s: &str) {
        for c in s.chars() {
            self.type_char(c);
        }
    }
}

impl PlainSurface for TextField {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn caret(&self) -> usize {
        self.caret
    }

    fn set_text_and_caret(&mut self, text: String, caret: usize) {
        self.caret = caret.min(text.chars().count());
        self.text = text;
    }

    fn dispatch_input(&mut self) {
        self.input_events += 1;
    }
}

/// One node of a [`RichDocument`]
#[derive(Debug, Clone, PartialEq)]
pub enum RichNode {
    Text(String),
    /// A non-text element such as an image or line break
    Element(String),
}

/// A flat content-editable region held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichDocument {
    nodes: Vec<RichNode>,
    /// Node index and offset within it
    caret: Option<(usize, usize)>,
}

impl RichDocument {
    pub fn new(nodes: Vec<RichNode>) -> Self {
        Self { nodes, caret: None }
    }

    pub fn with_caret(mut self, node: usize, offset: usize) -> Self {
        self.caret = Some((node, offset));
        self
    }

    pub fn nodes(&self) -> &[RichNode] {
        &self.nodes
    }

    pub fn caret(&self) -> Option<(usize, usize)> {
        self.caret
    }

    /// Concatenated text of all text nodes
    pub fn text_content(&self) -> String {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                RichNode::Text(text) => Some(text.as_str()),
                RichNode::Element(_) => None,
            })
            .collect()
    }

    fn caret_text_node(&self) -> Option<(usize, &String)> {
        let (node, _) = self.caret?;
        match self.nodes.get(node)? {
            RichNode::Text(text) => Some((node, text)),
            RichNode::Element(_) => None,
        }
    }
}

impl RichSurface for RichDocument {
    fn node_text(&self) -> Option<String> {
        self.caret_text_node().map(|(_, text)| text.clone())
    }

    fn caret_offset(&self) -> Option<usize> {
        self.caret_text_node()?;
        self.caret.map(|(_, offset)| offset)
    }

    fn set_node_text_and_caret(&mut self, text: String, caret: usize) {
        let Some(node) = self.caret_text_node().map(|(node, _)| node) else {
            return;
        };
        self.caret = Some((node, caret));
        self.nodes[node] = RichNode::Text(text);
    }
}
