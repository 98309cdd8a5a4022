//! Menu graph: nodes keyed by symbol, edges guarded by flag predicates.
//!
//! Nodes never own each other; edges name their destination by symbol so the
//! graph can hold cycles (back navigation, retry loops).

pub mod app;

use std::collections::HashMap;

use crate::cache::Frame;
use crate::error::{EngineError, Result};
use crate::flags::FlagManager;
use crate::registry::HandlerRegistry;
use crate::state::FlagSet;

/// Text in every supported language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Localized {
    pub eng: String,
    pub swa: String,
}

impl Localized {
    pub fn new(eng: &str, swa: &str) -> Self {
        Self {
            eng: eng.to_string(),
            swa: swa.to_string(),
        }
    }

    /// Text for `lang`, falling back to English when no translation exists.
    pub fn get(&self, lang: &str) -> &str {
        match lang {
            "swa" if !self.swa.is_empty() => &self.swa,
            _ => &self.eng,
        }
    }
}

/// Predicate over the flag set and the turn input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    FlagSet(u32),
    FlagReset(u32),
    /// Input equals the given string exactly.
    Input(String),
    /// Any non-empty input.
    AnyInput,
    All(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, flags: &FlagSet, input: &str) -> bool {
        match self {
            Condition::Always => true,
            Condition::FlagSet(bit) => flags.is_set(*bit),
            Condition::FlagReset(bit) => !flags.is_set(*bit),
            Condition::Input(want) => input == want,
            Condition::AnyInput => !input.is_empty(),
            Condition::All(all) => all.iter().all(|c| c.matches(flags, input)),
        }
    }
}

/// Where an edge leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(String),
    /// Previous screen on the path.
    Back,
    /// Clear the path and enter the root node.
    Root,
    /// Render the current screen again.
    Repeat,
    /// End the session showing the current screen.
    Quit,
    /// Stop and wait for input.
    Halt,
}

pub fn go(symbol: &str) -> Target {
    Target::Node(symbol.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub when: Condition,
    pub to: Target,
}

/// One selectable line of a menu screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub selector: String,
    pub label: Localized,
}

/// A menu screen.
///
/// On entry the node runs its `loads` in order, then follows the first
/// matching `entry` edge; with none it waits for input. Input is routed by
/// the first matching `input` edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub symbol: String,
    pub loads: Vec<String>,
    pub template: Localized,
    pub items: Vec<MenuItem>,
    pub entry: Vec<Edge>,
    pub input: Vec<Edge>,
    pub terminal: bool,
}

impl Node {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            loads: Vec::new(),
            template: Localized::default(),
            items: Vec::new(),
            entry: Vec::new(),
            input: Vec::new(),
            terminal: false,
        }
    }

    pub fn entry_edge(&self, flags: &FlagSet, input: &str) -> Option<&Edge> {
        self.entry.iter().find(|e| e.when.matches(flags, input))
    }

    pub fn input_edge(&self, flags: &FlagSet, input: &str) -> Option<&Edge> {
        self.input.iter().find(|e| e.when.matches(flags, input))
    }

    /// Render the screen body: the filled template followed by the menu
    /// items, one per line. Trailing newlines of the body are dropped.
    pub fn render(&self, lang: &str, frame: Option<&Frame>, separator: &str) -> String {
        let body = fill_template(self.template.get(lang), |name| {
            frame.and_then(|f| f.get(name))
        });
        let mut lines: Vec<String> = Vec::with_capacity(1 + self.items.len());
        let body = body.trim_end_matches('\n');
        if !body.is_empty() {
            lines.push(body.to_string());
        }
        for item in &self.items {
            lines.push(format!("{}{}{}", item.selector, separator, item.label.get(lang)));
        }
        lines.join("\n")
    }
}

/// Replace `{name}` placeholders using `lookup`; unknown names render empty.
/// A `{` without a matching `}` is kept literally.
pub fn fill_template<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                out.push_str(lookup(&after[..close]).unwrap_or_default());
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builds a [`Node`], resolving flag names through the flag table. The
/// first unknown flag is reported by [`NodeBuilder::build`].
pub struct NodeBuilder<'a> {
    flags: &'a FlagManager,
    node: Node,
    error: Option<EngineError>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(flags: &'a FlagManager, symbol: &str) -> Self {
        Self {
            flags,
            node: Node::new(symbol),
            error: None,
        }
    }

    fn flag(&mut self, name: &str) -> u32 {
        match self.flags.get(name) {
            Ok(bit) => bit,
            Err(e) => {
                self.error.get_or_insert(e);
                0
            }
        }
    }

    pub fn load(mut self, handler: &str) -> Self {
        self.node.loads.push(handler.to_string());
        self
    }

    pub fn text(mut self, eng: &str, swa: &str) -> Self {
        self.node.template = Localized::new(eng, swa);
        self
    }

    /// A menu line. Also routes the selector to `to`.
    pub fn item(mut self, selector: &str, eng: &str, swa: &str, to: Target) -> Self {
        self.node.items.push(MenuItem {
            selector: selector.to_string(),
            label: Localized::new(eng, swa),
        });
        self.node.input.push(Edge {
            when: Condition::Input(selector.to_string()),
            to,
        });
        self
    }

    /// Leave on entry when the flag is set.
    pub fn on_flag(mut self, flag: &str, to: Target) -> Self {
        let bit = self.flag(flag);
        self.node.entry.push(Edge {
            when: Condition::FlagSet(bit),
            to,
        });
        self
    }

    /// Leave on entry when the flag is clear.
    pub fn on_flag_reset(mut self, flag: &str, to: Target) -> Self {
        let bit = self.flag(flag);
        self.node.entry.push(Edge {
            when: Condition::FlagReset(bit),
            to,
        });
        self
    }

    /// Leave on entry unconditionally (after any earlier entry edge).
    pub fn then(mut self, to: Target) -> Self {
        self.node.entry.push(Edge {
            when: Condition::Always,
            to,
        });
        self
    }

    /// Route an exact input.
    pub fn on_input(mut self, input: &str, to: Target) -> Self {
        self.node.input.push(Edge {
            when: Condition::Input(input.to_string()),
            to,
        });
        self
    }

    /// Route an exact input only while the flag is set.
    pub fn on_input_if(mut self, input: &str, flag: &str, to: Target) -> Self {
        let bit = self.flag(flag);
        self.node.input.push(Edge {
            when: Condition::All(vec![
                Condition::FlagSet(bit),
                Condition::Input(input.to_string()),
            ]),
            to,
        });
        self
    }

    /// Route any non-empty input.
    pub fn on_any_input(mut self, to: Target) -> Self {
        self.node.input.push(Edge {
            when: Condition::AnyInput,
            to,
        });
        self
    }

    /// Entering this node ends the session.
    pub fn terminal(mut self) -> Self {
        self.node.terminal = true;
        self
    }

    pub fn build(self) -> Result<Node> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.node),
        }
    }
}

/// Every node of a menu, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    root: String,
    nodes: HashMap<String, Node>,
}

impl MenuTree {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            nodes: HashMap::new(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn insert(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.symbol) {
            return Err(EngineError::Menu(format!("duplicate node {}", node.symbol)));
        }
        self.nodes.insert(node.symbol.clone(), node);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Result<&Node> {
        self.nodes
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownNode(symbol.to_string()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that the root exists, every edge leads to a known node and
    /// every load names a registered handler.
    pub fn validate(&self, registry: &HandlerRegistry) -> Result<()> {
        self.get(&self.root)?;
        for node in self.nodes.values() {
            for load in &node.loads {
                if !registry.contains(load) {
                    return Err(EngineError::UnknownHandler(format!(
                        "{load} (node {})",
                        node.symbol
                    )));
                }
            }
            for edge in node.entry.iter().chain(node.input.iter()) {
                if let Target::Node(to) = &edge.to {
                    if !self.nodes.contains_key(to) {
                        return Err(EngineError::UnknownNode(format!(
                            "{to} (edge from {})",
                            node.symbol
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;

    fn flags() -> FlagManager {
        FlagManager::from_csv("flag,flag_x,20\nflag,flag_y,21").unwrap()
    }

    #[test]
    fn test_fill_template() {
        let out = fill_template("Hi {name}, {missing}!{ {not a placeholder}", |n| {
            (n == "name").then_some("Amina")
        });
        assert_eq!(out, "Hi Amina, !{ {not a placeholder}");
        assert_eq!(fill_template("{unterminated", |_| None), "{unterminated");
    }

    #[test]
    fn test_builder_resolves_flags() {
        let f = flags();
        let node = NodeBuilder::new(&f, "main")
            .on_flag("flag_x", go("other"))
            .then(Target::Halt)
            .build()
            .unwrap();
        assert_eq!(node.entry[0].when, Condition::FlagSet(20));

        let err = NodeBuilder::new(&f, "main")
            .on_flag("flag_nope", Target::Back)
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownFlag(_)));
    }

    #[test]
    fn test_edge_selection_in_order() {
        let f = flags();
        let node = NodeBuilder::new(&f, "main")
            .on_input_if("1", "flag_y", go("special"))
            .item("1", "Send", "Tuma", go("send"))
            .on_any_input(Target::Repeat)
            .build()
            .unwrap();
        let mut set = FlagSet::new(128);
        assert_eq!(node.input_edge(&set, "1").unwrap().to, go("send"));
        set.set(21).unwrap();
        assert_eq!(node.input_edge(&set, "1").unwrap().to, go("special"));
        assert_eq!(node.input_edge(&set, "7").unwrap().to, Target::Repeat);
        assert!(node.input_edge(&set, "").is_none());
    }

    #[test]
    fn test_render_localized_with_items() {
        let f = flags();
        let node = NodeBuilder::new(&f, "main")
            .load("check_balance")
            .text("{check_balance}\n", "{check_balance}\n")
            .item("1", "Send", "Tuma", go("send"))
            .item("9", "Quit", "Ondoka", go("quit"))
            .build()
            .unwrap();
        let mut cache = Cache::new("main", 160);
        cache.append("check_balance", "Balance: 1.00 SRF\n");
        assert_eq!(
            node.render("eng", cache.top(), ":"),
            "Balance: 1.00 SRF\n1:Send\n9:Quit"
        );
        assert_eq!(
            node.render("swa", cache.top(), ". "),
            "Balance: 1.00 SRF\n1. Tuma\n9. Ondoka"
        );
    }

    #[test]
    fn test_validate_catches_dangling_edges() {
        let f = flags();
        let mut tree = MenuTree::new("root");
        tree.insert(NodeBuilder::new(&f, "root").then(go("gone")).build().unwrap())
            .unwrap();
        let registry = HandlerRegistry::new();
        assert!(matches!(
            tree.validate(&registry),
            Err(EngineError::UnknownNode(_))
        ));
        assert!(tree
            .insert(NodeBuilder::new(&f, "root").build().unwrap())
            .is_err());
    }
}
