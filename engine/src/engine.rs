//! The menu engine: advances one session by one input.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{truncate_str, Cache};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::flags::{FlagManager, FLAG_INMATCH, FLAG_LANG, FLAG_TERMINATE, FLAG_WAIT};
use crate::menu::{MenuTree, Node, Target};
use crate::persist::Snapshot;
use crate::registry::HandlerRegistry;
use crate::request::Request;
use crate::state::State;

/// Transitions allowed in one turn before the menu is considered cyclic.
const MAX_STEPS: usize = 64;

/// Everything the engine shares across sessions. Read-only once built.
pub struct MenuSystem {
    config: EngineConfig,
    tree: MenuTree,
    registry: HandlerRegistry,
    default_language: String,
    back_flag: Option<u32>,
}

impl MenuSystem {
    /// Assemble and validate a menu system.
    ///
    /// # Errors
    ///
    /// Fails if the tree references unknown nodes or handlers, if its root
    /// differs from the configured root, or if the flag table does not fit
    /// the configured bitset.
    pub fn new(
        config: EngineConfig,
        tree: MenuTree,
        registry: HandlerRegistry,
        flags: &FlagManager,
        default_language: &str,
    ) -> Result<Self> {
        if tree.root() != config.root {
            return Err(EngineError::Menu(format!(
                "menu root {} does not match configured root {}",
                tree.root(),
                config.root
            )));
        }
        tree.validate(&registry)?;
        flags.validate(config.flag_count)?;
        Ok(Self {
            config,
            tree,
            registry,
            default_language: default_language.to_string(),
            back_flag: flags.get("flag_back_set").ok(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// A fresh snapshot positioned at the root.
    pub fn initial_snapshot(&self) -> Snapshot {
        let mut state = State::new(&self.config.root, self.config.flag_count);
        state.set_debug(self.config.debug);
        Snapshot {
            state,
            cache: Cache::new(&self.config.root, self.config.cache_capacity()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Wait,
    Terminal,
}

/// One session's engine for the duration of one turn.
pub struct Engine {
    system: Arc<MenuSystem>,
    session_id: String,
    state: State,
    cache: Cache,
    terminal: bool,
}

impl Engine {
    pub fn new(system: Arc<MenuSystem>, session_id: &str, snapshot: Option<Snapshot>) -> Self {
        let Snapshot { state, cache } = snapshot.unwrap_or_else(|| system.initial_snapshot());
        Self {
            system,
            session_id: session_id.to_string(),
            state,
            cache,
            terminal: false,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            cache: self.cache.clone(),
        }
    }

    fn language(&self) -> String {
        self.state
            .language()
            .unwrap_or(&self.system.default_language)
            .to_string()
    }

    /// Advance the session with one input.
    ///
    /// Returns `false` once the session reached a terminal node.
    pub async fn exec(&mut self, input: &str) -> Result<bool> {
        let input = input.trim();
        let root = self.system.config.root.clone();
        self.terminal = false;
        self.state.reset_flag(FLAG_INMATCH)?;

        let fresh = !self.state.is_set(FLAG_WAIT);
        let outcome = if fresh || (input.is_empty() && self.system.config.reset_on_empty_input) {
            debug!(session_id = %self.session_id, fresh, "starting at root");
            self.state.reset_to(&root);
            self.cache.reset(&root);
            self.run("").await?
        } else {
            self.state.append_input(input);
            let system = Arc::clone(&self.system);
            let node = system.tree.get(self.state.current())?;
            match node.input_edge(self.state.flags(), input) {
                Some(edge) => {
                    self.state.set_flag(FLAG_INMATCH)?;
                    self.follow(edge.to.clone(), input).await?
                }
                None => {
                    debug!(session_id = %self.session_id, symbol = %node.symbol, input, "no match, repeating");
                    Outcome::Wait
                }
            }
        };

        match outcome {
            Outcome::Wait => {
                self.state.set_flag(FLAG_WAIT)?;
            }
            Outcome::Terminal => {
                self.state.reset_flag(FLAG_WAIT)?;
                self.state.set_flag(FLAG_TERMINATE)?;
                self.terminal = true;
            }
        }

        if self.state.debug() {
            debug!(
                session_id = %self.session_id,
                path = ?self.state.path(),
                flags = ?self.state.flags().iter_set().collect::<Vec<_>>(),
                cache_bytes = self.cache.total(),
                "turn done"
            );
        }
        Ok(!self.terminal)
    }

    async fn follow(&mut self, to: Target, input: &str) -> Result<Outcome> {
        match to {
            Target::Node(symbol) => {
                self.state.push(&symbol);
                self.cache.push(&symbol);
                self.run(input).await
            }
            Target::Back => self.back().await,
            Target::Root => {
                let root = self.system.config.root.clone();
                self.state.reset_to(&root);
                self.cache.reset(&root);
                self.run("").await
            }
            Target::Repeat | Target::Halt => Ok(Outcome::Wait),
            Target::Quit => Ok(Outcome::Terminal),
        }
    }

    /// Enter the node on top of the path and follow entry edges until a node
    /// waits for input or ends the session. Nodes left by an entry edge are
    /// replaced rather than stacked.
    async fn run(&mut self, input: &str) -> Result<Outcome> {
        let system = Arc::clone(&self.system);
        let mut input = input.to_string();
        if let Some(bit) = system.back_flag {
            self.state.reset_flag(bit)?;
        }
        for _ in 0..MAX_STEPS {
            let node = system.tree.get(self.state.current())?;
            self.load(node, &input).await?;
            if node.terminal {
                return Ok(Outcome::Terminal);
            }
            let next = node
                .entry_edge(self.state.flags(), &input)
                .map(|e| e.to.clone());
            match next {
                None | Some(Target::Halt) | Some(Target::Repeat) => return Ok(Outcome::Wait),
                Some(Target::Quit) => return Ok(Outcome::Terminal),
                Some(Target::Back) => return self.back().await,
                Some(Target::Node(symbol)) => {
                    debug!(session_id = %self.session_id, from = %node.symbol, to = %symbol, "pass through");
                    self.state.replace_top(&symbol);
                    self.cache.replace_top(&symbol);
                }
                Some(Target::Root) => {
                    self.state.reset_to(&system.config.root);
                    self.cache.reset(&system.config.root);
                    input.clear();
                }
            }
        }
        Err(EngineError::Menu(format!(
            "more than {MAX_STEPS} transitions from {}",
            self.state.current()
        )))
    }

    async fn back(&mut self) -> Result<Outcome> {
        let system = Arc::clone(&self.system);
        self.state.pop();
        self.cache.pop();
        if let Some(bit) = system.back_flag {
            self.state.set_flag(bit)?;
        }
        let stale = self.cache.top().is_some_and(|f| f.is_stale());
        if stale {
            let node = system.tree.get(self.state.current())?;
            debug!(session_id = %self.session_id, symbol = %node.symbol, "reloading evicted frame");
            self.cache.clear_top();
            self.load(node, "").await?;
        }
        Ok(Outcome::Wait)
    }

    /// Run a node's handlers in order, merging each result before the next
    /// handler sees the flags.
    async fn load(&mut self, node: &Node, input: &str) -> Result<()> {
        for handler in &node.loads {
            let req = Request::new(
                self.session_id.clone(),
                self.language(),
                self.state.flags().clone(),
            );
            let res = self
                .system
                .registry
                .call(handler, req, &node.symbol, input)
                .await?;
            self.state.apply(&res)?;
            if self.state.is_set(FLAG_LANG) {
                let code = res.content.trim();
                if !code.is_empty() {
                    debug!(session_id = %self.session_id, language = code, "language changed");
                    self.state.set_language(code);
                }
                self.state.reset_flag(FLAG_LANG)?;
                continue;
            }
            self.cache.append(handler, &res.content);
        }
        Ok(())
    }

    /// The current screen, cut to the output budget.
    pub fn render(&self) -> Result<String> {
        let config = &self.system.config;
        let node = self.system.tree.get(self.state.current())?;
        let screen = node.render(&self.language(), self.cache.top(), &config.menu_separator);
        Ok(truncate_str(&screen, config.output_size).to_string())
    }

    /// Write the current screen to `w`, returning the bytes written.
    pub fn flush<W: Write>(&mut self, w: &mut W) -> Result<usize> {
        let screen = self.render()?;
        w.write_all(screen.as_bytes())?;
        Ok(screen.len())
    }

    /// Return to the root after a terminal turn.
    pub fn reset(&mut self) {
        let root = self.system.config.root.clone();
        self.state.reset_to(&root);
        self.cache.reset(&root);
        self.terminal = false;
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{go, NodeBuilder};
    use crate::result::HandlerResult;

    const FLAGS: &str = "flag,flag_ok,16\nflag,flag_back_set,17";

    fn system(config: EngineConfig) -> Arc<MenuSystem> {
        let flags = FlagManager::from_csv(FLAGS).unwrap();
        let mut registry = HandlerRegistry::new();
        registry.register("greet", |req, _sym, _input| async move {
            let greeting = if req.language() == "swa" { "Habari" } else { "Hello" };
            Ok(HandlerResult::with_content(greeting))
        });
        registry.register("check", |_req, _sym, input| async move {
            let res = HandlerResult::with_content(input.clone());
            Ok(if input == "42" { res.set(16) } else { res.reset(16) })
        });
        registry.register("lang", |_req, _sym, _input| async move {
            Ok(HandlerResult::with_content("swa").set(FLAG_LANG))
        });
        registry.register("bye", |_req, _sym, _input| async move {
            Ok(HandlerResult::with_content("Goodbye"))
        });

        let mut tree = MenuTree::new("root");
        let nodes = [
            NodeBuilder::new(&flags, "root")
                .load("greet")
                .text("{greet}", "{greet}")
                .item("1", "Guess", "Kisia", go("guess"))
                .item("2", "Swahili", "Kiswahili", go("language"))
                .item("9", "Quit", "Ondoka", go("quit")),
            NodeBuilder::new(&flags, "guess")
                .text("Enter number", "Weka nambari")
                .on_input("0", Target::Back)
                .on_any_input(go("check")),
            NodeBuilder::new(&flags, "check")
                .load("check")
                .on_flag("flag_ok", go("right"))
                .then(go("wrong")),
            NodeBuilder::new(&flags, "right").text("Right", "Sawa"),
            NodeBuilder::new(&flags, "wrong")
                .text("{check} is wrong", "{check} si sahihi")
                .item("0", "Back", "Rudi", Target::Back),
            NodeBuilder::new(&flags, "language").load("lang").then(Target::Root),
            NodeBuilder::new(&flags, "quit")
                .load("bye")
                .text("{bye}", "{bye}")
                .terminal(),
            NodeBuilder::new(&flags, "loop").then(go("loop")),
        ];
        for node in nodes {
            tree.insert(node.build().unwrap()).unwrap();
        }
        Arc::new(MenuSystem::new(config, tree, registry, &flags, "eng").unwrap())
    }

    fn flush(engine: &mut Engine) -> String {
        let mut out = Vec::new();
        engine.flush(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_first_turn_renders_root() {
        let sys = system(EngineConfig::default());
        let mut engine = Engine::new(sys, "254", None);
        assert!(engine.exec("").await.unwrap());
        assert_eq!(flush(&mut engine), "Hello\n1:Guess\n2:Swahili\n9:Quit");
        assert!(engine.state().is_set(FLAG_WAIT));
    }

    #[tokio::test]
    async fn test_pass_through_is_replaced_and_back_returns() {
        let sys = system(EngineConfig::default());
        let mut engine = Engine::new(sys, "254", None);
        engine.exec("").await.unwrap();
        engine.exec("1").await.unwrap();
        engine.exec("7").await.unwrap();
        assert_eq!(engine.state().current(), "wrong");
        assert_eq!(engine.state().depth(), 3);
        assert_eq!(flush(&mut engine), "7 is wrong\n0:Back");

        engine.exec("0").await.unwrap();
        assert_eq!(engine.state().current(), "guess");
        assert!(engine.state().is_set(17));

        engine.exec("42").await.unwrap();
        assert_eq!(engine.state().current(), "right");
        assert!(!engine.state().is_set(17));
    }

    #[tokio::test]
    async fn test_unmatched_input_repeats() {
        let sys = system(EngineConfig::default());
        let mut engine = Engine::new(sys, "254", None);
        engine.exec("").await.unwrap();
        engine.exec("5").await.unwrap();
        assert_eq!(engine.state().current(), "root");
        assert!(!engine.state().is_set(FLAG_INMATCH));
        assert_eq!(flush(&mut engine), "Hello\n1:Guess\n2:Swahili\n9:Quit");
    }

    #[tokio::test]
    async fn test_language_switch() {
        let sys = system(EngineConfig::default());
        let mut engine = Engine::new(sys, "254", None);
        engine.exec("").await.unwrap();
        engine.exec("2").await.unwrap();
        assert_eq!(engine.state().language(), Some("swa"));
        assert!(!engine.state().is_set(FLAG_LANG));
        assert_eq!(flush(&mut engine), "Habari\n1:Kisia\n2:Kiswahili\n9:Ondoka");
    }

    #[tokio::test]
    async fn test_terminal_and_reset() {
        let sys = system(EngineConfig::default());
        let mut engine = Engine::new(sys, "254", None);
        engine.exec("").await.unwrap();
        assert!(!engine.exec("9").await.unwrap());
        assert_eq!(flush(&mut engine), "Goodbye");
        engine.reset();
        assert_eq!(engine.state().current(), "root");
        assert!(!engine.state().is_set(FLAG_WAIT));
    }

    #[tokio::test]
    async fn test_output_budget_and_reset_on_empty() {
        let config = EngineConfig {
            output_size: 10,
            reset_on_empty_input: true,
            ..Default::default()
        };
        let sys = system(config);
        let mut engine = Engine::new(sys, "254", None);
        engine.exec("").await.unwrap();
        assert_eq!(flush(&mut engine), "Hello\n1:Gu");
        engine.exec("1").await.unwrap();
        engine.exec("").await.unwrap();
        assert_eq!(engine.state().current(), "root");
    }

    #[tokio::test]
    async fn test_cycle_is_an_error() {
        let sys = system(EngineConfig::default());
        let mut state = State::new("root", 128);
        state.set_flag(FLAG_WAIT).unwrap();
        state.push("guess");
        let mut cache = Cache::new("root", 160);
        cache.push("guess");
        let mut engine = Engine::new(Arc::clone(&sys), "254", Some(Snapshot { state, cache }));
        // Jump into the self-loop through a pass-through.
        let err = engine.follow(go("loop"), "").await.unwrap_err();
        assert!(matches!(err, EngineError::Menu(_)));
    }
}
