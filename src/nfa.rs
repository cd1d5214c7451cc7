/*!
Thompson NFA construction: small `Id`-newtype state handles, a flat
`Vec<State>` arena, and explicit edge lists rather than patch-lists of raw
pointers.

The third edge kind, `Side`, is this engine's departure from a textbook
Thompson NFA: a `Context` tree node (an anchor, a word-boundary predicate, a
back-reference) has no character to consume, but still needs to be visible
to the closure engine (§4.5) as something other than a bare epsilon, since
whether it is *allowed* depends on run-time state the NFA itself knows
nothing about.
*/

use crate::tree::{ContextKind, NodeKind, Tree};

/// An index into [`Nfa::states`]. `u32` is plenty: the largest patterns this
/// engine is built for have at most a few hundred tree nodes, each worth at
/// most two states.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

#[derive(Clone, Debug)]
pub enum EdgeKind {
    CharSet(crate::bitset::Bitset),
    Epsilon,
    /// A zero-width, side-effecting transition: the closure engine records
    /// `kind` in the path's side-effect prefix rather than treating the
    /// edge as free.
    Side(ContextKind),
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub target: StateId,
    pub kind: EdgeKind,
}

#[derive(Clone, Debug, Default)]
pub struct State {
    pub edges: Vec<Edge>,
    pub is_final: bool,
    /// Set by a `Cut(n)` node; `0` for the pattern's own terminal state and
    /// every other state.
    pub final_tag: i32,
}

impl State {
    /// True if this state has at least one character-consuming edge — a
    /// "hard" state in the closure engine's vocabulary.
    pub fn is_hard(&self) -> bool {
        self.edges.iter().any(|e| matches!(e.kind, EdgeKind::CharSet(_)))
    }
}

#[derive(Clone, Debug)]
pub struct Nfa {
    pub states: Vec<State>,
    pub start: StateId,
}

impl Nfa {
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.0 as usize]
    }

    /// Builds the NFA for `tree` over an alphabet of `alphabet_size` bytes
    /// `Parens` is transparent (the solver, not the NFA,
    /// tracks capture groups); `Interval` is translated identically to
    /// `Star` of its child, since the NFA has no notion of counted
    /// repetition — the solver enforces exact bounds (§4.8).
    pub fn build(tree: &Tree) -> Nfa {
        let mut builder = Builder { states: Vec::new() };
        let (start, end) = builder.build_node(tree);
        builder.states[end.0 as usize].is_final = true;
        Nfa { states: builder.states, start }
    }
}

struct Builder {
    states: Vec<State>,
}

impl Builder {
    fn new_state(&mut self) -> StateId {
        self.states.push(State::default());
        StateId((self.states.len() - 1) as u32)
    }

    fn edge(&mut self, from: StateId, to: StateId, kind: EdgeKind) {
        self.states[from.0 as usize].edges.push(Edge { target: to, kind });
    }

    /// Returns `(start, end)`: `end` is the single state with no outgoing
    /// edges yet, ready for the caller to wire onward (an epsilon edge for
    /// `Concat`, a join point for `Alt`/`Opt`/`Star`/`Plus`).
    fn build_node(&mut self, tree: &Tree) -> (StateId, StateId) {
        match tree.kind() {
            NodeKind::CharSet(set) => {
                let (s0, s1) = (self.new_state(), self.new_state());
                self.edge(s0, s1, EdgeKind::CharSet(set.clone()));
                (s0, s1)
            }
            NodeKind::LiteralRun(bytes) => self.build_literal_run(bytes),
            NodeKind::Concat(l, r) => {
                let (ls, le) = self.build_node(l);
                let (rs, re) = self.build_node(r);
                self.edge(le, rs, EdgeKind::Epsilon);
                (ls, re)
            }
            NodeKind::Alt(l, r) => {
                let s0 = self.new_state();
                let (ls, le) = self.build_node(l);
                let (rs, re) = self.build_node(r);
                let s1 = self.new_state();
                self.edge(s0, ls, EdgeKind::Epsilon);
                self.edge(s0, rs, EdgeKind::Epsilon);
                self.edge(le, s1, EdgeKind::Epsilon);
                self.edge(re, s1, EdgeKind::Epsilon);
                (s0, s1)
            }
            NodeKind::Opt(c) => {
                let s0 = self.new_state();
                let (cs, ce) = self.build_node(c);
                let s1 = self.new_state();
                self.edge(s0, cs, EdgeKind::Epsilon);
                self.edge(s0, s1, EdgeKind::Epsilon);
                self.edge(ce, s1, EdgeKind::Epsilon);
                (s0, s1)
            }
            NodeKind::Star(c) | NodeKind::Interval(c, _, _) => {
                let s0 = self.new_state();
                let (cs, ce) = self.build_node(c);
                let s1 = self.new_state();
                self.edge(s0, cs, EdgeKind::Epsilon);
                self.edge(s0, s1, EdgeKind::Epsilon);
                self.edge(ce, s0, EdgeKind::Epsilon);
                (s0, s1)
            }
            NodeKind::Plus(c) => {
                let (cs, ce) = self.build_node(c);
                let s1 = self.new_state();
                let loop_back = self.new_state();
                self.edge(ce, loop_back, EdgeKind::Epsilon);
                self.edge(loop_back, cs, EdgeKind::Epsilon);
                self.edge(loop_back, s1, EdgeKind::Epsilon);
                (cs, s1)
            }
            NodeKind::Parens(c, _) => self.build_node(c),
            NodeKind::Context(kind) => {
                let (s0, s1) = (self.new_state(), self.new_state());
                self.edge(s0, s1, EdgeKind::Side(*kind));
                (s0, s1)
            }
            NodeKind::Cut(tag) => {
                let (s0, s1) = (self.new_state(), self.new_state());
                self.edge(s0, s1, EdgeKind::Epsilon);
                self.states[s1.0 as usize].is_final = true;
                self.states[s1.0 as usize].final_tag = *tag;
                (s0, s1)
            }
        }
    }

    fn build_literal_run(&mut self, bytes: &[u8]) -> (StateId, StateId) {
        if bytes.is_empty() {
            let s = self.new_state();
            return (s, s);
        }
        let start = self.new_state();
        let mut prev = start;
        for &b in bytes {
            let next = self.new_state();
            let mut set = crate::bitset::Bitset::new(256);
            set.insert(b as usize);
            self.edge(prev, next, EdgeKind::CharSet(set));
            prev = next;
        }
        (start, prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::Bitset;

    fn singleton(b: u8) -> Tree {
        let mut s = Bitset::new(256);
        s.insert(b as usize);
        Tree::char_set(s)
    }

    #[test]
    fn literal_run_builds_a_chain_of_hard_states() {
        let nfa = Nfa::build(&Tree::literal_run(b"ab".to_vec()));
        assert!(nfa.state(nfa.start).is_hard());
        assert!(!nfa.states.last().unwrap().is_hard());
        assert!(nfa.states.last().unwrap().is_final);
    }

    #[test]
    fn star_loops_back_to_entry() {
        let nfa = Nfa::build(&Tree::star(singleton(b'a')));
        // The entry state has an epsilon both into the loop body and
        // straight to the final state (the empty-match branch).
        let entry = nfa.state(nfa.start);
        assert_eq!(entry.edges.len(), 2);
        assert!(entry.edges.iter().all(|e| matches!(e.kind, EdgeKind::Epsilon)));
    }

    #[test]
    fn context_node_yields_a_side_edge() {
        let nfa = Nfa::build(&Tree::context(ContextKind::BeginLine));
        let entry = nfa.state(nfa.start);
        assert_eq!(entry.edges.len(), 1);
        assert!(matches!(entry.edges[0].kind, EdgeKind::Side(ContextKind::BeginLine)));
    }

    #[test]
    fn cut_node_tags_its_final_state() {
        let nfa = Nfa::build(&Tree::cut(7));
        let tagged = nfa.states.iter().find(|s| s.is_final).unwrap();
        assert_eq!(tagged.final_tag, 7);
    }

    #[test]
    fn interval_is_built_like_star() {
        let star = Nfa::build(&Tree::star(singleton(b'a')));
        let interval = Nfa::build(&Tree::interval(singleton(b'a'), 0, 5));
        assert_eq!(star.states.len(), interval.states.len());
    }
}
