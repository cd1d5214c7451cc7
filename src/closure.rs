/*!
For an NFA state, computes the set of "possible futures" reachable by
following epsilon/side edges until a hard (character-consuming) or final
state is hit, via a DFS with visited-marks to break epsilon cycles, threading
a side-effect prefix along each path.

Side-effect lists are represented as a plain `Vec<ContextKind>` rather than a
hash-consed linked list: structural/lexicographic comparison gives the same
deterministic ordering at the cost of the sharing a true hash-cons would buy
(recorded in DESIGN.md).
*/

use std::collections::HashSet;

use crate::nfa::{EdgeKind, Nfa, StateId};
use crate::tree::{context_tag, ContextKind};

/// One path out of a state's closure: the side effects encountered along the
/// way (in traversal order) and the hard/final state the path terminates at.
#[derive(Clone, Debug)]
pub struct PossibleFuture {
    pub side_effects: Vec<ContextKind>,
    pub dest: StateId,
}

/// Total order used to sort possible-future lists deterministically: a
/// tag-based lexicographic comparison, standing in for pointer-identity
/// comparison on hash-consed nodes since these lists aren't hash-consed here.
fn side_effects_key(effects: &[ContextKind]) -> Vec<u64> {
    effects.iter().map(context_tag).collect()
}

/// Computes the possible futures of `state`. The DFS carries a `visited`
/// set to break epsilon cycles (e.g. `(a*)*`'s inner `Star` loop) and
/// accumulates side effects in the order encountered.
pub fn possible_futures(nfa: &Nfa, state: StateId) -> Vec<PossibleFuture> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    walk(nfa, state, &mut Vec::new(), &mut visited, &mut out);
    out.sort_by(|a, b| side_effects_key(&a.side_effects).cmp(&side_effects_key(&b.side_effects)));
    out
}

fn walk(
    nfa: &Nfa,
    state: StateId,
    prefix: &mut Vec<ContextKind>,
    visited: &mut HashSet<StateId>,
    out: &mut Vec<PossibleFuture>,
) {
    if !visited.insert(state) {
        return;
    }
    let s = nfa.state(state);
    if s.is_hard() || s.is_final {
        out.push(PossibleFuture { side_effects: prefix.clone(), dest: state });
    }
    for edge in &s.edges {
        match &edge.kind {
            EdgeKind::Epsilon => walk(nfa, edge.target, prefix, visited, out),
            EdgeKind::Side(kind) => {
                prefix.push(*kind);
                walk(nfa, edge.target, prefix, visited, out);
                prefix.pop();
            }
            EdgeKind::CharSet(_) => {}
        }
    }
    visited.remove(&state);
}

/// Merges possible-futures from multiple source states (as `handle_cache_miss`
/// does when several NFA states in a superstate consume the same byte) into
/// groups that share an identical side-effect list. Each group's
/// destination set is deduplicated and sorted for determinism.
pub fn merge_by_side_effects(
    futures: impl IntoIterator<Item = PossibleFuture>,
) -> Vec<(Vec<ContextKind>, Vec<StateId>)> {
    let mut groups: Vec<(Vec<ContextKind>, Vec<StateId>)> = Vec::new();
    for f in futures {
        match groups.iter_mut().find(|(effects, _)| *effects == f.side_effects) {
            Some((_, dests)) => {
                if !dests.contains(&f.dest) {
                    dests.push(f.dest);
                }
            }
            None => groups.push((f.side_effects, vec![f.dest])),
        }
    }
    for (_, dests) in groups.iter_mut() {
        dests.sort();
    }
    groups.sort_by(|a, b| side_effects_key(&a.0).cmp(&side_effects_key(&b.0)));
    groups
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
    fn hard_state_is_its_own_future() {
        let nfa = Nfa::build(&singleton(b'a'));
        let futures = possible_futures(&nfa, nfa.start);
        assert_eq!(futures.len(), 1);
        assert!(futures[0].side_effects.is_empty());
        assert_eq!(futures[0].dest, nfa.start);
    }

    #[test]
    fn side_edge_is_recorded_in_prefix() {
        let tree = Tree::concat(
            Tree::context(ContextKind::BeginLine),
            singleton(b'a'),
        );
        let nfa = Nfa::build(&tree);
        let futures = possible_futures(&nfa, nfa.start);
        assert_eq!(futures.len(), 1);
        assert_eq!(futures[0].side_effects, vec![ContextKind::BeginLine]);
    }

    #[test]
    fn star_of_star_does_not_infinite_loop() {
        let tree = Tree::star(Tree::star(singleton(b'a')));
        let nfa = Nfa::build(&tree);
        // Must terminate; exact count isn't load-bearing here.
        let _ = possible_futures(&nfa, nfa.start);
    }

    #[test]
    fn merge_groups_by_identical_side_effects() {
        let a = PossibleFuture { side_effects: vec![], dest: StateId(0) };
        let b = PossibleFuture { side_effects: vec![], dest: StateId(1) };
        let c = PossibleFuture {
            side_effects: vec![ContextKind::BeginLine],
            dest: StateId(2),
        };
        let groups = merge_by_side_effects(vec![a, b, c]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 2);
    }
}
