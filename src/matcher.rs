/*!
The match engine: `fit_p`, `advance`, `advance_to_final`.

A pure-regular byte loop over one locked superstate. Search loops of this
shape elsewhere are often written against an `Input` abstraction that can
represent a sub-slice of a larger haystack; here the source is narrowed to
the common case this engine actually needs (a byte slice with a start
offset), since broader rope/stream generality has no caller in this crate.
*/

use crate::cache::{Cache, SuperstateId, Transition};

/// The outcome of walking one locked superstate across as much of the input
/// as it can consume before needing the solver's help or hitting the end.
pub enum Advance {
    /// Consumed through `pos`; no further fast-path progress is possible
    /// (either end of input, or the next byte has no transition at all).
    Stuck { pos: usize, at_final: bool },
    /// The matcher hit a side-effecting transition; the caller (the solver)
    /// must check the effects, then resume from `target` at `pos`.
    SideEffect { pos: usize, effects: Vec<crate::tree::ContextKind>, target: SuperstateId },
    /// Ambiguous: more than one option, the solver must choose among them.
    BacktrackPoint {
        pos: usize,
        options: Vec<(Vec<crate::tree::ContextKind>, SuperstateId)>,
    },
}

/// Does the pure-regular DFA starting at `start_state` accept exactly
/// `input[start..end)`? Used by the solver's fast path for non-observable
/// sub-trees.
pub fn fit_p(cache: &mut Cache, start_state: SuperstateId, input: &[u8], start: usize, end: usize) -> bool {
    fit_p_tagged(cache, start_state, input, start, end).is_some()
}

/// Like [`fit_p`], but on acceptance also returns the `final_tag` of the
/// most recent `Cut` reached along the matched path; `0` if none was.
///
/// A `Cut` compiles to a zero-width NFA state that is itself `is_final`
/// (so the superstate it's a member of reports a nonzero `final_tag`) even
/// when more of the pattern follows it, since the rest of the match is
/// just further epsilon/byte transitions out of that same state. Only
/// checking the *last* superstate's tag would lose a `Cut` that isn't at
/// the very end of the pattern (e.g. `Concat(Cut(7), "foo")`, whose
/// accepting state after consuming `"foo"` is the literal run's own
/// untagged terminal) — so every superstate visited along the walk is
/// checked, and the most recently seen nonzero tag wins.
pub fn fit_p_tagged(
    cache: &mut Cache,
    start_state: SuperstateId,
    input: &[u8],
    start: usize,
    end: usize,
) -> Option<i32> {
    let mut state = start_state;
    let mut tag = cache.superstate(state).final_tag;
    for &b in &input[start..end] {
        match transition_for(cache, state, b) {
            Transition::Direct(next) => state = next,
            Transition::SideEffect { target, .. } => state = target,
            _ => return None,
        }
        let t = cache.superstate(state).final_tag;
        if t != 0 {
            tag = t;
        }
    }
    if cache.superstate(state).is_final {
        Some(tag)
    } else {
        None
    }
}

/// Walks one byte, resolving `Unbuilt` cells via `handle_cache_miss` and
/// promoting semifree destinations back to live.
fn transition_for(cache: &mut Cache, state: SuperstateId, byte: u8) -> Transition {
    let cell = cache.superstate(state).transitions[byte as usize].clone();
    let resolved = match cell {
        Transition::Unbuilt => cache.handle_cache_miss(state, byte),
        other => other,
    };
    if let Transition::Direct(target) | Transition::SideEffect { target, .. } = &resolved {
        if !cache.exists(*target) {
            return cache.handle_cache_miss(state, byte);
        }
    }
    resolved
}

/// Walks as far as the fast path allows from `start`, stopping at the first
/// `SideEffect`/`BacktrackPoint`/dead-end/end-of-input. This is the engine's
/// `advance` loop generalized to report *why* it stopped, so the solver can
/// resume the tree walk exactly where the DFA gave up.
pub fn advance(cache: &mut Cache, start_state: SuperstateId, input: &[u8], start: usize) -> Advance {
    let mut state = start_state;
    let mut pos = start;
    while pos < input.len() {
        match transition_for(cache, state, input[pos]) {
            Transition::Direct(next) => {
                state = next;
                pos += 1;
            }
            Transition::Backtrack => {
                return Advance::Stuck { pos, at_final: cache.superstate(state).is_final };
            }
            Transition::SideEffect { effects, target } => {
                return Advance::SideEffect { pos, effects, target };
            }
            Transition::BacktrackPoint(options) => {
                return Advance::BacktrackPoint { pos, options };
            }
            Transition::Unbuilt => unreachable!("transition_for always resolves"),
        }
    }
    Advance::Stuck { pos, at_final: cache.superstate(state).is_final }
}

/// `advance_to_final`: like [`advance`], but additionally tracks the
/// greatest position at which a final superstate was visited, for the
/// solver's length-guessing heuristic when refining `Concat`'s split upper
/// bound.
pub fn advance_to_final(
    cache: &mut Cache,
    start_state: SuperstateId,
    input: &[u8],
    start: usize,
) -> (Advance, Option<usize>) {
    let mut state = start_state;
    let mut pos = start;
    let mut last_final = if cache.superstate(state).is_final { Some(pos) } else { None };
    while pos < input.len() {
        match transition_for(cache, state, input[pos]) {
            Transition::Direct(next) => {
                state = next;
                pos += 1;
                if cache.superstate(state).is_final {
                    last_final = Some(pos);
                }
            }
            Transition::Backtrack => {
                return (
                    Advance::Stuck { pos, at_final: cache.superstate(state).is_final },
                    last_final,
                );
            }
            Transition::SideEffect { effects, target } => {
                return (Advance::SideEffect { pos, effects, target }, last_final);
            }
            Transition::BacktrackPoint(options) => {
                return (Advance::BacktrackPoint { pos, options }, last_final);
            }
            Transition::Unbuilt => unreachable!("transition_for always resolves"),
        }
    }
    (Advance::Stuck { pos, at_final: cache.superstate(state).is_final }, last_final)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::Bitset;
    use crate::nfa::Nfa;
    use crate::tree::Tree;
    use std::rc::Rc;

    fn singleton(b: u8) -> Tree {
        let mut s = Bitset::new(256);
        s.insert(b as usize);
        Tree::char_set(s)
    }

    #[test]
    fn fit_p_accepts_exact_literal() {
        let nfa = Rc::new(Nfa::build(&Tree::literal_run(b"ab".to_vec())));
        let mut cache = Cache::new(nfa, 256, 1 << 20);
        let start = cache.start_superstate();
        assert!(fit_p(&mut cache, start, b"ab", 0, 2));
        assert!(!fit_p(&mut cache, start, b"ac", 0, 2));
    }

    #[test]
    fn advance_reports_greatest_final_position() {
        let nfa = Rc::new(Nfa::build(&Tree::plus(singleton(b'a'))));
        let mut cache = Cache::new(nfa, 256, 1 << 20);
        let start = cache.start_superstate();
        let (_, last_final) = advance_to_final(&mut cache, start, b"aaab", 0);
        assert_eq!(last_final, Some(3));
    }
}
