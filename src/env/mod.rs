use std::hash::Hash;

// Result of taking one action in the environment.
#[derive(Clone, Debug)]
pub struct Step<S> {
    pub state: S,
    pub reward: f64,
    pub done: bool,
}

// An episodic environment with a finite, index-addressed action set.
// Actions are plain indices in 0..action_count(); states only need to be
// usable as hash map keys. Environments own their randomness, so two
// instances seeded identically replay the same card sequence / transitions.
//
// `step` may be called only after `reset` and before a step that returned
// `done`; the state carried by a `done` step is terminal and is never
// recorded into an episode.
pub trait Environment {
    type State: Clone + Eq + Hash;

    fn action_count(&self) -> usize;

    fn reset(&mut self) -> Self::State;

    fn step(&mut self, action: usize) -> Step<Self::State>;
}
