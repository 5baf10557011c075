use std::collections::HashMap;
use std::hash::Hash;

use rand::prelude::*;

use crate::env::Environment;
use crate::solver::{generate_episode, ReturnAcc};

// Index of the first maximal entry, so ties go to the lowest action.
pub fn greedy_action(row: &[f64]) -> usize {
    let mut best = 0;
    for (action, value) in row.iter().enumerate().skip(1) {
        if *value > row[best] {
            best = action;
        }
    }
    best
}

// Draws an index from a categorical distribution by inverting the cumulative
// distribution over a single uniform sample.
fn sample_categorical<R: Rng>(probabilities: &[f64], rng: &mut R) -> usize {
    let mut remaining = rng.gen::<f64>();
    for (index, probability) in probabilities.iter().enumerate() {
        if remaining < *probability {
            return index;
        }
        remaining -= probability;
    }

    // Rounding can leave the draw just past the last bucket.
    probabilities.len() - 1
}

// Selects an action for `state`: the greedy one with probability
// (1 - epsilon), any action uniformly with probability epsilon. Materializes
// a zero Q row for states not seen before.
pub fn epsilon_greedy<S, R>(
    q: &mut HashMap<S, Vec<f64>>,
    state: &S,
    n_actions: usize,
    epsilon: f64,
    rng: &mut R,
) -> usize
where
    S: Clone + Eq + Hash,
    R: Rng,
{
    debug_assert!(n_actions >= 1);
    debug_assert!((0.0..=1.0).contains(&epsilon));

    let row = q
        .entry(state.clone())
        .or_insert_with(|| vec![0.0; n_actions]);

    let mut probabilities = vec![epsilon / n_actions as f64; n_actions];
    probabilities[greedy_action(row)] += 1.0 - epsilon;
    sample_categorical(&probabilities, rng)
}

// Estimates the state-value function of a fixed policy by first-visit
// Monte Carlo: the return observed from a state's first occurrence in each
// episode is averaged over all sampled episodes.
pub fn predict_values<E, F>(
    env: &mut E,
    mut policy: F,
    n_episodes: u64,
    discount: f64,
) -> HashMap<E::State, f64>
where
    E: Environment,
    F: FnMut(&E::State) -> usize,
{
    let mut returns: HashMap<E::State, ReturnAcc> = HashMap::new();
    let mut values = HashMap::new();

    for _ in 0..n_episodes {
        let episode = generate_episode(env, &mut policy);

        // Sweep backwards with a running G. Inserting towards the front of
        // the episode overwrites later occurrences, so each state is left
        // with the return from its first visit.
        let mut first_visit_returns = HashMap::new();
        let mut g = 0.0;
        for t in episode.iter().rev() {
            g = discount * g + t.reward;
            first_visit_returns.insert(t.state.clone(), g);
        }

        for (state, g) in first_visit_returns {
            let acc = returns.entry(state.clone()).or_default();
            acc.add(g);
            values.insert(state, acc.mean());
        }
    }

    values
}

// Learns an action-value function on-policy: episodes are generated by the
// epsilon-greedy policy over the Q table being learned, and first-visit
// returns are averaged per (state, action) pair.
pub fn control_epsilon_greedy<E, R>(
    env: &mut E,
    n_episodes: u64,
    discount: f64,
    epsilon: f64,
    rng: &mut R,
) -> HashMap<E::State, Vec<f64>>
where
    E: Environment,
    R: Rng,
{
    let mut q: HashMap<E::State, Vec<f64>> = HashMap::new();
    if n_episodes == 0 {
        return q;
    }

    let n_actions = env.action_count();

    // A single exploration adjustment before the loop, not a per-episode
    // decay.
    let epsilon = (epsilon - 0.1 / n_episodes as f64).clamp(0.0, 1.0);

    let mut returns: HashMap<(E::State, usize), ReturnAcc> = HashMap::new();

    for _ in 0..n_episodes {
        let episode = generate_episode(env, |state| {
            epsilon_greedy(&mut q, state, n_actions, epsilon, rng)
        });

        let mut first_visit_returns = HashMap::new();
        let mut g = 0.0;
        for t in episode.iter().rev() {
            g = discount * g + t.reward;
            first_visit_returns.insert((t.state.clone(), t.action), g);
        }

        for ((state, action), g) in first_visit_returns {
            let acc = returns.entry((state.clone(), action)).or_default();
            acc.add(g);
            let mean = acc.mean();
            q.entry(state).or_insert_with(|| vec![0.0; n_actions])[action] = mean;
        }
    }

    q
}
