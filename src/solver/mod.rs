pub mod monte_carlo;

use crate::env::Environment;

// One step of an episode: the reward is the one received after taking
// `action` in `state`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<S> {
    pub state: S,
    pub action: usize,
    pub reward: f64,
}

pub type Episode<S> = Vec<Transition<S>>;

// Running sum and visit count of sampled returns for one table key.
// Keeping both in one entry guarantees sums and counts always cover the
// same key set.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReturnAcc {
    pub sum: f64,
    pub count: u64,
}

impl ReturnAcc {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

// Drives the environment from reset to termination, selecting actions with
// `select`, and records the visited transitions in order.
pub fn generate_episode<E, F>(env: &mut E, mut select: F) -> Episode<E::State>
where
    E: Environment,
    F: FnMut(&E::State) -> usize,
{
    let mut episode = Vec::new();
    let mut state = env.reset();
    loop {
        let action = select(&state);
        let step = env.step(action);
        episode.push(Transition {
            state,
            action,
            reward: step.reward,
        });
        if step.done {
            break;
        }
        state = step.state;
    }
    episode
}

// Cumulative discounted return G from index `from` to the end of the episode.
pub fn discounted_return<S>(episode: &[Transition<S>], from: usize, discount: f64) -> f64 {
    episode[from..]
        .iter()
        .rev()
        .fold(0.0, |g, t| discount * g + t.reward)
}

// Mean undiscounted episode return of `policy` over the given number of
// simulated episodes.
pub fn average_return<E, F>(env: &mut E, mut policy: F, episodes: u64) -> f64
where
    E: Environment,
    F: FnMut(&E::State) -> usize,
{
    if episodes == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for _ in 0..episodes {
        let episode = generate_episode(env, &mut policy);
        total += episode.iter().map(|t| t.reward).sum::<f64>();
    }
    total / episodes as f64
}

#[cfg(test)]
pub mod fixtures {
    use crate::env::{Environment, Step};

    // Replays pre-recorded episodes, ignoring the chosen actions. Episodes
    // are served round-robin from `reset`.
    pub struct ScriptedEnv {
        pub episodes: Vec<(u32, Vec<Step<u32>>)>,
        next_episode: usize,
        cursor: usize,
    }

    impl ScriptedEnv {
        pub fn new(episodes: Vec<(u32, Vec<Step<u32>>)>) -> ScriptedEnv {
            ScriptedEnv {
                episodes,
                next_episode: 0,
                cursor: 0,
            }
        }
    }

    impl Environment for ScriptedEnv {
        type State = u32;

        fn action_count(&self) -> usize {
            2
        }

        fn reset(&mut self) -> u32 {
            let episode = self.next_episode % self.episodes.len();
            self.next_episode += 1;
            self.cursor = 0;
            self.episodes[episode].0
        }

        fn step(&mut self, _action: usize) -> Step<u32> {
            let episode = (self.next_episode - 1) % self.episodes.len();
            let step = self.episodes[episode].1[self.cursor].clone();
            self.cursor += 1;
            step
        }
    }
}
