use std::collections::HashMap;

use prettytable::{Cell, Row, Table};
use rand::prelude::*;

use crate::env::{Environment, Step};
use crate::solver;
use crate::solver::monte_carlo;

pub const STICK: usize = 0;
pub const HIT: usize = 1;

// What the player can observe: their own sum, the dealer's showing card
// (ace counted as 1) and whether they hold an ace currently counted as 11.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Obs {
    pub player: u32,
    pub dealer: u32,
    pub usable_ace: bool,
}

// Value counts a usable ace as 11.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Hand {
    value: u32,
    usable_ace: bool,
}

impl Hand {
    // `card` is the card's point value: 1 for an ace, 10 for faces.
    fn add_card(&self, card: u32) -> Hand {
        let mut hand = *self;
        if card == 1 && !hand.usable_ace && hand.value <= 10 {
            hand.usable_ace = true;
            hand.value += 11;
        } else {
            hand.value += card;
        }

        if hand.value > 21 && hand.usable_ace {
            hand.value -= 10;
            hand.usable_ace = false;
        }
        hand
    }

    fn is_bust(&self) -> bool {
        self.value > 21
    }
}

// Blackjack against an infinite deck, with the rules of the classic gym
// environment: no doubling, no splitting, no naturals.
pub struct Blackjack {
    rng: StdRng,
    player: Hand,
    dealer_card: u32,
}

impl Blackjack {
    pub fn new() -> Blackjack {
        Blackjack::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Blackjack {
        Blackjack::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Blackjack {
        Blackjack {
            rng,
            player: Hand::default(),
            dealer_card: 1,
        }
    }

    fn draw_card(&mut self) -> u32 {
        // Ranks above 10 are face cards worth 10.
        self.rng.gen_range(1..=13).min(10)
    }

    fn obs(&self) -> Obs {
        Obs {
            player: self.player.value,
            dealer: self.dealer_card,
            usable_ace: self.player.usable_ace,
        }
    }

    // Dealer reveals the hidden card (dealt only now, which is equivalent)
    // and hits until reaching 17, then the hands are compared.
    fn resolve_stick(&mut self) -> f64 {
        let mut dealer = Hand::default().add_card(self.dealer_card);
        while dealer.value < 17 {
            let card = self.draw_card();
            dealer = dealer.add_card(card);
        }

        if dealer.is_bust() || self.player.value > dealer.value {
            1.0
        } else if self.player.value < dealer.value {
            -1.0
        } else {
            0.0
        }
    }
}

impl Environment for Blackjack {
    type State = Obs;

    fn action_count(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Obs {
        let first = self.draw_card();
        let second = self.draw_card();
        self.player = Hand::default().add_card(first).add_card(second);
        self.dealer_card = self.draw_card();
        self.obs()
    }

    fn step(&mut self, action: usize) -> Step<Obs> {
        debug_assert!(action < self.action_count());

        if action == STICK {
            let reward = self.resolve_stick();
            return Step {
                state: self.obs(),
                reward,
                done: true,
            };
        }

        let card = self.draw_card();
        self.player = self.player.add_card(card);
        if self.player.is_bust() {
            return Step {
                state: self.obs(),
                reward: -1.0,
                done: true,
            };
        }

        Step {
            state: self.obs(),
            reward: 0.0,
            done: false,
        }
    }
}

// The reference policy of the exercise: stick once the player reaches 20.
pub fn stick_at_20(obs: &Obs) -> usize {
    if obs.player >= 20 {
        STICK
    } else {
        HIT
    }
}

fn dealer_header() -> Row {
    let mut header = vec![Cell::new(""), Cell::new("Ace?")];
    for dealer in 1..=10 {
        header.push(match dealer {
            1 => Cell::new("A"),
            _ => Cell::new(&format!("{}", dealer)),
        });
    }
    Row::new(header)
}

// Renders one table cell per observation, one row per (player sum, ace) pair.
fn print_obs_table<F>(mut cell_for: F)
where
    F: FnMut(&Obs) -> Cell,
{
    let mut table = Table::new();
    table.add_row(dealer_header());

    for &usable_ace in &[false, true] {
        for player in 11..=21 {
            let mut cells = vec![
                Cell::new(&format!("{}", player)),
                Cell::new(if usable_ace { "Y" } else { "N" }),
            ];
            for dealer in 1..=10 {
                cells.push(cell_for(&Obs {
                    player,
                    dealer,
                    usable_ace,
                }));
            }
            table.add_row(Row::new(cells));
        }
    }
    table.printstd();
}

pub fn print_values(values: &HashMap<Obs, f64>) {
    print_obs_table(|obs| match values.get(obs) {
        Some(value) => Cell::new(&format!("{:+.2}", value)),
        None => Cell::new(""),
    });
}

pub fn print_policy(q: &HashMap<Obs, Vec<f64>>) {
    print_obs_table(|obs| match q.get(obs) {
        Some(row) => match monte_carlo::greedy_action(row) {
            STICK => Cell::new("S"),
            _ => Cell::new("H"),
        },
        None => Cell::new(""),
    });
}

pub fn run() {
    let mut env = Blackjack::new();

    let values = monte_carlo::predict_values(&mut env, stick_at_20, 500_000, 1.0);
    println!("State values under the stick-at-20 policy:");
    print_values(&values);

    let mut rng = StdRng::from_entropy();
    let q = monte_carlo::control_epsilon_greedy(&mut env, 1_000_000, 1.0, 0.1, &mut rng);
    println!("Learned policy (H = hit, S = stick):");
    print_policy(&q);

    // Compare the learned greedy policy against the reference policy.
    let learned = |obs: &Obs| match q.get(obs) {
        Some(row) => monte_carlo::greedy_action(row),
        None => HIT,
    };
    let runs = 100_000;
    println!(
        "Average stick-at-20 returns: {}",
        solver::average_return(&mut env, stick_at_20, runs)
    );
    println!(
        "Average learned-policy returns: {}",
        solver::average_return(&mut env, learned, runs)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_of(cards: &[u32]) -> Hand {
        cards.iter().fold(Hand::default(), |h, c| h.add_card(*c))
    }

    #[test]
    fn hand_counts_aces_high_while_possible() {
        assert_eq!(hand_of(&[1]).value, 11);
        assert!(hand_of(&[1]).usable_ace);
        assert_eq!(hand_of(&[1, 1]).value, 12);
        assert_eq!(hand_of(&[1, 1, 1]).value, 13);
        assert_eq!(hand_of(&[1, 9]).value, 20);
        assert_eq!(hand_of(&[10, 10, 1]).value, 21);
        assert!(!hand_of(&[10, 10, 1]).usable_ace);
    }

    #[test]
    fn hand_demotes_ace_instead_of_busting() {
        let hand = hand_of(&[1, 9, 5]);
        assert_eq!(hand.value, 15);
        assert!(!hand.usable_ace);
        assert!(!hand.is_bust());
    }

    #[test]
    fn reset_deals_valid_observations() {
        for seed in 0..20 {
            let mut env = Blackjack::seeded(seed);
            let obs = env.reset();
            assert!((4..=21).contains(&obs.player));
            assert!((1..=10).contains(&obs.dealer));
        }
    }

    #[test]
    fn hitting_forever_ends_in_a_bust() {
        for seed in 0..20 {
            let mut env = Blackjack::seeded(seed);
            env.reset();
            loop {
                let step = env.step(HIT);
                if step.done {
                    assert_eq!(step.reward, -1.0);
                    assert!(step.state.player > 21);
                    break;
                }
                assert_eq!(step.reward, 0.0);
                assert!(step.state.player <= 21);
            }
        }
    }

    #[test]
    fn sticking_ends_the_episode_with_a_comparison_reward() {
        for seed in 0..20 {
            let mut env = Blackjack::seeded(seed);
            env.reset();
            let step = env.step(STICK);
            assert!(step.done);
            assert!([-1.0, 0.0, 1.0].contains(&step.reward));
        }
    }

    #[test]
    fn control_learns_to_stick_on_21() {
        let mut env = Blackjack::seeded(99);
        let mut rng = StdRng::seed_from_u64(99);

        let q = monte_carlo::control_epsilon_greedy(&mut env, 50_000, 1.0, 0.3, &mut rng);

        // Hitting on 21 always busts, so the learned policy must stick.
        let obs = Obs {
            player: 21,
            dealer: 10,
            usable_ace: false,
        };
        assert_eq!(monte_carlo::greedy_action(&q[&obs]), STICK);
    }

    #[test]
    fn reference_policy_sticks_only_at_20() {
        let mut obs = Obs {
            player: 19,
            dealer: 5,
            usable_ace: false,
        };
        assert_eq!(stick_at_20(&obs), HIT);
        obs.player = 20;
        assert_eq!(stick_at_20(&obs), STICK);
        obs.player = 21;
        assert_eq!(stick_at_20(&obs), STICK);
    }
}
