pub mod blackjack;
pub mod env;
pub mod solver;
