fn main() {
    mc_blackjack::blackjack::run();
}
