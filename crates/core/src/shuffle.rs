use rand::Rng;
use rand::seq::SliceRandom;

/// Unbiased in-place Fisher–Yates shuffle driven by `rng`.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// Shuffle using the thread-local generator.
#[must_use]
pub fn shuffled<T>(mut items: Vec<T>) -> Vec<T> {
    shuffle_in_place(&mut items, &mut rand::rng());
    items
}
