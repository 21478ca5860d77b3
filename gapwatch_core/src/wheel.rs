use crate::table::{Outcome, OutcomeSet, DOMAIN_SIZE};

/// Single-zero wheel, clockwise from zero.
pub const WHEEL_ORDER: [u8; DOMAIN_SIZE] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

pub const DEFAULT_NEIGHBOR_RADIUS: usize = 3;

/// Position of `outcome` on the wheel (0 = zero pocket).
pub fn wheel_position(outcome: Outcome) -> usize {
    WHEEL_ORDER
        .iter()
        .position(|&n| n == outcome.value())
        .unwrap_or(0)
}

fn at(pos: usize) -> Outcome {
    // WHEEL_ORDER only holds values in 0..=36
    Outcome::new(WHEEL_ORDER[pos % DOMAIN_SIZE] as i64).unwrap_or(Outcome::ZERO)
}

/// `radius` counter-clockwise neighbours (farthest first), the outcome, then
/// `radius` clockwise neighbours. Wraps around zero.
pub fn neighbors(outcome: Outcome, radius: usize) -> Vec<Outcome> {
    let center = wheel_position(outcome);
    let radius = radius % DOMAIN_SIZE;
    let mut out = Vec::with_capacity(2 * radius + 1);
    for i in (1..=radius).rev() {
        out.push(at(center + DOMAIN_SIZE - i));
    }
    out.push(outcome);
    for i in 1..=radius {
        out.push(at(center + i));
    }
    out
}

/// Contiguous run of `len` pockets clockwise from `start`, inclusive.
pub fn wheel_section(start: Outcome, len: usize) -> OutcomeSet {
    let from = wheel_position(start);
    (0..len.min(DOMAIN_SIZE)).map(|i| at(from + i)).collect()
}
