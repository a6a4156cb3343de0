//! Hit chance and attack tag selection for the default attack formula.

use rust_decimal::Decimal;

/// Tag of a regular hit.
pub const HIT: &str = "hit";
/// Tag of a missed attack.
pub const MISS: &str = "miss";
/// Tag of a critical hit.
pub const CRITICAL_HIT: &str = "critical hit";

/// Calculate hit chance based on accuracy vs evasion.
///
/// # Formula
///
/// ```text
/// hit_chance = base_tohit + (accuracy - evasion)
/// ```
///
/// Not clamped: a chance above 100 always hits, one at or below 0 never does.
pub fn calculate_hit_chance(base_tohit: Decimal, accuracy: Decimal, evasion: Decimal) -> Decimal {
    base_tohit.saturating_add(accuracy.saturating_sub(evasion))
}

/// Select the attack tag from two pre-drawn rolls in `[0, 100)`.
///
/// The hit roll is checked first; only a hit can become critical.
pub fn select_tag(
    hit_chance: Decimal,
    roll: Decimal,
    critical_chance: Decimal,
    critical_roll: Decimal,
) -> &'static str {
    if roll >= hit_chance {
        MISS
    } else if critical_roll < critical_chance {
        CRITICAL_HIT
    } else {
        HIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn hit_chance_adds_accuracy_advantage() {
        // 90 + (20 - 10) = 100
        assert_eq!(calculate_hit_chance(d(90), d(20), d(10)), d(100));
        // 90 + (10 - 30) = 70
        assert_eq!(calculate_hit_chance(d(90), d(10), d(30)), d(70));
    }

    #[test]
    fn roll_at_chance_misses() {
        assert_eq!(select_tag(d(70), d(70), d(5), d(0)), MISS);
        assert_eq!(select_tag(d(70), d(69), d(5), d(50)), HIT);
    }

    #[test]
    fn low_critical_roll_turns_hit_critical() {
        assert_eq!(select_tag(d(90), d(10), d(5), d(4)), CRITICAL_HIT);
        assert_eq!(select_tag(d(90), d(10), d(5), d(5)), HIT);
        // a miss stays a miss regardless of the critical roll
        assert_eq!(select_tag(d(90), d(95), d(5), d(0)), MISS);
    }
}
