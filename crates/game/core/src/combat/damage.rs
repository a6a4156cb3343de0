//! Damage calculation for the default outcome formulas.

use rust_decimal::Decimal;

/// Damage dealt by a regular hit.
///
/// # Formula
///
/// ```text
/// damage = max(floor(damage - defense), minimum)
/// ```
pub fn hit_damage(damage: Decimal, defense: Decimal, minimum: Decimal) -> Decimal {
    damage.saturating_sub(defense).floor().max(minimum)
}

/// Damage dealt by a critical hit.
///
/// # Formula
///
/// ```text
/// damage = floor(max(damage - defense, 1) * (1 + multiplier / 100))
/// ```
///
/// `multiplier` is the attacker's critical damage multiplier in percent.
pub fn critical_damage(damage: Decimal, defense: Decimal, multiplier: Decimal) -> Decimal {
    let base = damage.saturating_sub(defense).max(Decimal::ONE);
    let ratio = Decimal::ONE.saturating_add(multiplier / Decimal::ONE_HUNDRED);
    base.saturating_mul(ratio).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn hit_damage_subtracts_defense() {
        // 15 - 0 = 15
        assert_eq!(hit_damage(d(15), d(0), d(1)), d(15));
        // 15 - 4 = 11
        assert_eq!(hit_damage(d(15), d(4), d(1)), d(11));
    }

    #[test]
    fn hit_damage_respects_minimum() {
        // 10 - 20 = -10, floor at 1
        assert_eq!(hit_damage(d(10), d(20), d(1)), d(1));
        // fractional results round down before the floor applies
        assert_eq!(hit_damage(Decimal::new(125, 1), d(2), d(1)), d(10));
    }

    #[test]
    fn critical_damage_scales_by_multiplier() {
        // max(20 - 10, 1) * (1 + 20/100) = 12
        assert_eq!(critical_damage(d(20), d(10), d(20)), d(12));
        // max(5 - 10, 1) * (1 + 50/100) = 1.5 -> 1
        assert_eq!(critical_damage(d(5), d(10), d(50)), d(1));
    }

    #[test]
    fn extreme_values_saturate() {
        assert_eq!(critical_damage(Decimal::MAX, d(0), d(100)), Decimal::MAX);
        assert_eq!(hit_damage(Decimal::MAX, Decimal::MIN, d(1)), Decimal::MAX);
    }
}
