//! Critical-hit resolution.
//!
//! Order of draws: flat bonus, crit roll, and only on a crit the multiplier
//! followed by the rare super-crit roll.

use rand::Rng;

/// Flat bonus is a whole number in `0..FLAT_BONUS_LIMIT`.
pub const FLAT_BONUS_LIMIT: u32 = 5;

/// Inclusive bounds of the crit multiplier, before rounding to hundredths.
pub const CRIT_MULTIPLIER_MIN: f32 = 1.2;
pub const CRIT_MULTIPLIER_MAX: f32 = 2.0;

/// Chance of a super-crit once a crit has landed.
pub const SUPER_CRIT_CHANCE: f32 = 0.005;
pub const SUPER_CRIT_MULTIPLIER: f32 = 10.0;

/// Source of the four draws a crit roll consumes.
pub trait CritDice {
    fn flat_bonus(&mut self) -> f32;
    /// Uniform `[0, 1]`, already rounded to hundredths.
    fn crit_roll(&mut self) -> f32;
    /// Uniform `[1.2, 2.0]`, already rounded to hundredths.
    fn multiplier(&mut self) -> f32;
    fn super_roll(&mut self) -> f32;
}

/// Draws from a live random generator.
pub struct RandomDice<'a, R: Rng>(pub &'a mut R);

impl<R: Rng> CritDice for RandomDice<'_, R> {
    #[allow(clippy::cast_precision_loss)]
    fn flat_bonus(&mut self) -> f32 {
        self.0.random_range(0..FLAT_BONUS_LIMIT) as f32
    }

    fn crit_roll(&mut self) -> f32 {
        round_hundredths(self.0.random::<f32>())
    }

    fn multiplier(&mut self) -> f32 {
        round_hundredths(
            self.0
                .random_range(CRIT_MULTIPLIER_MIN..=CRIT_MULTIPLIER_MAX),
        )
    }

    fn super_roll(&mut self) -> f32 {
        self.0.random::<f32>()
    }
}

/// Predetermined draws, for reproducible expectations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDice {
    pub flat_bonus: f32,
    pub crit_roll: f32,
    pub multiplier: f32,
    pub super_roll: f32,
}

impl CritDice for FixedDice {
    fn flat_bonus(&mut self) -> f32 {
        self.flat_bonus
    }

    fn crit_roll(&mut self) -> f32 {
        self.crit_roll
    }

    fn multiplier(&mut self) -> f32 {
        self.multiplier
    }

    fn super_roll(&mut self) -> f32 {
        self.super_roll
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CritResult {
    pub damage: f32,
    pub critical: bool,
    pub super_critical: bool,
}

/// Final damage for one hit. `crit_total` is the weapon's crit chance plus
/// every active bonus.
pub fn roll_crit(base: f32, crit_total: f32, dice: &mut impl CritDice) -> CritResult {
    let mut damage = base + dice.flat_bonus();
    let mut critical = false;
    let mut super_critical = false;

    if dice.crit_roll() < crit_total {
        critical = true;
        damage *= dice.multiplier();
        if dice.super_roll() < SUPER_CRIT_CHANCE {
            super_critical = true;
            damage *= SUPER_CRIT_MULTIPLIER;
        }
    }

    CritResult {
        damage,
        critical,
        super_critical,
    }
}

fn round_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
