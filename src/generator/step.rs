//! Price step strategies

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Strategy producing the next price delta
///
/// Injected into the generator so tests can substitute deterministic
/// sequences for the random walk.
pub trait Step: Send + Sync {
    fn delta(&mut self) -> Decimal;
}

/// Default walk: +1 or -1 with equal probability
pub struct RandomWalk;

impl Step for RandomWalk {
    fn delta(&mut self) -> Decimal {
        if rand::rng().random_bool(0.5) {
            dec!(1)
        } else {
            dec!(-1)
        }
    }
}

/// Same delta every step
pub struct FixedStep(pub Decimal);

impl Step for FixedStep {
    fn delta(&mut self) -> Decimal {
        self.0
    }
}

/// Replays a scripted sequence of deltas, then repeats the last one
pub struct ScriptedSteps {
    deltas: Vec<Decimal>,
    position: usize,
}

impl ScriptedSteps {
    /// The script must not be empty.
    pub fn new(deltas: Vec<Decimal>) -> Self {
        assert!(!deltas.is_empty(), "script must contain at least one delta");
        Self {
            deltas,
            position: 0,
        }
    }
}

impl Step for ScriptedSteps {
    fn delta(&mut self) -> Decimal {
        let index = self.position.min(self.deltas.len() - 1);
        self.position += 1;
        self.deltas[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_walk_is_unit_step() {
        let mut walk = RandomWalk;
        for _ in 0..100 {
            let delta = walk.delta();
            assert!(delta == dec!(1) || delta == dec!(-1));
        }
    }

    #[test]
    fn test_scripted_steps_repeat_last() {
        let mut steps = ScriptedSteps::new(vec![dec!(1), dec!(-2)]);
        assert_eq!(steps.delta(), dec!(1));
        assert_eq!(steps.delta(), dec!(-2));
        assert_eq!(steps.delta(), dec!(-2));
    }
}
