use serde::Deserialize;

/// * `base_speed` - (m/s) Speed without any boost, the floor of the economy
/// * `max_speed` - (m/s) Speed cap, boosts beyond it are absorbed
/// * `max_stacks` - Maximum number of stacks a racer can hold
#[derive(Debug, Deserialize, Clone)]
pub struct SpeedPars {
    pub base_speed: f64,
    pub max_speed: f64,
    pub max_stacks: u32,
}

impl Default for SpeedPars {
    fn default() -> Self {
        SpeedPars {
            base_speed: 5.0,
            max_speed: 15.0,
            max_stacks: 3,
        }
    }
}

/// SpeedEconomy holds the current speed of a racer together with a LIFO ledger of the boosts
/// that were actually applied. Only the post-clamp delta is recorded, so popping an entry always
/// undoes exactly the most recent applied boost.
#[derive(Debug, Clone)]
pub struct SpeedEconomy {
    base_speed: f64,
    max_speed: f64,
    cur_speed: f64,
    ledger: Vec<f64>,
}

impl SpeedEconomy {
    pub fn new(speed_pars: &SpeedPars) -> SpeedEconomy {
        SpeedEconomy {
            base_speed: speed_pars.base_speed,
            max_speed: speed_pars.max_speed.max(speed_pars.base_speed),
            cur_speed: speed_pars.base_speed,
            ledger: Vec::with_capacity(speed_pars.max_stacks as usize),
        }
    }

    /// apply_boost raises the speed by the nominal amount (clamped to [base, max]) and returns
    /// the applied delta. Non-positive nominals are ignored, the ledger only grows if the applied
    /// delta is positive.
    pub fn apply_boost(&mut self, nominal: f64) -> f64 {
        let old_speed = self.cur_speed;
        let new_speed = self.clamp(old_speed + nominal.max(0.0));
        let applied = new_speed - old_speed;

        if applied > 0.0 {
            self.ledger.push(applied);
        }

        self.cur_speed = new_speed;
        applied
    }

    /// undo_last_boost pops the most recent ledger entry and removes it from the speed. Returns
    /// the undone amount, 0.0 if the ledger is empty.
    pub fn undo_last_boost(&mut self) -> f64 {
        match self.ledger.pop() {
            Some(last) => {
                self.cur_speed = self.clamp(self.cur_speed - last);
                last
            }
            None => 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.ledger.clear();
        self.cur_speed = self.base_speed;
    }

    pub fn get_cur_speed(&self) -> f64 {
        self.cur_speed
    }

    pub fn get_base_speed(&self) -> f64 {
        self.base_speed
    }

    pub fn get_max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn get_ledger(&self) -> &[f64] {
        &self.ledger
    }

    fn clamp(&self, speed: f64) -> f64 {
        speed.clamp(self.base_speed, self.max_speed)
    }
}

/// StackCounter is the bounded counter shown to the player next to the ledger.
#[derive(Debug, Clone)]
pub struct StackCounter {
    cur: u32,
    max: u32,
}

impl StackCounter {
    pub fn new(max: u32) -> StackCounter {
        StackCounter { cur: 0, max }
    }

    /// try_increase returns true if the counter went up.
    pub fn try_increase(&mut self) -> bool {
        if self.cur < self.max {
            self.cur += 1;
            true
        } else {
            false
        }
    }

    /// try_decrease returns true if the counter went down.
    pub fn try_decrease(&mut self) -> bool {
        if self.cur > 0 {
            self.cur -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.cur = 0;
    }

    pub fn get_cur(&self) -> u32 {
        self.cur
    }

    pub fn get_max(&self) -> u32 {
        self.max
    }

    /// fill_ratio returns the stack bar fill in [0.0, 1.0].
    pub fn fill_ratio(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.cur as f64 / self.max as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn economy() -> SpeedEconomy {
        SpeedEconomy::new(&SpeedPars::default())
    }

    #[test]
    fn boost_records_applied_delta_only() {
        let mut eco = economy();
        assert_abs_diff_eq!(eco.apply_boost(3.0), 3.0);
        assert_abs_diff_eq!(eco.apply_boost(3.0), 3.0);
        assert_abs_diff_eq!(eco.apply_boost(3.0), 3.0);
        // 14.0 -> clamped at 15.0
        assert_abs_diff_eq!(eco.apply_boost(3.0), 1.0);
        assert_abs_diff_eq!(eco.get_cur_speed(), 15.0);
        // already at max, nothing applied, nothing recorded
        assert_abs_diff_eq!(eco.apply_boost(3.0), 0.0);
        assert_eq!(eco.get_ledger().len(), 4);

        assert_abs_diff_eq!(eco.undo_last_boost(), 1.0);
        assert_abs_diff_eq!(eco.get_cur_speed(), 14.0);
    }

    #[test]
    fn negative_boost_is_absorbed_by_base() {
        let mut eco = economy();
        assert_abs_diff_eq!(eco.apply_boost(-2.0), 0.0);
        assert_abs_diff_eq!(eco.get_cur_speed(), 5.0);
        assert!(eco.get_ledger().is_empty());
    }

    #[test]
    fn negative_boost_keeps_ledger_symmetry() {
        let mut eco = economy();
        eco.apply_boost(3.0);
        let before = eco.get_cur_speed();
        eco.apply_boost(2.0);
        assert_abs_diff_eq!(eco.apply_boost(-1.0), 0.0);
        assert_abs_diff_eq!(eco.get_cur_speed(), 10.0);

        eco.undo_last_boost();
        assert_abs_diff_eq!(eco.get_cur_speed(), before);
        assert_abs_diff_eq!(eco.get_cur_speed(), 8.0);
        assert_eq!(eco.get_ledger(), &[3.0]);
    }

    #[test]
    fn undo_on_empty_ledger_is_free() {
        let mut eco = economy();
        assert_abs_diff_eq!(eco.undo_last_boost(), 0.0);
        assert_abs_diff_eq!(eco.get_cur_speed(), 5.0);
    }

    #[test]
    fn undo_restores_speed_before_each_apply() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let mut eco = economy();
            let mut history = Vec::new();

            for _ in 0..rng.gen_range(1..8) {
                let before = eco.get_cur_speed();
                let applied = eco.apply_boost(rng.gen_range(-1.0..4.0));
                if applied > 0.0 {
                    history.push(before);
                }
                assert!(eco.get_cur_speed() >= eco.get_base_speed());
                assert!(eco.get_cur_speed() <= eco.get_max_speed());
            }

            while let Some(before) = history.pop() {
                eco.undo_last_boost();
                assert_abs_diff_eq!(eco.get_cur_speed(), before, epsilon = 1e-9);
            }
            assert_abs_diff_eq!(eco.undo_last_boost(), 0.0);
        }
    }

    #[test]
    fn reset_clears_ledger() {
        let mut eco = economy();
        eco.apply_boost(2.0);
        eco.reset();
        assert!(eco.get_ledger().is_empty());
        assert_abs_diff_eq!(eco.get_cur_speed(), 5.0);
    }

    #[test]
    fn stack_counter_is_bounded() {
        let mut stacks = StackCounter::new(2);
        assert!(!stacks.try_decrease());
        assert!(stacks.try_increase());
        assert!(stacks.try_increase());
        assert!(!stacks.try_increase());
        assert_eq!(stacks.get_cur(), 2);
        assert_abs_diff_eq!(stacks.fill_ratio(), 1.0);
        assert!(stacks.try_decrease());
        assert_eq!(stacks.get_cur(), 1);
    }
}
