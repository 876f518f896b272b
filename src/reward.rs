// Applying experience and coin rewards to the player

use crate::level;
use crate::models::Player;
use tracing::info;

impl Player {
    /// Fresh player at level 1 with no experience
    pub fn new() -> Self {
        Self::from_totals(0, 0, 0, false, false)
    }

    /// Build a player from stored totals, deriving every level field
    pub fn from_totals(
        current_xp: u64,
        coins: u64,
        streak: u32,
        did_task_today: bool,
        is_drought: bool,
    ) -> Self {
        let current_level = level::calculate_level(current_xp);
        Self {
            current_xp,
            current_level,
            current_level_xp: current_xp.saturating_sub(level::experience_for_level(current_level)),
            xp_to_next_level: level::total_xp_for_next_level(current_level),
            coins,
            streak,
            did_task_today,
            is_drought,
        }
    }

    /// Set total experience and re-derive the level fields.
    /// Returns true when the level changed.
    pub fn apply_xp(&mut self, new_total_xp: u64) -> bool {
        let previous = self.current_level;
        let current_level = level::calculate_level(new_total_xp);

        self.current_xp = new_total_xp;
        self.current_level = current_level;
        if current_level != previous {
            self.xp_to_next_level = level::total_xp_for_next_level(current_level);
            info!(from = previous, to = current_level, xp = new_total_xp, "Level changed");
        }
        let floor = level::experience_for_level(current_level);
        self.current_level_xp = new_total_xp.saturating_sub(floor);

        current_level != previous
    }

    pub fn grant_xp(&mut self, amount: u64) -> bool {
        self.apply_xp(self.current_xp.saturating_add(amount))
    }

    /// Remove experience, never going below zero
    pub fn spend_xp(&mut self, amount: u64) -> bool {
        self.apply_xp(self.current_xp.saturating_sub(amount))
    }

    /// Signed change as reported by the server (undo responses are negative)
    pub fn apply_xp_delta(&mut self, delta: i64) -> bool {
        if delta >= 0 {
            self.grant_xp(delta.unsigned_abs())
        } else {
            self.spend_xp(delta.unsigned_abs())
        }
    }

    pub fn grant_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    /// Remove coins, never going below zero
    pub fn spend_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_sub(amount);
    }

    /// Fraction of the current level already earned
    pub fn progress(&self) -> f64 {
        level::progress_to_next(self.current_level, self.current_xp)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_derives_fields() {
        let player = Player::new();
        assert_eq!(player.current_level, 1);
        assert_eq!(player.current_level_xp, 0);
        assert_eq!(player.xp_to_next_level, 50);
        assert!(player.current_level_xp < player.xp_to_next_level);
    }

    #[test]
    fn test_two_rewards_level_up() {
        let mut player = Player::new();

        assert!(!player.grant_xp(30));
        assert_eq!(player.current_level, 1);
        assert_eq!(player.current_level_xp, 30);

        assert!(player.grant_xp(30));
        assert_eq!(player.current_xp, 60);
        assert_eq!(player.current_level, 2);
        assert_eq!(player.current_level_xp, 10);
        assert_eq!(player.xp_to_next_level, 53);
    }

    #[test]
    fn test_spend_xp_floors_at_zero() {
        let mut player = Player::from_totals(60, 0, 0, false, false);
        assert!(player.spend_xp(100));
        assert_eq!(player.current_xp, 0);
        assert_eq!(player.current_level, 1);
        assert_eq!(player.xp_to_next_level, 50);
    }

    #[test]
    fn test_negative_delta_from_undo() {
        let mut player = Player::from_totals(60, 0, 0, false, false);
        player.apply_xp_delta(-20);
        assert_eq!(player.current_xp, 40);
        assert_eq!(player.current_level, 1);
        assert_eq!(player.current_level_xp, 40);
    }

    #[test]
    fn test_coins_floor_at_zero() {
        let mut player = Player::new();
        player.grant_coins(15);
        player.spend_coins(10);
        assert_eq!(player.coins, 5);
        player.spend_coins(10);
        assert_eq!(player.coins, 0);
    }

    #[test]
    fn test_level_xp_invariant_holds() {
        let mut player = Player::new();
        for _ in 0..200 {
            player.grant_xp(37);
            assert_eq!(
                player.current_level_xp,
                player.current_xp - level::experience_for_level(player.current_level)
            );
            assert!(player.current_level_xp < player.xp_to_next_level);
        }
    }
}
