//! Game configuration

use std::path::Path;

use anyhow::Context;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::board::{HexBoard, Player, DEFAULT_BONUS_MULTIPLIER, DEFAULT_BONUS_TILES, DEFAULT_RADIUS};
use crate::game::{EndCondition, GameState};

/// Largest radius a game may be created with
pub const MAX_RADIUS: u32 = 12;

/// Everything needed to start a game. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub radius: u32,
    pub end_condition: EndCondition,
    pub bonus_tiles: usize,
    pub bonus_multiplier: u32,
    /// Randomize who moves first; otherwise Red opens
    pub shuffle_turn_order: bool,
    /// `None` seats are played by a human
    pub red: Option<AgentKind>,
    pub blue: Option<AgentKind>,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            end_condition: EndCondition::default(),
            bonus_tiles: DEFAULT_BONUS_TILES,
            bonus_multiplier: DEFAULT_BONUS_MULTIPLIER,
            shuffle_turn_order: true,
            red: None,
            blue: None,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_end_condition(mut self, end_condition: EndCondition) -> Self {
        self.end_condition = end_condition;
        self
    }

    pub fn with_agent(mut self, player: Player, agent: Option<AgentKind>) -> Self {
        match player {
            Player::Red => self.red = agent,
            Player::Blue => self.blue = agent,
        }
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bonus_tiles(mut self, count: usize, multiplier: u32) -> Self {
        self.bonus_tiles = count;
        self.bonus_multiplier = multiplier;
        self
    }

    pub fn with_fixed_turn_order(mut self) -> Self {
        self.shuffle_turn_order = false;
        self
    }

    pub fn agent(&self, player: Player) -> Option<AgentKind> {
        match player {
            Player::Red => self.red,
            Player::Blue => self.blue,
        }
    }

    /// Clamp out-of-range values, logging each adjustment
    pub fn sanitized(mut self) -> Self {
        if self.radius > MAX_RADIUS {
            tracing::warn!(radius = self.radius, max = MAX_RADIUS, "radius too large, clamping");
            self.radius = MAX_RADIUS;
        }
        if let EndCondition::RoundLimit { max_rounds: 0 } = self.end_condition {
            tracing::warn!("max_rounds of 0 would end the game before it starts, using 1");
            self.end_condition = EndCondition::RoundLimit { max_rounds: 1 };
        }
        if self.bonus_tiles > 0 && self.bonus_multiplier < 2 {
            tracing::warn!(
                multiplier = self.bonus_multiplier,
                "bonus multiplier below 2 has no effect, disabling bonus tiles"
            );
            self.bonus_tiles = 0;
        }
        self
    }

    /// Fresh game: bonus tiles scattered and turn order drawn from `rng`
    pub fn build_state<R: Rng>(&self, rng: &mut R) -> GameState {
        let mut board = HexBoard::new(self.radius);
        if self.bonus_tiles > 0 && self.bonus_multiplier > 1 {
            board.scatter_bonus_tiles(rng, self.bonus_tiles, self.bonus_multiplier);
        }

        let mut turn_order = Player::ALL;
        if self.shuffle_turn_order {
            turn_order.shuffle(rng);
        }

        GameState::new(board, turn_order, self.end_condition)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading game config {}", path.display()))?;
        let config: GameConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing game config {}", path.display()))?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing game config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GameConfig = serde_json::from_str(
            r#"{"radius": 3, "blue": {"strategy": "genius"}}"#,
        )
        .unwrap();
        assert_eq!(config.radius, 3);
        assert_eq!(config.red, None);
        assert_eq!(config.blue, Some(AgentKind::Genius));
        assert_eq!(config.end_condition, EndCondition::RoundLimit { max_rounds: 25 });
        assert_eq!(config.bonus_tiles, DEFAULT_BONUS_TILES);
    }

    #[test]
    fn test_threshold_json() {
        let config: GameConfig = serde_json::from_str(
            r#"{"end_condition": {"mode": "score_threshold", "target": 50}}"#,
        )
        .unwrap();
        assert_eq!(
            config.end_condition,
            EndCondition::ScoreThreshold { target: Some(50) }
        );
    }

    #[test]
    fn test_save_and_load() {
        let path =
            std::env::temp_dir().join(format!("shapetac-config-{}.json", std::process::id()));
        let config = GameConfig::default()
            .with_radius(5)
            .with_seed(99)
            .with_agent(Player::Red, Some(AgentKind::Smart));

        config.save(&path).unwrap();
        let loaded = GameConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = GameConfig::load(Path::new("/nonexistent/shapetac.json")).unwrap_err();
        assert!(err.to_string().contains("reading game config"));
    }

    #[test]
    fn test_build_state_is_reproducible() {
        let config = GameConfig::default();
        let a = config.build_state(&mut ChaCha8Rng::seed_from_u64(5));
        let b = config.build_state(&mut ChaCha8Rng::seed_from_u64(5));

        assert_eq!(a.board(), b.board());
        assert_eq!(a.turn_order(), b.turn_order());
        assert_eq!(a.board().bonuses().count(), DEFAULT_BONUS_TILES);
    }

    #[test]
    fn test_fixed_turn_order() {
        let config = GameConfig::default().with_fixed_turn_order();
        for seed in 0..4 {
            let state = config.build_state(&mut ChaCha8Rng::seed_from_u64(seed));
            assert_eq!(state.current_player(), Player::Red);
        }
    }

    #[test]
    fn test_sanitized() {
        let config = GameConfig::default()
            .with_radius(40)
            .with_end_condition(EndCondition::RoundLimit { max_rounds: 0 })
            .with_bonus_tiles(3, 1)
            .sanitized();
        assert_eq!(config.radius, MAX_RADIUS);
        assert_eq!(config.end_condition, EndCondition::RoundLimit { max_rounds: 1 });
        assert_eq!(config.bonus_tiles, 0);
    }
}
