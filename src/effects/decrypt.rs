//! Movie style decryption: the input is typed out as ciphertext, then every
//! character flickers through random symbols before settling on its
//! plaintext in the final gradient colour.

use std::collections::VecDeque;

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::animation::SceneId;
use crate::engine::character::{CharacterId, EffectCharacter};
use crate::engine::events::{Action, Callback, Event};
use crate::engine::terminal::Terminal;
use crate::engine::BaseEffectIterator;
use crate::error::{EngineError, EngineResult};
use crate::gradient::{Gradient, GradientDirection};
use crate::types::{Color, GraphicalEffect};

use super::final_colors;

const TYPING: &str = "typing";
const FAST_DECRYPT: &str = "fast_decrypt";
const SLOW_DECRYPT: &str = "slow_decrypt";
const DISCOVERED: &str = "discovered";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptConfig {
    /// Characters typed per keystroke.
    pub typing_speed: usize,
    /// Ciphertext colours, one picked at random per character.
    pub ciphertext_colors: Vec<Color>,
    pub final_gradient_stops: Vec<Color>,
    pub final_gradient_steps: usize,
    pub final_gradient_direction: GradientDirection,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        DecryptConfig {
            typing_speed: 1,
            ciphertext_colors: vec![
                Color::rgb(0x00, 0x80, 0x00),
                Color::rgb(0x00, 0xcb, 0x00),
                Color::rgb(0x00, 0xff, 0x00),
            ],
            final_gradient_stops: vec![Color::rgb(0xed, 0xa0, 0x00)],
            final_gradient_steps: 12,
            final_gradient_direction: GradientDirection::Vertical,
        }
    }
}

impl DecryptConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.typing_speed == 0 {
            return Err(EngineError::InvalidConfig {
                message: "typing_speed must be at least 1".into(),
            });
        }
        if self.ciphertext_colors.is_empty() {
            return Err(EngineError::InvalidConfig {
                message: "ciphertext_colors must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Printable ASCII, block elements, box drawing and Latin-1/Extended-B.
fn encrypted_symbols() -> Vec<char> {
    [33u32..127, 9608..9632, 9472..9599, 174..452]
        .into_iter()
        .flatten()
        .filter_map(char::from_u32)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Typing,
    Decrypting,
    Complete,
}

pub struct Decrypt {
    engine: BaseEffectIterator,
    typing_pending: VecDeque<CharacterId>,
    typing_speed: usize,
    phase: Phase,
}

impl Decrypt {
    pub fn new(mut terminal: Terminal, config: DecryptConfig) -> EngineResult<Self> {
        config.validate()?;
        let colors = final_colors(
            &terminal,
            &config.final_gradient_stops,
            config.final_gradient_steps,
            config.final_gradient_direction,
        )?;
        let symbols = encrypted_symbols();
        let mut typing_pending = VecDeque::new();
        for character in terminal.characters_mut() {
            let final_color = colors[character.id().0];
            build_scenes(character, &config.ciphertext_colors, &symbols, final_color)?;
            typing_pending.push_back(character.id());
        }

        Ok(Decrypt {
            engine: BaseEffectIterator::new(terminal),
            typing_pending,
            typing_speed: config.typing_speed,
            phase: Phase::Typing,
        })
    }

    pub fn terminal(&self) -> &Terminal {
        self.engine.terminal()
    }

    fn start_typing(&mut self, id: CharacterId) -> EngineResult<()> {
        let character = self.engine.terminal_mut().character_mut(id)?;
        character.set_visible(true);
        character.activate_scene(&SceneId::new(TYPING))?;
        self.engine.add_active(id);
        Ok(())
    }

    fn start_decrypting(&mut self) -> EngineResult<()> {
        let fast = SceneId::new(FAST_DECRYPT);
        let ids: Vec<CharacterId> = self.engine.terminal().character_ids().collect();
        for &id in &ids {
            self.engine.terminal_mut().character_mut(id)?.activate_scene(&fast)?;
        }
        debug!("decrypt: typing done, decrypting {} characters", ids.len());
        self.engine.replace_active(ids);
        Ok(())
    }
}

fn random_symbol(character: &EffectCharacter, symbols: &[char], rng: &mut impl Rng) -> String {
    let count = if character.is_wide() { 2 } else { 1 };
    (0..count)
        .filter_map(|_| symbols.choose(&mut *rng))
        .collect()
}

fn cipher_effect(colors: &[Color], rng: &mut impl Rng) -> GraphicalEffect {
    GraphicalEffect {
        color: colors.choose(rng).copied(),
        ..GraphicalEffect::default()
    }
}

/// Typing, fast, slow and discovered scenes plus the rules chaining the
/// last three. Until the discovered scene starts, the character falls back
/// to ciphertext between scenes: the typed symbol while typing, then a
/// decryption symbol in the cipher colour.
fn build_scenes(
    character: &mut EffectCharacter,
    ciphertext_colors: &[Color],
    symbols: &[char],
    final_color: Color,
) -> EngineResult<()> {
    let mut rng = rand::thread_rng();

    let mut frames: Vec<(String, GraphicalEffect)> = ["▉", "▓", "▒", "░"]
        .into_iter()
        .map(|block| (block.to_string(), cipher_effect(ciphertext_colors, &mut rng)))
        .collect();
    let resting = (
        random_symbol(character, symbols, &mut rng),
        cipher_effect(ciphertext_colors, &mut rng),
    );
    frames.push(resting.clone());
    let typing = character.animation.new_scene(Some(TYPING), false);
    for (symbol, effect) in frames {
        typing.add_frame(symbol, 2, effect)?;
    }
    character.alternate_symbol = resting.0;
    character.use_alternate_symbol = true;
    character.final_graphical_effect = resting.1;

    let cipher = cipher_effect(ciphertext_colors, &mut rng);
    let fast: Vec<String> = (0..80)
        .map(|_| random_symbol(character, symbols, &mut rng))
        .collect();
    let decrypting_fallback = fast.last().cloned().unwrap_or_default();
    let fast_scene = character.animation.new_scene(Some(FAST_DECRYPT), false);
    for symbol in fast {
        fast_scene.add_frame(symbol, 3, cipher.clone())?;
    }

    let slow: Vec<(String, usize)> = (0..rng.gen_range(1..=15))
        .map(|_| {
            let duration = if rng.gen_range(0..=100) <= 30 {
                rng.gen_range(50..125)
            } else {
                rng.gen_range(5..10)
            };
            (random_symbol(character, symbols, &mut rng), duration)
        })
        .collect();
    let slow_scene = character.animation.new_scene(Some(SLOW_DECRYPT), false);
    for (symbol, duration) in slow {
        slow_scene.add_frame(symbol, duration, cipher.clone())?;
    }

    let discovered = Gradient::new(&[Color::rgb(0xff, 0xff, 0xff), final_color], 10)?;
    let input_symbol = character.input_symbol().to_string();
    character
        .animation
        .new_scene(Some(DISCOVERED), false)
        .apply_gradient_to_symbols(&discovered, &input_symbol, 8)?;

    let fallback_effect = cipher.clone();
    character.register_event(
        Event::SceneActivated(SceneId::new(FAST_DECRYPT)),
        Action::Callback(Callback::new(move |c| {
            c.alternate_symbol = decrypting_fallback.clone();
            c.use_alternate_symbol = true;
            c.final_graphical_effect = fallback_effect.clone();
        })),
    )?;
    character.register_event(
        Event::SceneActivated(SceneId::new(DISCOVERED)),
        Action::Callback(Callback::new(move |c| {
            c.use_alternate_symbol = false;
            c.final_graphical_effect = GraphicalEffect::with_color(final_color);
        })),
    )?;
    character.register_event(
        Event::SceneComplete(SceneId::new(FAST_DECRYPT)),
        Action::ActivateScene(SceneId::new(SLOW_DECRYPT)),
    )?;
    character.register_event(
        Event::SceneComplete(SceneId::new(SLOW_DECRYPT)),
        Action::ActivateScene(SceneId::new(DISCOVERED)),
    )?;
    Ok(())
}

impl Iterator for Decrypt {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.phase == Phase::Typing {
            if !self.typing_pending.is_empty() || self.engine.has_active() {
                if !self.typing_pending.is_empty() && rand::thread_rng().gen_range(0..=100) <= 75 {
                    for _ in 0..self.typing_speed {
                        let Some(id) = self.typing_pending.pop_front() else {
                            break;
                        };
                        if let Err(err) = self.start_typing(id) {
                            warn!("decrypt: {err}");
                        }
                    }
                }
                return Some(self.engine.update().to_string());
            }
            if let Err(err) = self.start_decrypting() {
                warn!("decrypt: {err}");
            }
            self.phase = Phase::Decrypting;
        }

        if self.phase == Phase::Decrypting {
            if self.engine.has_active() {
                return Some(self.engine.update().to_string());
            }
            debug!("decrypt: complete");
            self.phase = Phase::Complete;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::terminal::TerminalConfig;

    #[test]
    fn test_scenes_and_rules_are_built() {
        let decrypt = Decrypt::new(
            Terminal::new("hi", TerminalConfig::default()),
            DecryptConfig::default(),
        )
        .unwrap();
        let character = &decrypt.terminal().characters()[0];
        let typing = character.animation.scene(&SceneId::new(TYPING)).unwrap();
        assert_eq!(typing.frames().len(), 5);
        assert_eq!(typing.frames()[0].symbol, "▉");
        let fast = character.animation.scene(&SceneId::new(FAST_DECRYPT)).unwrap();
        assert_eq!(fast.frames().len(), 80);
        let slow = character.animation.scene(&SceneId::new(SLOW_DECRYPT)).unwrap();
        assert!((1..=15).contains(&slow.frames().len()));
        let discovered = character.animation.scene(&SceneId::new(DISCOVERED)).unwrap();
        assert_eq!(discovered.frames().len(), 11);
        assert_eq!(character.event_handler().rule_count(), 4);
    }

    #[test]
    fn test_wide_characters_get_two_symbol_ciphertext() {
        let decrypt = Decrypt::new(
            Terminal::new("世", TerminalConfig::default()),
            DecryptConfig::default(),
        )
        .unwrap();
        let character = &decrypt.terminal().characters()[0];
        let fast = character.animation.scene(&SceneId::new(FAST_DECRYPT)).unwrap();
        assert!(fast.frames().iter().all(|f| f.symbol.chars().count() == 2));
    }

    #[test]
    fn test_runs_to_plaintext() {
        let mut decrypt = Decrypt::new(
            Terminal::new("ok", TerminalConfig::default()),
            DecryptConfig::default(),
        )
        .unwrap();
        let last = decrypt.by_ref().take(5_000).last().unwrap();
        assert!(decrypt.next().is_none());
        assert!(last.contains('o') && last.contains('k'));
        let color = Color::rgb(0xed, 0xa0, 0x00);
        assert!(decrypt
            .terminal()
            .characters()
            .iter()
            .all(|c| c.symbol() == c.input_symbol() && c.graphical_effect().color == Some(color)));
    }

    #[test]
    fn test_plaintext_stays_hidden_until_discovered() {
        let mut decrypt = Decrypt::new(
            Terminal::new("Q", TerminalConfig::default()),
            DecryptConfig::default(),
        )
        .unwrap();
        let final_color = Some(Color::rgb(0xed, 0xa0, 0x00));
        let mut decrypting_ticks = 0;
        while decrypt.next().is_some() {
            let character = &decrypt.terminal().characters()[0];
            let Some(scene) = character.animation.active_scene() else {
                continue;
            };
            if scene.id().as_str() != FAST_DECRYPT && scene.id().as_str() != SLOW_DECRYPT {
                continue;
            }
            decrypting_ticks += 1;
            let fast = character.animation.scene(&SceneId::new(FAST_DECRYPT)).unwrap();
            let slow = character.animation.scene(&SceneId::new(SLOW_DECRYPT)).unwrap();
            let is_cipher = character.symbol() == character.alternate_symbol
                || fast
                    .frames()
                    .iter()
                    .chain(slow.frames())
                    .any(|frame| frame.symbol == character.symbol());
            assert!(is_cipher, "plaintext shown while decrypting");
            assert!(character.use_alternate_symbol);
            assert_ne!(character.graphical_effect().color, final_color);
        }
        assert!(decrypting_ticks > 240);
        let character = &decrypt.terminal().characters()[0];
        assert_eq!(character.symbol(), "Q");
        assert_eq!(character.graphical_effect().color, final_color);
    }

    #[test]
    fn test_zero_typing_speed_is_rejected() {
        let config = DecryptConfig {
            typing_speed: 0,
            ..DecryptConfig::default()
        };
        assert!(matches!(
            Decrypt::new(Terminal::new("x", TerminalConfig::default()), config),
            Err(EngineError::InvalidConfig { .. })
        ));
    }
}
