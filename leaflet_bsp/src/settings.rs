//! Protected per-module settings.
//!
//! Each relay, PWM and AIO module has one configuration word in its
//! position-0 holding register:
//!
//! | Module | Word                                             |
//! |--------|--------------------------------------------------|
//! | REL    | bit `position-1` set iff that relay is inverted  |
//! | PWM    | output frequency in Hz                           |
//! | AIO    | 4-bit mode code per channel, channel 1 lowest    |
//!
//! Words are kept here so a change to one pin never clobbers the others.
//!
//! Every setter passes the new word to a `commit` callback while the words
//! are still locked, so the last word committed for a module is its current
//! word.

use std::collections::BTreeMap;

use leaflet_common::bsp::error::BspError;
use leaflet_common::bsp::types::{AioMode, ModuleType};
use leaflet_common::consts::{AIO_BITS_PER_CHANNEL, PWM_FREQUENCY_MAX_HZ, PWM_FREQUENCY_MIN_HZ};
use parking_lot::Mutex;

/// Highest relay position addressable in the inversion word.
const RELAY_POSITIONS: u8 = u16::BITS as u8;

/// Current configuration words, keyed by (type, module).
#[derive(Debug, Default)]
pub struct ProtectedSettings {
    words: Mutex<BTreeMap<(ModuleType, u8), u16>>,
}

impl ProtectedSettings {
    /// No settings applied yet (all words zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Current word of a module.
    pub fn word(&self, module_type: ModuleType, module: u8) -> u16 {
        self.words
            .lock()
            .get(&(module_type, module))
            .copied()
            .unwrap_or(0)
    }

    /// Set or clear the inversion bit of a relay. Returns the new word.
    pub fn set_relay_inversion(
        &self,
        module: u8,
        position: u8,
        inverted: bool,
        commit: impl FnOnce(u16),
    ) -> Result<u16, BspError> {
        check_module(ModuleType::Rel, module)?;
        if !(1..=RELAY_POSITIONS).contains(&position) {
            return Err(BspError::InvalidSetting(format!(
                "relay position {position} outside 1..={RELAY_POSITIONS}"
            )));
        }
        let bit = 1u16 << (position - 1);
        Ok(self.update(
            ModuleType::Rel,
            module,
            |word| if inverted { word | bit } else { word & !bit },
            commit,
        ))
    }

    /// Replace the frequency of a PWM module. Returns the new word.
    pub fn set_pwm_frequency(
        &self,
        module: u8,
        frequency_hz: u16,
        commit: impl FnOnce(u16),
    ) -> Result<u16, BspError> {
        check_module(ModuleType::Pwm, module)?;
        if !(PWM_FREQUENCY_MIN_HZ..=PWM_FREQUENCY_MAX_HZ).contains(&frequency_hz) {
            return Err(BspError::InvalidSetting(format!(
                "PWM frequency {frequency_hz} Hz outside {PWM_FREQUENCY_MIN_HZ}..={PWM_FREQUENCY_MAX_HZ}"
            )));
        }
        Ok(self.update(ModuleType::Pwm, module, |_| frequency_hz, commit))
    }

    /// Replace the mode nibble of an AIO channel. Returns the new word.
    pub fn set_aio_mode(
        &self,
        module: u8,
        position: u8,
        mode: AioMode,
        commit: impl FnOnce(u16),
    ) -> Result<u16, BspError> {
        check_module(ModuleType::Aio, module)?;
        let shift = AioMode::channel_shift(position).ok_or_else(|| {
            BspError::InvalidSetting(format!("AIO channel {position} does not exist"))
        })?;
        let mask = ((1u16 << AIO_BITS_PER_CHANNEL) - 1) << shift;
        Ok(self.update(
            ModuleType::Aio,
            module,
            |word| (word & !mask) | (mode.code() << shift),
            commit,
        ))
    }

    fn update(
        &self,
        module_type: ModuleType,
        module: u8,
        f: impl FnOnce(u16) -> u16,
        commit: impl FnOnce(u16),
    ) -> u16 {
        let mut words = self.words.lock();
        let word = words.entry((module_type, module)).or_insert(0);
        *word = f(*word);
        let word = *word;
        commit(word);
        word
    }
}

fn check_module(module_type: ModuleType, module: u8) -> Result<(), BspError> {
    match module_type.max_modules() {
        Some(max) if (1..=max).contains(&module) => Ok(()),
        Some(max) => Err(BspError::InvalidSetting(format!(
            "{module_type} module {module} outside 1..={max}"
        ))),
        None => Err(BspError::UnsupportedModuleType { module_type }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_bits_set_and_clear_independently() {
        let settings = ProtectedSettings::new();
        assert_eq!(settings.set_relay_inversion(1, 1, true, |_| ()), Ok(0b001));
        assert_eq!(settings.set_relay_inversion(1, 3, true, |_| ()), Ok(0b101));
        assert_eq!(settings.set_relay_inversion(1, 1, false, |_| ()), Ok(0b100));
        // Another module has its own word.
        assert_eq!(settings.set_relay_inversion(2, 2, true, |_| ()), Ok(0b010));
        assert_eq!(settings.word(ModuleType::Rel, 1), 0b100);
    }

    #[test]
    fn relay_module_range() {
        let settings = ProtectedSettings::new();
        assert!(matches!(
            settings.set_relay_inversion(5, 1, true, |_| ()),
            Err(BspError::InvalidSetting(_))
        ));
        assert!(settings.set_relay_inversion(1, 0, true, |_| ()).is_err());
    }

    #[test]
    fn pwm_frequency_replaces_value() {
        let settings = ProtectedSettings::new();
        assert_eq!(settings.set_pwm_frequency(8, 24, |_| ()), Ok(24));
        assert_eq!(settings.set_pwm_frequency(8, 1500, |_| ()), Ok(1500));
        assert!(settings.set_pwm_frequency(8, 23, |_| ()).is_err());
        assert!(settings.set_pwm_frequency(8, 1501, |_| ()).is_err());
        assert!(settings.set_pwm_frequency(9, 100, |_| ()).is_err());
        assert_eq!(settings.word(ModuleType::Pwm, 8), 1500);
    }

    #[test]
    fn aio_mode_replaces_its_nibble() {
        let settings = ProtectedSettings::new();
        assert_eq!(settings.set_aio_mode(1, 1, AioMode::VoltageIn, |_| ()), Ok(0x0002));
        assert_eq!(settings.set_aio_mode(1, 3, AioMode::DigitalIn, |_| ()), Ok(0x0802));
        assert_eq!(settings.set_aio_mode(1, 1, AioMode::TemperatureIn, |_| ()), Ok(0x0807));
        assert!(settings.set_aio_mode(1, 5, AioMode::VoltageIn, |_| ()).is_err());
        assert!(settings.set_aio_mode(8, 1, AioMode::VoltageIn, |_| ()).is_err());
    }

    #[test]
    fn commit_sees_the_new_word_and_skips_rejected_values() {
        let settings = ProtectedSettings::new();
        let mut committed = Vec::new();
        settings
            .set_relay_inversion(1, 2, true, |word| committed.push(word))
            .unwrap();
        settings
            .set_relay_inversion(1, 17, true, |word| committed.push(word))
            .unwrap_err();
        settings
            .set_relay_inversion(1, 1, true, |word| committed.push(word))
            .unwrap();
        assert_eq!(committed, vec![0b10, 0b11]);
    }
}
