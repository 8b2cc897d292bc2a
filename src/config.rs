// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::info;

mod engine;
mod error;
mod params;

pub use engine::Engine;
pub use error::ConfigError;
pub use params::{
    Params, LFO_HZ, LFO_PERCENT, LPF_KHZ, PITCH_SEMITONES, Q_DEVIATION, VOLUME_DB, WALK_KMH,
};

/// Prefix of environment overrides, e.g. `FOOTFALL__ENGINE__BLOCK_SIZE=512`.
const ENV_PREFIX: &str = "FOOTFALL";

/// The full configuration file.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    engine: Engine,
    #[serde(default)]
    params: Params,
}

impl Settings {
    pub fn new(engine: Engine, params: Params) -> Settings {
        Settings { engine, params }
    }

    /// Loads settings from an optional YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!(path = ?path, "Loading settings.");
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.engine.validate()?;
        Ok(settings)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use config::{Config, File, FileFormat};

    use super::{ConfigError, Settings};
    use crate::playback::{step_frames_for_speed, PlayParams};

    fn parse(yaml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults() {
        let settings = parse("{}");
        assert_eq!(settings.engine().device(), "default");
        assert_eq!(settings.engine().sample_rate(), 48000);
        assert_eq!(settings.engine().block_size(), 256);
        assert_eq!(settings.engine().clips(), PathBuf::from("clips"));
        assert!(!settings.engine().preload());
        assert_eq!(
            settings.params().to_play_params(48000),
            PlayParams::new(48000)
        );
    }

    #[test]
    fn full_file() {
        let settings = parse(
            r#"
            engine:
              device: mock-device
              clips: /srv/steps
              sample_rate: 44100
              block_size: 512
              preload: true
              seed: 42
            params:
              walk: 6
              pitch: 3
              volume: 20
              lpf: 5
              q: 2
              lfo: true
              lfo_rate: 4
              lfo_depth: 50
              distortion: true
              fadeout: false
            "#,
        );
        let engine = settings.engine();
        assert_eq!(engine.device(), "mock-device");
        assert_eq!(engine.clips(), PathBuf::from("/srv/steps"));
        assert_eq!(engine.sample_rate(), 44100);
        assert_eq!(engine.block_size(), 512);
        assert!(engine.preload());
        assert_eq!(engine.seed(), Some(42));

        let params = settings.params().to_play_params(44100);
        assert_eq!(params.step_frames, step_frames_for_speed(44100, 6.0));
        assert_eq!(params.pitch_deviation, 3.0);
        assert!((params.volume_floor - 0.1).abs() < 1e-6);
        assert_eq!(params.lpf_freq_deviation, 5000.0);
        assert_eq!(params.lpf_q_deviation, 2.0);
        assert!(params.lfo_enabled);
        assert_eq!(params.lfo_rate, 4.0);
        assert_eq!(params.lfo_depth, 0.5);
        assert!(params.distortion);
        assert!(!params.fadeout);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let settings = parse(
            r#"
            params:
              walk: 40
              pitch: -3
              lpf: 25
              lfo: true
              lfo_rate: 0.1
              lfo_depth: 300
            "#,
        );
        let params = settings.params();
        assert_eq!(params.walk(), 12.0);
        assert_eq!(params.pitch(), 0.0);
        assert_eq!(params.lpf(), 19.0);
        assert_eq!(params.lfo(), Some((1.0, 100.0)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("footfall.yaml");
        fs::write(&path, "engine:\n  block_size: 128\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.engine().block_size(), 128);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("footfall.yaml");
        fs::write(&path, "engine:\n  sample_rate: 0\n").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(ConfigError::Invalid { .. })
        ));

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            Settings::load(Some(&missing)),
            Err(ConfigError::Load(_))
        ));
    }
}
