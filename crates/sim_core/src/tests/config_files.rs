//! Integration tests for loading engine configuration from disk

use std::path::PathBuf;

use crate::config::{Config, ConfigError};
use crate::core::config::EngineConfig;
use crate::foundation::math::{Rect, Vec2};
use crate::render::{Camera, RecordingContext};
use crate::{Engine, EngineError};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("sim_core_it_{}_{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_toml_file() {
        let path = temp_file(
            "arena.toml",
            r#"
[loop]
target_fps = 30
time_scale = 0.5

[physics]
gravity = [0.0, 0.0]
restitution = 1.0

[physics.world_bounds]
x = 0.0
y = 0.0
width = 640.0
height = 480.0

[camera]
zoom = 2.0
"#,
        );

        let engine = Engine::from_config_file(&path, RecordingContext::new()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(engine.config().frame_loop.target_fps, 30);
        assert_eq!(engine.scheduler().time_scale(), 0.5);
        assert_eq!(engine.physics().gravity(), Vec2::zeros());
        assert_eq!(engine.physics().world_bounds(), Some(Rect::new(0.0, 0.0, 640.0, 480.0)));
        assert_eq!(engine.render().camera().zoom(), 2.0);
        // Untouched values keep their defaults
        assert_eq!(engine.config().physics.air_resistance, 0.98);
    }

    #[test]
    fn test_engine_from_ron_file() {
        let mut config = EngineConfig::default();
        config.physics.priority = 5;
        config.render.culling = false;

        let path = std::env::temp_dir().join(format!("sim_core_it_{}_saved.ron", std::process::id()));
        config.save_to_file(&path).unwrap();
        let engine = Engine::from_config_file(&path, RecordingContext::new()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(engine.config(), &config);
        assert!(!engine.render().config().culling);
    }

    #[test]
    fn test_invalid_values_in_file_are_rejected() {
        let path = temp_file("broken.toml", "[camera]\nmin_zoom = 3.0\nmax_zoom = 1.0\n");

        let result = Engine::from_config_file(&path, RecordingContext::new());
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(EngineError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_malformed_file_reports_parse_error() {
        let path = temp_file("garbage.toml", "[loop\ntime_scale = ");

        let result = EngineConfig::load_from_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
