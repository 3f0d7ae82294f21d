use bevy::math::Vec2;
use hivebound::config::HiveConfig;
use hivebound::env::{ActionSpace, EpisodeState, HiveEnv, ResetOptions};
use hivebound::error::MapError;
use hivebound::render::{FrameRecorder, PLAYER};
use hivebound::{Action, HiveError, LevelMap};

fn bundled_config() -> HiveConfig {
    HiveConfig {
        map_path: format!("{}/assets/map/map.json", env!("CARGO_MANIFEST_DIR")),
        ..Default::default()
    }
}

#[test]
fn bundled_map_loads_and_plays() {
    let mut env = HiveEnv::from_config(bundled_config()).expect("bundled map loads");
    assert_eq!(env.map().guards.len(), 3);
    assert_eq!(env.map().checkpoints.len(), 2);
    assert_eq!(env.action_space(), ActionSpace { n: 5 });
    assert_eq!(env.observation_space().shape, 2);

    let (obs, info) = env.reset(Some(0), None);
    assert_eq!(obs.len(), 2);
    assert_eq!(info["episode"], 1);

    for _ in 0..100 {
        let action = env.sample_action();
        let result = env.step(action);
        assert_eq!(result.observation.len(), 2);
        for key in ["step", "episode", "detected", "respawned", "checkpoint_reached"] {
            assert!(result.info.contains_key(key), "missing info key {key}");
        }
        if result.done() {
            break;
        }
    }
}

#[test]
fn step_counter_and_episode_counter_follow_resets() {
    let mut env = HiveEnv::new(LevelMap::test_level(), HiveConfig::default()).expect("valid env");
    env.reset(None, None);
    let result = env.step(Action::None);
    assert_eq!(result.info["step"], 1);
    let result = env.step(3_i64);
    assert_eq!(result.info["step"], 2);
    assert_eq!(env.state(), EpisodeState::Running);

    env.reset(None, None);
    let result = env.step(Action::None);
    assert_eq!(result.info["step"], 1);
    assert_eq!(result.info["episode"], 2);
}

#[test]
fn reset_option_overrides_checkpoint_for_one_episode() {
    let mut env = HiveEnv::new(LevelMap::test_level(), HiveConfig::default()).expect("valid env");
    let (obs, _) = env.reset(
        None,
        Some(ResetOptions {
            checkpoint: Some(Vec2::new(220.0, 1736.0)),
        }),
    );
    assert_eq!(obs, vec![236.0, 1752.0]);
    let (obs, _) = env.reset(None, None);
    assert_eq!(obs, vec![116.0, 1752.0]);
}

#[test]
fn camera_brings_the_player_into_view() {
    let mut env = HiveEnv::new(LevelMap::test_level(), HiveConfig::default()).expect("valid env");
    env.reset(None, None);
    let mut frame = FrameRecorder::new(Vec2::new(600.0, 600.0));
    env.render(&mut frame);
    // The camera starts at the top of the level, far above the player.
    assert_eq!(frame.rects_with_color(PLAYER).count(), 0);
    for _ in 0..90 {
        env.step(Action::None);
        frame.commands.clear();
        env.render(&mut frame);
    }
    assert_eq!(frame.rects_with_color(PLAYER).count(), 1);
}

#[test]
fn missing_map_is_a_construction_error() {
    let config = HiveConfig {
        map_path: "/no/such/dir/map.json".to_string(),
        ..Default::default()
    };
    let err = HiveEnv::from_config(config).err().expect("construction fails");
    assert!(matches!(err, HiveError::Map(MapError::Io { .. })));
}

#[test]
fn malformed_map_file_is_a_construction_error() {
    let path = std::env::temp_dir().join(format!("hivebound-bad-map-{}.json", std::process::id()));
    std::fs::write(&path, r#"{"image": "x", "rects": [[0, 0, 10]], "guard_pos": {}}"#)
        .expect("write temp map");
    let config = HiveConfig {
        map_path: path.display().to_string(),
        ..Default::default()
    };
    let err = HiveEnv::from_config(config).err().expect("construction fails");
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, HiveError::Map(MapError::Parse { .. })));
}

#[test]
fn invalid_config_is_rejected_by_the_constructor() {
    let mut config = HiveConfig::default();
    config.env.stagnation_budget = 0.0;
    let err = HiveEnv::new(LevelMap::test_level(), config).err().expect("invalid config");
    assert!(matches!(err, HiveError::Config(_)));
}
