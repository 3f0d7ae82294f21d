use std::collections::BTreeMap;
use std::path::Path;

use bevy::log::info;
use bevy::math::Vec2;
use serde::Deserialize;

use crate::error::MapError;
use crate::geometry::Rect;

pub const DEFAULT_LEVEL_SIZE: [f32; 2] = [300.0, 1800.0];
pub const DEFAULT_SPAWN: [f32; 2] = [100.0, 1800.0 - 32.0];
pub const DEFAULT_CHECKPOINT: [f32; 2] = [100.0, 1800.0 - 64.0];

/// Map file as written by the level editor.
#[derive(Deserialize)]
struct MapFile {
    image: String,
    rects: Vec<[f32; 4]>,
    guard_pos: BTreeMap<String, GuardRecord>,
    #[serde(default)]
    checkpoints: Vec<[f32; 4]>,
    #[serde(default)]
    size: Option<[f32; 2]>,
    #[serde(default)]
    spawn: Option<[f32; 2]>,
    #[serde(default)]
    checkpoint: Option<[f32; 2]>,
}

#[derive(Deserialize)]
struct GuardRecord {
    pos: [f32; 2],
    delay: f32,
    f: PatrolFlag,
    #[serde(default)]
    speed: Option<f32>,
    #[serde(default)]
    distance: Option<f32>,
    #[serde(default)]
    range: Option<f32>,
}

/// The editor writes the pause flag either as a bool or as a number.
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum PatrolFlag {
    Bool(bool),
    Number(f64),
}

impl PatrolFlag {
    fn is_set(self) -> bool {
        match self {
            PatrolFlag::Bool(b) => b,
            PatrolFlag::Number(n) => n != 0.0,
        }
    }
}

/// Spawn record for one guard. Missing tuning values fall back to
/// [`GuardConfig`](crate::config::GuardConfig).
#[derive(Clone, Debug, PartialEq)]
pub struct GuardSpawn {
    pub id: String,
    /// Point the guard stands on (its feet).
    pub pos: Vec2,
    pub delay: f32,
    /// Wait `delay` seconds again at each end of the patrol.
    pub pause_at_bounds: bool,
    pub speed: Option<f32>,
    pub distance: Option<f32>,
    pub range: Option<f32>,
}

/// Static level geometry. Loaded once, never mutated afterwards.
#[derive(Clone, Debug)]
pub struct LevelMap {
    pub image: String,
    pub rects: Vec<Rect>,
    pub guards: Vec<GuardSpawn>,
    pub checkpoints: Vec<Rect>,
    pub size: Vec2,
    pub spawn: Vec2,
    pub checkpoint: Vec2,
}

impl LevelMap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_json_str(&contents, &path.display().to_string())?;
        info!(
            "[HiveBound] Loaded map {} ({} rects, {} guards)",
            path.display(),
            map.rects.len(),
            map.guards.len()
        );
        Ok(map)
    }

    /// `origin` names the source in error messages.
    pub fn from_json_str(contents: &str, origin: &str) -> Result<Self, MapError> {
        let file: MapFile = serde_json::from_str(contents).map_err(|source| MapError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: MapFile) -> Result<Self, MapError> {
        let rects = validate_rects(&file.rects)?;
        let checkpoints = validate_rects(&file.checkpoints)?;

        let size = file.size.unwrap_or(DEFAULT_LEVEL_SIZE);
        if !(size[0] > 0.0 && size[1] > 0.0) {
            return Err(MapError::InvalidSize(size));
        }

        let mut guards = Vec::with_capacity(file.guard_pos.len());
        for (id, record) in file.guard_pos {
            if !record.pos.iter().all(|v| v.is_finite()) {
                return Err(MapError::InvalidGuard {
                    id,
                    message: format!("non-finite position {:?}", record.pos),
                });
            }
            if record.delay.is_nan() || record.delay < 0.0 {
                return Err(MapError::InvalidGuard {
                    id,
                    message: format!("delay must be >= 0, got {}", record.delay),
                });
            }
            guards.push(GuardSpawn {
                id,
                pos: Vec2::from_array(record.pos),
                delay: record.delay,
                pause_at_bounds: record.f.is_set(),
                speed: record.speed,
                distance: record.distance,
                range: record.range,
            });
        }
        // Numeric ids sort numerically so "10" comes after "9".
        guards.sort_by(|a, b| {
            (a.id.parse::<i64>().ok(), &a.id).cmp(&(b.id.parse::<i64>().ok(), &b.id))
        });

        Ok(Self {
            image: file.image,
            rects,
            guards,
            checkpoints,
            size: Vec2::from_array(size),
            spawn: Vec2::from_array(file.spawn.unwrap_or(DEFAULT_SPAWN)),
            checkpoint: Vec2::from_array(file.checkpoint.unwrap_or(DEFAULT_CHECKPOINT)),
        })
    }

    /// Bounds of the playable area; leaving them counts as a fall.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.size.x, self.size.y)
    }

    /// True once `rect` is entirely below the level or past either side.
    /// Climbing above the top is not a fall.
    pub fn has_left(&self, rect: &Rect) -> bool {
        let bounds = self.bounds();
        rect.top() > bounds.bottom() || rect.right() < bounds.left() || rect.left() > bounds.right()
    }

    /// A climbable test level: alternating ledges 80px apart with walls
    /// either side and two guards high up.
    pub fn test_level() -> Self {
        let [width, height] = DEFAULT_LEVEL_SIZE;
        let mut rects = vec![
            Rect::new(0.0, height, width, 40.0),
            Rect::new(-40.0, -200.0, 40.0, height + 240.0),
            Rect::new(width, -200.0, 40.0, height + 240.0),
        ];
        let mut y = height - 80.0;
        let mut left = true;
        while y > 40.0 {
            let x = if left { 0.0 } else { 120.0 };
            rects.push(Rect::new(x, y, 180.0, 16.0));
            left = !left;
            y -= 80.0;
        }

        let guards = vec![
            GuardSpawn {
                id: "0".into(),
                pos: Vec2::new(10.0, 1080.0),
                delay: 1.0,
                pause_at_bounds: false,
                speed: None,
                distance: Some(130.0),
                range: None,
            },
            GuardSpawn {
                id: "1".into(),
                pos: Vec2::new(130.0, 520.0),
                delay: 0.5,
                pause_at_bounds: true,
                speed: None,
                distance: Some(130.0),
                range: None,
            },
        ];

        Self {
            image: String::new(),
            rects,
            guards,
            checkpoints: Vec::new(),
            size: Vec2::from_array(DEFAULT_LEVEL_SIZE),
            spawn: Vec2::from_array(DEFAULT_SPAWN),
            checkpoint: Vec2::from_array(DEFAULT_CHECKPOINT),
        }
    }
}

fn validate_rects(raw: &[[f32; 4]]) -> Result<Vec<Rect>, MapError> {
    raw.iter()
        .enumerate()
        .map(|(index, r)| {
            let rect = Rect::from(*r);
            if rect.is_valid() {
                Ok(rect)
            } else {
                Err(MapError::InvalidRect { index, rect: *r })
            }
        })
        .collect()
}
