//! Episode bookkeeping and the headless random-policy runner.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;
use serde::Serialize;

use crate::env::{HiveEnv, StepResult};
use crate::player::Action;

/// Totals for one finished (or cut-off) episode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub steps: u64,
    pub total_reward: f64,
    /// Highest point reached, as the smallest player-center y.
    pub best_y: f32,
    pub detections: u32,
    pub terminated: bool,
    pub truncated: bool,
}

impl EpisodeSummary {
    fn new(episode: u32) -> Self {
        Self {
            episode,
            steps: 0,
            total_reward: 0.0,
            best_y: f32::MAX,
            detections: 0,
            terminated: false,
            truncated: false,
        }
    }
}

/// Accumulates step results until the episode ends.
#[derive(Debug, Resource)]
pub struct EpisodeTracker {
    current: EpisodeSummary,
}

impl Default for EpisodeTracker {
    fn default() -> Self {
        Self {
            current: EpisodeSummary::new(0),
        }
    }
}

impl EpisodeTracker {
    pub fn begin(&mut self, episode: u32) {
        self.current = EpisodeSummary::new(episode);
    }

    pub fn current(&self) -> &EpisodeSummary {
        &self.current
    }

    /// Returns the summary once `result` ends the episode.
    pub fn record(&mut self, result: &StepResult) -> Option<EpisodeSummary> {
        let current = &mut self.current;
        current.steps += 1;
        current.total_reward += f64::from(result.reward);
        if let Some(&y) = result.observation.get(1) {
            current.best_y = current.best_y.min(y);
        }
        if result.info.get("detected").and_then(|v| v.as_bool()) == Some(true) {
            current.detections += 1;
        }
        current.terminated = result.terminated;
        current.truncated = result.truncated;
        result.done().then(|| current.clone())
    }
}

/// Resets `env` and plays one episode with `policy`, stopping after
/// `max_steps` even if the episode has not ended.
pub fn run_episode(
    env: &mut HiveEnv,
    seed: Option<u64>,
    max_steps: u64,
    mut policy: impl FnMut(&mut HiveEnv) -> Action,
) -> EpisodeSummary {
    env.reset(seed, None);
    let mut tracker = EpisodeTracker::default();
    tracker.begin(env.episode());
    for _ in 0..max_steps {
        let action = policy(env);
        let result = env.step(action);
        if let Some(summary) = tracker.record(&result) {
            return summary;
        }
    }
    tracker.current().clone()
}

/// The env driven by the running app.
#[derive(Resource, Deref, DerefMut)]
pub struct Simulation(pub HiveEnv);

#[derive(Resource, Clone, Debug)]
pub struct RolloutPlan {
    pub episodes: u32,
    pub max_steps: u64,
    /// Episode `i` is reset with `seed + i`.
    pub seed: Option<u64>,
}

impl Default for RolloutPlan {
    fn default() -> Self {
        Self {
            episodes: 5,
            max_steps: 10_000,
            seed: None,
        }
    }
}

/// Finished episode summaries. Clones share storage, so a handle kept
/// outside the app still reads the report after `App::run` has consumed it.
#[derive(Resource, Clone, Default, Debug)]
pub struct RolloutReport(Arc<Mutex<Vec<EpisodeSummary>>>);

impl RolloutReport {
    fn lock(&self) -> MutexGuard<'_, Vec<EpisodeSummary>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, summary: EpisodeSummary) {
        self.lock().push(summary);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn summaries(&self) -> Vec<EpisodeSummary> {
        self.lock().clone()
    }

    pub fn mean_return(&self) -> f64 {
        let summaries = self.lock();
        if summaries.is_empty() {
            return 0.0;
        }
        summaries.iter().map(|s| s.total_reward).sum::<f64>() / summaries.len() as f64
    }
}

/// Plays random-policy episodes without a window, one per frame, then
/// exits the app. Insert a [`RolloutReport`] before adding the plugin to
/// keep a handle on the results.
pub struct RolloutPlugin;

impl Plugin for RolloutPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RolloutPlan>()
            .init_resource::<RolloutReport>()
            .add_systems(Update, run_next_episode);
    }
}

fn run_next_episode(
    mut sim: ResMut<Simulation>,
    plan: Res<RolloutPlan>,
    report: Res<RolloutReport>,
    mut exit: EventWriter<AppExit>,
) {
    let done = report.len() as u64;
    if done >= u64::from(plan.episodes) {
        if !sim.is_closed() {
            info!(
                "[HiveBound] Rollout finished: {} episodes, mean return {:.1}",
                report.len(),
                report.mean_return()
            );
            sim.close();
        }
        exit.send(AppExit::Success);
        return;
    }

    let seed = plan.seed.map(|s| s.wrapping_add(done));
    let summary = run_episode(&mut sim.0, seed, plan.max_steps, HiveEnv::sample_action);
    info!(
        "[HiveBound] Episode {}: {} steps, return {:.1}, best y {:.0}, terminated {}, truncated {}",
        summary.episode,
        summary.steps,
        summary.total_reward,
        summary.best_y,
        summary.terminated,
        summary.truncated
    );
    report.push(summary);
}
