use bevy::log::LogPlugin;
use bevy::prelude::*;
use hivebound::config::HiveConfig;
use hivebound::rollout::{RolloutPlan, RolloutPlugin, RolloutReport, Simulation};
use hivebound::viewer::{Policy, ViewerPlugin};
use hivebound::HiveEnv;

const USAGE: &str = "usage: hivebound [--headless] [--random] [--episodes N] [--max-steps N] \
                     [--seed S] [--config PATH] [--map PATH]";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    headless: bool,
    random: bool,
    episodes: Option<u32>,
    max_steps: Option<u64>,
    seed: Option<u64>,
    config: Option<String>,
    map: Option<String>,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--headless" => cli.headless = true,
            "--random" => cli.random = true,
            "--episodes" => cli.episodes = Some(parse_number("--episodes", &value("--episodes")?)?),
            "--max-steps" => {
                cli.max_steps = Some(parse_number("--max-steps", &value("--max-steps")?)?)
            }
            "--seed" => cli.seed = Some(parse_number("--seed", &value("--seed")?)?),
            "--config" => cli.config = Some(value("--config")?),
            "--map" => cli.map = Some(value("--map")?),
            other => return Err(format!("unknown argument {other}")),
        }
    }
    Ok(cli)
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{flag} expects a number, got {raw}"))
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("[HiveBound] {e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    // An explicit --config must load; the startup file may fall back to defaults.
    let mut config = match &cli.config {
        Some(path) => match HiveConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("[HiveBound] {e}");
                std::process::exit(2);
            }
        },
        None => HiveConfig::load_startup(),
    };
    if let Some(map) = &cli.map {
        config.map_path = map.clone();
    }

    let mut app = App::new();
    if cli.headless {
        app.add_plugins((MinimalPlugins, LogPlugin::default()));
        info!("[HiveBound] Starting in HEADLESS mode");
    } else {
        let window = &config.window;
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: window.title.clone(),
                resolution: (window.width, window.height).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        let bg = window.background_color;
        app.insert_resource(ClearColor(Color::srgb(bg[0], bg[1], bg[2])));
        info!("[HiveBound] Starting in WINDOWED mode");
    }

    let tick_hz = config.tick_hz;
    let env = match HiveEnv::from_config(config) {
        Ok(env) => env,
        Err(e) => {
            error!("[HiveBound] {e}");
            std::process::exit(2);
        }
    };
    app.insert_resource(Simulation(env));

    let report = RolloutReport::default();
    if cli.headless {
        let defaults = RolloutPlan::default();
        app.insert_resource(report.clone())
            .add_plugins(RolloutPlugin)
            .insert_resource(RolloutPlan {
                episodes: cli.episodes.unwrap_or(defaults.episodes),
                max_steps: cli.max_steps.unwrap_or(defaults.max_steps),
                seed: cli.seed,
            });
    } else {
        let policy = if cli.random {
            Policy::Random
        } else {
            Policy::Keyboard
        };
        app.insert_resource(Time::<Fixed>::from_hz(f64::from(tick_hz)))
            .add_plugins(ViewerPlugin {
                policy,
                seed: cli.seed,
            });
    }

    app.run();

    // `run` leaves an empty app behind; read the report through the shared handle.
    if cli.headless {
        match serde_json::to_string_pretty(&report.summaries()) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("[HiveBound] Failed to serialize report: {e}"),
        }
    }
}
