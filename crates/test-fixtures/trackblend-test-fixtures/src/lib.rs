use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use trackblend_core::{
    BlendConfig, BlendSession, BlendSnapshot, BlendState, DriveKey, DriveSnapshot,
};

pub mod host;

pub use host::{run_frame, run_timers, HostOp, HostProbe, RecordingHost};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    presets: HashMap<String, String>,
    scenarios: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let raw = read_to_string(rel)?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse fixture {rel}"))
}

/// Names of every config preset in the manifest.
pub fn preset_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = MANIFEST.presets.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Names of every scenario in the manifest.
pub fn scenario_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = MANIFEST.scenarios.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Load and validate a named config preset.
pub fn preset(name: &str) -> Result<BlendConfig> {
    let rel = MANIFEST
        .presets
        .get(name)
        .ok_or_else(|| anyhow!("unknown preset '{name}'"))?;
    let raw = read_to_string(rel)?;
    BlendConfig::from_json(&raw).with_context(|| format!("preset '{name}' is invalid"))
}

/// State kinds as written in scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedState {
    Tracked,
    RampingDown,
    Overridden,
    RampingUp,
}

impl ExpectedState {
    pub fn matches(self, state: &BlendState) -> bool {
        matches!(
            (self, state),
            (ExpectedState::Tracked, BlendState::Tracked)
                | (ExpectedState::RampingDown, BlendState::RampingDown { .. })
                | (ExpectedState::Overridden, BlendState::Overridden)
                | (ExpectedState::RampingUp, BlendState::RampingUp { .. })
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameSpec {
    pub dt: f32,
    #[serde(default = "one")]
    pub repeat: u32,
    pub tracking_valid: bool,
    #[serde(default)]
    pub drive: HashMap<String, f32>,
}

fn one() -> u32 {
    1
}

impl FrameSpec {
    pub fn snapshot(&self) -> Result<DriveSnapshot> {
        let mut snap = DriveSnapshot {
            tracking_valid: self.tracking_valid,
            ..DriveSnapshot::default()
        };
        for (name, magnitude) in &self.drive {
            let key: DriveKey = serde_json::from_value(serde_json::Value::String(name.clone()))
                .with_context(|| format!("unknown drive key '{name}'"))?;
            snap.set(key, *magnitude);
        }
        Ok(snap)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Expectation {
    pub state: ExpectedState,
    pub weight: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub preset: String,
    pub frames: Vec<FrameSpec>,
    pub expect: Expectation,
}

/// Result of replaying a scenario against a fresh session.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub final_snapshot: BlendSnapshot,
    /// Weight after every frame.
    pub weights: Vec<f32>,
    pub max_live_timers: usize,
    pub arms_while_live: usize,
    /// Live timers left after the session was dropped.
    pub live_after_teardown: usize,
}

impl Scenario {
    pub fn config(&self) -> Result<BlendConfig> {
        preset(&self.preset)
    }

    /// Replay every frame through a session on a [`RecordingHost`].
    pub fn run(&self) -> Result<ScenarioOutcome> {
        let (host, probe) = RecordingHost::new();
        let mut session = BlendSession::activate(host, self.config()?)?;
        let mut weights = Vec::new();
        for frame in &self.frames {
            probe.set_input(frame.snapshot()?);
            for _ in 0..frame.repeat {
                run_frame(&mut session, frame.dt);
                weights.push(session.weight().get());
            }
        }
        let final_snapshot = session.snapshot();
        drop(session);
        Ok(ScenarioOutcome {
            final_snapshot,
            weights,
            max_live_timers: probe.max_live_timers(),
            arms_while_live: probe.arms_while_live(),
            live_after_teardown: probe.live_timers(),
        })
    }
}

/// Load a named scenario from the manifest.
pub fn scenario(name: &str) -> Result<Scenario> {
    let rel = MANIFEST
        .scenarios
        .get(name)
        .ok_or_else(|| anyhow!("unknown scenario '{name}'"))?;
    load_json(rel)
}
