//! The engine facade: layers, mixer, scheduler, and chime behind one
//! explicitly owned surface.
//!
//! An `AudioEngine` is the session: it owns the node graph, the master
//! bus, every layer, and the virtual clock, and is created and disposed
//! explicitly rather than living in ambient global state. All mutations
//! run on the thread that owns the engine, in strict invocation order;
//! the only deferred work is virtual-time tasks fired from inside
//! `render_block`. The public surface never panics - failures come back
//! as `EngineError` or as drained `EngineEvent`s.

pub mod layer;
pub mod lifecycle;
pub mod message;
pub mod mixer;
pub mod scheduler;
pub mod voice;

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::Waveform,
    error::{EngineError, Result},
    graph::AudioGraph,
    profile::{Combination, TrackDescriptor},
    MAX_BLOCK_SIZE,
};

use self::{
    layer::Layer,
    lifecycle::{NodeRegistry, OwnerId},
    mixer::Mixer,
    scheduler::{Scheduler, TaskAction},
};

pub use self::message::{CommandReceiver, EngineCommand};

/// Settle time before a combination's staggered starts begin, giving the
/// stops it issued time to fade out of the output bus.
const DEFAULT_BASE_DELAY_SECS: f64 = 0.3;
const DEFAULT_VOICE_RAMP_SECS: f32 = 2.0;

const CHIME_PEAK: f32 = 0.3;
const CHIME_ATTACK_SECS: f32 = 0.1;
const CHIME_DECAY_SECS: f32 = 1.5;
const PROGRESS_TICK_SECS: f64 = 1.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    /// Delay before a combination's first start fires.
    pub base_delay_secs: f64,
    /// Attack ramp length for voice harmonics (click avoidance).
    pub voice_ramp_secs: f32,
    pub master_volume: f32,
    /// Autoplay policy: when true the engine starts suspended and
    /// `resume()` must be called from a user gesture before playback.
    pub require_gesture: bool,
    /// When false the host has no audio support and the engine degrades
    /// to a silent no-op.
    pub available: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            base_delay_secs: DEFAULT_BASE_DELAY_SECS,
            voice_ramp_secs: DEFAULT_VOICE_RAMP_SECS,
            master_volume: 0.7,
            require_gesture: false,
            available: true,
        }
    }
}

/// Notifications for the hosting application, drained via `take_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A duration-bound track reached its end and stopped on its own.
    PlaybackEnded { layer_id: String },
    /// Fired once per second while anything is playing.
    ProgressTick { elapsed_secs: f64 },
    /// Emitted once when the engine degraded to a silent no-op.
    ContextUnavailable,
}

struct ProgressClock {
    started_at: f64,
    next_tick: f64,
}

pub struct AudioEngine {
    config: EngineConfig,
    graph: AudioGraph,
    registry: NodeRegistry,
    mixer: Mixer,
    layers: BTreeMap<String, Layer>,
    combinations: BTreeMap<String, Combination>,
    scheduler: Scheduler,
    chimes: Vec<(OwnerId, f64)>,
    events: Vec<EngineEvent>,
    available: bool,
    suspended: bool,
    disposed: bool,
    current_combination: Option<String>,
    progress: Option<ProgressClock>,
}

impl AudioEngine {
    /// Build the session graph: master bus plus one persistent personal
    /// gain per track. Never panics; an unavailable host yields a silent
    /// engine that surfaces one `ContextUnavailable` event.
    pub fn new(
        config: EngineConfig,
        tracks: Vec<TrackDescriptor>,
        combinations: Vec<Combination>,
    ) -> Self {
        let mut graph = AudioGraph::new(config.sample_rate);
        let mixer = Mixer::new(&mut graph, config.master_volume);

        let mut layers = BTreeMap::new();
        for descriptor in tracks {
            let id = descriptor.id.clone();
            let layer = Layer::new(&mut graph, mixer.master(), descriptor);
            layers.insert(id, layer);
        }

        let combinations = combinations
            .into_iter()
            .map(|combo| (combo.name.clone(), combo))
            .collect();

        let mut events = Vec::new();
        if !config.available {
            tracing::warn!("audio unavailable on this host; engine is a silent no-op");
            events.push(EngineEvent::ContextUnavailable);
        }

        Self {
            available: config.available,
            suspended: config.require_gesture,
            disposed: false,
            config,
            graph,
            registry: NodeRegistry::new(),
            mixer,
            layers,
            combinations,
            scheduler: Scheduler::new(),
            chimes: Vec::new(),
            events,
            current_combination: None,
            progress: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Probe access to the live graph (node counts, gain values).
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    /// True while autoplay policy is holding playback back.
    pub fn needs_gesture(&self) -> bool {
        self.suspended
    }

    /// Unlock playback. Call from a genuine user-initiated event.
    pub fn resume(&mut self) {
        if self.suspended {
            tracing::debug!("engine resumed by user gesture");
            self.suspended = false;
        }
    }

    // ---- playback operations ---------------------------------------------

    pub fn start(&mut self, layer_id: &str) -> Result<()> {
        if self.silent() {
            return Ok(());
        }
        if self.suspended {
            return Err(EngineError::PlaybackBlocked);
        }
        self.start_layer(layer_id).map_err(surface)
    }

    pub fn stop(&mut self, layer_id: &str) -> Result<()> {
        if self.silent() {
            return Ok(());
        }
        let layer = self
            .layers
            .get_mut(layer_id)
            .ok_or_else(|| EngineError::UnknownLayer(layer_id.into()))?;
        layer.stop(&mut self.graph, &mut self.registry);
        self.settle_progress_clock();
        Ok(())
    }

    pub fn set_layer_volume(&mut self, layer_id: &str, volume: f32) -> Result<()> {
        let layer = self
            .layers
            .get_mut(layer_id)
            .ok_or_else(|| EngineError::UnknownLayer(layer_id.into()))?;
        layer.set_volume(&mut self.graph, volume);
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.mixer.set_master_volume(&mut self.graph, volume);
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.mixer.set_mute(&mut self.graph, muted);
    }

    pub fn master_volume(&self) -> f32 {
        self.mixer.master_volume()
    }

    pub fn is_muted(&self) -> bool {
        self.mixer.is_muted()
    }

    pub fn layer_volume(&self, layer_id: &str) -> Option<f32> {
        self.layers.get(layer_id).map(Layer::volume)
    }

    pub fn playing_layers(&self) -> Vec<String> {
        self.layers
            .values()
            .filter(|layer| layer.is_playing())
            .map(|layer| layer.id().to_string())
            .collect()
    }

    pub fn current_combination(&self) -> Option<&str> {
        self.current_combination.as_deref()
    }

    /// Apply a named combination: invalidate every pending scheduled
    /// start, stop playing layers the combination does not reference, and
    /// schedule the combination's layers at `now + base_delay + offset`.
    pub fn apply_combination(&mut self, name: &str) -> Result<()> {
        if self.silent() {
            return Ok(());
        }
        if self.suspended {
            return Err(EngineError::PlaybackBlocked);
        }
        let combo = self
            .combinations
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCombination(name.into()))?;

        let generation = self.scheduler.bump_generation();
        tracing::debug!(combination = name, generation, "applying combination");

        for layer in self.layers.values_mut() {
            let referenced = combo.entries.iter().any(|e| e.layer_id == layer.id());
            if layer.is_playing() && !referenced {
                layer.stop(&mut self.graph, &mut self.registry);
            }
        }

        let now = self.graph.now();
        for entry in &combo.entries {
            let fire_at = now + self.config.base_delay_secs + entry.offset_secs.max(0.0) as f64;
            self.scheduler
                .schedule(fire_at, TaskAction::StartLayer(entry.layer_id.clone()));
        }

        self.current_combination = Some(combo.name);
        Ok(())
    }

    /// Stop everything: invalidate pending starts, stop every playing
    /// layer immediately, clear the current-combination indicator.
    pub fn stop_all(&mut self) {
        self.scheduler.bump_generation();
        for layer in self.layers.values_mut() {
            layer.stop(&mut self.graph, &mut self.registry);
        }
        self.current_combination = None;
        self.settle_progress_clock();
    }

    /// Fire-and-forget interval chime: one oscillator and one gain routed
    /// straight into the master bus (unaffected by layer volumes), ramped
    /// up over 0.1 s, decayed over 1.5 s, then reaped automatically.
    pub fn play_chime(&mut self, frequency: f32) -> Result<()> {
        if self.silent() {
            return Ok(());
        }
        if self.suspended {
            return Err(EngineError::PlaybackBlocked);
        }

        let owner = self.registry.new_owner();
        match self.build_chime(owner, frequency) {
            Ok(ends_at) => {
                self.chimes.push((owner, ends_at));
                Ok(())
            }
            Err(err) => {
                let released = self.registry.release(owner, &mut self.graph);
                tracing::warn!(%err, released, "chime build failed, partial graph released");
                Err(surface(err))
            }
        }
    }

    fn build_chime(&mut self, owner: OwnerId, frequency: f32) -> Result<f64> {
        let oscillator = self.graph.create_oscillator(Waveform::Sine, frequency)?;
        self.registry.track(owner, oscillator);
        let gain = self.graph.create_gain(0.0);
        self.registry.track(owner, gain);

        self.graph.connect(oscillator, gain)?;
        self.graph.connect(gain, self.mixer.master())?;
        self.graph
            .ramp_gain_linear(gain, CHIME_PEAK, CHIME_ATTACK_SECS);
        self.graph
            .decay_gain_exponential(gain, 0.0, CHIME_DECAY_SECS - CHIME_ATTACK_SECS);
        self.graph.start_oscillator(oscillator)?;

        let ends_at = self.graph.now() + CHIME_DECAY_SECS as f64;
        self.graph.stop_oscillator_at(oscillator, ends_at);
        Ok(ends_at)
    }

    // ---- events and commands ---------------------------------------------

    /// Drain pending notifications for the host UI.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply queued commands in FIFO order. Errors are logged, not
    /// propagated: a remote control surface cannot handle them anyway.
    pub fn drain_commands<R: CommandReceiver>(&mut self, rx: &mut R) {
        while let Some(command) = rx.pop() {
            let result = match command {
                EngineCommand::Start(id) => self.start(&id),
                EngineCommand::Stop(id) => self.stop(&id),
                EngineCommand::SetLayerVolume(id, v) => self.set_layer_volume(&id, v),
                EngineCommand::SetMasterVolume(v) => {
                    self.set_master_volume(v);
                    Ok(())
                }
                EngineCommand::SetMute(muted) => {
                    self.set_mute(muted);
                    Ok(())
                }
                EngineCommand::ApplyCombination(name) => self.apply_combination(&name),
                EngineCommand::StopAll => {
                    self.stop_all();
                    Ok(())
                }
                EngineCommand::PlayChime(freq) => self.play_chime(freq),
                EngineCommand::Resume => {
                    self.resume();
                    Ok(())
                }
            };
            if let Err(err) = result {
                tracing::warn!(%err, "engine command failed");
            }
        }
    }

    // ---- rendering -------------------------------------------------------

    /// Render one block of output and advance the session: fire due
    /// scheduled starts, end duration-bound tracks, reap expired chimes,
    /// and emit progress ticks.
    pub fn render_block(&mut self, out: &mut [f32]) {
        if self.disposed {
            out.fill(0.0);
            return;
        }
        debug_assert!(out.len() <= MAX_BLOCK_SIZE);

        let now = self.graph.now();

        for action in self.scheduler.take_due(now) {
            match action {
                TaskAction::StartLayer(id) => {
                    if let Err(err) = self.start_layer(&id) {
                        tracing::warn!(%err, layer = %id, "scheduled start failed");
                    }
                }
            }
        }

        let ended: Vec<String> = self
            .layers
            .values()
            .filter(|layer| matches!(layer.ends_at, Some(t) if t <= now))
            .map(|layer| layer.id().to_string())
            .collect();
        for id in ended {
            if let Some(layer) = self.layers.get_mut(&id) {
                layer.stop(&mut self.graph, &mut self.registry);
            }
            self.events
                .push(EngineEvent::PlaybackEnded { layer_id: id });
        }
        if !self.events.is_empty() {
            self.settle_progress_clock();
        }

        let mut expired = Vec::new();
        self.chimes.retain(|&(owner, ends_at)| {
            if ends_at <= now {
                expired.push(owner);
                false
            } else {
                true
            }
        });
        for owner in expired {
            self.registry.release(owner, &mut self.graph);
        }

        if let Some(progress) = &mut self.progress {
            while now >= progress.next_tick {
                self.events.push(EngineEvent::ProgressTick {
                    elapsed_secs: progress.next_tick - progress.started_at,
                });
                progress.next_tick += PROGRESS_TICK_SECS;
            }
        }

        self.graph.render_block(out);
    }

    /// Tear down the session: stop everything, release every node, and
    /// go permanently silent. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.stop_all();
        self.scheduler.clear();
        self.registry.release_all(&mut self.graph);
        for id in self.layers.values().map(Layer::gain_node).collect::<Vec<_>>() {
            self.graph.remove(id);
        }
        self.graph.remove(self.mixer.master());
        self.disposed = true;
        tracing::debug!("engine disposed");
    }

    // ---- internals -------------------------------------------------------

    fn silent(&self) -> bool {
        !self.available || self.disposed
    }

    fn start_layer(&mut self, layer_id: &str) -> Result<()> {
        let layer = self
            .layers
            .get_mut(layer_id)
            .ok_or_else(|| EngineError::UnknownLayer(layer_id.into()))?;
        let now = self.graph.now();
        layer.start(
            &mut self.graph,
            &mut self.registry,
            self.config.voice_ramp_secs,
            now,
        )?;
        if self.progress.is_none() {
            self.progress = Some(ProgressClock {
                started_at: now,
                next_tick: now + PROGRESS_TICK_SECS,
            });
        }
        Ok(())
    }

    /// Drop the progress clock once nothing is playing.
    fn settle_progress_clock(&mut self) {
        if !self.layers.values().any(Layer::is_playing) {
            self.progress = None;
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Public-surface error policy: partial build failures have already been
/// torn down by the time they reach the caller, and are reported as the
/// host-level condition they imply.
fn surface(err: EngineError) -> EngineError {
    match err {
        EngineError::NodeCreation { .. } => EngineError::ContextUnavailable,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CombinationEntry, TrackSource, VoiceProfile};

    fn track(id: &str) -> TrackDescriptor {
        TrackDescriptor {
            id: id.into(),
            display_name: id.into(),
            category: "tones".into(),
            source: TrackSource::Synth {
                base_frequency_hz: 200.0,
            },
            profile: VoiceProfile::pure_tone(),
            default_volume: 0.8,
            duration_secs: None,
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: 1_000.0,
            block_size: 50,
            ..EngineConfig::default()
        }
    }

    fn engine_with(config: EngineConfig) -> AudioEngine {
        AudioEngine::new(
            config,
            vec![track("alpha"), track("beta")],
            vec![Combination {
                name: "calm".into(),
                entries: vec![CombinationEntry {
                    layer_id: "alpha".into(),
                    offset_secs: 0.0,
                }],
            }],
        )
    }

    #[test]
    fn unknown_ids_return_typed_errors() {
        let mut engine = engine_with(config());

        assert!(matches!(
            engine.start("nope"),
            Err(EngineError::UnknownLayer(_))
        ));
        assert!(matches!(
            engine.apply_combination("nope"),
            Err(EngineError::UnknownCombination(_))
        ));
    }

    #[test]
    fn suspended_engine_blocks_until_resume() {
        let mut engine = engine_with(EngineConfig {
            require_gesture: true,
            ..config()
        });

        assert!(engine.needs_gesture());
        assert!(matches!(
            engine.start("alpha"),
            Err(EngineError::PlaybackBlocked)
        ));
        assert!(matches!(
            engine.play_chime(432.0),
            Err(EngineError::PlaybackBlocked)
        ));

        engine.resume();
        assert!(!engine.needs_gesture());
        engine.start("alpha").unwrap();
        assert_eq!(engine.playing_layers(), vec!["alpha".to_string()]);
    }

    #[test]
    fn unavailable_engine_is_a_silent_noop_with_one_notice() {
        let mut engine = engine_with(EngineConfig {
            available: false,
            ..config()
        });

        engine.start("alpha").unwrap();
        engine.apply_combination("calm").unwrap();
        engine.play_chime(432.0).unwrap();

        assert!(engine.playing_layers().is_empty());
        let events = engine.take_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, EngineEvent::ContextUnavailable))
                .count(),
            1
        );
        assert!(engine.take_events().is_empty(), "notice fires exactly once");
    }

    #[test]
    fn applying_a_combination_records_it_as_current() {
        let mut engine = engine_with(config());

        engine.apply_combination("calm").unwrap();
        assert_eq!(engine.current_combination(), Some("calm"));

        engine.stop_all();
        assert_eq!(engine.current_combination(), None);
    }

    #[test]
    fn dispose_releases_every_node() {
        let mut engine = engine_with(config());
        engine.start("alpha").unwrap();
        engine.play_chime(432.0).unwrap();

        engine.dispose();

        assert_eq!(engine.graph().node_count(), 0);
        // Disposed engines stay silent and safe.
        engine.start("alpha").unwrap();
        assert!(engine.playing_layers().is_empty());
    }
}
