//! Offline rendering of an emitter orbiting the listener.

use anyhow::{Context, Result};
use audio::{forward_events, Engine};
use dsp_core::{NodeEvent, SampleBlock};
use filter::EqualizerKernel;
use log::{debug, info, warn};
use playback::{ClipPlayerKernel, ClipPlayerParameters, ClipSource, NoiseSource, SampleSource};
use settings_manager::Settings;
use spatial::positioning::Vec3;
use spatial::{spatialize, Listener, Spatializer, SpatializerKernel};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Distance between the ears, in meters
const EAR_DISTANCE: f32 = 0.18;
const TONE_AMPLITUDE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    /// Sine clip lasting the whole render
    Tone,
    /// Endless white noise
    Noise,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub seconds: f32,
    pub source: SourceKind,
    pub frequency: f32,
    /// Orbit radius in meters
    pub radius: f32,
    /// Time for one full orbit
    pub orbit_seconds: f32,
    pub output: Option<PathBuf>,
}

/// Per-second levels of a render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// (left, right) RMS of each started second
    pub rms: Vec<(f32, f32)>,
    pub frames: usize,
    pub events: Vec<NodeEvent>,
}

/// Accumulates per-second RMS of the first two channels
struct LevelMeter {
    frames_per_window: usize,
    frames: usize,
    sums: (f64, f64),
    windows: Vec<(f32, f32)>,
}

impl LevelMeter {
    fn new(sample_rate: u32) -> Self {
        Self {
            frames_per_window: sample_rate as usize,
            frames: 0,
            sums: (0.0, 0.0),
            windows: Vec::new(),
        }
    }

    fn push(&mut self, left: &[f32], right: &[f32]) {
        for (l, r) in left.iter().zip(right) {
            self.sums.0 += (*l as f64) * (*l as f64);
            self.sums.1 += (*r as f64) * (*r as f64);
            self.frames += 1;
            if self.frames == self.frames_per_window {
                self.close();
            }
        }
    }

    fn close(&mut self) {
        if self.frames == 0 {
            return;
        }
        let n = self.frames as f64;
        self.windows
            .push(((self.sums.0 / n).sqrt() as f32, (self.sums.1 / n).sqrt() as f32));
        self.frames = 0;
        self.sums = (0.0, 0.0);
    }

    fn finish(mut self) -> Vec<(f32, f32)> {
        self.close();
        self.windows
    }
}

/// Emitter position on a horizontal circle, starting straight ahead and
/// moving towards the right
pub fn orbit_position(radius: f32, orbit_seconds: f32, time: f32) -> Vec3 {
    let angle = 2.0 * std::f32::consts::PI * time / orbit_seconds.max(f32::EPSILON);
    [radius * angle.sin(), 0.0, radius * angle.cos()]
}

fn make_source(options: &RenderOptions, sample_rate: u32) -> Box<dyn SampleSource> {
    match options.source {
        SourceKind::Tone => Box::new(ClipSource::tone(
            options.frequency,
            TONE_AMPLITUDE,
            options.seconds,
            sample_rate,
        )),
        SourceKind::Noise => Box::new(NoiseSource::new(1, 0.0)),
    }
}

/// Run clip player -> spatializer -> equalizer for `options.seconds`
pub async fn render(settings: &Settings, options: &RenderOptions) -> Result<RenderReport> {
    settings.validate()?;
    let engine_config = settings.engine_config();
    let (mut engine, events) = Engine::new(engine_config)?;

    let source = make_source(options, settings.sample_rate);
    let mut player = engine.add_node(ClipPlayerKernel::new(
        source,
        settings.pull_buffer_frames,
        settings.block_size,
    ));
    player.publish(ClipPlayerParameters::default())?;

    let spatializer = Spatializer::new(
        settings.spatializer.clone(),
        settings.sample_rate,
        settings.max_delay_samples,
    );
    let spatial_handle = engine.add_node(SpatializerKernel::new(spatializer));

    let mut equalizer = engine.add_node(EqualizerKernel::new(settings.channels));
    equalizer.publish(settings.equalizer.clamped(settings.sample_rate))?;

    let (tx, mut rx) = mpsc::channel(16);
    let forwarder = forward_events(events, Duration::from_millis(10), tx);

    let settings_copy = settings.clone();
    let options_copy = options.clone();
    let (frames, rms) = tokio::task::spawn_blocking(move || {
        run_blocks(&mut engine, spatial_handle, &settings_copy, &options_copy)
    })
    .await
    .context("render thread panicked")??;

    // Give the forwarder a chance to flush the last events
    let mut received = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
        info!("Engine event: {:?}", event);
        received.push(event);
    }
    drop(rx);
    if let Err(e) = forwarder.await {
        warn!("Event forwarder failed: {}", e);
    }

    Ok(RenderReport {
        rms,
        frames,
        events: received,
    })
}

fn run_blocks(
    engine: &mut Engine,
    mut spatial_handle: audio::NodeHandle<spatial::SpatializerParameters>,
    settings: &Settings,
    options: &RenderOptions,
) -> Result<(usize, Vec<(f32, f32)>)> {
    let sample_rate = settings.sample_rate;
    let block_size = settings.block_size;
    let total_frames = (options.seconds.max(0.0) * sample_rate as f32).ceil() as usize;
    let blocks = (total_frames + block_size - 1) / block_size;

    let frames_per_update = settings.kernel_update_ms as usize * sample_rate as usize / 1000;
    let blocks_per_update = (frames_per_update / block_size).max(1);

    let listener = Listener::from_head(
        [0.0; 3],
        [0.0, 1.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0],
        EAR_DISTANCE,
    );

    let mut writer = match &options.output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {:?}", path))?,
        )),
        None => None,
    };

    let input = SampleBlock::new(settings.channels, block_size);
    let mut output = SampleBlock::new(settings.channels, block_size);
    let mut interleaved = Vec::with_capacity(settings.channels * block_size);
    let mut meter = LevelMeter::new(sample_rate);

    info!(
        "Rendering {} blocks of {} frames ({:?} source, radius {} m)",
        blocks, block_size, options.source, options.radius
    );

    for block in 0..blocks {
        if block % blocks_per_update == 0 {
            let time = (block * block_size) as f32 / sample_rate as f32;
            let emitter = orbit_position(options.radius, options.orbit_seconds, time);
            let parameters = spatialize(&listener, emitter, sample_rate, &settings.spatializer);
            if let Err(e) = spatial_handle.publish(parameters) {
                debug!("Skipped spatializer update: {}", e);
            }
        }

        engine.process_block(&input, &mut output)?;
        meter.push(output.channel(0), output.channel(1));

        if let Some(writer) = writer.as_mut() {
            interleaved.clear();
            output.interleave_into(&mut interleaved);
            for sample in &interleaved {
                writer.write_all(&sample.to_le_bytes())?;
            }
        }
    }

    if let Some(mut writer) = writer {
        writer.flush()?;
    }

    Ok((blocks * block_size, meter.finish()))
}
