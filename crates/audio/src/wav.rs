//! WAV inspection and manipulation
//!
//! Everything the gate and the sync planner need from audio files:
//! duration measurement, silence appending and a coarse energy
//! envelope. Only WAV is handled here; other containers are the
//! compositor's business.

use std::path::Path;

use vidforge_core::{Error, Result};

/// Energy envelope frame rate, frames per second
pub const ENVELOPE_FPS: f64 = 10.0;

/// Basic properties of a WAV file
#[derive(Debug, Clone, Copy)]
pub struct WavInfo {
    pub duration_s: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Read duration and format of a WAV file
pub fn info(path: &Path) -> Result<WavInfo> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();
    Ok(WavInfo {
        duration_s: reader.duration() as f64 / spec.sample_rate as f64,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Duration of a WAV file in seconds
pub fn duration(path: &Path) -> Result<f64> {
    Ok(info(path)?.duration_s)
}

/// Read samples mono-mixed and normalised to [-1, 1]
fn read_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", path.display())))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", path.display())))?,
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Copy a WAV file, appending `silence_s` seconds of silence.
///
/// Sample rate, channel count and sample format are preserved.
pub fn append_silence(src: &Path, dst: &Path, silence_s: f64) -> Result<()> {
    let mut reader = hound::WavReader::open(src)
        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", src.display())))?;
    let spec = reader.spec();
    let mut writer = hound::WavWriter::create(dst, spec)
        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", dst.display())))?;

    let silence_samples = (silence_s * spec.sample_rate as f64) as usize * spec.channels as usize;

    match spec.sample_format {
        hound::SampleFormat::Int => {
            for sample in reader.samples::<i32>() {
                let sample =
                    sample.map_err(|e| Error::AssetCorrupt(format!("{}: {e}", src.display())))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| Error::AssetCorrupt(e.to_string()))?;
            }
            for _ in 0..silence_samples {
                writer
                    .write_sample(0i32)
                    .map_err(|e| Error::AssetCorrupt(e.to_string()))?;
            }
        }
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                let sample =
                    sample.map_err(|e| Error::AssetCorrupt(format!("{}: {e}", src.display())))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| Error::AssetCorrupt(e.to_string()))?;
            }
            for _ in 0..silence_samples {
                writer
                    .write_sample(0f32)
                    .map_err(|e| Error::AssetCorrupt(e.to_string()))?;
            }
        }
    }

    writer
        .finalize()
        .map_err(|e| Error::AssetCorrupt(e.to_string()))
}

/// Concatenate WAV files into a single one.
///
/// All inputs must share the first file's sample rate and channel
/// layout; that holds within a session because one speech provider
/// produced every segment.
pub fn concatenate(sources: &[std::path::PathBuf], dst: &Path) -> Result<()> {
    let first = sources
        .first()
        .ok_or_else(|| Error::AssetCorrupt("no audio files to combine".to_string()))?;
    let spec = hound::WavReader::open(first)
        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", first.display())))?
        .spec();
    let mut writer = hound::WavWriter::create(dst, spec)
        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", dst.display())))?;

    for src in sources {
        let mut reader = hound::WavReader::open(src)
            .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", src.display())))?;
        match spec.sample_format {
            hound::SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    let sample = sample
                        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", src.display())))?;
                    writer
                        .write_sample(sample)
                        .map_err(|e| Error::AssetCorrupt(e.to_string()))?;
                }
            }
            hound::SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    let sample = sample
                        .map_err(|e| Error::AssetCorrupt(format!("{}: {e}", src.display())))?;
                    writer
                        .write_sample(sample)
                        .map_err(|e| Error::AssetCorrupt(e.to_string()))?;
                }
            }
        }
    }

    writer
        .finalize()
        .map_err(|e| Error::AssetCorrupt(e.to_string()))
}

/// RMS energy envelope over time
#[derive(Debug, Clone)]
pub struct EnergyEnvelope {
    /// One RMS value per frame
    pub frames: Vec<f32>,
    /// Frames per second
    pub frame_rate: f64,
}

impl EnergyEnvelope {
    /// Total duration covered by the envelope
    pub fn total_duration(&self) -> f64 {
        self.frames.len() as f64 / self.frame_rate
    }

    /// Timestamp of a frame index
    pub fn timestamp(&self, frame: usize) -> f64 {
        frame as f64 / self.frame_rate
    }

    pub fn mean(&self) -> f32 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.frames.iter().sum::<f32>() / self.frames.len() as f32
    }

    pub fn stddev(&self) -> f32 {
        if self.frames.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .frames
            .iter()
            .map(|&v| (v - mean) * (v - mean))
            .sum::<f32>()
            / self.frames.len() as f32;
        var.sqrt()
    }
}

/// Compute the RMS energy envelope across files, in file order.
pub fn energy_envelope(paths: &[std::path::PathBuf]) -> Result<EnergyEnvelope> {
    let mut frames = Vec::new();

    for path in paths {
        let (samples, sample_rate) = read_mono(path)?;
        let window = (sample_rate as f64 / ENVELOPE_FPS) as usize;
        if window == 0 {
            continue;
        }
        for chunk in samples.chunks(window) {
            let rms =
                (chunk.iter().map(|&v| v * v).sum::<f32>() / chunk.len() as f32).sqrt();
            frames.push(rms);
        }
    }

    if frames.is_empty() {
        return Err(Error::AssetCorrupt("no audio samples to analyze".to_string()));
    }
    Ok(EnergyEnvelope {
        frames,
        frame_rate: ENVELOPE_FPS,
    })
}
