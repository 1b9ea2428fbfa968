//! WAV loading for offline analysis.

use anyhow::{Context, Result, bail};
use log::debug;
use std::path::Path;

/// Mono samples normalized to [-1.0, 1.0] plus their sample rate.
#[derive(Debug, Clone)]
pub(crate) struct WavAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Reads a WAV file and mixes all channels down to mono.
pub(crate) fn read_mono(path: &Path) -> Result<WavAudio> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        bail!("WAV file {} has no channels", path.display());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<Result<Vec<f32>, _>>()
        }
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<f32>, _>>(),
    }
    .with_context(|| format!("Failed to decode samples from {}", path.display()))?;

    let channels = spec.channels as usize;
    let samples: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    debug!(
        "read {} frames at {} Hz ({} channel(s)) from {}",
        samples.len(),
        spec.sample_rate,
        spec.channels,
        path.display()
    );

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writes a 16-bit WAV with one sine per channel.
    pub(crate) fn write_sine_wav(path: &Path, freqs: &[f32], sample_rate: u32, len: usize) {
        let spec = hound::WavSpec {
            channels: freqs.len() as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..len {
            for &freq in freqs {
                let t = i as f32 / sample_rate as f32;
                let value = 0.5 * (2.0 * std::f32::consts::PI * freq * t).sin();
                writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn reads_and_normalizes_16_bit_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a440.wav");
        write_sine_wav(&path, &[440.0], 44100, 4410);

        let audio = read_mono(&path).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples.len(), 4410);
        let peak = audio.samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.01, "peak {peak}");
    }

    #[test]
    fn stereo_is_mixed_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_sine_wav(&path, &[440.0, 440.0], 22050, 1000);

        let audio = read_mono(&path).unwrap();
        assert_eq!(audio.samples.len(), 1000);
        assert_eq!(audio.sample_rate, 22050);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_mono(Path::new("/no/such/file.wav")).unwrap_err();
        assert!(err.to_string().contains("/no/such/file.wav"));
    }
}
