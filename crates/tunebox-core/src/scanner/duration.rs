//! Track duration probing (Symphonia)

use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use thiserror::Error;

/// Why a duration could not be determined
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported or corrupt audio: {0}")]
    Unsupported(String),
}

/// Something that can tell how long an audio file plays
pub trait DurationProbe: Send + Sync {
    fn duration_seconds(&self, path: &Path) -> Result<f64, ProbeError>;
}

/// Reads durations from container headers, falling back to summing packet
/// durations when the header carries no frame count. Packets are never
/// decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64, ProbeError> {
        let file = File::open(path).map_err(|source| ProbeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ProbeError::Unsupported(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProbeError::Unsupported("No audio track found".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let time_base = params
            .time_base
            .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))
            .ok_or_else(|| ProbeError::Unsupported("Unknown time base".to_string()))?;

        if let Some(n_frames) = params.n_frames {
            return Ok(to_seconds(time_base.calc_time(n_frames)));
        }

        let mut total: u64 = 0;
        loop {
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() == track_id {
                        total += packet.dur;
                    }
                }
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    log::debug!("duration_seconds: Stopped reading packets of {:?}: {}", path, e);
                    break;
                }
            }
        }

        Ok(to_seconds(time_base.calc_time(total)))
    }
}

fn to_seconds(time: Time) -> f64 {
    time.seconds as f64 + time.frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, frames: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(0i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 44_100, 88_200);

        let secs = SymphoniaProbe.duration_seconds(&path).unwrap();
        assert!((secs - 2.0).abs() < 0.01, "got {}", secs);
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(SymphoniaProbe.duration_seconds(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = SymphoniaProbe
            .duration_seconds(Path::new("/nonexistent/track.flac"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::Open { .. }));
    }
}
