//! PCM WAVE decoding.
//!
//! Only uncompressed integer PCM with 8 or 16 bits per sample is accepted.
//! Positional playback wants mono data; stereo files load with a warning and
//! are spatialised as if they were mono.

use std::io::Cursor;

use roadnoise_common::{AudioError, AudioResult};
use tracing::warn;

/// Sample layout of a decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    /// Channel count (1 or 2).
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Bits per sample in the source file (8 or 16).
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Whether the data can be positioned in 3D without downmixing.
    #[must_use]
    pub const fn is_mono(&self) -> bool {
        self.channels == 1
    }
}

/// Decoded PCM data.
///
/// Samples are interleaved and always widened to 16-bit range, whatever the
/// bit depth of the file was.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmData {
    /// Layout of the source file.
    pub format: PcmFormat,
    /// Interleaved samples.
    pub samples: Vec<i16>,
}

impl PcmData {
    /// Number of frames (samples per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }

    /// Playback length at native pitch, in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.format.sample_rate as f32
    }
}

/// Decode a RIFF/WAVE file held in memory.
///
/// `path` is only used for error messages and logging.
pub fn decode_wav(path: &str, bytes: &[u8]) -> AudioResult<PcmData> {
    let decode_err = |reason: String| AudioError::DecodeFailed {
        path: path.to_string(),
        reason,
    };

    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| decode_err(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(decode_err("only integer PCM is supported".into()));
    }

    let shift = match spec.bits_per_sample {
        8 => 8,
        16 => 0,
        bits => return Err(decode_err(format!("unsupported bit depth {bits}"))),
    };

    if !(1..=2).contains(&spec.channels) {
        return Err(decode_err(format!("unsupported channel count {}", spec.channels)));
    }

    if spec.channels != 1 {
        warn!("'{path}' is not mono, spatialisation treats it as mono");
    }

    let samples = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v << shift))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| decode_err(e.to_string()))?;

    Ok(PcmData {
        format: PcmFormat {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        },
        samples,
    })
}

/// Encode integer PCM as a WAVE file for test fixtures.
#[cfg(test)]
pub(crate) fn encode_wav(channels: u16, bits: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for &s in samples {
            if bits == 8 {
                writer.write_sample((s >> 8) as i8).expect("write sample");
            } else {
                writer.write_sample(s).expect("write sample");
            }
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// Silent mono 16-bit fixture at 8 kHz.
#[cfg(test)]
pub(crate) fn silence_wav(frames: usize) -> Vec<u8> {
    encode_wav(1, 16, 8000, &vec![0; frames])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mono16() {
        let bytes = encode_wav(1, 16, 22050, &[0, 1000, -1000, 32767]);
        let pcm = decode_wav("mono.wav", &bytes).expect("decode");
        assert_eq!(pcm.format.channels, 1);
        assert_eq!(pcm.format.sample_rate, 22050);
        assert_eq!(pcm.format.bits_per_sample, 16);
        assert_eq!(pcm.samples, vec![0, 1000, -1000, 32767]);
        assert!(pcm.format.is_mono());
    }

    #[test]
    fn test_decode_8bit_widens() {
        let bytes = encode_wav(1, 8, 8000, &[0, 256 * 10, -256 * 10]);
        let pcm = decode_wav("eight.wav", &bytes).expect("decode");
        assert_eq!(pcm.format.bits_per_sample, 8);
        assert_eq!(pcm.samples, vec![0, 2560, -2560]);
    }

    #[test]
    fn test_stereo_is_accepted() {
        let bytes = encode_wav(2, 16, 8000, &[1, 2, 3, 4]);
        let pcm = decode_wav("stereo.wav", &bytes).expect("decode");
        assert_eq!(pcm.format.channels, 2);
        assert_eq!(pcm.frames(), 2);
    }

    #[test]
    fn test_duration() {
        let pcm = decode_wav("s.wav", &silence_wav(4000)).expect("decode");
        assert!((pcm.duration_secs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = decode_wav("junk.wav", b"RIFX....not a wave").unwrap_err();
        assert!(matches!(err, AudioError::DecodeFailed { ref path, .. } if path == "junk.wav"));
    }

    #[test]
    fn test_rejects_24bit() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("writer");
            writer.write_sample(0i32).expect("sample");
            writer.finalize().expect("finalize");
        }
        let err = decode_wav("deep.wav", &cursor.into_inner()).unwrap_err();
        assert!(err.to_string().contains("bit depth"));
    }

    #[test]
    fn test_rejects_float() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("writer");
            writer.write_sample(0.5f32).expect("sample");
            writer.finalize().expect("finalize");
        }
        assert!(decode_wav("float.wav", &cursor.into_inner()).is_err());
    }
}
