//! Audio decoding using Symphonia

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalysisError;

/// Decoded PCM audio, one vector per channel
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Deinterleaved channel samples, normalized to [-1.0, 1.0]
    pub channels: Vec<Vec<f32>>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Frames per channel
    pub fn frames(&self) -> usize {
        self.channels.iter().map(|c| c.len()).min().unwrap_or(0)
    }
}

/// Decode an audio file to PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file
///
/// # Errors
///
/// Returns `AnalysisError::LoadError` if the file is missing, cannot be
/// probed, has no audio track, or decodes to zero samples.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, AnalysisError> {
    log::debug!("Decoding audio file: {}", path.display());

    if !path.is_file() {
        return Err(AnalysisError::LoadError(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|e| {
        AnalysisError::LoadError(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            AnalysisError::LoadError(format!("unsupported format {}: {}", path.display(), e))
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            AnalysisError::LoadError(format!("no audio track found in {}", path.display()))
        })?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| {
            AnalysisError::LoadError(format!("unsupported codec in {}: {}", path.display(), e))
        })?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut interleaved: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) if interleaved.is_empty() => {
                return Err(AnalysisError::LoadError(format!(
                    "read error in {}: {}",
                    path.display(),
                    e
                )))
            }
            Err(e) => {
                log::warn!("Stopped reading {} early: {}", path.display(), e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => {
                // Corrupted packets are skipped
                skipped_packets += 1;
                continue;
            }
            Err(e) => {
                return Err(AnalysisError::LoadError(format!(
                    "decode error in {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channel_count = spec.channels.count();

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    if skipped_packets > 0 {
        log::warn!(
            "Skipped {} undecodable packet(s) in {}",
            skipped_packets,
            path.display()
        );
    }

    if interleaved.is_empty() || channel_count == 0 {
        return Err(AnalysisError::LoadError(format!(
            "decoded zero samples from {}",
            path.display()
        )));
    }

    if sample_rate == 0 {
        return Err(AnalysisError::LoadError(format!(
            "unknown sample rate in {}",
            path.display()
        )));
    }

    let frames = interleaved.len() / channel_count;
    let channels: Vec<Vec<f32>> = (0..channel_count)
        .map(|ch| {
            (0..frames)
                .map(|f| interleaved[f * channel_count + ch])
                .collect()
        })
        .collect();

    log::debug!(
        "Decoded {} frames x {} channel(s) at {} Hz",
        frames,
        channel_count,
        sample_rate
    );

    Ok(DecodedAudio {
        channels,
        sample_rate,
    })
}
