//! Compressed and PCM audio decoding into mono [`MediaSource`]s.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use crate::error::BackendError;
use crate::graph::MediaSource;

/// Extensions [`load_source`] accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

/// Decode a file, rejecting extensions outside [`SUPPORTED_EXTENSIONS`].
pub fn load_source(path: &Path) -> Result<MediaSource, BackendError> {
    let Some(ext) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
    else {
        return Err(BackendError::UnsupportedFormat(path.display().to_string()));
    };

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(ext);

    decode(mss, &hint).map_err(|reason| BackendError::Decode {
        path: path.to_path_buf(),
        reason,
    })
}

fn decode(mss: MediaSourceStream, hint: &Hint) -> Result<MediaSource, String> {
    let probed = get_probe()
        .format(hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| e.to_string())?;
    let mut format = probed.format;

    let track = format.default_track().ok_or("no default track")?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| e.to_string())?;

    let mut scratch: Option<SampleBuffer<f32>> = None;
    let mut mono = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.to_string()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt frame: skip it, the stream may recover
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!(reason, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.to_string()),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channels = spec.channels.count().max(1);

        let needed = decoded.capacity() * channels;
        if scratch.as_ref().is_some_and(|buffer| buffer.capacity() < needed) {
            scratch = None;
        }
        let buffer =
            scratch.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buffer.copy_interleaved_ref(decoded);

        // Mix down: the graph is mono
        mono.extend(
            buffer
                .samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    let sample_rate = sample_rate.ok_or("unknown sample rate")?;
    Ok(MediaSource::new(mono, sample_rate as f32))
}
