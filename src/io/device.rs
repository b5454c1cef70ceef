//! cpal output device rendering the shared graph.

use std::cell::Cell;
use std::future::ready;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{debug, error, info};

use crate::error::BackendError;
use crate::graph::{lock_graph, MediaSource, SharedGraph};
use crate::io::decode::load_source;
use crate::io::{AudioBackend, DeviceFuture, OutputDevice};
use crate::selector::SourceRef;
use crate::MAX_BLOCK_SIZE;

/// Default host output, optionally picked by device name.
#[derive(Clone, Debug, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    fn find_device(&self, host: &cpal::Host) -> Result<cpal::Device, BackendError> {
        match &self.device_name {
            None => host.default_output_device().ok_or(BackendError::NoDevice),
            Some(wanted) => host
                .output_devices()
                .map_err(|e| BackendError::Device(e.to_string()))?
                .find(|d| d.name().is_ok_and(|name| &name == wanted))
                .ok_or(BackendError::NoDevice),
        }
    }
}

impl AudioBackend for CpalBackend {
    type Device = CpalDevice;

    fn open(&self, graph: SharedGraph) -> Result<CpalDevice, BackendError> {
        let host = cpal::default_host();
        let device = self.find_device(&host)?;
        let config = device
            .default_output_config()
            .map_err(|e| BackendError::Device(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let name = device.name().unwrap_or_else(|_| "unknown".into());

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), graph, channels),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), graph, channels),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), graph, channels),
            other => Err(BackendError::Device(format!("unsupported sample format {other:?}"))),
        }?;

        // Start suspended, like a freshly created browser context
        if let Err(e) = stream.pause() {
            debug!(error = %e, "stream could not be paused after creation");
        }

        info!(device = %name, sample_rate, channels, "opened output device");
        Ok(CpalDevice {
            stream: Some(stream),
            sample_rate,
            running: Cell::new(false),
        })
    }

    fn load(&self, source: &SourceRef) -> Result<MediaSource, BackendError> {
        load_source(source.as_path())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
    channels: usize,
) -> Result<cpal::Stream, BackendError>
where
    T: SizedSample + FromSample<f32>,
{
    let sample_rate = config.sample_rate.0 as f32;
    let mut mono = vec![0.0f32; MAX_BLOCK_SIZE];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                let mut graph = lock_graph(&graph);
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut mono[..frames];
                    graph.render(block, sample_rate);

                    // Mono to all channels
                    let offset = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[offset + i * channels + ch] = T::from_sample(s);
                        }
                    }
                    frames_written += frames;
                }
            },
            |err| error!(error = %err, "audio stream error"),
            None,
        )
        .map_err(|e| BackendError::Device(e.to_string()))
}

/// Open cpal stream. Dropping it (or `close`) stops output.
pub struct CpalDevice {
    stream: Option<cpal::Stream>,
    sample_rate: f32,
    running: Cell<bool>,
}

impl OutputDevice for CpalDevice {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn is_suspended(&self) -> bool {
        !self.running.get()
    }

    fn resume(&self) -> DeviceFuture {
        let result = match &self.stream {
            None => Err(BackendError::Closed),
            Some(stream) => stream
                .play()
                .map(|()| self.running.set(true))
                .map_err(|e| BackendError::Device(e.to_string())),
        };
        Box::pin(ready(result))
    }

    fn play(&self, source: &MediaSource) -> DeviceFuture {
        let result = if self.stream.is_some() {
            source.play();
            Ok(())
        } else {
            Err(BackendError::Closed)
        };
        Box::pin(ready(result))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!(error = %e, "pause on close failed");
            }
            self.running.set(false);
            info!("closed output device");
        }
    }
}
