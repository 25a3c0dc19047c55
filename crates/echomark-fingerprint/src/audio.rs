//! Sample sources: WAV decoding, downmixing and resampling.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use rubato::{FftFixedIn, Resampler};
use tracing::{debug, info};

use echomark_core::{Error, Result, SampleBuffer};

/// Produces a mono sample buffer from some container.
pub trait SampleSource {
    /// Decode to mono samples at the source's native rate.
    fn read_samples(&self) -> Result<SampleBuffer>;
}

/// WAV data from a file or an in-memory buffer.
#[derive(Debug, Clone)]
pub enum WavSource {
    /// File on disk
    Path(PathBuf),
    /// Complete WAV file contents
    Bytes(Vec<u8>),
}

impl WavSource {
    /// Source reading from `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        WavSource::Path(path.as_ref().to_path_buf())
    }

    /// Source reading from raw WAV bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        WavSource::Bytes(bytes.into())
    }
}

impl SampleSource for WavSource {
    fn read_samples(&self) -> Result<SampleBuffer> {
        let buffer = match self {
            WavSource::Path(path) => {
                let reader = hound::WavReader::open(path).map_err(wav_error)?;
                decode_wav(reader)?
            }
            WavSource::Bytes(bytes) => {
                let reader = hound::WavReader::new(Cursor::new(bytes.as_slice())).map_err(wav_error)?;
                decode_wav(reader)?
            }
        };

        if buffer.is_empty() {
            return Err(Error::invalid_input("decoded audio contains no samples"));
        }
        Ok(buffer)
    }
}

fn wav_error(err: hound::Error) -> Error {
    match err {
        hound::Error::IoError(e) => Error::Io(e),
        other => Error::invalid_input(format!("unreadable WAV data: {}", other)),
    }
}

fn decode_wav<R: std::io::Read>(reader: hound::WavReader<R>) -> Result<SampleBuffer> {
    let spec = reader.spec();
    debug!("WAV spec: {:?}", spec);

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(wav_error)?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    Ok(SampleBuffer::new(
        downmix(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

/// Average interleaved channels into one.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

const RESAMPLE_CHUNK: usize = 1024;

/// Convert `buffer` to `target_rate` with an FFT resampler.
///
/// The resampler's delay is trimmed so sample `i` of the output lines up with
/// time `i / target_rate` of the input.
pub fn resample(buffer: &SampleBuffer, target_rate: u32) -> Result<SampleBuffer> {
    if target_rate == 0 || buffer.sample_rate == 0 {
        return Err(Error::invalid_input("sample rates must be positive"));
    }
    if buffer.sample_rate == target_rate {
        return Ok(buffer.clone());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        buffer.sample_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        2,
        1,
    )
    .map_err(|e| Error::Internal(format!("resampler setup failed: {}", e)))?;

    let delay = resampler.output_delay();
    let expected =
        (buffer.len() as f64 * target_rate as f64 / buffer.sample_rate as f64).round() as usize;
    let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    while out.len() < expected + delay {
        let chunk_len = resampler.input_frames_next();
        let end = (pos + chunk_len).min(buffer.len());

        let mut block = vec![0.0f32; chunk_len];
        if pos < end {
            block[..end - pos].copy_from_slice(&buffer.samples[pos..end]);
        }
        pos = end;

        let frames = resampler
            .process(&[block], None)
            .map_err(|e| Error::Internal(format!("resampling failed: {}", e)))?;
        match frames.into_iter().next() {
            Some(channel) if !channel.is_empty() => out.extend(channel),
            _ if pos >= buffer.len() => break,
            _ => {}
        }
    }

    let start = delay.min(out.len());
    out.drain(..start);
    out.truncate(expected);

    debug!(
        from = buffer.sample_rate,
        to = target_rate,
        samples = out.len(),
        "Resampled audio"
    );
    Ok(SampleBuffer::new(out, target_rate))
}

/// Decode `source` and bring it to the analysis rate.
pub fn load_for_analysis(source: &dyn SampleSource, target_rate: u32) -> Result<SampleBuffer> {
    let buffer = source.read_samples()?;
    info!(
        samples = buffer.len(),
        sample_rate = buffer.sample_rate,
        duration_secs = buffer.duration_secs(),
        "Decoded audio"
    );
    resample(&buffer, target_rate)
}

/// Load a WAV file and bring it to the analysis rate.
pub fn load_wav(path: impl AsRef<Path>, target_rate: u32) -> Result<SampleBuffer> {
    load_for_analysis(&WavSource::from_path(path), target_rate)
}
