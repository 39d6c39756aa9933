use thiserror::Error;

/// Errors surfaced by the tuner core.
///
/// Only [`TunerError::UnsupportedLength`] can occur on a correctly wired
/// device, and only at startup. The others signal a broken host harness.
#[derive(Debug, Error)]
pub enum TunerError {
    #[error("FFT cannot be initialized for {len} samples (need a power of two >= {min})")]
    UnsupportedLength { len: usize, min: usize },

    #[error("sample buffer holds {actual} samples but the analyzer expects {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("sampler event channel closed")]
    SamplerDisconnected,

    #[error("failed to spawn timer thread: {0}")]
    TimerSpawn(#[from] std::io::Error),
}
