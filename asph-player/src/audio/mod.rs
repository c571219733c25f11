//! Audio collaborators: WAV files, resampling and output sinks

pub mod output;
pub mod resampler;
pub mod sink;
pub mod wav;

pub use output::CpalSink;
pub use resampler::{Resampler, StreamResampler};
pub use sink::{GainControl, OutputSink};
pub use wav::{write_wav, WavSource};
