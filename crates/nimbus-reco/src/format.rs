//! Audio format descriptor and the once-per-turn wire prelude
//!
//! The service expects each turn's audio to open with a RIFF/WAVE/fmt/data
//! header whose two size fields are zero: the stream is open-ended, so the
//! sizes cannot be known up front.

/// PCM format tag.
pub const FORMAT_TAG_PCM: u16 = 1;

/// Immutable description of the audio the site will push. Stored once on the
/// first `set_format` and retained until the adapter stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Format-specific trailing bytes, appended verbatim to the fmt chunk.
    pub extra: Vec<u8>,
}

impl AudioFormat {
    /// Plain PCM descriptor with the derived rate/alignment fields filled in.
    pub fn pcm(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        let block_align = channels * bits_per_sample / 8;
        Self {
            tag: FORMAT_TAG_PCM,
            channels,
            sample_rate,
            avg_bytes_per_sec: sample_rate * block_align as u32,
            block_align,
            bits_per_sample,
            extra: Vec::new(),
        }
    }
}

/// Size of the core format record inside the fmt chunk: tag, channels,
/// sample rate, average byte rate, and block alignment.
const FORMAT_CORE_BYTES: u32 = 14;

/// Serialize the turn prelude: `"RIFF" u32(0) "WAVE" "fmt " u32(14+extra)
/// <format core + extra> "data" u32(0)`, all integers little-endian.
pub fn wav_header(format: &AudioFormat) -> Vec<u8> {
    let fmt_chunk = FORMAT_CORE_BYTES + format.extra.len() as u32;
    let mut header = Vec::with_capacity(12 + 8 + fmt_chunk as usize + 8);

    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(b"WAVE");

    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&fmt_chunk.to_le_bytes());
    header.extend_from_slice(&format.tag.to_le_bytes());
    header.extend_from_slice(&format.channels.to_le_bytes());
    header.extend_from_slice(&format.sample_rate.to_le_bytes());
    header.extend_from_slice(&format.avg_bytes_per_sec.to_le_bytes());
    header.extend_from_slice(&format.block_align.to_le_bytes());
    header.extend_from_slice(&format.extra);

    header.extend_from_slice(b"data");
    header.extend_from_slice(&0u32.to_le_bytes());

    header
}
