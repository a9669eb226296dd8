//! PCM helpers for the voice endpoints.
//!
//! Clients stream 16 kHz mono signed 16-bit little-endian PCM.

pub const SAMPLE_RATE: u32 = 16_000;

/// RMS (on the i16 scale) above which a chunk counts as speech.
pub const SPEECH_RMS_THRESHOLD: f32 = 500.0;

/// Trailing silence that ends an utterance.
pub const END_OF_SPEECH_MS: u32 = 800;

/// Longest utterance buffered before it is flushed regardless of silence.
pub const MAX_UTTERANCE_SECS: usize = 30;

/// [`MAX_UTTERANCE_SECS`] of 16-bit mono PCM, in bytes.
pub const MAX_UTTERANCE_BYTES: usize = SAMPLE_RATE as usize * 2 * MAX_UTTERANCE_SECS;

/// Wrap raw PCM bytes in a 44-byte RIFF/WAVE header.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let mut bytes = Vec::with_capacity(44 + pcm.len());

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36u32 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    bytes.extend_from_slice(&2u16.to_le_bytes()); // block align
    bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.extend_from_slice(pcm);
    bytes
}

/// Decode little-endian i16 samples; a trailing odd byte is ignored.
pub fn samples(pcm: &[u8]) -> impl Iterator<Item = i16> + '_ {
    pcm.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]]))
}

/// Root-mean-square energy of a chunk.
pub fn rms(pcm: &[u8]) -> f32 {
    let (sum, count) = samples(pcm).fold((0i64, 0usize), |(sum, count), s| {
        (sum + (s as i64).pow(2), count + 1)
    });
    if count == 0 {
        return 0.0;
    }
    (sum as f32 / count as f32).sqrt()
}

/// Energy-based end-of-utterance detection.
///
/// Reports the end once speech has been heard and is followed by
/// [`END_OF_SPEECH_MS`] of chunks below the threshold.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    threshold: f32,
    silence_samples_needed: usize,
    heard_speech: bool,
    trailing_silence: usize,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new(SPEECH_RMS_THRESHOLD, END_OF_SPEECH_MS)
    }
}

impl SilenceDetector {
    pub fn new(threshold: f32, silence_ms: u32) -> Self {
        Self {
            threshold,
            silence_samples_needed: (SAMPLE_RATE as usize * silence_ms as usize) / 1000,
            heard_speech: false,
            trailing_silence: 0,
        }
    }

    pub fn reset(&mut self) {
        self.heard_speech = false;
        self.trailing_silence = 0;
    }

    /// Feed one chunk; returns true when the utterance has ended.
    pub fn push(&mut self, pcm: &[u8]) -> bool {
        let count = pcm.len() / 2;
        if rms(pcm) >= self.threshold {
            self.heard_speech = true;
            self.trailing_silence = 0;
            return false;
        }
        if !self.heard_speech {
            return false;
        }
        self.trailing_silence += count;
        self.trailing_silence >= self.silence_samples_needed
    }
}
