use anyhow::{Context, Result};
use std::io::Cursor;

/// Mime type reported alongside encoded capture bytes.
pub const WAV_MIME: &str = "audio/wav";

/// Encode a mono f32 capture as 16-bit PCM WAV bytes at the device rate.
/// Samples outside [-1, 1] are clamped before quantization.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .context("failed to start WAV encoder")?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            let quantized = (clamped * i16::MAX as f32) as i16;
            writer
                .write_sample(quantized)
                .context("failed to write WAV sample")?;
        }
        writer.finalize().context("failed to finalize WAV data")?;
    }
    Ok(cursor.into_inner())
}
