use super::backend::AudioBuffer;

/// Convert a tap buffer to the target rate and channel count
///
/// Rates are reduced by decimation only; buffers below the target rate pass
/// through untouched.
pub fn convert_buffer(buffer: AudioBuffer, target_sample_rate: u32, target_channels: u16) -> AudioBuffer {
    let mut converted = buffer;

    if converted.channels != target_channels && target_channels == 1 {
        converted = to_mono(converted);
    }

    if converted.sample_rate != target_sample_rate {
        converted = downsample(converted, target_sample_rate);
    }

    converted
}

/// Downsample by decimation, keeping whole frames
pub fn downsample(buffer: AudioBuffer, target_rate: u32) -> AudioBuffer {
    if buffer.sample_rate == target_rate || target_rate == 0 {
        return buffer;
    }

    let ratio = buffer.sample_rate / target_rate;
    if ratio <= 1 {
        return buffer; // Can't upsample
    }

    let channels = buffer.channels.max(1) as usize;
    let samples: Vec<i16> = buffer
        .samples
        .chunks_exact(channels)
        .step_by(ratio as usize)
        .flatten()
        .copied()
        .collect();

    AudioBuffer {
        samples,
        sample_rate: target_rate,
        channels: buffer.channels,
        timestamp_ms: buffer.timestamp_ms,
    }
}

/// Mix interleaved channels down to mono by averaging
pub fn to_mono(buffer: AudioBuffer) -> AudioBuffer {
    if buffer.channels <= 1 {
        return buffer;
    }

    let channels = buffer.channels as usize;
    let samples: Vec<i16> = buffer
        .samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect();

    AudioBuffer {
        samples,
        sample_rate: buffer.sample_rate,
        channels: 1,
        timestamp_ms: buffer.timestamp_ms,
    }
}

/// Little-endian PCM bytes for transport
pub fn to_pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
