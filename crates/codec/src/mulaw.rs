//! ITU-T G.711 mu-law <-> linear PCM16 conversion.
//!
//! Pure, allocation-free sample conversion. Carriers (Twilio/Genesys-style
//! media streams) speak 8kHz mu-law; the rest of the pipeline speaks PCM16/f32.

const BIAS: i16 = 0x84;
const CLIP: i16 = 32635;

/// Encode one linear PCM16 sample to a mu-law byte.
pub fn linear_to_ulaw(pcm: i16) -> u8 {
    let sign = if pcm < 0 { 0x80u8 } else { 0x00u8 };
    let mut magnitude = if pcm < 0 {
        pcm.saturating_neg()
    } else {
        pcm
    };
    if magnitude > CLIP {
        magnitude = CLIP;
    }
    magnitude += BIAS;

    let exponent = exponent_of(magnitude);
    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;
    let ulaw = sign | ((exponent as u8) << 4) | mantissa;
    !ulaw
}

/// Decode one mu-law byte to a linear PCM16 sample.
pub fn ulaw_to_linear(ulaw: u8) -> i16 {
    let ulaw = !ulaw;
    let sign = ulaw & 0x80;
    let exponent = (ulaw >> 4) & 0x07;
    let mantissa = ulaw & 0x0F;

    let mut sample = ((mantissa as i16) << 3) + BIAS;
    sample <<= exponent as i16;
    sample -= BIAS;

    if sign != 0 {
        -sample
    } else {
        sample
    }
}

fn exponent_of(magnitude: i16) -> i16 {
    let mut mask: i16 = 0x4000;
    let mut exponent: i16 = 7;
    while magnitude & mask == 0 && exponent > 0 {
        exponent -= 1;
        mask >>= 1;
    }
    exponent
}

/// Decode a mu-law byte stream into PCM16 samples.
pub fn decode_buffer(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().map(|&b| ulaw_to_linear(b)).collect()
}

/// Encode PCM16 samples into a mu-law byte stream.
pub fn encode_buffer(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| linear_to_ulaw(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_sign_and_rough_magnitude() {
        for pcm in [-20000i16, -500, -1, 0, 1, 500, 20000] {
            let encoded = linear_to_ulaw(pcm);
            let decoded = ulaw_to_linear(encoded);
            // mu-law is lossy/companded; allow generous tolerance.
            let tolerance = (pcm.abs() / 16).max(32);
            assert!(
                (decoded - pcm).abs() <= tolerance,
                "pcm={pcm} decoded={decoded} tolerance={tolerance}"
            );
        }
    }

    #[test]
    fn silence_round_trips_to_silence() {
        assert_eq!(ulaw_to_linear(linear_to_ulaw(0)), 0);
    }

    #[test]
    fn buffers_round_trip_length() {
        let samples: Vec<i16> = (0..160).map(|i| (i * 100) as i16).collect();
        let encoded = encode_buffer(&samples);
        assert_eq!(encoded.len(), samples.len());
        let decoded = decode_buffer(&encoded);
        assert_eq!(decoded.len(), samples.len());
    }
}
