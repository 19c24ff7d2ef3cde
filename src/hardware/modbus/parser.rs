//! Register-value decoding helpers for the Modbus battery bus (C4).

/// Interpret a single 16-bit holding register as an unsigned integer.
pub fn parse_u16(registers: &[u16]) -> u16 {
    registers.first().copied().unwrap_or(0)
}

/// Interpret a single 16-bit holding register as a signed integer (two's
/// complement), used for bidirectional power/rate commands.
pub fn parse_i16(registers: &[u16]) -> i16 {
    registers.first().copied().unwrap_or(0) as i16
}

/// Decode a register with a scale divisor, returning a failure for any
/// NaN/non-finite result rather than letting it silently propagate
/// (spec.md §9, "Non-finite numerics").
pub fn parse_scaled_u16(registers: &[u16], scale: f64) -> anyhow::Result<f64> {
    let raw = parse_u16(registers) as f64;
    let value = raw / scale;
    if !value.is_finite() {
        anyhow::bail!("decoded register value is not finite (raw={raw}, scale={scale})");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scaled_u16_applies_divisor() {
        let value = parse_scaled_u16(&[800], 10.0).unwrap();
        assert_eq!(value, 80.0);
    }

    #[test]
    fn parse_scaled_u16_rejects_zero_scale() {
        assert!(parse_scaled_u16(&[800], 0.0).is_err());
    }

    #[test]
    fn parse_i16_handles_negative_values() {
        // 0xFFFF as two's complement i16 is -1
        assert_eq!(parse_i16(&[0xFFFF]), -1);
    }
}
