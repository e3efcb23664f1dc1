// access/src/otp.rs

use rand::Rng;

pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;

/// Generates a one-time passcode: 6 ASCII digits, uniform in
/// [100000, 999999]. Compared verbatim as a string at verification time.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_emit_six_ascii_digits() {
        for _ in 0..1_000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn should_stay_inside_the_code_range() {
        for _ in 0..10_000 {
            let value: u32 = generate_code().parse().unwrap();
            assert!((OTP_MIN..=OTP_MAX).contains(&value));
        }
    }

    #[test]
    fn should_distribute_roughly_uniformly() {
        // Mean over many draws lands near the midpoint, and every leading
        // digit shows up. Loose bounds keep this stable across seeds.
        const DRAWS: usize = 50_000;
        let mut sum: u64 = 0;
        let mut leading = [0usize; 10];
        for _ in 0..DRAWS {
            let code = generate_code();
            sum += code.parse::<u64>().unwrap();
            leading[(code.as_bytes()[0] - b'0') as usize] += 1;
        }
        let mean = sum as f64 / DRAWS as f64;
        let midpoint = (OTP_MIN as f64 + OTP_MAX as f64) / 2.0;
        assert!((mean - midpoint).abs() < midpoint * 0.01, "mean drifted: {mean}");
        assert_eq!(leading[0], 0);
        for digit in 1..=9 {
            assert!(leading[digit] > 0, "leading digit {digit} never drawn");
        }
    }
}
