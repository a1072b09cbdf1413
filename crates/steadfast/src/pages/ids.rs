//! Random identifiers for devices created by scenarios.

use rand::Rng;

/// Six-digit external device ID, e.g. `482913`
#[must_use]
pub fn external_device_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000..=999_999).to_string()
}

/// Eight dash-separated two-digit pairs, e.g. `12-47-83-10-99-25-61-38`
#[must_use]
pub fn dashed_device_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..8)
        .map(|_| rng.gen_range(10..=99).to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Two uppercase letters and five digits in `AA00001..=ZZ99999`
#[must_use]
pub fn short_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let a = char::from(rng.gen_range(b'A'..=b'Z'));
    let b = char::from(rng.gen_range(b'A'..=b'Z'));
    format!("{a}{b}{:05}", rng.gen_range(1..=99_999))
}
