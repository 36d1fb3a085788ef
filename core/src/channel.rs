//! BPSK over an additive white Gaussian noise channel.
//!
//! The channel never drops or inserts bits: whatever goes in comes out with
//! the same length, possibly with some bits flipped.

use log::debug;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{LinkError, Result};

/// Expand bytes into bits, most significant bit first
pub fn bytes_to_bits(data: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1 == 1);
        }
    }
    bits
}

/// Pack bits into bytes, most significant bit first
pub fn bits_to_bytes(bits: &[bool]) -> Result<Vec<u8>> {
    if bits.len() % 8 != 0 {
        return Err(LinkError::BitLength(bits.len()));
    }
    Ok(pack_bits(bits))
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | bit as u8))
        .collect()
}

/// Antipodal mapping: 0 -> -1.0, 1 -> +1.0
pub fn bpsk_modulate(bits: &[bool]) -> Vec<f64> {
    bits.iter().map(|&bit| if bit { 1.0 } else { -1.0 }).collect()
}

/// Hard decision at zero. An exact zero (or NaN) decides 0.
pub fn bpsk_demodulate(symbols: &[f64]) -> Vec<bool> {
    symbols.iter().map(|&s| s > 0.0).collect()
}

/// Noise standard deviation for unit-energy BPSK at the given Eb/N0
pub fn noise_sigma(eb_n0_db: f64) -> f64 {
    let eb_n0 = 10f64.powf(eb_n0_db / 10.0);
    (1.0 / (2.0 * eb_n0)).sqrt()
}

/// Add independent zero-mean Gaussian noise to every symbol
pub fn awgn_channel<R: Rng + ?Sized>(symbols: &[f64], eb_n0_db: f64, rng: &mut R) -> Vec<f64> {
    let sigma = noise_sigma(eb_n0_db);
    symbols
        .iter()
        .map(|&s| {
            let n: f64 = rng.sample(StandardNormal);
            s + sigma * n
        })
        .collect()
}

/// Send bytes through modulate -> noise -> demodulate using `rng` for the noise
pub fn transmit_with_rng<R: Rng + ?Sized>(data: &[u8], eb_n0_db: f64, rng: &mut R) -> Vec<u8> {
    let bits = bytes_to_bits(data);
    let noisy = awgn_channel(&bpsk_modulate(&bits), eb_n0_db, rng);
    // One symbol per bit in, one bit per symbol out: always whole bytes
    let received = pack_bits(&bpsk_demodulate(&noisy));

    debug!(
        "channel: {} bytes at {:.1} dB Eb/N0, {} bit errors",
        data.len(),
        eb_n0_db,
        count_bit_errors(data, &received)
    );
    received
}

/// Send bytes through the noisy channel using the thread RNG
pub fn simulate_channel(data: &[u8], eb_n0_db: f64) -> Vec<u8> {
    transmit_with_rng(data, eb_n0_db, &mut rand::thread_rng())
}

/// Number of differing bits over the common prefix of `a` and `b`
pub fn count_bit_errors(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x ^ y).count_ones() as usize)
        .sum()
}

/// Fraction of flipped bits; 0.0 for empty input
pub fn bit_error_rate(sent: &[u8], received: &[u8]) -> f64 {
    let total = sent.len().min(received.len()) * 8;
    if total == 0 {
        return 0.0;
    }
    count_bit_errors(sent, received) as f64 / total as f64
}
