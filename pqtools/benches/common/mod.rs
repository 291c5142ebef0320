#[allow(dead_code)]

use pqtools::bit::pack;
use pqtools::decode::{HH_SPECIAL, HH_T2_CHANNEL, HH_T2_TIME, HH_T3_CHANNEL, HH_T3_DTIME, HH_T3_NSYNC};
use pqtools::T3;

/// Deterministic stand-in for measured data
pub struct Lcg(u64);

impl Lcg {
    pub fn new() -> Self {
        Lcg(0x2545_f491_4f6c_dd1d)
    }

    pub fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        return (self.0 >> 33) as u32;
    }
}

/// Raw HydraHarp v2 T2 records on four channels, with an overflow record
/// after every 64 photons
pub fn hydraharp_t2(n: usize) -> Vec<u8> {
    let mut rng = Lcg::new();
    let mut time = 0u32;
    let mut words = Vec::with_capacity(n + n / 64);
    for i in 0..n {
        if i % 64 == 63 {
            words.push(pack(&[(HH_T2_TIME, 1), (HH_T2_CHANNEL, 63), (HH_SPECIAL, 1)]));
            time = 0;
        }
        time += rng.next() % 1000;
        words.push(pack(&[(HH_T2_TIME, time), (HH_T2_CHANNEL, rng.next() % 4)]));
    }
    return words.iter().flat_map(|w| w.to_le_bytes()).collect();
}

/// Raw HydraHarp v2 T3 records, one photon per few sync pulses
pub fn hydraharp_t3(n: usize) -> Vec<u8> {
    let mut rng = Lcg::new();
    let mut words = Vec::with_capacity(n);
    for _ in 0..n {
        words.push(pack(&[
            (HH_T3_NSYNC, rng.next() % 1024),
            (HH_T3_DTIME, rng.next() % 4096),
            (HH_T3_CHANNEL, rng.next() % 4),
        ]));
    }
    return words.iter().flat_map(|w| w.to_le_bytes()).collect();
}

/// T3 events sorted except for a local shuffle within each run of 16
pub fn nearly_sorted_t3(n: usize) -> Vec<T3> {
    let mut rng = Lcg::new();
    let mut events: Vec<T3> = (0..n as u64)
        .map(|i| T3 { channel: (i % 4) as u32, pulse: i / 2, time: (rng.next() % 4096) as u64 })
        .collect();
    for chunk in events.chunks_mut(16) {
        let k = rng.next() as usize % chunk.len();
        chunk.rotate_left(k);
    }
    return events;
}
