#![no_main]

use libfuzzer_sys::fuzz_target;

use emdcal_core::prob_less;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let values: Vec<f64> = data[1..]
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();
    let split = usize::from(data[0]).min(values.len());
    let (a, b) = values.split_at(split);

    if let Ok(p) = prob_less(a, b) {
        assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
        let q = prob_less(b, a).expect("swapped inputs must also succeed");
        assert!(p + q <= 1.0 + 1e-12, "P(a<b) + P(b<a) = {}", p + q);
    }
});
