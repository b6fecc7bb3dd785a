#![no_main]

use libfuzzer_sys::fuzz_target;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use emdcal_core::{CValue, DataModel, ModelCount, ModelFactory, Result, SeededDistribution};
use emdcal_orchestration::codec::{pack, unpack_results};
use emdcal_orchestration::CalibrateOutput;

#[derive(Debug, Clone)]
struct Empty;

impl DataModel for Empty {
    type Dataset = ();

    fn generate(&self, _size: usize) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct Empties;

impl ModelFactory for Empties {
    type Model = Empty;

    fn draw(&self, _rng: &mut ChaCha8Rng, _index: usize) -> Empty {
        Empty
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte picks the grid shape, the rest is the packed JSON
    let n_models = usize::from(data[0] & 0x0f);
    let n_c = usize::from(data[0] >> 4);
    let Ok(output) = serde_json::from_slice::<CalibrateOutput>(&data[1..]) else {
        return;
    };

    let c_list: Vec<CValue> = (0..n_c).map(|k| CValue(k as f64)).collect();
    let count = if n_models == 0 {
        ModelCount::Unbounded
    } else {
        ModelCount::Finite(n_models)
    };
    let dist = SeededDistribution::new(count, 0, Empties);

    // Whatever unpacks must pack back to the same arrays
    if let Ok(results) = unpack_results(&output, &dist, &c_list) {
        let repacked = pack(&c_list, &results).expect("unpacked results must pack");
        assert_eq!(repacked.bconf, output.bconf);
        assert_eq!(
            repacked.bemd.iter().map(|b| b.to_bits()).collect::<Vec<_>>(),
            output.bemd.iter().map(|b| b.to_bits()).collect::<Vec<_>>()
        );
    }
});
