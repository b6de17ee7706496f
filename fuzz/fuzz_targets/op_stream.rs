#![no_main]
use libfuzzer_sys::fuzz_target;
use tinymap::ops;

fuzz_target!(|data: &[u8]| {
    let actions = ops::decode(data);
    if let Err(divergence) = ops::replay(&actions) {
        panic!("{divergence} after {} actions", actions.len());
    }
});
