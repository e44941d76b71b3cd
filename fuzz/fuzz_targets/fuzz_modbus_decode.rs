#![no_main]
use handwheel_hardware::modbus::{self, Decoded};
use handwheel_traits::registers::RegisterBank;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let bank = RegisterBank::new(8);
    for line_idle in [false, true] {
        if let Decoded::Frame {
            address,
            request,
            len,
        } = modbus::decode(data, line_idle)
        {
            assert!(len <= data.len());
            let _ = modbus::execute(&bank, address, &request);
        }
    }
});
