#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary archives: ZIP extraction -> descriptor parsing -> model rewriting
    let mut out = Cursor::new(Vec::new());
    let _ = bambu2prusa::Converter::new().transcode(Cursor::new(data), &mut out);
});
