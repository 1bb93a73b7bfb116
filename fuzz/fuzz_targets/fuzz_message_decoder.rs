#![no_main]
use libfuzzer_sys::fuzz_target;
use washcall_core::decode_congestion;
use washcall_core::wire::{
    decode_course_started, decode_machine_list, decode_message, decode_room_reserved, decode_tip,
};

// Server frames are untrusted; every decoder must reject garbage without panicking.
fuzz_target!(|data: &str| {
    let _ = decode_message(data);
    let _ = decode_machine_list(data);
    let _ = decode_course_started(1, data);
    let _ = decode_congestion(data);
    let _ = decode_tip(data);
    let _ = decode_room_reserved(1, true, data);
});
