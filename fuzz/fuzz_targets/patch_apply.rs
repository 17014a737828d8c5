#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    treesync_fuzz::fuzz_shared_tree(data);
    treesync_fuzz::fuzz_store(data);
});
