use peak_alloc::PeakAlloc;
use pktcls_core::{
    dim::{Dim, DimRange},
    engine::Classifier,
    rule::{Packet, RangeRule},
};
use pktcls_hs::HyperSplit;

#[test]
#[ignore = "test should be run manually"]
fn test_no_memory_leak() {
    #[global_allocator]
    static PEAK_ALLOC: PeakAlloc = PeakAlloc;

    let mut rules = Vec::new();
    for i in 0..512u32 {
        let mut r = RangeRule::any(i);
        r.dims[Dim::Sport.index()] = DimRange {
            low: (i % 64) * 1024,
            high: (i % 64) * 1024 + 1023,
        };
        rules.push(r);
    }

    let current_mem = PEAK_ALLOC.current_usage_as_kb();
    println!("This program initially uses {} kB of RAM.", current_mem);

    // First round ---------------
    let index = HyperSplit::build(&rules).unwrap();
    assert_eq!(index.lookup(&Packet::new([0, 0, 100, 0, 0])), Some(0));
    let current_mem = PEAK_ALLOC.current_usage_as_kb();
    println!("first time: after build: it uses {} kB of RAM.", current_mem);

    drop(index);
    let after_first = PEAK_ALLOC.current_usage_as_kb();
    println!(
        "first time: after cleanup: it uses {} kB of RAM.",
        after_first
    );

    // Second round ---------------
    let index = HyperSplit::build(&rules).unwrap();
    let current_mem = PEAK_ALLOC.current_usage_as_kb();
    println!(
        "second time: after build: it uses {} kB of RAM.",
        current_mem
    );

    drop(index);
    let after_second = PEAK_ALLOC.current_usage_as_kb();
    println!(
        "second time: after cleanup: it uses {} kB of RAM.",
        after_second
    );

    // cleanup releases everything the build allocated
    assert!(after_second <= after_first + 1.0);
}
