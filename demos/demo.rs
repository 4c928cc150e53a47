//! Basic usage of the collector: allocation, rooting, and manual collection.

use tristep::{Collector, RootList, SystemAlloc};

fn main() {
    println!("=== tristep demo ===\n");

    println!("Example 1: Basic Allocation");
    basic_allocation();
    println!();

    println!("Example 2: Manual Collection");
    manual_collection();
    println!();

    println!("Example 3: Memory Pressure and Collection");
    memory_pressure();
}

fn basic_allocation() {
    let collector = Collector::new(SystemAlloc, RootList::new());

    let number = collector.allocate(42);
    let text = collector.allocate("Hello, World!".to_string());
    let vector = collector.allocate(vec![1, 2, 3, 4, 5]);

    println!("  Number: {}", *number);
    println!("  Text: {}", *text);
    println!("  Vector: {:?}", *vector);
    println!("  Live objects: {}", collector.live_objects());
}

fn manual_collection() {
    let collector = Collector::new(SystemAlloc, RootList::new());

    println!("  Allocating 5 objects, rooting only the first...");
    let kept = collector.allocate(1);
    collector.with_roots(|roots| roots.register(kept.erase()));
    let _garbage2 = collector.allocate(2);
    let _garbage3 = collector.allocate(3);
    let _garbage4 = collector.allocate(4);
    let _garbage5 = collector.allocate(5);

    println!(
        "  Before collection: {} objects, {} bytes",
        collector.live_objects(),
        collector.bytes_allocated()
    );

    collector.collect();

    println!(
        "  After collection: {} objects, {} bytes",
        collector.live_objects(),
        collector.bytes_allocated()
    );
    println!("  kept still alive: {}", *kept);
}

fn memory_pressure() {
    let collector = Collector::new(SystemAlloc, RootList::new());

    println!("  Allocating many objects, keeping every hundredth one rooted...");
    let mut live = Vec::new();
    for i in 0..1000 {
        let value = collector.allocate(vec![i; 100]);
        if i % 100 == 0 {
            collector.with_roots(|roots| roots.register(value.erase()));
            live.push(value);
        }
    }

    println!(
        "  Before collection: {} objects, {} bytes",
        collector.live_objects(),
        collector.bytes_allocated()
    );

    collector.collect();

    println!(
        "  After collection: {} objects, {} bytes",
        collector.live_objects(),
        collector.bytes_allocated()
    );
    println!("  Rooted objects kept: {}", live.len());
}
