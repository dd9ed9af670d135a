//! Multi-writer fan-in: several threads publish into one topic while a
//! single subscriber drains it.
//!
//! Run with `cargo run --example mwmr_fanin`.

use std::thread;

use surge::{Consumed, RegionBuilder, RingKind, SharedRegion, TopicConfig, METRICS};

const WRITERS: u16 = 4;
const PER_WRITER: u64 = 1000;

fn main() -> surge::Result<()> {
    tracing_subscriber::fmt::init();

    let region_name = format!("/surge-fanin-{}", std::process::id());
    let region = RegionBuilder::new(&region_name, 4 << 20)
        .topic(TopicConfig::new("events", 8192, 16, RingKind::MultiWriter))
        .create()?;

    let mut writers = Vec::new();
    for writer_id in 0..WRITERS {
        let name = region_name.clone();
        writers.push(thread::spawn(move || {
            let map = SharedRegion::open(&name).unwrap();
            let mut publisher = map.mwmr_publisher("events", writer_id).unwrap();
            for counter in 0..PER_WRITER {
                let mut payload = [0u8; 16];
                payload[..8].copy_from_slice(&(writer_id as u64).to_le_bytes());
                payload[8..].copy_from_slice(&counter.to_le_bytes());
                publisher.publish(&payload).unwrap();
            }
        }));
    }
    for writer in writers {
        writer.join().unwrap();
    }

    let mut subscriber = region.subscriber("events")?;
    let mut buf = [0u8; 16];
    let mut per_writer = [0u64; WRITERS as usize];
    while let Consumed::Delivered { .. } = subscriber.consume(&mut buf) {
        let writer_id = u64::from_le_bytes(buf[..8].try_into().unwrap());
        per_writer[writer_id as usize] += 1;
    }

    for (writer_id, count) in per_writer.iter().enumerate() {
        println!("writer {writer_id}: {count} messages delivered");
    }
    println!("skipped: {}", subscriber.skipped());
    println!("metrics: {}", METRICS.snapshot());

    drop(region);
    SharedRegion::unlink(&region_name)?;
    Ok(())
}
