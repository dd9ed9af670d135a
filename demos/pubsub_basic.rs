//! Basic walk-through: build a region, publish, subscribe, probe health.
//!
//! Run with `cargo run --example pubsub_basic`.

use surge::{Consumed, RegionBuilder, RingKind, SharedRegion, TopicConfig};

fn main() -> surge::Result<()> {
    tracing_subscriber::fmt::init();

    let region_name = format!("/surge-demo-{}", std::process::id());
    let region = RegionBuilder::new(&region_name, 1 << 20)
        .topic(TopicConfig::new("ticks", 1024, 64, RingKind::SingleWriter))
        .create()?;

    let mut publisher = region.swmr_publisher("ticks", 1)?;
    for value in 0u64..10 {
        let seq = publisher.publish(&value.to_le_bytes())?;
        println!("published value {value} as sequence {seq}");
    }

    // A consumer process would attach exactly like this.
    let attached = SharedRegion::open(&region_name)?;
    let mut subscriber = attached.subscriber("ticks")?;
    let mut buf = [0u8; 64];
    loop {
        match subscriber.consume(&mut buf) {
            Consumed::Delivered { seq, len, publisher_id } => {
                let value = u64::from_le_bytes(buf[..len].try_into().unwrap());
                println!("received value {value} (seq {seq}, publisher {publisher_id})");
            }
            Consumed::NoData => break,
            other => println!("outcome: {other:?}"),
        }
    }

    let probe = attached.topic("ticks").unwrap().health();
    println!("{}", probe.report(subscriber.last_seq()).to_json_line()?);

    drop(attached);
    drop(region);
    SharedRegion::unlink(&region_name)?;
    Ok(())
}
