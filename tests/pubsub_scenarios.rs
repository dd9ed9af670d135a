//! End-to-end publish/subscribe scenarios across separate mappings.

use surge::{Consumed, RegionBuilder, RetCode, RingKind, SharedRegion, TopicConfig};

fn test_region(name: &str) -> String {
    format!("/surge-e2e-{}-{}", name, std::process::id())
}

fn cleanup(name: &str) {
    let _ = SharedRegion::unlink(name);
}

#[test]
fn test_single_writer_single_reader_in_order() {
    let name = test_region("inorder");
    cleanup(&name);

    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("ticks", 64, 64, RingKind::SingleWriter))
        .create()
        .unwrap();

    // Subscriber attaches through its own mapping, before the first publish.
    let reader_map = SharedRegion::open(&name).unwrap();
    let mut subscriber = reader_map.subscriber("ticks").unwrap();

    let mut publisher = region.swmr_publisher("ticks", 1).unwrap();
    for value in 1u64..=100 {
        publisher.publish(&value.to_be_bytes()).unwrap();
    }

    let mut buf = [0u8; 64];
    let mut received = Vec::new();
    loop {
        match subscriber.consume(&mut buf) {
            Consumed::Delivered { len, .. } => {
                assert_eq!(len, 8);
                received.push(u64::from_be_bytes(buf[..8].try_into().unwrap()));
            }
            Consumed::NoData => break,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(received, (1u64..=100).collect::<Vec<_>>());
    assert_eq!(subscriber.skipped(), 0);

    drop(reader_map);
    drop(region);
    cleanup(&name);
}

#[test]
fn test_lagging_subscriber_jumps_forward() {
    let name = test_region("lagging");
    cleanup(&name);

    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("burst", 16, 64, RingKind::SingleWriter))
        .create()
        .unwrap();

    let mut publisher = region.swmr_publisher("burst", 1).unwrap();
    for value in 1u64..=160 {
        publisher.publish(&value.to_le_bytes()).unwrap();
    }

    let reader_map = SharedRegion::open(&name).unwrap();
    let mut subscriber = reader_map.subscriber("burst").unwrap();

    let mut buf = [0u8; 64];
    let first = subscriber.consume(&mut buf);
    let second = subscriber.consume(&mut buf);

    for outcome in [first, second] {
        if let Consumed::Delivered { seq, .. } = outcome {
            assert!((145..=160).contains(&seq), "sequence {seq} was reclaimed");
        }
    }
    assert!(
        matches!(second, Consumed::Delivered { .. }),
        "second consume must deliver from the live window, got {second:?}"
    );
    assert!(subscriber.skipped() >= 144, "skipped {}", subscriber.skipped());

    drop(reader_map);
    drop(region);
    cleanup(&name);
}

#[test]
fn test_late_subscriber_starts_in_live_window() {
    let name = test_region("late");
    cleanup(&name);

    let slot_count = 32u64;
    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("t", slot_count as u32, 64, RingKind::SingleWriter))
        .create()
        .unwrap();

    let mut publisher = region.swmr_publisher("t", 1).unwrap();
    for value in 1..=(10 * slot_count) {
        publisher.publish(&value.to_le_bytes()).unwrap();
    }

    let mut subscriber = region.subscriber("t").unwrap();
    let mut buf = [0u8; 64];
    match subscriber.consume(&mut buf) {
        Consumed::Delivered { seq, .. } => {
            assert!(seq >= 10 * slot_count - slot_count + 1, "got stale sequence {seq}");
        }
        other => panic!("expected delivery, got {other:?}"),
    }

    drop(region);
    cleanup(&name);
}

#[test]
fn test_oversize_publish_rejected_without_reservation() {
    let name = test_region("oversize");
    cleanup(&name);

    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("t", 16, 64, RingKind::SingleWriter))
        .create()
        .unwrap();

    let mut publisher = region.swmr_publisher("t", 1).unwrap();
    let err = publisher.publish(&[0u8; 65]).unwrap_err();
    assert_eq!(err.code(), RetCode::PayloadTooLarge);
    assert_eq!(publisher.write_head(), 0);

    // The ring still works normally afterwards.
    assert_eq!(publisher.publish(&[0u8; 64]).unwrap(), 1);

    drop(region);
    cleanup(&name);
}

#[test]
fn test_truncated_consume_advances_past_message() {
    let name = test_region("truncated");
    cleanup(&name);

    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("t", 16, 128, RingKind::SingleWriter))
        .create()
        .unwrap();

    let mut publisher = region.swmr_publisher("t", 1).unwrap();
    publisher.publish(&[0x11; 100]).unwrap();

    let mut subscriber = region.subscriber("t").unwrap();
    let mut small = [0u8; 32];

    let outcome = subscriber.consume(&mut small);
    assert_eq!(outcome, Consumed::Truncated { seq: 1, required: 100 });
    assert_eq!(outcome.code(), RetCode::Truncated);

    // The cursor moved past the oversized message.
    assert_eq!(subscriber.consume(&mut small), Consumed::NoData);

    publisher.publish(b"next").unwrap();
    match subscriber.consume(&mut small) {
        Consumed::Delivered { seq, len, .. } => {
            assert_eq!(seq, 2);
            assert_eq!(&small[..len], b"next");
        }
        other => panic!("expected delivery, got {other:?}"),
    }

    drop(region);
    cleanup(&name);
}

#[test]
fn test_zero_length_payloads_round_trip() {
    let name = test_region("zerolen");
    cleanup(&name);

    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("t", 16, 64, RingKind::SingleWriter))
        .create()
        .unwrap();

    let mut publisher = region.swmr_publisher("t", 2).unwrap();
    publisher.publish(&[]).unwrap();

    let mut subscriber = region.subscriber("t").unwrap();
    let mut buf = [0u8; 64];
    assert_eq!(
        subscriber.consume(&mut buf),
        Consumed::Delivered { seq: 1, len: 0, publisher_id: 2 }
    );

    drop(region);
    cleanup(&name);
}

#[test]
fn test_independent_subscribers_keep_independent_cursors() {
    let name = test_region("independent");
    cleanup(&name);

    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("t", 64, 64, RingKind::SingleWriter))
        .create()
        .unwrap();

    let mut publisher = region.swmr_publisher("t", 1).unwrap();
    for value in 0u64..10 {
        publisher.publish(&value.to_le_bytes()).unwrap();
    }

    let mut fast = region.subscriber("t").unwrap();
    let mut slow = region.subscriber("t").unwrap();
    let mut buf = [0u8; 64];

    for _ in 0..10 {
        assert!(matches!(fast.consume(&mut buf), Consumed::Delivered { .. }));
    }
    assert_eq!(fast.last_seq(), 10);
    assert_eq!(slow.last_seq(), 0);
    assert_eq!(slow.available(), 10);

    assert!(matches!(slow.consume(&mut buf), Consumed::Delivered { seq: 1, .. }));

    drop(region);
    cleanup(&name);
}

#[test]
fn test_health_probe_from_second_mapping() {
    let name = test_region("health");
    cleanup(&name);

    let region = RegionBuilder::new(&name, 1 << 20)
        .topic(TopicConfig::new("t", 16, 64, RingKind::SingleWriter))
        .create()
        .unwrap();

    let mut publisher = region.swmr_publisher("t", 1).unwrap();
    for value in 0u64..5 {
        publisher.publish(&value.to_le_bytes()).unwrap();
    }

    let observer = SharedRegion::open(&name).unwrap();
    let probe = observer.topic("t").unwrap().health();
    assert_eq!(probe.total_published(), 5);
    assert!(probe.last_publish_ns() > 0);

    let report = probe.report(3);
    assert_eq!(report.lag, 2);
    let line = report.to_json_line().unwrap();
    assert!(line.contains("\"published\":5"));
    assert!(line.contains("\"lag\":2"));

    drop(observer);
    drop(region);
    cleanup(&name);
}
