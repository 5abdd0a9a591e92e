use chrono::{DateTime, TimeZone, Utc};
use docrepo::{ObjectId, RepositoryError};

#[test]
fn byte_construction() {
    let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
    let id = ObjectId::from_bytes(bytes);

    assert_eq!(id.timestamp(), 0x0102_0304);
    assert_eq!(
        id.creation_time(),
        Utc.timestamp_opt(0x0102_0304, 0).unwrap()
    );
    assert_eq!(id.to_string(), "0102030405060708090a0b0c");
    assert_eq!(id.bytes(), bytes);
}

#[test]
fn hex_round_trip() {
    let id = ObjectId::parse("0102030405060708090a0b0c").unwrap();
    assert_eq!(id.bytes(), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    assert_eq!(id.to_string(), "0102030405060708090a0b0c");
}

#[test]
fn invalid_hex_is_rejected() {
    assert!(matches!(
        ObjectId::parse("0102").unwrap_err(),
        RepositoryError::InvalidArgument(_)
    ));
    assert!(matches!(
        ObjectId::parse("zz02030405060708090a0b0c").unwrap_err(),
        RepositoryError::InvalidArgument(_)
    ));
}

#[test]
fn timestamp_is_interpreted_as_unsigned() {
    let expect = |timestamp: u32, text: &str| {
        let id = ObjectId::generate_with_timestamp(timestamp);
        let expected: DateTime<Utc> = text.parse().unwrap();
        assert_eq!(id.creation_time(), expected);
    };

    expect(0x0000_0000, "1970-01-01T00:00:00Z");
    expect(0x7FFF_FFFF, "2038-01-19T03:14:07Z");
    expect(0x8000_0000, "2038-01-19T03:14:08Z");
    expect(0xFFFF_FFFF, "2106-02-07T06:28:15Z");
}

#[test]
fn generation_stamps_the_current_time() {
    let before = Utc::now().timestamp() as u32;
    let id = ObjectId::generate();
    let after = Utc::now().timestamp() as u32;

    assert!(id.timestamp() >= before && id.timestamp() <= after);
}

#[test]
fn sequential_generation_orders() {
    let first = ObjectId::generate_with_timestamp(42);
    let second = ObjectId::generate_with_timestamp(42);

    assert!(first < second);
    assert!(first <= second);
    assert_ne!(first, second);

    let copy = first;
    assert_eq!(first, copy);
    assert!(first <= copy && first >= copy);
}

#[test]
fn ordering_follows_the_byte_layout() {
    let base = ObjectId::parse("0102030405060708090a0b0c").unwrap();

    // Larger timestamp, random, and increment components each order above.
    for larger in [
        "0102030505060708090a0b0c",
        "0102030405060808090a0b0c",
        "0102030405060708090a0b0d",
    ] {
        let other = ObjectId::parse(larger).unwrap();
        assert!(base < other);
        assert!(other > base);
    }
}

#[test]
fn component_ranges_are_validated() {
    assert!(ObjectId::create(1, 0xFF_FFFF_FFFF, 0xFF_FFFF).is_ok());
    assert!(matches!(
        ObjectId::create(1, 0x100_0000_0000, 0).unwrap_err(),
        RepositoryError::InvalidArgument(_)
    ));
    assert!(matches!(
        ObjectId::create(1, 0, 0x100_0000).unwrap_err(),
        RepositoryError::InvalidArgument(_)
    ));
}

#[test]
fn serde_round_trip() {
    let id = ObjectId::parse("0102030405060708090a0b0c").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"0102030405060708090a0b0c\"");

    let back: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
