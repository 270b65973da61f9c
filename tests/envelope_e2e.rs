use chrono::{TimeZone, Utc};

use dms_bus::{
    deserialize, serialize, Body, DataSet, DataSetQuery, DataType, DataTypeRegistry,
    DeserializationError, Discover, Hello, Message, NoResults, RawDataPoint, RawDatum,
    TagExpression, TagSet, Value,
};

fn through_the_wire<T: DataType + Clone>(record: &T, topic: &str) -> T {
    let bytes = record.to_message(topic).to_bytes().unwrap();
    let message = deserialize(&bytes).unwrap();
    assert_eq!(message.data_type(), T::NAME);
    assert_eq!(message.topic(), topic);

    let decoded = DataTypeRegistry::with_builtin_types()
        .from_message(&message)
        .unwrap();
    decoded
        .downcast_ref::<T>()
        .expect("decoded record has the wrong type")
        .clone()
}

#[test]
fn every_builtin_record_survives_the_wire() {
    let t = |s: i64| Utc.timestamp_opt(s, 0).unwrap();

    let probe = Discover::new("/ma.i/", "data-processor").unwrap();
    assert_eq!(through_the_wire(&probe, "console:probe:1"), probe);

    let hello = Hello::new("magi", "data-processor", 4242);
    assert_eq!(through_the_wire(&hello, "console:probe:1"), hello);

    let datum = RawDatum::new("system", "CPU usage", "user", 12.5).with_time_stamp(t(10));
    assert_eq!(through_the_wire(&datum, ""), datum);

    let point = datum.to_raw_data_point_at("magi", t(20));
    assert_eq!(through_the_wire(&point, "magi"), point);

    let data_set = DataSet::new("memory", TagSet::parse("location:magi, system:memory"), "B", t(0), t(60))
        .with_point("free", t(1), 100)
        .with_point("free", t(2), 101)
        .with_point("used", t(1), "n/a");
    assert_eq!(through_the_wire(&data_set, "q1"), data_set);

    let query = DataSetQuery::new(
        "q1",
        TagExpression::parse("location:/magi/, system:memory").unwrap(),
        t(0),
        t(60),
        0.5,
    );
    assert_eq!(through_the_wire(&query, ""), query);

    assert_eq!(through_the_wire(&NoResults, "q1"), NoResults);
}

#[test]
fn records_stamped_with_nanoseconds_survive_the_wire() {
    let t = |nanos: u32| Utc.timestamp_opt(1_700_000_000, nanos).unwrap();

    let point = RawDatum::new("system", "memory", "free", 1).to_raw_data_point("magi");
    assert_eq!(through_the_wire(&point, "magi"), point);

    let point = RawDatum::new("system", "memory", "free", 1)
        .with_time_stamp(t(551_828_381))
        .to_raw_data_point_at("magi", t(0));
    assert_eq!(through_the_wire(&point, ""), point);

    let point = RawDataPoint::new("magi", "system", "memory", "free", 2, t(999_999_501));
    assert_eq!(through_the_wire(&point, ""), point);

    let data_set = DataSet::new("memory", TagSet::parse("location:magi"), "B", t(1), t(999))
        .with_point("free", t(123_456_789), 100);
    assert_eq!(through_the_wire(&data_set, "q1"), data_set);

    let query = DataSetQuery::new("q1", TagExpression::new(), t(7), t(987_654_321), 1.0);
    assert_eq!(through_the_wire(&query, ""), query);
}

#[test]
fn nil_sample_values_survive_the_wire() {
    let datum = RawDatum::new("system", "memory", "free", Value::Nil);
    assert_eq!(through_the_wire(&datum, ""), datum);

    let point = datum.to_raw_data_point("magi");
    assert_eq!(through_the_wire(&point, ""), point);
    assert!(point.value.is_nil());
}

#[test]
fn envelope_layout_is_bit_exact() {
    let body = Body::new().with("a", 1);
    let bytes = serialize("Hello", "abc", 3, "msgpack", &body).unwrap();

    let mut expected = b"Hello/abc\n3\nmsgpack\n\n".to_vec();
    expected.extend_from_slice(&[0x81, 0xa1, b'a', 0x01]);
    assert_eq!(bytes, expected);
}

#[test]
fn header_and_body_can_travel_separately() {
    let message = Hello::new("magi", "p", 1).to_message("t");
    let header = message.header();
    let body = message.body_bytes().unwrap();

    assert_eq!(header, "Hello/t\n0\nmsgpack");
    let loaded = Message::load_split(header.as_bytes(), &body).unwrap();
    assert_eq!(loaded, message);
}

#[test]
fn malformed_envelopes_are_classified() {
    let body = rmp_serde::to_vec(&Body::new().with("a", 1)).unwrap();
    let with_header = |header: &str, body: &[u8]| {
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(b"\n\n");
        bytes.extend_from_slice(body);
        bytes
    };

    assert!(matches!(
        deserialize(b"Hello/\n0\nmsgpack"),
        Err(DeserializationError::MissingHeaderBodyDelimiter { .. })
    ));
    assert!(matches!(
        deserialize(&with_header("NoSlash\n0\nmsgpack", &body)),
        Err(DeserializationError::BadHeader { .. })
    ));
    assert!(matches!(
        deserialize(&with_header("Hello/\n0\nbson", &body)),
        Err(DeserializationError::UnsupportedEncoding { .. })
    ));
    assert!(matches!(
        deserialize(&with_header("Hello/\n0\nmsgpack", &[0xc1])),
        Err(DeserializationError::BodyDecoding { .. })
    ));
    assert!(matches!(
        deserialize(&with_header("Hello/\n0\nmsgpack", &rmp_serde::to_vec("text").unwrap())),
        Err(DeserializationError::BodyNotHash { .. })
    ));
}

#[test]
fn non_string_body_keys_are_normalized() {
    let map = Value::Map(vec![(Value::Int(1), Value::from("one"))]);
    let mut bytes = b"Test/\n0\nmsgpack\n\n".to_vec();
    bytes.extend_from_slice(&rmp_serde::to_vec(&map).unwrap());

    let message = deserialize(&bytes).unwrap();
    assert_eq!(message.get("1"), Some(&Value::from("one")));
}
