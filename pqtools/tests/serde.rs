use pqtools::ser::{self, Printer};
use pqtools::{de, Error, HistogramBin, T2, T3};
use std::io::Write;

fn t3s() -> Vec<T3> {
    vec![
        T3 { channel: 1, pulse:  0, time:   16 },
        T3 { channel: 2, pulse:  4, time: 4096 },
        T3 { channel: 1, pulse: 99, time:    0 },
    ]
}

#[test]
fn ascii_lines() {
    let mut out = Vec::new();
    {
        let mut wtr = ser::writer(&mut out);
        ser::t2_csv(&mut wtr, &T2 { channel: 3, time: 1_000_000_000_001 }).unwrap();
        ser::t3_csv(&mut wtr, &T3 { channel: 0, pulse: 12, time: 250 }).unwrap();
        wtr.flush().unwrap();
    }
    assert_eq!(String::from_utf8(out).unwrap(), "3,1000000000001\n0,12,250\n");
}

#[test]
fn binary_layout() {
    let mut b = Vec::new();
    ser::t2_binary(&mut b, &T2 { channel: 2, time: 0x0102_0304_0506_0708 }).unwrap();
    assert_eq!(b, [2, 0, 0, 0, 0, 0, 0, 0, 8, 7, 6, 5, 4, 3, 2, 1]);

    let mut b = Vec::new();
    ser::t3_binary(&mut b, &T3 { channel: 1, pulse: 2, time: 3 }).unwrap();
    assert_eq!(b.len(), ser::T3_SIZE);
    assert_eq!(&b[4..8], &[0, 0, 0, 0]);
    assert_eq!(b[8], 2);
    assert_eq!(b[16], 3);
}

#[test]
fn t3_text_and_binary_read_back() {
    let events = t3s();

    let mut text = Printer::new(Vec::new(), false);
    let mut binary = Printer::new(Vec::new(), true);
    for e in &events {
        text.t3(e).unwrap();
        binary.t3(e).unwrap();
    }
    let text = text.into_inner().unwrap();
    let binary = binary.into_inner().unwrap();

    assert_eq!(de::t3_csv(&mut de::reader(&*text)).unwrap(), events);
    assert_eq!(de::t3_binary(&mut &*binary).unwrap(), events);
}

#[test]
fn streaming_readers() {
    let text = "1,10\n2,20\n";
    let events: Vec<T2> = de::csv_events(de::reader(text.as_bytes()))
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(events, vec![T2 { channel: 1, time: 10 }, T2 { channel: 2, time: 20 }]);

    let mut b = Vec::new();
    ser::t2_binary(&mut b, &events[0]).unwrap();
    b.extend_from_slice(&[1, 2, 3]);
    let results: Vec<_> = de::binary_events::<T2, _>(&*b).collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap(), &events[0]);
    assert!(matches!(results[1], Err(Error::Truncated { read: 3, expected: 16 })));
}

#[test]
fn bad_text_is_a_parse_error() {
    let res = de::t2_csv(&mut de::reader("1,ten\n".as_bytes()));
    match res {
        Err(Error::Parse { field: "time", value }) => assert_eq!(value, "ten"),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn histogram_bins() {
    let bins = vec![
        HistogramBin { curve: 0, bin_left: 0.0, bin_right: 250.0, counts: 12 },
        HistogramBin { curve: 0, bin_left: 250.0, bin_right: 500.0, counts: 7 },
    ];

    let mut text = Vec::new();
    {
        let mut wtr = ser::writer(&mut text);
        for b in &bins {
            ser::bin_csv(&mut wtr, b).unwrap();
        }
        wtr.flush().unwrap();
    }
    assert_eq!(String::from_utf8(text.clone()).unwrap(), "0,0.00,0.25,12\n0,0.25,0.50,7\n");
    assert_eq!(de::bin_csv(&mut de::reader(&*text)).unwrap(), bins);

    let mut b = Vec::new();
    for bin in &bins {
        ser::bin_binary(&mut b, bin).unwrap();
    }
    assert_eq!(b.len(), 2 * ser::BIN_SIZE);
    assert_eq!(de::bin_binary(&mut &*b).unwrap(), bins);
}

#[test]
fn resolution_line() {
    let mut text = Vec::new();
    ser::resolution(&mut text, 4.0, false).unwrap();
    ser::resolution(&mut text, 36.6, false).unwrap();
    assert_eq!(String::from_utf8(text).unwrap(), "4.00\n36.60\n");

    let mut b = Vec::new();
    ser::resolution(&mut b, 16.0, true).unwrap();
    assert_eq!(b, 16.0f64.to_le_bytes());
}

/// Files ending in .zst are decompressed on open
#[test]
fn open_zstd() {
    let dir = std::env::temp_dir();
    let plain = dir.join(format!("pqtools-serde-{}.csv", std::process::id()));
    let packed = dir.join(format!("pqtools-serde-{}.csv.zst", std::process::id()));
    let text = b"1,0,16\n2,4,4096\n1,99,0\n";

    std::fs::write(&plain, text).unwrap();
    let mut zwtr = zstd::stream::write::Encoder::new(std::fs::File::create(&packed).unwrap(), 0).unwrap();
    zwtr.write_all(text).unwrap();
    zwtr.finish().unwrap();

    for path in [&plain, &packed] {
        let events = de::t3_csv(&mut de::reader(de::open(path).unwrap())).unwrap();
        assert_eq!(events, t3s());
    }
    std::fs::remove_file(plain).unwrap();
    std::fs::remove_file(packed).unwrap();
}
