use pqtools::bit::pack;
use pqtools::cfg::Calibration;
use pqtools::decode::*;
use pqtools::stream::{self, Options, Quiet, Summary, TextDiagnostics};
use pqtools::{de, ser, Error, T2, T3};

fn hh_t2(special: u32, channel: u32, time: u32) -> u32 {
    pack(&[(HH_T2_TIME, time), (HH_T2_CHANNEL, channel), (HH_SPECIAL, special)])
}

fn hh_t3(special: u32, channel: u32, nsync: u32, dtime: u32) -> u32 {
    pack(&[(HH_T3_NSYNC, nsync), (HH_T3_DTIME, dtime), (HH_T3_CHANNEL, channel), (HH_SPECIAL, special)])
}

fn bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn run(format: RecordFormat, cal: &Calibration, options: &Options, input: &[u8]) -> (String, Summary) {
    let mut out = Vec::new();
    let mut rdr = input;
    let summary = stream::stream(&mut rdr, &mut out, format, cal, options, &mut Quiet).unwrap();
    (String::from_utf8(out).unwrap(), summary)
}

/// An overflow worth 1000 ticks shifts every later event
#[test]
fn t2_end_to_end() {
    let cal = Calibration { overflow_increment: Some(1000), ..Default::default() };
    let input = bytes(&[hh_t2(1, 63, 1), hh_t2(0, 0, 5), hh_t2(0, 1, 10)]);
    let (out, summary) = run(RecordFormat::HydraHarpV2T2, &cal, &Options::default(), &input);
    assert_eq!(out, "0,1005\n1,1010\n");
    assert_eq!(summary, Summary { records: 2, markers: 0, overflows: 1 });
}

#[test]
fn t3_end_to_end() {
    let cal = Calibration { resolution: Some(4e-12), ..Default::default() };
    let input = bytes(&[hh_t3(0, 2, 4, 7), hh_t3(1, 63, 1, 0), hh_t3(0, 1, 3, 2)]);
    let (out, _) = run(RecordFormat::HydraHarpV2T3, &cal, &Options::default(), &input);
    assert_eq!(out, "2,4,28\n1,1027,8\n");
}

#[test]
fn t3_to_t2() {
    let cal = Calibration {
        resolution: Some(1e-12),
        sync_rate: 1_000_000,
        ..Default::default()
    };
    let options = Options { to_t2: true, ..Default::default() };
    let input = bytes(&[hh_t3(0, 2, 4, 7)]);
    let (out, _) = run(RecordFormat::HydraHarpV2T3, &cal, &options, &input);
    assert_eq!(out, "2,4000000\n");

    // Same input, same output
    let (again, _) = run(RecordFormat::HydraHarpV2T3, &cal, &options, &input);
    assert_eq!(out, again);
}

#[test]
fn to_t2_needs_a_sync_rate() {
    let cal = Calibration { resolution: Some(1e-12), ..Default::default() };
    let options = Options { to_t2: true, ..Default::default() };
    let input = bytes(&[hh_t3(0, 2, 4, 7)]);
    let mut out = Vec::new();
    let mut rdr = &*input;
    let res = stream::stream(&mut rdr, &mut out, RecordFormat::HydraHarpV2T3, &cal, &options, &mut Quiet);
    assert!(matches!(res, Err(Error::Options(_))));
    assert!(out.is_empty());
    // Nothing was read either
    assert_eq!(rdr.len(), 4);
}

#[test]
fn to_t2_rejected_for_timeharp_200() {
    let cal = Calibration {
        resolution: Some(1e-12),
        sync_rate: 1_000_000,
        ..Default::default()
    };
    let options = Options { to_t2: true, ..Default::default() };
    let mut out = Vec::new();
    let res = stream::stream(&mut &[0u8; 4][..], &mut out, RecordFormat::TimeHarp200, &cal, &options, &mut Quiet);
    assert!(matches!(res, Err(Error::Options(_))));
    assert!(out.is_empty());
}

/// The driver stops right after the last counted record and reads no further
#[test]
fn limit_stops_reading() {
    let words = [
        hh_t2(0, 1, 1),
        hh_t2(0, 1, 2),
        hh_t2(1, 4, 0),
        hh_t2(0, 1, 3),
        hh_t2(1, 63, 1),
        hh_t2(0, 1, 4),
    ];
    let input = bytes(&words);
    let options = Options { number: Some(3), ..Default::default() };
    let mut out = Vec::new();
    let mut rdr = &*input;
    let summary = stream::stream(
        &mut rdr,
        &mut out,
        RecordFormat::HydraHarpV2T2,
        &Calibration::default(),
        &options,
        &mut Quiet,
    )
    .unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(summary.markers, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "1,1\n1,2\n1,3\n");
    assert_eq!(rdr.len(), 8);
}

#[test]
fn limit_zero_reads_nothing() {
    let input = bytes(&[hh_t2(0, 1, 1)]);
    let options = Options { number: Some(0), ..Default::default() };
    let (out, summary) = run(RecordFormat::HydraHarpV2T2, &Calibration::default(), &options, &input);
    assert!(out.is_empty());
    assert_eq!(summary.records, 0);
}

#[test]
fn markers_and_progress_go_to_diagnostics() {
    let words = [hh_t2(0, 1, 1), hh_t2(1, 3, 0), hh_t2(0, 1, 2), hh_t2(0, 2, 3), hh_t2(0, 2, 4)];
    let input = bytes(&words);
    let options = Options { print_every: Some(2), ..Default::default() };
    let mut out = Vec::new();
    let mut diag = TextDiagnostics::new(Vec::new(), "test");
    stream::stream(
        &mut &*input,
        &mut out,
        RecordFormat::HydraHarpV2T2,
        &Calibration::default(),
        &options,
        &mut diag,
    )
    .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "1,1\n1,2\n2,3\n2,4\n");

    let diag = String::from_utf8(diag.into_inner()).unwrap();
    let lines: Vec<&str> = diag.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "External marker: 3");
    assert!(lines[1].ends_with(&format!("(test) Record {:>20}", 2)));
    assert!(lines[2].ends_with(&format!("(test) Record {:>20}", 4)));
}

#[test]
fn binary_output_reads_back() {
    let cal = Calibration { resolution: Some(25e-12), ..Default::default() };
    let words = [hh_t3(0, 1, 5, 3), hh_t3(1, 63, 2, 0), hh_t3(0, 2, 1, 9)];
    let input = bytes(&words);
    let options = Options { binary_out: true, ..Default::default() };
    let mut out = Vec::new();
    stream::stream(&mut &*input, &mut out, RecordFormat::TimeHarp260PT3, &cal, &options, &mut Quiet).unwrap();
    assert_eq!(out.len(), 2 * 24);
    let events = de::t3_binary(&mut &*out).unwrap();
    assert_eq!(
        events,
        vec![
            T3 { channel: 1, pulse: 5, time: 75 },
            T3 { channel: 2, pulse: 2049, time: 225 },
        ]
    );
}

#[test]
fn truncated_input_is_an_error() {
    let mut input = bytes(&[hh_t2(0, 1, 1)]);
    input.extend_from_slice(&[0, 0]);
    let mut out = Vec::new();
    let res = stream::stream(
        &mut &*input,
        &mut out,
        RecordFormat::HydraHarpV2T2,
        &Calibration::default(),
        &Options::default(),
        &mut Quiet,
    );
    assert!(matches!(res, Err(Error::Truncated { read: 2, expected: 4 })));
}

#[test]
fn mode_mismatch() {
    assert!(matches!(RecordFormat::PicoHarpT3.t2(), Err(Error::Mode(_))));
    assert!(matches!(RecordFormat::HydraHarpV1T2.t3(), Err(Error::Mode(_))));
}

#[test]
fn events_feed_windowing() {
    let cal = Calibration { overflow_increment: Some(100), ..Default::default() };
    let input = bytes(&[hh_t2(0, 0, 5), hh_t2(1, 63, 1), hh_t2(1, 1, 0), hh_t2(0, 1, 7)]);
    let tttr = RecordFormat::HydraHarpV2T2.tttr(&cal).unwrap();
    let mut diag = TextDiagnostics::new(Vec::new(), "test");
    let events: Vec<T2> = Events::new(&*input, T2Format::HydraHarpV2, tttr, &mut diag)
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(events, vec![T2 { channel: 0, time: 5 }, T2 { channel: 1, time: 107 }]);
    assert_eq!(String::from_utf8(diag.into_inner()).unwrap(), "External marker: 1\n");
}

/// Fixed-resolution formats report their hardware value; the rest report
/// the calibrated one
#[test]
fn resolution_report() {
    let mut out = Vec::new();
    let tttr = RecordFormat::PicoHarpT2.tttr(&Calibration::default()).unwrap();
    ser::resolution(&mut out, tttr.resolution_ps(), false).unwrap();
    let cal = Calibration { resolution: Some(16e-12), ..Default::default() };
    let tttr = RecordFormat::HydraHarpV2T3.tttr(&cal).unwrap();
    ser::resolution(&mut out, tttr.resolution_ps(), false).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "4.00\n16.00\n");

    assert!(matches!(
        RecordFormat::TimeHarp260NT3.tttr(&Calibration::default()),
        Err(Error::Options(_))
    ));
}
