use std::fs;
use std::io::Write;
use std::path;

use proptest::prelude::*;
use xentrace_parser::*;

fn write_trace(path: &path::Path, byte_reader: XenByteReader, records: &[XenRecord]) {
    let mut file = fs::File::create(path).unwrap();
    let mut buf = [0u8; XenRecord::MAX_SIZE];
    for rec in records {
        let len = rec.encode(byte_reader, &mut buf);
        file.write_all(&buf[..len]).unwrap();
    }
}

fn cpu_change(cpu: u32) -> XenRecord {
    XenRecord::new(XenEventId::TRACE_CPU_CHANGE, None, &[cpu])
}

fn to_running(tsc: Option<u64>, dom: u16, vcpu: u16) -> XenRecord {
    XenRecord::new(
        XenEventId::SCHED_RUNSTATE_CHANGE,
        tsc,
        &[XenDomain::new(dom, vcpu).packed()],
    )
}

fn generic(tsc: Option<u64>, tag: u32) -> XenRecord {
    XenRecord::new(XenEventId::HVM, tsc, &[tag])
}

#[test]
fn cpu_change_then_schedule() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sched.trace");
    let t = 1_000_000;
    write_trace(
        &path,
        XenByteReader::KEEP_ENDIAN,
        &[cpu_change(2), to_running(Some(t), 5, 1), generic(None, 9)],
    );

    let mut parser = XenTraceParser::new(&path).unwrap();
    assert_eq!(2, parser.execute());
    assert_eq!(2, parser.event_count());
    assert_eq!(3, parser.cpu_count());
    assert_eq!(Some(XenTraceStopReason::EndOfStream), parser.stop_reason());

    let mut saw_sched = false;
    let mut saw_generic = false;
    while let Some(event) = parser.next_event() {
        assert_eq!(2, event.host_cpu());
        assert_eq!(5, event.domain().id());
        assert_eq!(1, event.domain().vcpu());
        assert_eq!(t, event.timestamp());

        let id = event.record().id();
        if id == XenEventId::SCHED_RUNSTATE_CHANGE {
            assert!(event.record().has_timestamp());
            saw_sched = true;
        } else if id == XenEventId::HVM {
            assert!(!event.record().has_timestamp());
            assert_eq!([9], event.record().extra());
            saw_generic = true;
        }
    }
    assert!(saw_sched && saw_generic);
    assert!(parser.iter().all(|e| e.record().id() != XenEventId::TRACE_CPU_CHANGE));
}

#[test]
fn execute_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idem.trace");
    write_trace(
        &path,
        XenByteReader::KEEP_ENDIAN,
        &[generic(Some(3), 0), generic(Some(1), 1), generic(Some(2), 2)],
    );

    let mut parser = XenTraceParser::new(&path).unwrap();
    assert_eq!(3, parser.execute());
    let first: Vec<XenEvent> = parser.events().to_vec();

    // The cached result is returned without reading the file again.
    fs::remove_file(&path).unwrap();
    assert_eq!(3, parser.execute());
    assert_eq!(3, parser.try_execute().unwrap());
    assert_eq!(first, parser.events());
}

#[test]
fn zero_event_trace_is_read_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zero.trace");
    write_trace(&path, XenByteReader::KEEP_ENDIAN, &[cpu_change(3)]);

    let mut parser = XenTraceParser::new(&path).unwrap();
    assert_eq!(0, parser.execute());
    assert_eq!(4, parser.cpu_count());

    write_trace(
        &path,
        XenByteReader::KEEP_ENDIAN,
        &[cpu_change(1), generic(Some(5), 0)],
    );
    assert_eq!(1, parser.execute());
    assert_eq!(2, parser.cpu_count());
    assert_eq!(1, parser.get_event(0).unwrap().host_cpu());
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("later.trace");

    let mut parser = XenTraceParser::new(&path).unwrap();
    assert_eq!(0, parser.execute());
    assert!(matches!(parser.try_execute(), Err(XenTraceError::Io(_))));
    assert_eq!(None, parser.stop_reason());

    // The parser is still usable once the file exists.
    write_trace(&path, XenByteReader::KEEP_ENDIAN, &[generic(Some(1), 0)]);
    assert_eq!(1, parser.execute());
}

#[test]
fn empty_path() {
    assert!(matches!(
        XenTraceParser::new(""),
        Err(XenTraceError::InvalidPath)
    ));
}

#[test]
fn truncated_mid_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trunc.trace");
    let records: Vec<XenRecord> = (0..10).map(|i| generic(Some(i), i as u32)).collect();
    write_trace(&path, XenByteReader::KEEP_ENDIAN, &records);

    let valid_len = fs::metadata(&path).unwrap().len();
    fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(&[0xFF, 0xFF, 0xFF])
        .unwrap();

    let mut parser = XenTraceParser::new(&path).unwrap();
    assert_eq!(10, parser.execute());
    assert_eq!(
        Some(XenTraceStopReason::Truncated { offset: valid_len }),
        parser.stop_reason()
    );
}

#[test]
fn many_records_without_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many.trace");
    let total = 4096 * 2 + 123;
    let records: Vec<XenRecord> = (0..total).map(|i| generic(None, i)).collect();
    write_trace(&path, XenByteReader::KEEP_ENDIAN, &records);

    let mut parser = XenTraceParser::new(&path).unwrap();
    assert_eq!(total as usize, parser.execute());
    assert_eq!(1, parser.cpu_count());

    // All timestamps are 0, so order is unspecified; check the payloads as a set.
    let mut tags: Vec<u32> = parser.iter().map(|e| e.record().extra()[0]).collect();
    tags.sort_unstable();
    assert_eq!((0..total).collect::<Vec<u32>>(), tags);
    assert!(parser.iter().all(|e| e.timestamp() == 0 && e.domain().is_default()));
}

#[test]
fn swapped_byte_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swapped.trace");
    write_trace(
        &path,
        XenByteReader::SWAP_ENDIAN,
        &[cpu_change(1), to_running(Some(0x0102_0304_0506), 7, 2)],
    );

    let options = XenTraceParserOptions {
        byte_reader: XenByteReader::SWAP_ENDIAN,
        ..Default::default()
    };
    let mut parser = XenTraceParser::with_options(&path, options).unwrap();
    assert_eq!(1, parser.execute());
    let event = parser.get_event(0).unwrap();
    assert_eq!(1, event.host_cpu());
    assert_eq!(XenDomain::new(7, 2), event.domain());
    assert_eq!(0x0102_0304_0506, event.timestamp());
}

/// One host CPU's buffer: a CPU-change record followed by records whose
/// timestamps are non-decreasing (some carried forward).
fn arb_cpu_block() -> impl Strategy<Value = Vec<XenRecord>> {
    (
        0u32..16,
        prop::collection::vec((0u64..1_000, any::<bool>(), any::<bool>(), any::<u16>()), 0..40),
    )
        .prop_map(|(cpu, steps)| {
            let mut records = vec![cpu_change(cpu)];
            let mut tsc = 0;
            for (delta, has_tsc, sched, tag) in steps {
                tsc += delta;
                let stamp = if has_tsc { Some(tsc) } else { None };
                records.push(if sched {
                    to_running(stamp, tag, tag % 4)
                } else {
                    generic(stamp, tag as u32)
                });
            }
            records
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ordering_and_access_agree(blocks in prop::collection::vec(arb_cpu_block(), 1..6)) {
        let records: Vec<XenRecord> = blocks.concat();
        let stored = records
            .iter()
            .filter(|r| r.id() != XenEventId::TRACE_CPU_CHANGE)
            .count();
        let highest = records
            .iter()
            .filter(|r| r.id() == XenEventId::TRACE_CPU_CHANGE)
            .map(|r| r.extra0())
            .max()
            .unwrap_or(0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prop.trace");
        write_trace(&path, XenByteReader::KEEP_ENDIAN, &records);

        let mut parser = XenTraceParser::new(&path).unwrap();
        let count = parser.execute();
        prop_assert_eq!(stored, count);
        prop_assert_eq!(highest + 1, parser.cpu_count());

        for pair in parser.events().windows(2) {
            prop_assert!(pair[0].timestamp() <= pair[1].timestamp());
        }

        let indexed: Vec<XenEvent> = (0..count).map(|i| *parser.get_event(i).unwrap()).collect();
        parser.reset_iter();
        let mut iterated = Vec::new();
        while let Some(event) = parser.next_event() {
            iterated.push(*event);
        }
        prop_assert_eq!(indexed, iterated);
        prop_assert!(parser.get_event(count).is_none());
        prop_assert!(parser.get_event(count + 1).is_none());

        if count > 0 {
            prop_assert_eq!(count, parser.execute());
        }
    }
}
