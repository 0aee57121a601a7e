//! Tests for ScullDevice
//!
//! These tests verify:
//! - Single-quantum round trips and quantum clamping
//! - Size tracking and end-of-data reads
//! - Holes left by seek-then-write patterns
//! - Trim and both trim policies
//! - Seek arithmetic and bounds
//! - Copy faults, allocation failures and interrupted lock waits
//! - Concurrent writers on one device

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use scull::config::TrimPolicy;
use scull::device::{
    Geometry, Interrupt, InterruptibleMutex, OpenMode, ReaderSource, ScullDevice, SharedGeometry,
    Whence, WriterSink,
};
use scull::ScullError;

// =============================================================================
// Helper Functions
// =============================================================================

fn device_with(quantum: usize, qset: usize, policy: TrimPolicy) -> (SharedGeometry, ScullDevice) {
    let defaults = SharedGeometry::new(Geometry::try_new(quantum, qset).unwrap());
    let device = ScullDevice::new(0, defaults.clone(), policy, Duration::from_millis(1));
    (defaults, device)
}

fn device(quantum: usize, qset: usize) -> ScullDevice {
    device_with(quantum, qset, TrimPolicy::ReloadDefaults).1
}

fn write_at(device: &ScullDevice, data: &[u8], pos: u64) -> usize {
    let mut pos = pos;
    let mut src = data;
    device.write(&mut src, &mut pos, &Interrupt::new()).unwrap()
}

fn read_at(device: &ScullDevice, count: usize, pos: u64) -> Vec<u8> {
    let mut pos = pos;
    let mut buf = vec![0u8; count];
    let n = device.read(&mut buf[..], &mut pos, &Interrupt::new()).unwrap();
    buf.truncate(n);
    buf
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// =============================================================================
// Read/Write Tests
// =============================================================================

#[test]
fn test_new_device_is_empty() {
    let device = device(4000, 1000);

    assert_eq!(device.size(), 0);
    assert!(read_at(&device, 10, 0).is_empty());

    let stats = device.stats(&Interrupt::new()).unwrap();
    assert_eq!(stats.nodes, 0);
    assert_eq!(stats.quanta, 0);
}

#[test]
fn test_write_then_read_round_trip() {
    let device = device(4000, 1000);

    assert_eq!(write_at(&device, b"hello world", 0), 11);
    assert_eq!(device.size(), 11);
    assert_eq!(read_at(&device, 11, 0), b"hello world");
}

#[test]
fn test_round_trip_at_unaligned_offset() {
    let device = device(16, 4);

    assert_eq!(write_at(&device, b"abcdef", 37), 6);
    assert_eq!(read_at(&device, 6, 37), b"abcdef");
}

#[test]
fn test_write_advances_position() {
    let device = device(4000, 1000);
    let interrupt = Interrupt::new();

    let mut pos = 0;
    let mut src: &[u8] = b"abc";
    device.write(&mut src, &mut pos, &interrupt).unwrap();
    assert_eq!(pos, 3);

    let mut src: &[u8] = b"def";
    device.write(&mut src, &mut pos, &interrupt).unwrap();
    assert_eq!(pos, 6);

    assert_eq!(read_at(&device, 6, 0), b"abcdef");
}

#[test]
fn test_write_is_clamped_to_quantum() {
    let device = device(8, 4);

    // 5 bytes of room left in the first quantum
    assert_eq!(write_at(&device, &[7u8; 20], 3), 5);
    assert_eq!(device.size(), 8);
}

#[test]
fn test_read_is_clamped_to_quantum() {
    let device = device(8, 4);
    let data = pattern(32);

    let mut written = 0;
    while written < data.len() {
        written += write_at(&device, &data[written..], written as u64);
    }

    let chunk = read_at(&device, 32, 5);
    assert_eq!(chunk.len(), 3);
    assert_eq!(chunk, &data[5..8]);
}

#[test]
fn test_read_is_clamped_to_size() {
    let device = device(4000, 1000);
    write_at(&device, b"0123456789", 0);

    assert_eq!(read_at(&device, 100, 6), b"6789");
}

#[test]
fn test_read_at_or_past_end_returns_nothing() {
    let device = device(4000, 1000);
    write_at(&device, b"data", 0);

    assert!(read_at(&device, 10, 4).is_empty());
    assert!(read_at(&device, 10, 1_000_000).is_empty());
}

#[test]
fn test_concrete_5000_byte_scenario() {
    let device = device(4000, 1000);
    let data = pattern(5000);

    assert_eq!(write_at(&device, &data, 0), 4000);
    assert_eq!(device.size(), 4000);

    assert_eq!(write_at(&device, &data[4000..], 4000), 1000);
    assert_eq!(device.size(), 5000);

    let first = read_at(&device, 5000, 0);
    assert_eq!(first.len(), 4000);
    let second = read_at(&device, 1000, 4000);
    assert_eq!(second.len(), 1000);

    let mut all = first;
    all.extend_from_slice(&second);
    assert_eq!(all, data);

    let stats = device.stats(&Interrupt::new()).unwrap();
    assert_eq!(stats.nodes, 1);
    assert_eq!(stats.slot_arrays, 1);
    assert_eq!(stats.quanta, 2);
    assert_eq!(stats.last_node_slots, vec![0, 1]);
}

#[test]
fn test_multi_quantum_stream_across_nodes() {
    // item size 12: the stream spans several nodes
    let device = device(4, 3);
    let data = pattern(50);
    let interrupt = Interrupt::new();

    let mut pos = 0;
    let mut src: &[u8] = &data;
    while !src.is_empty() {
        device.write(&mut src, &mut pos, &interrupt).unwrap();
    }
    assert_eq!(pos, 50);

    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let mut buf = [0u8; 64];
        let n = device.read(&mut buf[..], &mut pos, &interrupt).unwrap();
        if n == 0 {
            break;
        }
        assert!(n <= 4);
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, data);

    let stats = device.stats(&interrupt).unwrap();
    assert_eq!(stats.nodes, 5);
    assert_eq!(stats.quanta, 13);
}

#[test]
fn test_size_never_decreases_on_write() {
    let device = device(16, 4);

    write_at(&device, b"0123456789", 0);
    assert_eq!(device.size(), 10);

    write_at(&device, b"ab", 2);
    assert_eq!(device.size(), 10);
    assert_eq!(read_at(&device, 10, 0), b"01ab456789");
}

#[test]
fn test_empty_write_transfers_nothing() {
    let device = device(16, 4);

    assert_eq!(write_at(&device, b"", 0), 0);
    assert_eq!(device.size(), 0);
}

// =============================================================================
// Hole Tests
// =============================================================================

#[test]
fn test_hole_reads_as_no_data() {
    let device = device(4, 2);

    write_at(&device, b"ab", 0);
    write_at(&device, b"xy", 100);
    assert_eq!(device.size(), 102);

    // node 6 was created by the walk to node 12 but never written
    assert!(read_at(&device, 4, 50).is_empty());
    assert_eq!(read_at(&device, 2, 100), b"xy");
}

#[test]
fn test_untouched_slot_in_existing_node_is_a_hole() {
    let device = device(4, 8);

    write_at(&device, b"ab", 0);
    write_at(&device, b"cd", 20);

    // slot 2 of node 0 was never allocated
    assert!(read_at(&device, 4, 8).is_empty());
}

#[test]
fn test_unwritten_bytes_of_touched_quantum_are_zero() {
    let device = device(8, 2);

    write_at(&device, b"z", 5);
    assert_eq!(read_at(&device, 6, 0), vec![0, 0, 0, 0, 0, b'z']);
}

// =============================================================================
// Trim Tests
// =============================================================================

#[test]
fn test_trim_releases_everything() {
    let device = device(4, 2);
    let interrupt = Interrupt::new();

    // three populated nodes
    write_at(&device, b"aaaa", 0);
    write_at(&device, b"bbbb", 8);
    write_at(&device, b"cccc", 16);
    assert_eq!(device.stats(&interrupt).unwrap().nodes, 3);

    device.trim(&interrupt).unwrap();

    let stats = device.stats(&interrupt).unwrap();
    assert_eq!(device.size(), 0);
    assert_eq!(stats.nodes, 0);
    assert_eq!(stats.quanta, 0);
    assert!(read_at(&device, 4, 0).is_empty());
}

#[test]
fn test_trim_on_empty_device_is_idempotent() {
    let device = device(4000, 1000);
    let interrupt = Interrupt::new();

    device.trim(&interrupt).unwrap();
    device.trim(&interrupt).unwrap();

    assert_eq!(device.size(), 0);
    assert_eq!(device.stats(&interrupt).unwrap().nodes, 0);
}

#[test]
fn test_device_usable_after_trim() {
    let device = device(16, 4);

    write_at(&device, b"before", 0);
    device.trim(&Interrupt::new()).unwrap();
    write_at(&device, b"after", 0);

    assert_eq!(device.size(), 5);
    assert_eq!(read_at(&device, 16, 0), b"after");
}

#[test]
fn test_trim_reloads_current_defaults() {
    let (defaults, device) = device_with(4000, 1000, TrimPolicy::ReloadDefaults);
    let interrupt = Interrupt::new();

    defaults.set(Geometry::try_new(16, 4).unwrap());
    assert_eq!(device.geometry(&interrupt).unwrap(), Geometry::try_new(4000, 1000).unwrap());

    device.trim(&interrupt).unwrap();
    assert_eq!(device.geometry(&interrupt).unwrap(), Geometry::try_new(16, 4).unwrap());

    // the new geometry governs later writes
    assert_eq!(write_at(&device, &[1u8; 100], 0), 16);
}

#[test]
fn test_trim_keeps_geometry_when_asked() {
    let (defaults, device) = device_with(4000, 1000, TrimPolicy::KeepGeometry);
    let interrupt = Interrupt::new();

    defaults.set(Geometry::try_new(16, 4).unwrap());
    device.trim(&interrupt).unwrap();

    assert_eq!(device.geometry(&interrupt).unwrap(), Geometry::try_new(4000, 1000).unwrap());
}

#[test]
fn test_write_only_open_trims() {
    let device = device(16, 4);
    let interrupt = Interrupt::new();
    write_at(&device, b"data", 0);

    device.open(OpenMode::read_only(), &interrupt).unwrap();
    assert_eq!(device.size(), 4);

    device.open(OpenMode::read_write(), &interrupt).unwrap();
    assert_eq!(device.size(), 4);

    device.open(OpenMode::write_only(), &interrupt).unwrap();
    assert_eq!(device.size(), 0);

    write_at(&device, b"data", 0);
    device.open(OpenMode::read_write().truncate(true), &interrupt).unwrap();
    assert_eq!(device.size(), 0);
}

// =============================================================================
// Seek Tests
// =============================================================================

#[test]
fn test_seek_absolute() {
    let device = device(16, 4);

    assert_eq!(device.seek(0, 42, Whence::Set).unwrap(), 42);
    assert_eq!(device.seek(99, 0, Whence::Set).unwrap(), 0);
}

#[test]
fn test_seek_negative_absolute_is_invalid() {
    let device = device(16, 4);

    let result = device.seek(0, -1, Whence::Set);
    assert!(matches!(result, Err(ScullError::InvalidArgument(_))));
}

#[test]
fn test_seek_relative_to_current() {
    let device = device(16, 4);

    assert_eq!(device.seek(10, 5, Whence::Current).unwrap(), 15);
    assert_eq!(device.seek(10, -10, Whence::Current).unwrap(), 0);
    assert!(matches!(
        device.seek(10, -11, Whence::Current),
        Err(ScullError::InvalidArgument(_))
    ));
}

#[test]
fn test_seek_relative_to_end() {
    let device = device(16, 4);
    write_at(&device, b"0123456789", 0);

    assert_eq!(device.seek(0, 0, Whence::End).unwrap(), 10);
    assert_eq!(device.seek(0, -4, Whence::End).unwrap(), 6);
    assert!(device.seek(0, -11, Whence::End).is_err());
}

#[test]
fn test_seek_beyond_size_is_allowed() {
    let device = device(16, 4);
    write_at(&device, b"abc", 0);

    assert_eq!(device.seek(0, 1_000_000, Whence::Set).unwrap(), 1_000_000);
    assert_eq!(device.seek(0, 500, Whence::End).unwrap(), 503);
}

#[test]
fn test_seek_overflow_is_invalid() {
    let device = device(16, 4);

    let result = device.seek(i64::MAX as u64, 1, Whence::Current);
    assert!(matches!(result, Err(ScullError::InvalidArgument(_))));
}

// =============================================================================
// Fault Tests
// =============================================================================

struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "caller buffer went away"))
    }
}

struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "caller buffer went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_write_copy_fault_leaves_size_and_position() {
    let device = device(16, 4);
    let interrupt = Interrupt::new();

    let mut pos = 4;
    let mut src = ReaderSource::new(BrokenReader, 8);
    let result = device.write(&mut src, &mut pos, &interrupt);

    assert!(matches!(result, Err(ScullError::CopyFault(_))));
    assert_eq!(pos, 4);
    assert_eq!(device.size(), 0);

    // allocations made before the copy stay
    assert_eq!(device.stats(&interrupt).unwrap().quanta, 1);
}

#[test]
fn test_write_from_reader_source() {
    let device = device(16, 4);
    let interrupt = Interrupt::new();

    let mut pos = 0;
    let mut src = ReaderSource::new(&b"streamed"[..], 8);
    assert_eq!(device.write(&mut src, &mut pos, &interrupt).unwrap(), 8);
    assert_eq!(read_at(&device, 8, 0), b"streamed");
}

#[test]
fn test_read_copy_fault_leaves_position() {
    let device = device(16, 4);
    let interrupt = Interrupt::new();
    write_at(&device, b"payload", 0);

    let mut pos = 0;
    let mut sink = WriterSink::new(BrokenWriter, 7);
    let result = device.read(&mut sink, &mut pos, &interrupt);

    assert!(matches!(result, Err(ScullError::CopyFault(_))));
    assert_eq!(pos, 0);

    // the device is still usable
    assert_eq!(read_at(&device, 7, 0), b"payload");
}

#[test]
fn test_read_into_writer_sink() {
    let device = device(16, 4);
    let interrupt = Interrupt::new();
    write_at(&device, b"payload", 0);

    let mut pos = 0;
    let mut sink = WriterSink::new(Vec::new(), 3);
    assert_eq!(device.read(&mut sink, &mut pos, &interrupt).unwrap(), 3);
    assert_eq!(sink.into_inner(), b"pay");
}

#[test]
fn test_failed_quantum_allocation_is_out_of_memory() {
    // a single quantum of 2^62 bytes cannot be reserved
    let device = device(1 << 62, 1);
    let interrupt = Interrupt::new();

    let mut pos = 0;
    let mut src: &[u8] = b"hello";
    let result = device.write(&mut src, &mut pos, &interrupt);

    assert!(matches!(result, Err(ScullError::OutOfMemory)));
    assert_eq!(pos, 0);
    assert_eq!(device.size(), 0);

    // the node and slot array grown before the failure stay in place
    let stats = device.stats(&interrupt).unwrap();
    assert_eq!(stats.nodes, 1);
    assert_eq!(stats.slot_arrays, 1);
    assert_eq!(stats.quanta, 0);

    // reads see no data and the device still takes a trim
    assert!(read_at(&device, 5, 0).is_empty());
    device.trim(&interrupt).unwrap();
    assert_eq!(device.stats(&interrupt).unwrap().nodes, 0);
}

// =============================================================================
// Locking Tests
// =============================================================================

#[test]
fn test_uncontended_lock_ignores_raised_interrupt() {
    let device = device(16, 4);
    let interrupt = Interrupt::new();
    interrupt.raise();

    let mut pos = 0;
    let mut src: &[u8] = b"ok";
    assert_eq!(device.write(&mut src, &mut pos, &interrupt).unwrap(), 2);
}

#[test]
fn test_blocked_lock_wait_is_interrupted() {
    let mutex = Arc::new(InterruptibleMutex::new(0u32, Duration::from_millis(1)));
    let interrupt = Interrupt::new();

    let guard = mutex.lock(&Interrupt::new()).unwrap();

    let waiter = {
        let mutex = Arc::clone(&mutex);
        let interrupt = interrupt.clone();
        thread::spawn(move || {
            let result = mutex.lock(&interrupt).map(|mut value| *value += 1);
            result
        })
    };

    thread::sleep(Duration::from_millis(20));
    interrupt.raise();

    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(ScullError::Interrupted)));

    // nothing was mutated by the interrupted waiter
    assert_eq!(*guard, 0);
}

#[test]
fn test_blocked_lock_wait_proceeds_after_release() {
    let mutex = Arc::new(InterruptibleMutex::new(0u32, Duration::from_millis(1)));

    let guard = mutex.lock(&Interrupt::new()).unwrap();

    let waiter = {
        let mutex = Arc::clone(&mutex);
        thread::spawn(move || {
            let mut value = mutex.lock(&Interrupt::new()).unwrap();
            *value += 1;
        })
    };

    thread::sleep(Duration::from_millis(20));
    drop(guard);
    waiter.join().unwrap();

    assert_eq!(*mutex.lock_uninterruptible(), 1);
}

#[test]
fn test_interrupt_can_be_cleared() {
    let interrupt = Interrupt::new();

    interrupt.raise();
    assert!(interrupt.is_raised());

    interrupt.clear();
    assert!(!interrupt.is_raised());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_on_disjoint_regions() {
    let device = device(64, 4);
    let region = 1000usize;

    crossbeam::thread::scope(|s| {
        for t in 0..8u8 {
            let device = &device;
            s.spawn(move |_| {
                let data = vec![t + 1; region];
                let interrupt = Interrupt::new();
                let mut pos = (t as usize * region) as u64;
                let mut src: &[u8] = &data;
                while !src.is_empty() {
                    device.write(&mut src, &mut pos, &interrupt).unwrap();
                }
            });
        }
    })
    .unwrap();

    assert_eq!(device.size(), 8 * region as u64);

    let interrupt = Interrupt::new();
    let mut pos = 0;
    let mut out = Vec::new();
    loop {
        let mut buf = [0u8; 64];
        let n = device.read(&mut buf[..], &mut pos, &interrupt).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }

    assert_eq!(out.len(), 8 * region);
    for (t, chunk) in out.chunks(region).enumerate() {
        assert!(chunk.iter().all(|&b| b == t as u8 + 1));
    }
}

#[test]
fn test_concurrent_writes_to_same_quantum_are_serialized() {
    let device = Arc::new(device(4000, 1000));

    let handles: Vec<_> = (0..4u8)
        .map(|t| {
            let device = Arc::clone(&device);
            thread::spawn(move || {
                for _ in 0..100 {
                    let mut pos = 0;
                    let data = [t; 32];
                    let mut src: &[u8] = &data;
                    device.write(&mut src, &mut pos, &Interrupt::new()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // each write replaced the whole 32-byte record atomically
    let record = read_at(&device, 32, 0);
    assert_eq!(record.len(), 32);
    assert!(record.iter().all(|&b| b == record[0]));
}
