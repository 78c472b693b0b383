#![cfg(unix)]

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::OwnedFd;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixDatagram;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use taptun::{is_stopped, AccessorConfig, DeviceKind, Interface};

const POLL: Duration = Duration::from_millis(50);

// Datagram sockets keep packet boundaries, like a TUN/TAP device
fn device() -> (Interface, UnixDatagram) {
    let (a, b) = UnixDatagram::pair().expect("socket pair");
    let file = File::from(OwnedFd::from(a));
    let iface = Interface::from_file(DeviceKind::Tap, "tap-test", file).expect("Interface");
    (iface, b)
}

fn config() -> AccessorConfig {
    AccessorConfig::default().with_poll_timeout(POLL)
}

#[test]
fn test_read_write_frames() {
    let (iface, peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();

    peer.send(b"first frame").unwrap();
    peer.send(b"second").unwrap();
    let mut buf = [0u8; 64];
    let n = accessor.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"first frame");
    let n = accessor.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"second");

    assert_eq!(accessor.write(b"reply").unwrap(), 5);
    let n = peer.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"reply");
}

#[test]
fn test_read_waits_for_data() {
    let (iface, peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();
    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut buf = [0u8; 64];
            accessor.read(&mut buf).map(|n| buf[..n].to_vec())
        });
        // long enough for several poll timeouts
        thread::sleep(POLL * 3);
        peer.send(b"late").unwrap();
        assert_eq!(reader.join().unwrap().unwrap(), b"late");
    });
}

#[test]
fn test_stop_unblocks_reader() {
    let (iface, _peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();
    thread::scope(|s| {
        let reader = s.spawn(|| accessor.read(&mut [0u8; 64]));
        thread::sleep(POLL * 2);
        let start = Instant::now();
        assert!(accessor.stop());
        let e = reader.join().unwrap().unwrap_err();
        assert!(is_stopped(&e));
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        assert!(start.elapsed() < POLL * 10);
    });
}

#[test]
fn test_stopped_accessor_does_not_transfer() {
    let (iface, peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();
    peer.send(b"pending").unwrap();
    assert!(accessor.stop());
    assert!(accessor.is_stopped());

    let mut buf = [0u8; 64];
    assert!(is_stopped(&accessor.read(&mut buf).unwrap_err()));
    assert!(is_stopped(&accessor.write(b"dropped").unwrap_err()));
    // stays stopped
    assert!(!accessor.stop());
    assert!(is_stopped(&accessor.read(&mut buf).unwrap_err()));

    // the pending frame is still there, nothing was written
    drop(accessor);
    let n = (&iface).read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"pending");
    peer.set_nonblocking(true).unwrap();
    assert_eq!(
        peer.recv(&mut buf).unwrap_err().kind(),
        io::ErrorKind::WouldBlock
    );
}

#[test]
fn test_concurrent_stop_single_winner() {
    let (iface, _peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();
    let winners = AtomicUsize::new(0);
    thread::scope(|s| {
        let reader = s.spawn(|| accessor.read(&mut [0u8; 64]));
        for _ in 0..4 {
            s.spawn(|| {
                if accessor.stop() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        assert!(is_stopped(&reader.join().unwrap().unwrap_err()));
    });
    assert_eq!(winners.load(Ordering::SeqCst), 1);
}

#[test]
fn test_accessor_does_not_close_device() {
    let (iface, peer) = device();
    let fd = iface.as_raw_fd();
    {
        let accessor = iface.accessor_with_config(config()).unwrap();
        accessor.stop();
    }
    // a second accessor over the same device works
    let accessor = iface.accessor_with_config(config()).unwrap();
    peer.send(b"again").unwrap();
    let mut buf = [0u8; 16];
    let n = accessor.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"again");
    drop(accessor);
    assert_eq!(iface.as_raw_fd(), fd);
    iface.close().expect("close");
}

#[test]
fn test_io_traits() {
    let (iface, peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();
    (&accessor).write_all(b"via Write").unwrap();
    let mut buf = [0u8; 16];
    let n = peer.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"via Write");

    peer.send(b"via Read").unwrap();
    let n = (&accessor).read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"via Read");
}

// Queue frames until the peer's receive queue is full; the device is non-blocking by now
#[cfg(target_os = "linux")]
fn fill_peer_queue(iface: &Interface) -> usize {
    let mut queued = 0;
    loop {
        match (&*iface).write(&[0u8; 256]) {
            Ok(_) => queued += 1,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return queued,
            Err(e) => panic!("filling peer queue: {}", e),
        }
        assert!(queued < 1 << 16, "peer queue never filled");
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_stop_unblocks_writer() {
    let (iface, _peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();
    assert!(fill_peer_queue(&iface) > 0);
    thread::scope(|s| {
        let writer = s.spawn(|| accessor.write(&[1u8; 256]));
        thread::sleep(POLL * 2);
        assert!(!writer.is_finished());
        assert!(accessor.stop());
        let e = writer.join().unwrap().unwrap_err();
        assert!(is_stopped(&e));
    });
}

#[cfg(target_os = "linux")]
#[test]
fn test_write_waits_for_room() {
    let (iface, peer) = device();
    let accessor = iface.accessor_with_config(config()).unwrap();
    let queued = fill_peer_queue(&iface);
    thread::scope(|s| {
        let writer = s.spawn(|| accessor.write(&[1u8; 256]));
        thread::sleep(POLL * 2);
        assert!(!writer.is_finished());

        peer.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 512];
        let mut received = 0;
        let mut seen = false;
        loop {
            match peer.recv(&mut buf) {
                Ok(n) => {
                    assert_eq!(n, 256);
                    received += 1;
                    seen |= buf[0] == 1;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => panic!("draining: {}", e),
            }
        }
        assert!(received >= queued);
        assert_eq!(writer.join().unwrap().unwrap(), 256);

        if !seen {
            peer.set_nonblocking(false).unwrap();
            peer.set_read_timeout(Some(POLL * 10)).unwrap();
            let n = peer.recv(&mut buf).unwrap();
            assert_eq!(&buf[..n], &[1u8; 256][..]);
        }
    });
}
