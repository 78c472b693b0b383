use criterion::{black_box, criterion_group, criterion_main, Criterion};
use taptun::ethernet::{mac_destination, mac_ethertype, mac_payload, mac_source};
use taptun::ipv4::{ipv4_destination, ipv4_source};

fn frame(tags: &[u8]) -> Vec<u8> {
    let mut v = vec![0x02, 0x42, 0xac, 0x11, 0x00, 0x02, 0x52, 0x54, 0x00, 0x12, 0x34, 0x56];
    v.extend_from_slice(tags);
    v.extend_from_slice(&[0x08, 0x00]);
    v.extend_from_slice(&[
        0x45, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00, 0x0a, 0x00, 0x00,
        0x01, 0x0a, 0x00, 0x00, 0x02,
    ]);
    v
}

fn decode(f: &[u8]) -> usize {
    let dst = mac_destination(f).unwrap();
    let src = mac_source(f).unwrap();
    let et = mac_ethertype(f).unwrap();
    let ip = mac_payload(f).unwrap();
    let a = ipv4_source(ip).unwrap();
    let b = ipv4_destination(ip).unwrap();
    usize::from(dst.0[5] ^ src.0[5]) + usize::from(et.0) + usize::from(a.octets()[3] ^ b.octets()[3])
}

fn bench_decode(c: &mut Criterion) {
    let untagged = frame(&[]);
    let double = frame(&[0x81, 0x00, 0x00, 0x64, 0x81, 0x00, 0x00, 0xc8]);
    c.bench_function("decode untagged", |b| b.iter(|| decode(black_box(&untagged))));
    c.bench_function("decode double tagged", |b| b.iter(|| decode(black_box(&double))));
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
