use cryptext_crypto::{base61, derive_keyset, CascadeEnvelope, Packer};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn make_text(size: usize) -> String {
    "the quick brown fox jumps over the lazy dog. "
        .chars()
        .cycle()
        .take(size)
        .collect()
}

#[divan::bench(args = [64, 1024, 65536])]
fn bench_envelope_seal(bencher: divan::Bencher, size: usize) {
    let env = CascadeEnvelope::cascade();
    let keys = derive_keyset(&[0xAB; 32]).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| env.encrypt(divan::black_box(&data), &keys).unwrap());
}

#[divan::bench(args = [64, 1024, 65536])]
fn bench_envelope_open(bencher: divan::Bencher, size: usize) {
    let env = CascadeEnvelope::cascade();
    let keys = derive_keyset(&[0xAB; 32]).unwrap();
    let sealed = env.encrypt(&make_data(size), &keys).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| env.decrypt(divan::black_box(&sealed), &keys).unwrap());
}

#[divan::bench(args = [1024, 65536])]
fn bench_pack_text(bencher: divan::Bencher, size: usize) {
    let packer = Packer::default();
    let text = make_text(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| packer.pack(divan::black_box(&text)).unwrap());
}

#[divan::bench(args = [40, 1024])]
fn bench_base61_encode(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| base61::encode(divan::black_box(&data)));
}

#[divan::bench(args = [40, 1024])]
fn bench_base61_decode(bencher: divan::Bencher, size: usize) {
    let text = base61::encode(&make_data(size));
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| base61::decode(divan::black_box(&text)).unwrap());
}

fn main() {
    divan::main();
}
