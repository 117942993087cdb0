use std::io::Cursor;

use hseal_crypto::{decrypt, encrypt, encrypt_stream, generate_key, CodecOptions, FramedCodec};
use secrecy::SecretSlice;

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_cascade_encrypt(bencher: divan::Bencher, size: usize) {
    let key = generate_key();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encrypt(divan::black_box(&data), divan::black_box(&key)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_cascade_decrypt(bencher: divan::Bencher, size: usize) {
    let key = generate_key();
    let data = make_data(size);
    let sealed = encrypt(&data, &key).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| decrypt(divan::black_box(&sealed), divan::black_box(&key)).unwrap());
}

#[divan::bench(args = [1048576])]
fn bench_chunked_encrypt(bencher: divan::Bencher, size: usize) {
    let secret = SecretSlice::from(vec![0x11u8; 32]);
    let sign_key = SecretSlice::from(vec![0x22u8; 32]);
    let opts = CodecOptions::default();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let mut out = Vec::with_capacity(size + size / 32);
            encrypt_stream(Cursor::new(&data), &mut out, &secret, &sign_key, &opts).unwrap();
            out
        });
}

#[divan::bench(args = [1048576])]
fn bench_framed_encrypt(bencher: divan::Bencher, size: usize) {
    let codec = FramedCodec::new(&generate_key(), &generate_key()).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let mut out = Vec::with_capacity(size + size / 256);
            codec.encrypt(Cursor::new(&data), &mut out).unwrap();
            out
        });
}

fn main() {
    divan::main();
}
