#![feature(test)]

extern crate test;

use core::str::FromStr;

use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use rsa::RsaPrivateKey;
use scep::{
    operation::PkiOperation, CertStore, Identity, MessageDecoder, MessageEncoder, Nonce,
    PkiMessage, TransactionId,
};
use test::Bencher;
use x509_cert::name::Name;

fn peers() -> (Identity, Identity) {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let ca_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let ca = Identity::self_signed(ca_key, Name::from_str("CN=ca").unwrap()).unwrap();
    let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let requester = Identity::self_signed(key, Name::from_str("CN=example.org").unwrap()).unwrap();
    (ca, requester)
}

fn pkcs_req(requester: &Identity, rng: &mut ChaCha8Rng) -> PkiMessage {
    let operation = PkiOperation::pkcs_req(
        requester.private_key(),
        Name::from_str("CN=example.org").unwrap(),
        Some("secret"),
    )
    .unwrap();
    PkiMessage::request(
        TransactionId::generate(rng),
        Nonce::generate(rng),
        &operation,
    )
    .unwrap()
}

#[bench]
fn bench_encode_pkcs_req(b: &mut Bencher) {
    let (ca, requester) = peers();
    let mut rng = ChaCha8Rng::from_seed([7; 32]);
    let message = pkcs_req(&requester, &mut rng);
    let encoder = MessageEncoder::new(&requester, ca.certificate());

    b.iter(|| {
        let der = encoder.encode(&mut rng, &message).unwrap();
        test::black_box(der);
    });
}

#[bench]
fn bench_decode_pkcs_req(b: &mut Bencher) {
    let (ca, requester) = peers();
    let mut rng = ChaCha8Rng::from_seed([7; 32]);
    let message = pkcs_req(&requester, &mut rng);
    let der = MessageEncoder::new(&requester, ca.certificate())
        .encode(&mut rng, &message)
        .unwrap();
    let decoder = MessageDecoder::new(ca.private_key());

    b.iter(|| {
        let decoded = decoder.decode(&der).unwrap();
        test::black_box(decoded);
    });
}

#[bench]
fn bench_encode_success(b: &mut Bencher) {
    let (ca, requester) = peers();
    let mut rng = ChaCha8Rng::from_seed([7; 32]);
    let store = CertStore::with_certificates(vec![requester.certificate().clone()]);
    let message = PkiMessage::success(
        TransactionId::generate(&mut rng),
        Nonce::generate(&mut rng),
        Nonce::generate(&mut rng),
        &store,
    )
    .unwrap();
    let encoder = MessageEncoder::new(&ca, requester.certificate());

    b.iter(|| {
        let der = encoder.encode(&mut rng, &message).unwrap();
        test::black_box(der);
    });
}
