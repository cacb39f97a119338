//! pkiMessage encoding and decoding.

use core::str::FromStr;

use cms::{content_info::ContentInfo, signed_data::SignedData};
use der::{
    asn1::{Any, OctetString, SetOfVec},
    Decode, Encode,
};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use rsa::RsaPrivateKey;
use scep::{
    operation::PkiOperation, CertStore, CipherAlgorithm, DigestAlgorithm, Error, ErrorKind,
    FailInfo, Identity, MessageDecoder, MessageEncoder, MessageType, Nonce, PkiMessage,
    PkiStatus, TransactionId,
};
use x509_cert::{name::Name, serial_number::SerialNumber};

struct Peers {
    ca: Identity,
    requester: Identity,
    rng: ChaCha8Rng,
}

fn peers(seed: u8) -> Peers {
    let mut rng = ChaCha8Rng::from_seed([seed; 32]);
    let ca_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let ca = Identity::self_signed(ca_key, Name::from_str("CN=ca").unwrap()).unwrap();
    let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let requester =
        Identity::self_signed(key, Name::from_str("CN=example.org").unwrap()).unwrap();
    Peers { ca, requester, rng }
}

fn signed_data(der: &[u8]) -> SignedData {
    let content_info = ContentInfo::from_der(der).unwrap();
    SignedData::from_der(&content_info.content.to_der().unwrap()).unwrap()
}

fn reencode(signed_data: &SignedData) -> Vec<u8> {
    ContentInfo {
        content_type: der::oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2"),
        content: Any::encode_from(signed_data).unwrap(),
    }
    .to_der()
    .unwrap()
}

#[test]
fn request_operations() {
    let mut peers = peers(1);
    let ca_cert = peers.ca.certificate();
    let issuer = ca_cert.tbs_certificate.subject.clone();
    let csr = PkiOperation::pkcs_req(
        peers.requester.private_key(),
        Name::from_str("CN=example.org").unwrap(),
        None,
    )
    .unwrap();

    let operations = [
        (csr, DigestAlgorithm::Sha256, CipherAlgorithm::DesEde3),
        (
            PkiOperation::get_cert_initial(issuer.clone(), Name::from_str("CN=example.org").unwrap()),
            DigestAlgorithm::Sha1,
            CipherAlgorithm::Des,
        ),
        (
            PkiOperation::get_cert(issuer.clone(), SerialNumber::from(42u32)),
            DigestAlgorithm::Md5,
            CipherAlgorithm::Aes128,
        ),
        (
            PkiOperation::get_crl(issuer, ca_cert.tbs_certificate.serial_number.clone()),
            DigestAlgorithm::Sha512,
            CipherAlgorithm::DesEde3,
        ),
    ];

    for (operation, digest, cipher) in operations {
        let transaction_id = TransactionId::generate(&mut peers.rng);
        let nonce = Nonce::generate(&mut peers.rng);
        let request = PkiMessage::request(transaction_id.clone(), nonce.clone(), &operation).unwrap();
        let der = MessageEncoder::new(&peers.requester, ca_cert)
            .with_digest(digest)
            .with_cipher(cipher)
            .encode(&mut peers.rng, &request)
            .unwrap();

        let (decoded, signer) = MessageDecoder::new(peers.ca.private_key())
            .decode_signed(&der)
            .unwrap();
        assert_eq!(decoded, request);
        assert_eq!(&signer, peers.requester.certificate());
        assert_eq!(decoded.transaction_id(), &transaction_id);
        assert_eq!(decoded.sender_nonce(), &nonce);
        assert_eq!(decoded.recipient_nonce(), None);
        assert_eq!(decoded.pki_status(), None);
        assert_eq!(decoded.message_type(), operation.message_type());
        assert_eq!(decoded.operation().unwrap(), operation);

        let signed_data = signed_data(&der);
        let signer_info = signed_data.signer_infos.0.iter().next().unwrap();
        assert_eq!(signer_info.digest_alg.oid, digest.oid());
    }
}

#[test]
fn success_carries_certificates() {
    let mut peers = peers(2);
    let store = CertStore::with_certificates(vec![peers.requester.certificate().clone()]);
    let response = PkiMessage::success(
        TransactionId::new("42").unwrap(),
        Nonce::generate(&mut peers.rng),
        Nonce::generate(&mut peers.rng),
        &store,
    )
    .unwrap();
    let der = MessageEncoder::new(&peers.ca, peers.requester.certificate())
        .encode(&mut peers.rng, &response)
        .unwrap();

    let decoded = MessageDecoder::new(peers.requester.private_key())
        .decode(&der)
        .unwrap();
    assert_eq!(decoded.message_type(), MessageType::CertRep);
    assert_eq!(decoded.pki_status(), Some(PkiStatus::Success));
    assert_eq!(decoded.cert_store().unwrap(), store);
    assert!(decoded.operation().is_err());
}

#[test]
fn pending_and_failure_carry_no_envelope() {
    let mut peers = peers(3);
    let tid = TransactionId::new("7").unwrap();
    let responses = [
        PkiMessage::pending(
            tid.clone(),
            Nonce::generate(&mut peers.rng),
            Nonce::generate(&mut peers.rng),
        ),
        PkiMessage::failure(
            tid,
            Nonce::generate(&mut peers.rng),
            Nonce::generate(&mut peers.rng),
            FailInfo::BadTime,
        ),
    ];

    for response in responses {
        let der = MessageEncoder::new(&peers.ca, peers.requester.certificate())
            .encode(&mut peers.rng, &response)
            .unwrap();
        assert!(signed_data(&der).encap_content_info.econtent.is_none());

        // no decryption is needed, so any key will do
        let decoded = MessageDecoder::new(peers.ca.private_key())
            .decode(&der)
            .unwrap();
        assert_eq!(decoded, response);
        assert!(decoded.message_data.is_none());
        assert!(matches!(decoded.cert_store(), Err(Error::MissingEnvelope)));
    }
}

#[test]
fn wrong_recipient() {
    let mut peers = peers(4);
    let operation = PkiOperation::get_cert(
        peers.ca.certificate().tbs_certificate.subject.clone(),
        SerialNumber::from(1u8),
    );
    let request = PkiMessage::request(
        TransactionId::generate(&mut peers.rng),
        Nonce::generate(&mut peers.rng),
        &operation,
    )
    .unwrap();
    let der = MessageEncoder::new(&peers.requester, peers.ca.certificate())
        .encode(&mut peers.rng, &request)
        .unwrap();

    let err = MessageDecoder::new(peers.requester.private_key())
        .decode(&der)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CryptoFailure);
}

fn encoded_request(peers: &mut Peers) -> Vec<u8> {
    let operation = PkiOperation::get_crl(
        peers.ca.certificate().tbs_certificate.subject.clone(),
        SerialNumber::from(1u8),
    );
    let request = PkiMessage::request(
        TransactionId::generate(&mut peers.rng),
        Nonce::generate(&mut peers.rng),
        &operation,
    )
    .unwrap();
    MessageEncoder::new(&peers.requester, peers.ca.certificate())
        .encode(&mut peers.rng, &request)
        .unwrap()
}

#[test]
fn two_signers() {
    let mut peers = peers(5);
    let mut signed_data = signed_data(&encoded_request(&mut peers));
    let first = signed_data.signer_infos.0.iter().next().unwrap().clone();
    let mut second = first.clone();
    let mut signature = second.signature.as_bytes().to_vec();
    signature[0] ^= 1;
    second.signature = OctetString::new(signature).unwrap();
    signed_data.signer_infos.0 = SetOfVec::try_from(vec![first, second]).unwrap();

    let der = reencode(&signed_data);
    assert!(matches!(
        MessageDecoder::new(peers.ca.private_key()).decode(&der),
        Err(Error::SignerCount(2))
    ));
}

#[test]
fn tampered_signature() {
    let mut peers = peers(6);
    let mut signed_data = signed_data(&encoded_request(&mut peers));
    let mut signer_info = signed_data.signer_infos.0.iter().next().unwrap().clone();
    let mut signature = signer_info.signature.as_bytes().to_vec();
    let last = signature.len() - 1;
    signature[last] ^= 0x80;
    signer_info.signature = OctetString::new(signature).unwrap();
    signed_data.signer_infos.0 = SetOfVec::try_from(vec![signer_info]).unwrap();
    let der = reencode(&signed_data);

    let decoder = MessageDecoder::new(peers.ca.private_key());
    assert!(matches!(decoder.decode(&der), Err(Error::Verification)));

    // accepted once verification is turned off
    let decoded = decoder.verify_signatures(false).decode(&der).unwrap();
    assert_eq!(decoded.message_type(), MessageType::GetCrl);
}

#[test]
fn tampered_content() {
    let mut peers = peers(7);
    let mut signed_data = signed_data(&encoded_request(&mut peers));
    let econtent = signed_data.encap_content_info.econtent.take().unwrap();
    let mut octets = OctetString::from_der(&econtent.to_der().unwrap())
        .unwrap()
        .as_bytes()
        .to_vec();
    let last = octets.len() - 1;
    octets[last] ^= 0xff;
    signed_data.encap_content_info.econtent =
        Some(Any::encode_from(&OctetString::new(octets).unwrap()).unwrap());
    let der = reencode(&signed_data);

    let err = MessageDecoder::new(peers.ca.private_key())
        .decode(&der)
        .unwrap_err();
    assert!(matches!(err, Error::DigestMismatch));
    assert_eq!(err.kind(), ErrorKind::CryptoFailure);
}

#[test]
fn not_a_pki_message() {
    let peers = peers(8);
    let store = CertStore::with_certificates(vec![peers.ca.certificate().clone()]);
    let err = MessageDecoder::new(peers.ca.private_key())
        .decode(&store.to_der().unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedMessage);
}
