//! Detached PKCS#7/CMS signature over `manifest.json`.
//!
//! Decoding failures are fatal. Verification failures are not: they are
//! recorded as [`SignatureVerification::Failed`] and validation carries on.

use crate::ber;
use crate::certificate::render_name;
use crate::error::{CoreError, CoreResult};
use crate::result::SignatureVerification;
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::ObjectIdentifier;
use der::{Decode, Encode, Tag, Tagged};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::Certificate;

pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
pub const ID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
pub const ID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub const SHA256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const ID_CE_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

/// The certificate a SignerInfo points at, and the issuer it claims.
#[derive(Debug, Clone)]
pub struct SignerReference {
    /// `None` when no embedded certificate matches the signer identifier.
    pub certificate: Option<Certificate>,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DecodedSignature {
    pub certificates: Vec<Certificate>,
    pub signer: Option<SignerReference>,
    pub verification: SignatureVerification,
}

/// Decodes `signature` as SignedData and verifies it over `manifest`.
///
/// BER input (indefinite lengths, constructed strings) is accepted.
pub fn decode_signature(manifest: &[u8], signature: &[u8]) -> CoreResult<DecodedSignature> {
    let signature = ber::to_der(signature)
        .map_err(|e| CoreError::SignatureMalformed(format!("encoding: {}", e)))?;
    let content_info = ContentInfo::from_der(&signature)
        .map_err(|e| CoreError::SignatureMalformed(format!("ContentInfo: {}", e)))?;
    if content_info.content_type != ID_SIGNED_DATA {
        return Err(CoreError::SignatureMalformed(format!(
            "content type {} is not signed-data",
            content_info.content_type
        )));
    }
    let signed_data_der = content_info
        .content
        .to_der()
        .map_err(|e| CoreError::SignatureMalformed(e.to_string()))?;
    let signed_data = SignedData::from_der(&signed_data_der)
        .map_err(|e| CoreError::SignatureMalformed(format!("SignedData: {}", e)))?;

    let certificates: Vec<Certificate> = signed_data
        .certificates
        .as_ref()
        .map(|set| {
            set.0
                .iter()
                .filter_map(|choice| match choice {
                    CertificateChoices::Certificate(cert) => Some(cert.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    tracing::debug!(count = certificates.len(), "signed data certificates");

    let signer_info = match signed_data.signer_infos.0.iter().next() {
        Some(si) => si,
        None => {
            tracing::warn!("signed data carries no signer info");
            return Ok(DecodedSignature {
                certificates,
                signer: None,
                verification: SignatureVerification::Failed {
                    reason: "signed data carries no signer info".to_string(),
                },
            });
        }
    };

    let signer_cert = find_signer_certificate(&certificates, &signer_info.sid).cloned();
    let issuer = match (&signer_cert, &signer_info.sid) {
        (Some(cert), _) => Some(render_name(&cert.tbs_certificate.issuer)),
        (None, SignerIdentifier::IssuerAndSerialNumber(ias)) => Some(render_name(&ias.issuer)),
        (None, SignerIdentifier::SubjectKeyIdentifier(_)) => None,
    };

    let verification = match verify_signer(manifest, signer_info, signer_cert.as_ref()) {
        Ok(()) => {
            tracing::info!("manifest signature verified");
            SignatureVerification::Verified
        }
        Err(reason) => {
            tracing::warn!(%reason, "manifest signature verification failed");
            SignatureVerification::Failed { reason }
        }
    };

    Ok(DecodedSignature {
        certificates,
        signer: Some(SignerReference {
            certificate: signer_cert,
            issuer,
        }),
        verification,
    })
}

fn find_signer_certificate<'a>(
    certs: &'a [Certificate],
    sid: &SignerIdentifier,
) -> Option<&'a Certificate> {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(ias) => certs.iter().find(|c| {
            c.tbs_certificate.issuer == ias.issuer
                && c.tbs_certificate.serial_number == ias.serial_number
        }),
        SignerIdentifier::SubjectKeyIdentifier(ski) => certs.iter().find(|c| {
            c.tbs_certificate
                .extensions
                .iter()
                .flatten()
                .filter(|ext| ext.extn_id == ID_CE_SUBJECT_KEY_IDENTIFIER)
                .filter_map(|ext| SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes()).ok())
                .any(|found| found.0 == ski.0)
        }),
    }
}

// Err carries the human readable reason recorded on the result.
fn verify_signer(
    manifest: &[u8],
    signer_info: &SignerInfo,
    cert: Option<&Certificate>,
) -> Result<(), String> {
    let cert = cert.ok_or_else(|| "signer certificate not present in signed data".to_string())?;

    if signer_info.digest_alg.oid != ID_SHA256 {
        return Err(format!(
            "unsupported digest algorithm {}",
            signer_info.digest_alg.oid
        ));
    }
    let digest = Sha256::digest(manifest);

    let signed_bytes = match &signer_info.signed_attrs {
        Some(attrs) => {
            let md = attrs
                .iter()
                .find(|a| a.oid == ID_MESSAGE_DIGEST)
                .and_then(|a| a.values.iter().next())
                .ok_or_else(|| "signed attributes lack messageDigest".to_string())?;
            if md.tag() != Tag::OctetString || md.value() != digest.as_slice() {
                return Err("messageDigest does not match manifest".to_string());
            }
            attrs
                .to_der()
                .map_err(|e| format!("re-encoding signed attributes: {}", e))?
        }
        None => manifest.to_vec(),
    };

    let sig_alg = &signer_info.signature_algorithm.oid;
    if *sig_alg != RSA_ENCRYPTION && *sig_alg != SHA256_WITH_RSA_ENCRYPTION {
        return Err(format!("unsupported signature algorithm {}", sig_alg));
    }

    let spki = &cert.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != RSA_ENCRYPTION {
        return Err(format!(
            "unsupported signer key algorithm {}",
            spki.algorithm.oid
        ));
    }
    let key_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| "signer public key has unused bits".to_string())?;
    let key = RsaPublicKey::from_pkcs1_der(key_bytes)
        .map_err(|e| format!("signer public key: {}", e))?;

    let signature = rsa::pkcs1v15::Signature::try_from(signer_info.signature.as_bytes())
        .map_err(|e| format!("signature value: {}", e))?;
    rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key)
        .verify(&signed_bytes, &signature)
        .map_err(|e| format!("rsa verification: {}", e))
}
