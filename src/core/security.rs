//! One-time anti-forgery token of secured mappings.
//!
//! Filling a secured root stores a fresh secret in the user storage and puts
//! a token derived from it into the hidden token field. Binding reads the
//! token back and checks it against the stored secret; the root deletes the
//! secret right after reading it so a token can be used once.

use hmac::digest::generic_array::GenericArray;
use hmac::{Hmac, Mac};
use indexmap::IndexMap;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::core::collaborators::{RequestContext, RequestParams, TokenAuthority};
use crate::core::errors::{FormError, TokenRejected};
use crate::core::mapping::MappingNode;
use crate::core::path;
use crate::core::types::AUTH_TOKEN_FIELD_NAME;
use crate::core::value::{PropertyValue, Scalar};

const SECRET_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_@#$%^&*";

/// Random secret of `len` characters.
pub fn generate_secret(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SECRET_ALPHABET[rng.gen_range(0..SECRET_ALPHABET.len())] as char)
        .collect()
}

impl MappingNode {
    /// Checks the submitted token when this mapping is secured.
    pub(crate) fn verify_auth_token_if_secured(
        &self,
        params: &dyn RequestParams,
        ctx: Option<&dyn RequestContext>,
        in_list: bool,
    ) -> Result<(), FormError> {
        if !self.secured {
            return Ok(());
        }
        if in_list && self.is_root() {
            return Err(FormError::SecuredRootList {
                path: self.path.clone(),
            });
        }
        let ctx = ctx.ok_or_else(|| FormError::MissingContext {
            path: self.path.clone(),
        })?;
        let token_field = path::compose_child(self.root_path(), AUTH_TOKEN_FIELD_NAME);
        let token = match params.param_value(&token_field) {
            Some(token) if !token.trim().is_empty() => token,
            _ => {
                warn!(path = %self.path, "authorization token missing");
                return Err(FormError::TokenMissing { field: token_field });
            }
        };

        let storage = ctx.user_storage();
        let secret_key = self.root_secret_key();
        let stored = storage.get(&secret_key);
        if self.is_root() {
            // one-time secret
            storage.delete(&secret_key);
        }
        let Some(generated) = stored else {
            warn!(path = %self.path, "no secret stored for authorization token");
            return Err(TokenRejected::new("no secret was issued for this form").into());
        };

        let secret = ctx.request_secret(&generated);
        let config = self.require_config()?;
        config
            .token_authority()
            .validate_token(&token, &secret)
            .inspect_err(|_| warn!(path = %self.path, "authorization token rejected"))?;
        debug!(path = %self.path, "authorization token accepted");
        Ok(())
    }

    /// Issues a new secret and puts the derived token among the values to
    /// fill, when this is a secured root.
    pub(crate) fn put_auth_token_if_secured(
        &self,
        values: &mut IndexMap<String, PropertyValue>,
        ctx: Option<&dyn RequestContext>,
    ) -> Result<(), FormError> {
        if !(self.secured && self.is_root()) {
            return Ok(());
        }
        let ctx = ctx.ok_or_else(|| FormError::MissingContext {
            path: self.path.clone(),
        })?;
        let config = self.require_config()?;
        let generated = generate_secret(config.settings().secret_length);
        ctx.user_storage().set(&self.root_secret_key(), generated.clone());
        let token = config
            .token_authority()
            .generate_token(&ctx.request_secret(&generated));
        values.insert(
            AUTH_TOKEN_FIELD_NAME.to_string(),
            PropertyValue::Scalar(Scalar::Text(token)),
        );
        Ok(())
    }
}

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 64;
const NONCE_LEN: usize = 16;

/// Token authority signing `nonce:secret` with HMAC-SHA256.
///
/// Tokens have the form `hex(nonce):hex(mac)`.
#[derive(Clone)]
pub struct HmacTokenAuthority {
    key: [u8; KEY_LEN],
}

impl HmacTokenAuthority {
    /// Authority keyed with `key`. Keys longer than a SHA-256 block are
    /// hashed first, as HMAC does.
    pub fn new(key: &[u8]) -> Self {
        let mut block = [0u8; KEY_LEN];
        if key.len() > KEY_LEN {
            let digest = Sha256::digest(key);
            block[..digest.len()].copy_from_slice(&digest);
        } else {
            block[..key.len()].copy_from_slice(key);
        }
        Self { key: block }
    }

    pub fn with_random_key() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    fn compute_mac(&self, nonce: &str, secret: &str) -> Vec<u8> {
        let mut mac = <HmacSha256 as Mac>::new(GenericArray::from_slice(&self.key));
        mac.update(nonce.as_bytes());
        mac.update(b":");
        mac.update(secret.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl TokenAuthority for HmacTokenAuthority {
    fn generate_token(&self, secret: &str) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);
        let mac = self.compute_mac(&nonce, secret);
        format!("{nonce}:{}", hex::encode(mac))
    }

    fn validate_token(&self, token: &str, secret: &str) -> Result<(), TokenRejected> {
        let (nonce, mac_hex) = token
            .split_once(':')
            .ok_or_else(|| TokenRejected::new("malformed token"))?;
        let submitted = hex::decode(mac_hex).map_err(|e| TokenRejected::new(format!("invalid hex: {e}")))?;
        let computed = self.compute_mac(nonce, secret);
        if computed.ct_eq(&submitted).into() {
            Ok(())
        } else {
            Err(TokenRejected::new("token does not match the issued secret"))
        }
    }
}

impl std::fmt::Debug for HmacTokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenAuthority").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collaborators::UserStorage;
    use crate::core::fixtures::{self, Address, Line, Person};
    use crate::core::field::FieldKind;
    use crate::core::form::FormData;
    use crate::core::mapping::MappingBuilder;
    use crate::core::memory::{MapParams, SessionContext};
    use crate::core::types::Locale;

    fn locale() -> Locale {
        Locale::new("en")
    }

    fn person() -> Person {
        Person {
            name: "Alice".into(),
            address: Address {
                street: "Main".into(),
                city: "Town".into(),
            },
            ..Person::default()
        }
    }

    #[test]
    fn secrets_use_the_token_alphabet() {
        let secret = generate_secret(32);
        assert_eq!(secret.len(), 32);
        assert!(secret.bytes().all(|b| SECRET_ALPHABET.contains(&b)));
        assert!(generate_secret(0).is_empty());
    }

    #[test]
    fn hmac_tokens_validate_only_against_their_secret() {
        let authority = HmacTokenAuthority::new(b"key");
        let token = authority.generate_token("s3cret");
        assert!(authority.validate_token(&token, "s3cret").is_ok());
        assert!(authority.validate_token(&token, "other").is_err());
        assert!(HmacTokenAuthority::new(b"other key").validate_token(&token, "s3cret").is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let authority = HmacTokenAuthority::new(b"key");
        assert!(authority.validate_token("", "s").is_err());
        assert!(authority.validate_token("no-separator", "s").is_err());
        assert!(authority.validate_token("abcd:zz", "s").is_err());
        assert!(authority.validate_token("abcd:", "s").is_err());
    }

    #[test]
    fn long_keys_are_hashed() {
        let long = [7u8; 100];
        let authority = HmacTokenAuthority::new(&long);
        let token = authority.generate_token("s");
        assert!(HmacTokenAuthority::new(&long).validate_token(&token, "s").is_ok());
    }

    #[test]
    fn secured_bind_without_token_fails() {
        let ctx = SessionContext::new("session-1");
        let params = MapParams::new().with_value("person-name", "Alice");
        let err = fixtures::secured_person_form()
            .bind(&params, &locale(), Some(&ctx), &[])
            .unwrap_err();
        assert!(err.is_authorization());
        assert!(matches!(err, FormError::TokenMissing { ref field } if field == "person-formAuthToken"));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let ctx = SessionContext::new("session-1");
        let form = fixtures::secured_person_form();
        form.fill(FormData::unvalidated(person()), &locale(), Some(&ctx)).unwrap();
        let secret_key = form.node().root_secret_key();
        let issued = ctx.user_storage().get(&secret_key);
        assert!(issued.is_some());

        for blank in ["", "   "] {
            let params = MapParams::new()
                .with_value("person-name", "Alice")
                .with_value("person-formAuthToken", blank);
            let err = form.bind(&params, &locale(), Some(&ctx), &[]).unwrap_err();
            assert!(err.is_authorization());
            assert!(matches!(err, FormError::TokenMissing { .. }));
            // nothing read, nothing consumed
            assert_eq!(ctx.user_storage().get(&secret_key), issued);
        }
    }

    #[test]
    fn padded_token_is_rejected() {
        let ctx = SessionContext::new("session-1");
        let form = fixtures::secured_person_form();
        let filled = form.fill(FormData::unvalidated(person()), &locale(), Some(&ctx)).unwrap();
        let token = filled.node().field(AUTH_TOKEN_FIELD_NAME).unwrap().value().unwrap().to_string();

        let params = MapParams::new()
            .with_value("person-name", "Alice")
            .with_value("person-formAuthToken", format!(" {token} "));
        let err = form.bind(&params, &locale(), Some(&ctx), &[]).unwrap_err();
        assert!(matches!(err, FormError::InvalidToken(_)));
    }

    #[test]
    fn filled_token_stays_out_of_printed_trees() {
        let ctx = SessionContext::new("session-1");
        let filled = fixtures::secured_person_form()
            .fill(FormData::unvalidated(person()), &locale(), Some(&ctx))
            .unwrap();
        let token = filled.node().field(AUTH_TOKEN_FIELD_NAME).unwrap().value().unwrap().to_string();

        let described = filled.node().to_string();
        let debugged = format!("{:?}", filled.node());
        assert!(!described.contains(&token));
        assert!(!debugged.contains(&token));
        assert!(described.contains("<redacted>"));
        // other values still show
        assert!(described.contains("Alice"));
    }

    #[test]
    fn secured_bind_without_context_fails() {
        let params = MapParams::new().with_value("person-formAuthToken", "x");
        let err = fixtures::secured_person_form()
            .bind(&params, &locale(), None, &[])
            .unwrap_err();
        assert!(matches!(err, FormError::MissingContext { .. }));
    }

    #[test]
    fn filled_token_binds_once() {
        let ctx = SessionContext::new("session-1");
        let form = fixtures::secured_person_form();
        let filled = form.fill(FormData::unvalidated(person()), &locale(), Some(&ctx)).unwrap();
        let secret_key = form.node().root_secret_key();
        assert!(ctx.user_storage().get(&secret_key).is_some());

        let params = MapParams::from_filled(filled.node());
        let bound = form.bind(&params, &locale(), Some(&ctx), &[]).unwrap();
        assert_eq!(bound.data.name, "Alice");
        assert!(ctx.user_storage().get(&secret_key).is_none());

        // replay
        let err = form.bind(&params, &locale(), Some(&ctx), &[]).unwrap_err();
        assert!(matches!(err, FormError::InvalidToken(_)));
    }

    #[test]
    fn token_of_another_session_is_rejected() {
        let ctx = SessionContext::new("session-1");
        let form = fixtures::secured_person_form();
        let filled = form.fill(FormData::unvalidated(person()), &locale(), Some(&ctx)).unwrap();
        let params = MapParams::from_filled(filled.node());

        let other = SessionContext::with_storage("session-2", ctx.storage());
        let err = form.bind(&params, &locale(), Some(&other), &[]).unwrap_err();
        assert!(matches!(err, FormError::InvalidToken(_)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let ctx = SessionContext::new("session-1");
        let form = fixtures::secured_person_form();
        form.fill(FormData::unvalidated(person()), &locale(), Some(&ctx)).unwrap();
        let params = MapParams::new()
            .with_value("person-name", "Alice")
            .with_value("person-formAuthToken", "00:00");
        let err = form.bind(&params, &locale(), Some(&ctx), &[]).unwrap_err();
        assert!(err.is_authorization());
    }

    #[test]
    fn secured_nested_mapping_checks_root_token_without_consuming_it() {
        let ctx = SessionContext::new("session-1");
        let address = MappingBuilder::<Address>::new("address")
            .field("street", FieldKind::Text)
            .field("city", FieldKind::Text)
            .secured(true)
            .build()
            .unwrap();
        let form = MappingBuilder::<Person>::new("person")
            .field("name", FieldKind::Text)
            .nested(address)
            .secured(true)
            .config(fixtures::config())
            .build()
            .unwrap();

        let filled = form.fill(FormData::unvalidated(person()), &locale(), Some(&ctx)).unwrap();
        // only the root carries a token value
        let nested = filled.node().nested().get("address").unwrap();
        assert!(nested.field(AUTH_TOKEN_FIELD_NAME).unwrap().value().is_none());
        assert!(filled.node().field(AUTH_TOKEN_FIELD_NAME).unwrap().value().is_some());

        let params = MapParams::from_filled(filled.node());
        form.bind(&params, &locale(), Some(&ctx), &[]).unwrap();
        assert!(ctx.user_storage().get(&form.node().root_secret_key()).is_none());
    }

    #[test]
    fn secured_root_list_is_refused() {
        let ctx = SessionContext::new("session-1");
        let lines = MappingBuilder::<Line>::new("lines")
            .field("product", FieldKind::Text)
            .secured(true)
            .config(fixtures::config())
            .build_list()
            .unwrap();

        let params = MapParams::new().with_value("lines[0]-product", "Nut");
        let err = lines.bind(&params, &locale(), Some(&ctx), &[]).unwrap_err();
        assert!(matches!(err, FormError::SecuredRootList { .. }));

        let err = lines
            .fill(FormData::unvalidated(vec![Line::default()]), &locale(), Some(&ctx))
            .unwrap_err();
        assert!(matches!(err, FormError::SecuredRootList { .. }));
    }
}
