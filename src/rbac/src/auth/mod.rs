//! Authentication and session tokens

pub mod authenticator;
pub mod cipher;

pub use authenticator::{parse_auth_basic, parse_auth_bearer, parse_cookie, Authenticator};
pub use cipher::{Cipher, TOKEN_VERSION};
