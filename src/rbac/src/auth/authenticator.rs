//! Resolving a caller from a password pair, an `Authorization` header or a
//! session cookie

use tracing::{debug, warn};

use super::cipher::Cipher;
use crate::domain::{IdentityDomain, PasswordDomain};
use crate::error::Result;
use crate::identity::{Cookie, UserPass};

/// Verifies credentials against the user and password files
#[derive(Debug, Clone)]
pub struct Authenticator {
    identity_domain: IdentityDomain,
    password_domain: PasswordDomain,
    cipher: Cipher,
    cookie_name: String,
}

impl Authenticator {
    pub fn new(
        identity_domain: IdentityDomain,
        password_domain: PasswordDomain,
        cipher: Cipher,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            identity_domain,
            password_domain,
            cipher,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn identity_domain(&self) -> &IdentityDomain {
        &self.identity_domain
    }

    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Hand the loaded domains back for the rest of the decision.
    pub fn into_domains(self) -> (IdentityDomain, PasswordDomain) {
        (self.identity_domain, self.password_domain)
    }

    /// Resolve the caller.
    ///
    /// Sources are tried in order: an explicit pair, the `Authorization`
    /// header (Basic, then Bearer), then the session cookie. The first
    /// source that is present and verifies wins.
    pub fn authenticate(
        &self,
        userpass: Option<&UserPass>,
        auth_header: Option<&str>,
        cookie: Option<&str>,
    ) -> Option<UserPass> {
        userpass
            .and_then(|userpass| self.auth_userpass(userpass))
            .or_else(|| auth_header.and_then(|header| self.auth_header(header)))
            .or_else(|| cookie.and_then(|cookie| self.auth_cookie(cookie)))
    }

    /// Check a pair against the stored password of a known user.
    pub fn auth_userpass(&self, userpass: &UserPass) -> Option<UserPass> {
        let Some(user) = self.identity_domain.user_by_name(&userpass.username) else {
            debug!("unknown user {:?}", userpass.username);
            return None;
        };
        let Some(stored) = self.password_domain.password_for_name(&user.name) else {
            debug!("no password for {:?}", user.name);
            return None;
        };
        if self.cipher.secrets_equal(&stored.password, &userpass.password) {
            Some(userpass.clone())
        } else {
            warn!("bad password for {:?}", user.name);
            None
        }
    }

    pub fn auth_header(&self, header: &str) -> Option<UserPass> {
        if let Some(userpass) = parse_auth_basic(header) {
            return self.auth_userpass(&userpass);
        }
        if let Some(token) = parse_auth_bearer(header) {
            return self.auth_token(token);
        }
        debug!("unsupported Authorization scheme");
        None
    }

    /// Accept a session cookie: either the bare value, or `name=value`
    /// pairs from which the configured cookie name is picked.
    pub fn auth_cookie(&self, cookie: &str) -> Option<UserPass> {
        let cookie = cookie.trim();
        if let Ok(userpass) = self.cipher.decipher_userpass(cookie) {
            return Some(userpass);
        }
        match parse_cookie(cookie, &self.cookie_name) {
            Some(value) => self.auth_token(value),
            None => {
                debug!("no {} cookie", self.cookie_name);
                None
            }
        }
    }

    /// A token needs no password check; only we can produce one.
    pub fn auth_token(&self, token: &str) -> Option<UserPass> {
        match self.cipher.decipher_userpass(token) {
            Ok(userpass) => Some(userpass),
            Err(e) => {
                warn!("rejected session token: {}", e);
                None
            }
        }
    }

    pub fn userpass_token(&self, userpass: &UserPass) -> Result<String> {
        self.cipher.encipher_userpass(userpass)
    }

    pub fn userpass_cookie(&self, userpass: &UserPass) -> Result<Cookie> {
        Ok(Cookie {
            name: self.cookie_name.clone(),
            value: self.userpass_token(userpass)?,
        })
    }
}

/// `Basic base64(user:pass)`
pub fn parse_auth_basic(header: &str) -> Option<UserPass> {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    let encoded = scheme_credentials(header, "Basic")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(UserPass::new(username, password))
}

/// `Bearer TOKEN`
pub fn parse_auth_bearer(header: &str) -> Option<&str> {
    scheme_credentials(header, "Bearer")
}

/// The single credential token after `scheme` and one or more spaces
fn scheme_credentials<'a>(header: &'a str, scheme: &str) -> Option<&'a str> {
    let rest = header.strip_prefix(scheme)?;
    if !rest.starts_with(' ') {
        return None;
    }
    let credentials = rest.trim_start_matches(' ');
    if credentials.is_empty() || credentials.contains(char::is_whitespace) {
        return None;
    }
    Some(credentials)
}

/// Value of cookie `name` in `a=1; name="v"` style text. Quotes are
/// optional; pairs with other names are ignored.
pub fn parse_cookie<'a>(cookie: &'a str, name: &str) -> Option<&'a str> {
    cookie.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key.trim() != name {
            return None;
        }
        let value = value.trim();
        Some(
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TextLoader;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn authenticator() -> Authenticator {
        let loader = TextLoader::new();
        let users = loader.read_users("user bob staff\nuser frank staff\n").unwrap();
        let passwords = loader.read_passwords("password bob b0b3r7\n").unwrap();
        Authenticator::new(
            IdentityDomain::new(users, Vec::new()),
            PasswordDomain::new(passwords),
            Cipher::new("123"),
            "authsession",
        )
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{user}:{pass}")))
    }

    #[test]
    fn test_auth_userpass() {
        let auth = authenticator();
        assert!(auth.auth_userpass(&UserPass::new("bob", "b0b3r7")).is_some());
        assert!(auth.auth_userpass(&UserPass::new("bob", "wrong")).is_none());
        // known user without a password record
        assert!(auth.auth_userpass(&UserPass::new("frank", "")).is_none());
        assert!(auth.auth_userpass(&UserPass::new("mallory", "x")).is_none());
    }

    #[test]
    fn test_parse_auth_basic() {
        let userpass = parse_auth_basic(&basic("bob", "a:b")).unwrap();
        assert_eq!(userpass.username, "bob");
        assert_eq!(userpass.password, "a:b");
        assert!(parse_auth_basic("Basic").is_none());
        assert!(parse_auth_basic("Basic !!!").is_none());
        assert!(parse_auth_basic("Basicx Ym9iOng=").is_none());
        assert!(parse_auth_basic(&format!("Basic {}", BASE64.encode("nocolon"))).is_none());
    }

    #[test]
    fn test_parse_auth_bearer() {
        assert_eq!(parse_auth_bearer("Bearer  abc="), Some("abc="));
        assert_eq!(parse_auth_bearer("Bearer a b"), None);
        assert_eq!(parse_auth_bearer("Token abc"), None);
    }

    #[test]
    fn test_parse_cookie() {
        assert_eq!(parse_cookie("authsession=abc==", "authsession"), Some("abc=="));
        assert_eq!(parse_cookie("authsession=\"abc==\"", "authsession"), Some("abc=="));
        assert_eq!(parse_cookie("theme=dark; authsession=t0k", "authsession"), Some("t0k"));
        assert_eq!(parse_cookie("other=abc", "authsession"), None);
    }

    #[test]
    fn test_auth_header() {
        let auth = authenticator();
        let ok = auth.auth_header(&basic("bob", "b0b3r7")).unwrap();
        assert_eq!(ok.username, "bob");
        assert!(auth.auth_header(&basic("bob", "nope")).is_none());

        let token = auth.userpass_token(&UserPass::new("bob", "b0b3r7")).unwrap();
        let ok = auth.auth_header(&format!("Bearer {token}")).unwrap();
        assert_eq!(ok.username, "bob");
        assert!(auth.auth_header("Bearer garbage").is_none());
        assert!(auth.auth_header("Digest x").is_none());
    }

    #[test]
    fn test_auth_cookie_forms() {
        let auth = authenticator();
        let cookie = auth.userpass_cookie(&UserPass::new("bob", "b0b3r7")).unwrap();
        assert_eq!(cookie.name, "authsession");

        assert!(auth.auth_cookie(&cookie.value).is_some());
        assert!(auth.auth_cookie(&cookie.to_string()).is_some());
        assert!(auth.auth_cookie(&format!("authsession=\"{}\"", cookie.value)).is_some());
        assert!(auth.auth_cookie(&format!("x=1; {}", cookie)).is_some());
        assert!(auth.auth_cookie(&format!("other={}", cookie.value)).is_none());
        assert!(auth.auth_cookie("authsession=forged").is_none());
    }

    #[test]
    fn test_authenticate_order() {
        let auth = authenticator();
        let cookie = auth.userpass_token(&UserPass::new("carol", "x")).unwrap();

        let good = UserPass::new("bob", "b0b3r7");
        let found = auth
            .authenticate(Some(&good), None, Some(&cookie))
            .unwrap();
        assert_eq!(found.username, "bob");

        // a failing earlier source falls through to the next
        let bad = UserPass::new("bob", "nope");
        let found = auth
            .authenticate(Some(&bad), Some("Bearer junk"), Some(&cookie))
            .unwrap();
        assert_eq!(found.username, "carol");

        assert!(auth.authenticate(None, None, None).is_none());
    }
}
