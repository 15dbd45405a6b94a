//! Request path parsing and module path escaping.
//!
//! Module paths may contain uppercase letters, but the proxy protocol and the
//! store file names only ever carry lowercase ones: an uppercase `X` travels as
//! `!x`. [`escape`] and [`unescape`] convert between the two forms and are
//! inverses of each other on every valid module path.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::error::{ProxyError, Result};
use crate::semver;

const LATEST_SUFFIX: &str = "/@latest";
const LIST_SUFFIX: &str = "/@v/list";
const VERSION_MARKER: &str = "/@v/";

/// The proxy operation a request path names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `/@latest`. Always answered with not-found.
    Latest,
    /// `/@v/list`
    List,
    /// `/@v/<version>.info`
    Info(String),
    /// `/@v/<version>.mod`
    Mod(String),
    /// `/@v/<version>.zip`
    Zip(String),
}

impl Operation {
    /// The version carried by the operation, if any.
    pub fn version(&self) -> Option<&str> {
        match self {
            Operation::Latest | Operation::List => None,
            Operation::Info(v) | Operation::Mod(v) | Operation::Zip(v) => Some(v),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Latest => "latest",
            Operation::List => "list",
            Operation::Info(_) => "info",
            Operation::Mod(_) => "mod",
            Operation::Zip(_) => "zip",
        }
    }
}

/// A parsed proxy request: a canonical module path and what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleQuery {
    pub module: String,
    pub op: Operation,
}

impl fmt::Display for ModuleQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op.version() {
            Some(v) => write!(f, "{} {}@{}", self.op.name(), self.module, v),
            None => write!(f, "{} {}", self.op.name(), self.module),
        }
    }
}

/// Parse a request path such as `/example.com/!foo/@v/v1.0.0.zip`.
///
/// The path is percent-decoded first, since clients send `!` as `%21`.
/// Performs no I/O. Versions must already be canonical; `1.0.0`, `v1.0` and
/// `v1.0.0+meta` are all rejected here.
pub fn parse_request(raw: &str) -> Result<ModuleQuery> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| ProxyError::malformed(raw, "invalid UTF-8 after percent-decoding"))?;
    let path: &str = &decoded;

    let Some(rest) = path.strip_prefix('/') else {
        return Err(ProxyError::malformed(path, "does not start with '/'"));
    };

    let (escaped_module, op) = if let Some(module) = rest.strip_suffix(LATEST_SUFFIX) {
        (module, Operation::Latest)
    } else if let Some(module) = rest.strip_suffix(LIST_SUFFIX) {
        (module, Operation::List)
    } else {
        let Some(at) = rest.find(VERSION_MARKER) else {
            return Err(ProxyError::malformed(path, "does not contain '@v'"));
        };
        let module = &rest[..at];
        let file = &rest[at + VERSION_MARKER.len()..];
        let Some(dot) = file.rfind('.') else {
            return Err(ProxyError::malformed(path, "does not have extension"));
        };
        let (escaped_version, ext) = (&file[..dot], &file[dot + 1..]);

        if !matches!(ext, "info" | "latest" | "list" | "mod" | "zip") {
            return Err(ProxyError::malformed(
                path,
                format!("invalid extension {ext:?}"),
            ));
        }
        let version = parse_version(path, escaped_version)?;
        let op = match ext {
            "info" => Operation::Info(version),
            "mod" => Operation::Mod(version),
            "zip" => Operation::Zip(version),
            "latest" => Operation::Latest,
            _ => Operation::List,
        };
        (module, op)
    };

    let module = unescape(escaped_module)
        .ok_or_else(|| {
            ProxyError::malformed(path, format!("invalid escaped module path {escaped_module:?}"))
        })?;
    check_path(&module).map_err(|reason| {
        ProxyError::malformed(path, format!("malformed module path {module:?}: {reason}"))
    })?;

    Ok(ModuleQuery { module, op })
}

fn parse_version(path: &str, escaped: &str) -> Result<String> {
    let version = unescape(escaped)
        .ok_or_else(|| ProxyError::malformed(path, format!("invalid escaped version {escaped:?}")))?;
    if version.is_empty() {
        return Err(ProxyError::malformed(path, "version is empty"));
    }
    if !semver::is_canonical(&version) {
        return Err(ProxyError::malformed(
            path,
            format!("version {version:?} is not canonical"),
        ));
    }
    Ok(version)
}

/// Encode every uppercase ASCII letter as `!` followed by its lowercase form.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Invert [`escape`].
///
/// Returns `None` if `s` contains a raw uppercase letter or a `!` that is not
/// followed by a lowercase ASCII letter.
pub fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut bang = false;
    for c in s.chars() {
        if bang {
            if !c.is_ascii_lowercase() {
                return None;
            }
            out.push(c.to_ascii_uppercase());
            bang = false;
        } else if c == '!' {
            bang = true;
        } else if c.is_ascii_uppercase() {
            return None;
        } else {
            out.push(c);
        }
    }
    (!bang).then_some(out)
}

/// Validate an unescaped module path.
///
/// The first element is a lowercase host-like name containing a dot; later
/// elements may use both cases. No element may be empty, start or end with a
/// dot, or use characters outside `[A-Za-z0-9-._~]`.
pub fn check_path(path: &str) -> std::result::Result<(), String> {
    if path.is_empty() {
        return Err("empty string".to_string());
    }
    if path.starts_with('/') {
        return Err("leading slash".to_string());
    }
    if path.ends_with('/') {
        return Err("trailing slash".to_string());
    }
    if path.contains("//") {
        return Err("double slash".to_string());
    }

    for (i, elem) in path.split('/').enumerate() {
        if elem == "." || elem == ".." {
            return Err(format!("invalid path element {elem:?}"));
        }
        if elem.starts_with('.') {
            return Err(format!("leading dot in path element {elem:?}"));
        }
        if elem.ends_with('.') {
            return Err(format!("trailing dot in path element {elem:?}"));
        }
        if let Some(c) = elem
            .chars()
            .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')))
        {
            return Err(format!("invalid char {c:?}"));
        }
        if i == 0 {
            if elem.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(format!("uppercase letter in first path element {elem:?}"));
            }
            if !elem.contains('.') {
                return Err(format!("missing dot in first path element {elem:?}"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(path: &str) -> String {
        parse_request(path).unwrap_err().to_string()
    }

    #[test]
    fn parses_every_operation() {
        let q = parse_request("/example.com/m/@latest").unwrap();
        assert_eq!(q.module, "example.com/m");
        assert_eq!(q.op, Operation::Latest);

        let q = parse_request("/example.com/m/@v/list").unwrap();
        assert_eq!(q.op, Operation::List);

        let q = parse_request("/example.com/m/@v/v1.0.0.info").unwrap();
        assert_eq!(q.op, Operation::Info("v1.0.0".to_string()));

        let q = parse_request("/example.com/m/@v/v1.0.0.mod").unwrap();
        assert_eq!(q.op, Operation::Mod("v1.0.0".to_string()));

        let q = parse_request("/example.com/m/@v/v1.2.3-rc.1.zip").unwrap();
        assert_eq!(q.op, Operation::Zip("v1.2.3-rc.1".to_string()));
        assert_eq!(q.to_string(), "zip example.com/m@v1.2.3-rc.1");
    }

    #[test]
    fn unescapes_module_and_version() {
        let q = parse_request("/github.com/!burnt!sushi/toml/@v/v1.0.0-!r!c1.mod").unwrap();
        assert_eq!(q.module, "github.com/BurntSushi/toml");
        assert_eq!(q.op, Operation::Mod("v1.0.0-RC1".to_string()));
    }

    #[test]
    fn decodes_percent_escapes() {
        let q = parse_request("/github.com/%21burnt%21sushi/toml/@v/v1.0.0-%21r%21c1.zip").unwrap();
        assert_eq!(q.module, "github.com/BurntSushi/toml");
        assert_eq!(q.op, Operation::Zip("v1.0.0-RC1".to_string()));

        assert_eq!(
            parse_err("/example.com/%FF/@v/list"),
            "parsing path /example.com/%FF/@v/list: invalid UTF-8 after percent-decoding"
        );
    }

    #[test]
    fn version_segment_is_checked_for_every_extension() {
        let q = parse_request("/example.com/m/@v/v1.0.0.list").unwrap();
        assert_eq!(q.op, Operation::List);
        let q = parse_request("/example.com/m/@v/v1.0.0.latest").unwrap();
        assert_eq!(q.op, Operation::Latest);

        assert!(parse_err("/example.com/m/@v/junk.list").contains("\"junk\" is not canonical"));
        assert!(parse_err("/example.com/m/@v/junk.latest").contains("is not canonical"));
        assert!(parse_err("/example.com/m/@v/.list").contains("version is empty"));
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(parse_err("example.com/m/@v/list").contains("does not start with '/'"));
        assert!(parse_err("/example.com/m").contains("does not contain '@v'"));
        assert!(parse_err("/example.com/m/@v/v1").contains("does not have extension"));
        assert!(parse_err("/example.com/m/@v/v1.0.0.txt").contains("invalid extension \"txt\""));
        assert!(parse_err("/example.com/m/@v/.zip").contains("version is empty"));
        assert!(parse_err("/example.com/m/@v/1.0.0.zip").contains("is not canonical"));
        assert!(parse_err("/example.com/m/@v/v1.0.zip").contains("is not canonical"));
        assert!(parse_err("/example.com/M/@v/list").contains("invalid escaped module path"));
        assert!(parse_err("/example.com/m/@v/v1.0.0-!.zip").contains("invalid escaped version"));
        assert!(parse_err("//@v/list").contains("malformed module path"));
        assert!(parse_err("/example.com/../x/@v/list").contains("malformed module path"));
    }

    #[test]
    fn errors_name_the_request_path() {
        assert_eq!(
            parse_err("/example.com/m/@v/v1.0.0.txt"),
            "parsing path /example.com/m/@v/v1.0.0.txt: invalid extension \"txt\""
        );
    }

    #[test]
    fn escape_round_trips() {
        for p in [
            "example.com/m",
            "github.com/BurntSushi/toml",
            "example.com/A/B/CdE",
            "gopkg.in/Yaml.v2",
            "example.com/x_y~z/Q-1",
        ] {
            assert!(check_path(p).is_ok(), "{p}");
            let escaped = escape(p);
            assert!(!escaped.chars().any(|c| c.is_ascii_uppercase()));
            assert_eq!(unescape(&escaped).as_deref(), Some(p));
        }
        assert_eq!(escape("github.com/BurntSushi"), "github.com/!burnt!sushi");
    }

    #[test]
    fn unescape_rejects_bad_input() {
        assert_eq!(unescape("a!"), None);
        assert_eq!(unescape("a!1"), None);
        assert_eq!(unescape("a!!b"), None);
        assert_eq!(unescape("aB"), None);
    }

    #[test]
    fn check_path_rules() {
        assert!(check_path("example.com").is_ok());
        assert!(check_path("").is_err());
        assert!(check_path("example.com/").is_err());
        assert!(check_path("/example.com").is_err());
        assert!(check_path("example.com//m").is_err());
        assert!(check_path("example.com/.hidden").is_err());
        assert!(check_path("example.com/m.").is_err());
        assert!(check_path("example.com/a b").is_err());
        assert!(check_path("example.com/a!b").is_err());
        assert!(check_path("Example.com/m").is_err());
        assert!(check_path("localhost/m").is_err());
    }
}
