//! Semantic version canonicalization.
//!
//! Versions use the module convention: a leading `v`, then
//! `MAJOR[.MINOR[.PATCH]]`, an optional `-PRERELEASE` and an optional
//! `+BUILD`. The canonical form always has all three numbers and never
//! carries build metadata, so `v1.2` becomes `v1.2.0` and
//! `v1.0.0+meta` becomes `v1.0.0`.

struct Parsed<'a> {
    major: &'a str,
    minor: &'a str,
    patch: &'a str,
    prerelease: &'a str,
}

/// Return the canonical form of `v`, or `None` if `v` is not a valid version.
pub fn canonical(v: &str) -> Option<String> {
    let p = parse(v)?;
    Some(format!("v{}.{}.{}{}", p.major, p.minor, p.patch, p.prerelease))
}

/// Report whether `v` is non-empty and already in canonical form.
pub fn is_canonical(v: &str) -> bool {
    !v.is_empty() && canonical(v).as_deref() == Some(v)
}

fn parse(v: &str) -> Option<Parsed<'_>> {
    let rest = v.strip_prefix('v')?;

    let (major, rest) = parse_int(rest)?;
    if rest.is_empty() {
        return Some(Parsed {
            major,
            minor: "0",
            patch: "0",
            prerelease: "",
        });
    }

    let (minor, rest) = parse_int(rest.strip_prefix('.')?)?;
    if rest.is_empty() {
        return Some(Parsed {
            major,
            minor,
            patch: "0",
            prerelease: "",
        });
    }

    let (patch, rest) = parse_int(rest.strip_prefix('.')?)?;

    let (prerelease, rest) = if rest.starts_with('-') {
        parse_prerelease(rest)?
    } else {
        ("", rest)
    };

    if rest.starts_with('+') {
        parse_build(rest)?;
    } else if !rest.is_empty() {
        return None;
    }

    Some(Parsed {
        major,
        minor,
        patch,
        prerelease,
    })
}

/// Split a leading decimal number off `s`. Leading zeros are not allowed.
fn parse_int(s: &str) -> Option<(&str, &str)> {
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    let (num, rest) = s.split_at(end);
    if num.len() > 1 && num.starts_with('0') {
        return None;
    }
    Some((num, rest))
}

/// Split `-PRERELEASE` off `s`, keeping the leading `-` in the result.
fn parse_prerelease(s: &str) -> Option<(&str, &str)> {
    let end = s.find('+').unwrap_or(s.len());
    let (pre, rest) = s.split_at(end);
    let valid = pre[1..].split('.').all(|ident| {
        is_ident(ident) && !(is_numeric(ident) && ident.len() > 1 && ident.starts_with('0'))
    });
    valid.then_some((pre, rest))
}

/// Validate `+BUILD`, which must run to the end of the string.
fn parse_build(s: &str) -> Option<()> {
    s[1..].split('.').all(is_ident).then_some(())
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn is_numeric(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}
