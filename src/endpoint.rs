//! `[address:]path` endpoints and forgiving `{KEY}` substitution.
//!
//! A source or target location is either a plain local path or
//! `host:path` / `user@host:path`.  Path templates may carry `{TOML_FOLDER}`,
//! `{TODAY}` and `{LATEST}` placeholders which resolve at different times, so
//! substitution is *forgiving*: known keys are replaced, unknown `{KEY}`
//! tokens stay verbatim, extra supplied keys are ignored.

use std::fmt;
use std::path::Path;

/// One side of a folder rule: optional host address plus a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: Option<String>,
    path: String,
}

impl Endpoint {
    /// Split `host:path` into address and path; a string without a colon
    /// (or with a slash before the first colon) is a local path.
    pub fn parse(spec: &str) -> Self {
        if let Some((address, path)) = spec.split_once(':') {
            if !address.is_empty() && !address.contains('/') {
                return Self {
                    address: Some(address.to_owned()),
                    path: path.to_owned(),
                };
            }
        }
        Self {
            address: None,
            path: spec.to_owned(),
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_remote(&self) -> bool {
        self.address.is_some()
    }

    /// The path component without the address.
    pub fn local_path(&self) -> &str {
        &self.path
    }

    /// Whether the path component is absolute.
    pub fn is_absolute(&self) -> bool {
        Path::new(&self.path).is_absolute()
    }

    /// Substitute the supplied keys, leaving unknown `{KEY}` tokens intact.
    pub fn resolve(&self, vars: &[(&str, &str)]) -> Self {
        Self {
            address: self.address.clone(),
            path: str_format(&self.path, vars),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.path.contains(&format!("{{{key}}}"))
    }

    /// Endpoint for the parent directory of the path component.
    pub fn parent(&self) -> Self {
        let parent = Path::new(self.path.trim_end_matches('/'))
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone());
        Self {
            address: self.address.clone(),
            path: parent,
        }
    }

    /// Endpoint with `segment` appended to the path component.
    pub fn join(&self, segment: &str) -> Self {
        let mut path = self.path.trim_end_matches('/').to_owned();
        path.push('/');
        path.push_str(segment);
        Self {
            address: self.address.clone(),
            path,
        }
    }

    /// Rendering used for rsync source arguments.
    pub fn with_trailing_slash(&self) -> String {
        let rendered = self.to_string();
        if rendered.ends_with('/') {
            rendered
        } else {
            format!("{rendered}/")
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "{address}:{}", self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// One-pass forgiving substitution over `{IDENT}` tokens.
pub fn str_format(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let token = &after[..close];
                let is_ident = !token.is_empty()
                    && token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
                match vars.iter().find(|(key, _)| is_ident && *key == token) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_substitutes_supplied_keys() {
        let resolved = str_format(
            "/folder/{KEY_1}_{KEY_2}",
            &[("KEY_1", "hello"), ("KEY_2", "world")],
        );
        assert_eq!(resolved, "/folder/hello_world");
    }

    #[test]
    fn format_ignores_redundant_keys() {
        let resolved = str_format(
            "/folder/{KEY_1}_{KEY_2}",
            &[("KEY_1", "hello"), ("KEY_2", "world"), ("KEY_3", "!")],
        );
        assert_eq!(resolved, "/folder/hello_world");
    }

    #[test]
    fn format_keeps_missing_keys_verbatim() {
        let resolved = str_format("/folder/{KEY_1}_{KEY_2}", &[("KEY_1", "hello")]);
        assert_eq!(resolved, "/folder/hello_{KEY_2}");
    }

    #[test]
    fn format_leaves_unterminated_brace() {
        assert_eq!(str_format("/a/{TODAY", &[("TODAY", "x")]), "/a/{TODAY");
    }

    #[test]
    fn parse_splits_remote_address() {
        let remote = Endpoint::parse("host:/a/b");
        assert_eq!(remote.address(), Some("host"));
        assert_eq!(remote.local_path(), "/a/b");
        assert!(remote.is_absolute());
    }

    #[test]
    fn parse_keeps_local_path_whole() {
        let local = Endpoint::parse("foo/bar");
        assert_eq!(local.address(), None);
        assert_eq!(local.local_path(), "foo/bar");
        assert!(!local.is_absolute());
        assert_eq!(local.with_trailing_slash(), "foo/bar/");
    }

    #[test]
    fn absoluteness_ignores_the_address() {
        let remote = Endpoint::parse("host:foo/bar");
        assert_eq!(remote.address(), Some("host"));
        assert!(!remote.is_absolute());
        assert_eq!(remote.with_trailing_slash(), "host:foo/bar/");
    }

    #[test]
    fn colon_after_slash_is_not_an_address() {
        let local = Endpoint::parse("/funny:dir/name");
        assert_eq!(local.address(), None);
    }

    #[test]
    fn parent_and_join_stay_on_the_same_host() {
        let remote = Endpoint::parse("host:/a/b/c");
        assert_eq!(remote.parent().to_string(), "host:/a/b");
        assert_eq!(remote.join("d").to_string(), "host:/a/b/c/d");
    }

    #[test]
    fn resolve_replaces_placeholders_late() {
        let target = Endpoint::parse("host:/backups/{TODAY}");
        assert!(target.contains_key("TODAY"));
        let resolved = target.resolve(&[("TODAY", "1999-12-25")]);
        assert_eq!(resolved.to_string(), "host:/backups/1999-12-25");
        assert!(!resolved.contains_key("TODAY"));
    }
}
