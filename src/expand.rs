//! Variable expansion in raw config text, applied before parsing.
//!
//! ## Syntax
//!
//! - `${VAR}` - Substitute the value of `VAR`. Error if it has no value.
//! - `${VAR:default}` - Substitute `VAR`, or `default` if it has no value.
//! - `${VAR:""}` - Substitute `VAR`, or the empty string.
//! - `$VAR` - Shell-style name: letters, digits and `_`, not starting with a
//!   digit. Error if it has no value.
//! - `$$` - A literal `$`.
//!
//! Any other `$` is copied through untouched, as is an unterminated `${`.
//! Defaults are used verbatim; nothing inside them is expanded.
//!
//! ## Example
//!
//! ```text
//! modules:
//!   http:
//!     port: ${HTTP_PORT:8080}   -> 8080 when HTTP_PORT is not set
//! ```

use crate::error::{Error, Result};
use std::io::{self, Read};

/// Separator between a variable name and its default inside `${...}`.
pub const DEFAULT_VALUE_SEPARATOR: char = ':';

/// Default text meaning "substitute the empty string".
pub const EMPTY_DEFAULT: &str = r#""""#;

const CHUNK_SIZE: usize = 8 * 1024;

/// Token conventions for expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Splits `${KEY<sep>DEFAULT}` at its first occurrence.
    pub default_separator: char,
    /// A default equal to this expands to the empty string.
    pub empty_default: String,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            default_separator: DEFAULT_VALUE_SEPARATOR,
            empty_default: EMPTY_DEFAULT.to_string(),
        }
    }
}

/// Source of variable values, allowing tests to use a mock environment.
pub trait Lookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Looks variables up in the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvLookup;

impl Lookup for EnvLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Expand all variable references in `input` using the default options.
pub fn expand<L: Lookup + ?Sized>(input: &str, lookup: &L) -> Result<String> {
    expand_with(input, lookup, &ExpandOptions::default())
}

/// Expand all variable references in `input`.
pub fn expand_with<L: Lookup + ?Sized>(
    input: &str,
    lookup: &L,
    options: &ExpandOptions,
) -> Result<String> {
    // Quick check: no $ means nothing to substitute
    if !input.contains('$') {
        return Ok(input.to_string());
    }

    let resolver = |body: &str| resolve(body, lookup, options);
    let mut scanner = Scanner::default();
    let mut out = Vec::with_capacity(input.len());
    for byte in input.bytes() {
        scanner.feed(byte, &mut out, &resolver)?;
    }
    scanner.finish(&mut out, &resolver)?;

    // Only ASCII bytes are ever split off, so valid input stays valid.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Resolve the body of one token: `KEY` or `KEY<sep>DEFAULT`.
fn resolve<L: Lookup + ?Sized>(body: &str, lookup: &L, options: &ExpandOptions) -> Result<String> {
    let (key, default) = match body.split_once(options.default_separator) {
        Some((key, default)) => (key, default),
        None => (body, ""),
    };

    if let Some(value) = lookup.lookup(key) {
        return Ok(value);
    }

    if default.is_empty() {
        Err(Error::undefined_variable(key))
    } else if default == options.empty_default {
        Ok(String::new())
    } else {
        Ok(default.to_string())
    }
}

/// Where the scanner is inside a potential token.
#[derive(Debug, Default)]
enum State {
    #[default]
    Text,
    /// Just saw `$`.
    Dollar,
    /// Inside `${`, collecting the body.
    Braced(Vec<u8>),
    /// Inside `$NAME`, collecting the name.
    Bare(Vec<u8>),
}

/// Byte-at-a-time token recognizer. Only the current token is buffered.
#[derive(Debug, Default)]
struct Scanner {
    state: State,
}

impl Scanner {
    fn feed<F>(&mut self, byte: u8, out: &mut Vec<u8>, resolve: &F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        match std::mem::take(&mut self.state) {
            State::Text => self.text(byte, out),
            State::Dollar => match byte {
                b'$' => out.push(b'$'),
                b'{' => self.state = State::Braced(Vec::new()),
                b if is_name_start(b) => self.state = State::Bare(vec![b]),
                b => {
                    out.push(b'$');
                    out.push(b);
                }
            },
            State::Braced(mut body) => {
                if byte == b'}' {
                    let value = resolve(&String::from_utf8_lossy(&body))?;
                    out.extend_from_slice(value.as_bytes());
                } else {
                    body.push(byte);
                    self.state = State::Braced(body);
                }
            }
            State::Bare(mut name) => {
                if is_name_char(byte) {
                    name.push(byte);
                    self.state = State::Bare(name);
                } else {
                    let value = resolve(&String::from_utf8_lossy(&name))?;
                    out.extend_from_slice(value.as_bytes());
                    self.text(byte, out);
                }
            }
        }
        Ok(())
    }

    fn text(&mut self, byte: u8, out: &mut Vec<u8>) {
        if byte == b'$' {
            self.state = State::Dollar;
        } else {
            out.push(byte);
        }
    }

    /// Flush whatever token is pending at end of input.
    fn finish<F>(&mut self, out: &mut Vec<u8>, resolve: &F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        match std::mem::take(&mut self.state) {
            State::Text => {}
            State::Dollar => out.push(b'$'),
            State::Braced(body) => {
                out.extend_from_slice(b"${");
                out.extend_from_slice(&body);
            }
            State::Bare(name) => {
                let value = resolve(&String::from_utf8_lossy(&name))?;
                out.extend_from_slice(value.as_bytes());
            }
        }
        Ok(())
    }
}

fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// A reader that expands variable references as it streams.
///
/// Pulls fixed-size chunks from `inner` and never holds more than one chunk
/// of output plus the token being matched. An undefined variable surfaces as
/// an [`io::ErrorKind::InvalidData`] error wrapping
/// [`Error::UndefinedVariable`]; `Error::from(io_error)` recovers it.
pub struct ExpandReader<'l, R, L: ?Sized> {
    inner: R,
    lookup: &'l L,
    options: ExpandOptions,
    scanner: Scanner,
    out: Vec<u8>,
    pos: usize,
    done: bool,
    failed: Option<String>,
}

impl<'l, R: Read, L: Lookup + ?Sized> ExpandReader<'l, R, L> {
    pub fn new(inner: R, lookup: &'l L) -> Self {
        Self::with_options(inner, lookup, ExpandOptions::default())
    }

    pub fn with_options(inner: R, lookup: &'l L, options: ExpandOptions) -> Self {
        Self {
            inner,
            lookup,
            options,
            scanner: Scanner::default(),
            out: Vec::new(),
            pos: 0,
            done: false,
            failed: None,
        }
    }

    /// Give back the wrapped reader. Unread expanded output is dropped.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Refill `out` from the next chunk of input.
    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        self.out.clear();
        self.pos = 0;

        let lookup = self.lookup;
        let options = &self.options;
        let resolver = |body: &str| resolve(body, lookup, options);
        if n == 0 {
            self.done = true;
            return self.scanner.finish(&mut self.out, &resolver);
        }
        for &byte in &chunk[..n] {
            self.scanner.feed(byte, &mut self.out, &resolver)?;
        }
        Ok(())
    }
}

impl<R: Read, L: Lookup + ?Sized> Read for ExpandReader<'_, R, L> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(key) = &self.failed {
            return Err(undefined_io_error(key));
        }

        while self.pos == self.out.len() {
            if self.done {
                return Ok(0);
            }
            match self.fill() {
                Ok(()) => {}
                Err(Error::UndefinedVariable { key }) => {
                    let err = undefined_io_error(&key);
                    self.failed = Some(key);
                    return Err(err);
                }
                Err(Error::SourceRead { source, .. }) => return Err(source),
                Err(other) => return Err(io::Error::new(io::ErrorKind::InvalidData, other)),
            }
        }

        let pending = &self.out[self.pos..];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.pos += n;
        Ok(n)
    }
}

fn undefined_io_error(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, Error::undefined_variable(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(_: &str) -> Option<String> {
        None
    }

    fn env(key: &str) -> Option<String> {
        match key {
            "P" => Some("9090".to_string()),
            "HOST" => Some("db.local".to_string()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_default_used_when_missing() {
        assert_eq!(expand("port: ${P:8080}", &missing).unwrap(), "port: 8080");
    }

    #[test]
    fn test_found_value_wins_over_default() {
        assert_eq!(expand("port: ${P:8080}", &env).unwrap(), "port: 9090");
    }

    #[test]
    fn test_empty_default_sentinel() {
        assert_eq!(expand(r#"${P:""}"#, &missing).unwrap(), "");
        assert_eq!(expand(r#"a: "${P:""}""#, &missing).unwrap(), r#"a: """#);
    }

    #[test]
    fn test_missing_required() {
        match expand("${P}", &missing).unwrap_err() {
            Error::UndefinedVariable { key } => assert_eq!(key, "P"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bare_name_missing_is_error() {
        let err = expand("host: $DB_HOST", &missing).unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable { key } if key == "DB_HOST"));
    }

    #[test]
    fn test_literal_dollar() {
        assert_eq!(expand("cost: $$5", &missing).unwrap(), "cost: $5");
        assert_eq!(expand("$${HOST}", &env).unwrap(), "${HOST}");
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(expand("url: $HOST/x", &env).unwrap(), "url: db.local/x");
        assert_eq!(expand("$HOST", &env).unwrap(), "db.local");
        assert_eq!(expand("$P$HOST", &env).unwrap(), "9090db.local");
    }

    #[test]
    fn test_found_empty_value_is_substituted() {
        assert_eq!(expand("[${EMPTY}]", &env).unwrap(), "[]");
    }

    #[test]
    fn test_other_dollars_pass_through() {
        assert_eq!(expand("price: 5$", &missing).unwrap(), "price: 5$");
        assert_eq!(expand("a $1 b", &missing).unwrap(), "a $1 b");
        assert_eq!(expand("a $- b", &missing).unwrap(), "a $- b");
    }

    #[test]
    fn test_unterminated_brace_passes_through() {
        assert_eq!(expand("x: ${HOST", &env).unwrap(), "x: ${HOST");
    }

    #[test]
    fn test_default_is_not_expanded_and_splits_once() {
        assert_eq!(expand("${X:$HOST}", &env).unwrap(), "$HOST");
        assert_eq!(
            expand("${URL:http://h:1}", &missing).unwrap(),
            "http://h:1"
        );
    }

    #[test]
    fn test_unicode_text_preserved() {
        assert_eq!(expand("név: ${HOST} ✓", &env).unwrap(), "név: db.local ✓");
    }

    #[test]
    fn test_custom_options() {
        let options = ExpandOptions {
            default_separator: '|',
            empty_default: "<none>".to_string(),
        };
        assert_eq!(
            expand_with("${A|x:y} ${B|<none>}", &missing, &options).unwrap(),
            "x:y "
        );
    }

    #[test]
    fn test_env_lookup() {
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(expand("${PATH}", &EnvLookup).unwrap(), path);
        }
        assert!(expand("${YAML_LAYERS_SURELY_UNSET_VAR}", &EnvLookup).is_err());
    }

    #[test]
    fn test_reader_matches_expand_across_chunk_boundaries() {
        let input = "a: ${P:1}\nb: $HOST\nc: $$\nd: ${MISSING:\"\"}\ne: ü$P";
        let expected = expand(input, &env).unwrap();
        for step in 1..=7 {
            let source = Trickle {
                data: input.as_bytes(),
                step,
            };
            let mut out = String::new();
            ExpandReader::new(source, &env)
                .read_to_string(&mut out)
                .unwrap();
            assert_eq!(out, expected, "step {step}");
        }
    }

    #[test]
    fn test_reader_surfaces_undefined_variable() {
        let mut reader = ExpandReader::new("port: ${PORT}".as_bytes(), &missing);
        let mut out = String::new();
        let err = reader.read_to_string(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        match Error::from(err) {
            Error::UndefinedVariable { key } => assert_eq!(key, "PORT"),
            other => panic!("unexpected error: {other}"),
        }

        // The reader stays failed.
        assert!(reader.read(&mut [0u8; 16]).is_err());
    }

    #[test]
    fn test_into_inner_returns_unread_input() {
        let data = "a: $HOST\nrest".as_bytes();
        let source = Trickle { data, step: 9 };
        let mut reader = ExpandReader::new(source, &env);
        let mut buf = [0u8; 64];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"a: db.local\n");
        assert_eq!(reader.into_inner().data, b"rest");
    }
}
