use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Redacts credentials from text before it is written anywhere
#[derive(Clone)]
pub struct SecretScrubber {
    patterns: Arc<[(Regex, &'static str)]>,
}

impl SecretScrubber {
    /// Build the scrubber
    ///
    /// Covers bearer tokens, `api-key`/token/secret/password fields in
    /// headers, query strings and JSON, and bare JWTs such as Azure CLI
    /// access tokens.
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = vec![
            (
                Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9\-_\.=]+")?,
                "${1}[REDACTED]",
            ),
            (
                Regex::new(
                    r#"(?i)(["']?(?:api[-_]?key|access_?token|token|secret|password)["']?\s*[:=]\s*["']?)[^"'\s,}&]+"#,
                )?,
                "${1}[REDACTED]",
            ),
            (
                Regex::new(r"eyJ[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+")?,
                "[JWT_REDACTED]",
            ),
        ];
        Ok(Self {
            patterns: patterns.into(),
        })
    }

    /// Scrub a message of sensitive data
    pub fn scrub<'a>(&self, message: &'a str) -> Cow<'a, str> {
        let mut scrubbed = Cow::Borrowed(message);
        for (pattern, replacement) in self.patterns.iter() {
            let replaced = match pattern.replace_all(&scrubbed, *replacement) {
                Cow::Owned(replaced) => Some(replaced),
                Cow::Borrowed(_) => None,
            };
            if let Some(replaced) = replaced {
                scrubbed = Cow::Owned(replaced);
            }
        }
        scrubbed
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber")
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

/// [`MakeWriter`] wrapper that scrubs every formatted event
#[derive(Debug, Clone)]
pub struct ScrubbingMakeWriter<M> {
    inner: M,
    scrubber: SecretScrubber,
}

impl<M> ScrubbingMakeWriter<M> {
    pub const fn new(inner: M, scrubber: SecretScrubber) -> Self {
        Self { inner, scrubber }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for ScrubbingMakeWriter<M> {
    type Writer = ScrubbingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        ScrubbingWriter {
            inner: self.inner.make_writer(),
            scrubber: self.scrubber.clone(),
        }
    }
}

/// Writer produced by [`ScrubbingMakeWriter`]
///
/// The fmt layer hands over each event as one buffer, so patterns never
/// straddle two writes.
pub struct ScrubbingWriter<W> {
    inner: W,
    scrubber: SecretScrubber,
}

impl<W: io::Write> io::Write for ScrubbingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match std::str::from_utf8(buf) {
            Ok(text) => {
                self.inner.write_all(self.scrubber.scrub(text).as_bytes())?;
                Ok(buf.len())
            }
            Err(_) => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
