use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a macro handler asks the parser to do after running.
pub enum MacroAction {
    /// Nothing further; parsing continues after the macro site.
    Nothing,
    /// Splice `data` in as a new chunk, parsed before the current
    /// input resumes. This is how `.include` works.
    PushChunk { data: String, priority: u8 },
}

/// A registered macro body handler. The argument is the raw macro body
/// (quoted, braced or bare, as written); an `Err` aborts the parse at
/// the macro site.
pub type MacroHandler = Box<dyn FnMut(&str) -> std::result::Result<MacroAction, String>>;

/// Host hook that resolves include targets and checks signatures. The
/// parser performs no I/O of its own; everything goes through this
/// trait.
pub trait Fetcher {
    fn fetch_path(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn fetch_url(&mut self, url: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("url fetching is not available: {url}"),
        ))
    }

    /// Check `data` against a detached signature. The default fetcher
    /// has no keys and rejects everything.
    fn verify(&mut self, _data: &[u8], _signature: &[u8]) -> std::result::Result<(), String> {
        Err("no public keys are registered".to_string())
    }
}

/// Filesystem-only fetcher used unless the host installs its own.
#[derive(Debug, Default)]
pub struct FsFetcher;

impl Fetcher for FsFetcher {}

/// An include target is a local path when it starts with `/` or `.`,
/// otherwise a URL for the fetcher to interpret.
pub(crate) enum IncludeTarget {
    Path(PathBuf),
    Url(String),
}

pub(crate) fn classify_target(target: &str) -> IncludeTarget {
    if target.starts_with('/') || target.starts_with('.') {
        IncludeTarget::Path(PathBuf::from(target))
    } else {
        IncludeTarget::Url(target.to_string())
    }
}

pub(crate) fn fetch_target(
    fetcher: &mut dyn Fetcher,
    target: &str,
) -> io::Result<Vec<u8>> {
    match classify_target(target) {
        IncludeTarget::Path(path) => fetcher.fetch_path(&path),
        IncludeTarget::Url(url) => fetcher.fetch_url(&url),
    }
}

/// Fetch the detached signature companion of an include target
/// (`<target>.sig`).
pub(crate) fn fetch_signature(
    fetcher: &mut dyn Fetcher,
    target: &str,
) -> io::Result<Vec<u8>> {
    let sig = format!("{target}.sig");
    fetch_target(fetcher, &sig)
}
