//! Directory-backed cache shared across processes
//!
//! One file per key, named by the uppercase base16 encoding of the key's
//! bytes; keys too long for one file name nest into segment directories.
//! File contents are the serialized [`Value`]; the file's
//! modification time is the only age signal.
//!
//! Writers hold an exclusive `flock` while replacing a file, readers a
//! shared one, so a reader never sees a partially written entry. There is
//! no coordination about *who* computes a value: two processes that miss
//! at the same time both compute and the last write wins.

use super::lock::{FileLock, LockMode, LockWait};
use super::serialization::{restricted_deserialize, serialize, AllowList};
use super::{Cache, Filter, FilterChain, Value};
use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// File name used for the empty key; `_` never appears in hex output
const EMPTY_KEY_NAME: &str = "_";

/// Hex characters per path component. Even, so segments split on byte
/// boundaries, and one short of `NAME_MAX` to leave room for the marker.
const SEGMENT_LEN: usize = 254;

/// Suffix on directory components of long keys. Hex never contains it, so
/// a directory segment can't collide with the file name of a shorter key.
const SEGMENT_MARKER: char = '-';

/// Map a key to its path relative to the cache directory.
///
/// Keys up to 127 bytes map to a single file name. Longer keys are split
/// into [`SEGMENT_LEN`]-character directory components ending in `-`,
/// followed by the remaining hex as the file name.
pub fn encode_key(key: &str) -> PathBuf {
    if key.is_empty() {
        return PathBuf::from(EMPTY_KEY_NAME);
    }
    let hex = hex::encode_upper(key.as_bytes());
    let mut segments: Vec<&str> = Vec::new();
    let mut rest = hex.as_str();
    while rest.len() > SEGMENT_LEN {
        let (head, tail) = rest.split_at(SEGMENT_LEN);
        segments.push(head);
        rest = tail;
    }

    let mut path = PathBuf::new();
    for segment in segments {
        path.push(format!("{}{}", segment, SEGMENT_MARKER));
    }
    path.push(rest);
    path
}

/// Reverse [`encode_key`]; `None` for paths that no key produces
pub fn decode_key(relative: impl AsRef<Path>) -> Option<String> {
    let names = relative
        .as_ref()
        .components()
        .map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()?;
    let (file, dirs) = names.split_last()?;

    if *file == EMPTY_KEY_NAME {
        return dirs.is_empty().then(String::new);
    }

    let mut hex = String::new();
    for dir in dirs {
        let segment = dir.strip_suffix(SEGMENT_MARKER)?;
        if segment.len() != SEGMENT_LEN || !is_upper_hex(segment) {
            return None;
        }
        hex.push_str(segment);
    }
    if file.is_empty() || file.len() > SEGMENT_LEN || !is_upper_hex(file) {
        return None;
    }
    hex.push_str(file);

    let bytes = hex::decode(hex).ok()?;
    String::from_utf8(bytes).ok()
}

fn is_upper_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

/// Stored entry as seen by `cache info`
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Cache persisted as a directory of flat files
#[derive(Debug)]
pub struct CacheDirectory {
    path: PathBuf,
    allowed: AllowList,
    lock_wait: LockWait,
    filters: FilterChain,
}

impl CacheDirectory {
    /// Open (creating if needed) a cache directory at `path`.
    ///
    /// Records are only reconstructed if their type is in `allowed`;
    /// `None` permits primitive shapes only. Failing to create the
    /// directory is fatal.
    pub fn new(path: impl Into<PathBuf>, allowed: Option<AllowList>) -> CacheResult<Self> {
        let path = path.into();
        initialize_directory(&path)?;
        debug!("Using cache directory {}", path.display());
        Ok(Self {
            path,
            allowed: allowed.unwrap_or_else(AllowList::primitives),
            lock_wait: LockWait::Blocking,
            filters: FilterChain::default(),
        })
    }

    /// Bound how long reads and writes wait for a competing lock
    pub fn with_lock_wait(mut self, lock_wait: LockWait) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File that holds `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.path.join(encode_key(key))
    }

    /// List entries currently on disk, sorted by key
    pub fn entries(&self) -> io::Result<Vec<EntryInfo>> {
        let mut entries = Vec::new();
        self.collect_entries(&self.path, Path::new(""), &mut entries)?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    fn collect_entries(
        &self,
        dir: &Path,
        relative: &Path,
        out: &mut Vec<EntryInfo>,
    ) -> io::Result<()> {
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            // Segment directory removed by a concurrent purge
            Err(e) if e.kind() == io::ErrorKind::NotFound && dir != self.path => return Ok(()),
            Err(e) => return Err(e),
        };

        for entry in listing {
            let entry = entry?;
            let name = entry.file_name();
            let relative = relative.join(&name);
            let metadata = match entry.metadata() {
                Ok(m) => m,
                // Removed between read_dir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            if metadata.is_dir() {
                if name.to_str().is_some_and(|n| n.ends_with(SEGMENT_MARKER)) {
                    self.collect_entries(&entry.path(), &relative, out)?;
                }
                continue;
            }
            if !metadata.is_file() {
                continue;
            }
            let Some(key) = decode_key(&relative) else {
                debug!("Ignoring foreign file in cache: {}", relative.display());
                continue;
            };
            out.push(EntryInfo {
                key,
                path: entry.path(),
                size: metadata.len(),
                modified: metadata.modified()?.into(),
            });
        }
        Ok(())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> CacheResult<()> {
        let path = self.entry_path(key);
        let write_err = |source| CacheError::Write {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| *p != self.path) {
            create_private_dir(parent).map_err(write_err)?;
        }

        // Truncate only once the exclusive lock is held
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&path).map_err(write_err)?;

        let _lock = FileLock::acquire(&file, &path, LockMode::Exclusive, self.lock_wait)?;
        file.set_len(0).map_err(write_err)?;
        (&file).write_all(bytes).map_err(write_err)?;

        debug!("Cached {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    fn load(&self, key: &str, max_age: Option<Duration>) -> CacheResult<Vec<u8>> {
        let path = self.entry_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CacheError::miss(key)),
            Err(e) => return Err(unexpected(key, e)),
        };

        let _lock = FileLock::acquire(&file, &path, LockMode::Shared, self.lock_wait)
            .map_err(|e| unexpected(key, e))?;

        if let Some(max_age) = max_age {
            let modified = file
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| unexpected(key, e))?;
            if is_stale(modified, max_age) {
                debug!("Cached value for {} is older than {:?}", key, max_age);
                remove_stale(&path);
                return Err(CacheError::miss(key));
            }
        }

        let mut bytes = Vec::new();
        (&file)
            .read_to_end(&mut bytes)
            .map_err(|e| unexpected(key, e))?;

        // Created by a writer that has not taken its lock yet
        if bytes.is_empty() {
            return Err(CacheError::miss(key));
        }
        Ok(bytes)
    }
}

impl Cache for CacheDirectory {
    fn put(&mut self, key: &str, value: Value) -> CacheResult<()> {
        let bytes = serialize(&value)?;
        self.save(key, &bytes)
    }

    fn get(&mut self, key: &str, max_age: Option<Duration>) -> CacheResult<Value> {
        let bytes = self.load(key, max_age)?;
        let value = restricted_deserialize(&bytes, &self.allowed)?;
        self.filters.apply(value)
    }

    fn purge(&mut self) -> CacheResult<()> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CacheError::Purge {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        initialize_directory(&self.path)?;
        debug!("Purged cache directory {}", self.path.display());
        Ok(())
    }

    fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    fn describe(&self) -> String {
        format!("cache directory {}", self.path.display())
    }
}

/// Create the directory and restrict it to the owner
fn initialize_directory(path: &Path) -> CacheResult<()> {
    let init_err = |source| CacheError::DirectoryInit {
        path: path.to_path_buf(),
        source,
    };

    create_private_dir(path).map_err(init_err)?;

    // An existing directory keeps its mode unless reset
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o700);
        fs::set_permissions(path, perms).map_err(init_err)?;
    }

    Ok(())
}

fn create_private_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}

fn is_stale(modified: SystemTime, max_age: Duration) -> bool {
    // A timestamp in the future counts as brand new
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    age >= max_age
}

fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        // Another reader got there first
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove stale cache entry {}: {}", path.display(), e),
    }
}

/// Unexpected read failures are logged and downgraded to a miss
fn unexpected(key: &str, err: impl Display) -> CacheError {
    warn!("Unexpected error occurred while reading from cache: {}", err);
    CacheError::miss(key)
}
