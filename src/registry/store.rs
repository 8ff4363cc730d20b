use super::{ProjectRecord, Registry};
use crate::config::Workspace;
use crate::error::{Error, Result};
use fs2::FileExt;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Registry persisted as a pretty-printed JSON object.
///
/// Reads never take the lock. Anything that reads, allocates and writes back
/// must hold a [`RegistryLock`] for the whole cycle, which
/// [`RegistryStore::transaction`] does.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_path: lock_path.into(),
        }
    }

    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self::new(workspace.registry_path(), workspace.lock_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the registry. A missing file is an empty registry; anything that
    /// is not a JSON object of records is `StorageCorrupt`.
    pub fn load(&self) -> Result<Registry> {
        // Directly try to read the file - avoid TOCTOU race
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Registry::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|e| Error::StorageCorrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Persist the full registry, replacing previous content atomically.
    pub fn save(&self, registry: &Registry) -> Result<()> {
        let contents = to_pretty_json(registry)?;
        atomic_write(&self.path, &contents)?;
        debug!(projects = registry.len(), "Saved registry to {}", self.path.display());
        Ok(())
    }

    /// Create an empty registry file unless one exists. Returns whether it
    /// was created. Existing content is never touched.
    ///
    /// Takes the lock, so callers must not already hold it.
    pub fn ensure_exists(&self) -> Result<bool> {
        let _lock = self.lock()?;
        if self.exists() {
            return Ok(false);
        }
        atomic_write(&self.path, &to_pretty_json(&Registry::new())?)?;
        info!("Created empty registry at {}", self.path.display());
        Ok(true)
    }

    /// Delete the registry file. Returns whether it was present.
    ///
    /// The lock file stays: unlinking it would let a later `lock()` take a
    /// fresh inode while a current holder still locks the old one.
    pub fn discard(&self) -> Result<bool> {
        remove_if_present(&self.path)
    }

    /// Take the exclusive advisory lock, blocking while another process
    /// holds it.
    pub fn lock(&self) -> Result<RegistryLock> {
        RegistryLock::acquire(&self.lock_path)
    }

    /// Run `f` against the current registry under the lock, saving the result
    /// if `f` succeeds and changed anything. On error nothing is written.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
        let _lock = self.lock()?;
        let before = self.load()?;
        let mut registry = before.clone();
        let value = f(&mut registry)?;
        if registry != before {
            self.save(&registry)?;
        }
        Ok(value)
    }

    /// Insert or overwrite one record and persist.
    pub fn add(&self, name: &str, record: ProjectRecord) -> Result<Option<ProjectRecord>> {
        self.transaction(|registry| Ok(registry.insert(name, record)))
    }

    /// Remove one record and persist. Absent names are a no-op.
    pub fn remove(&self, name: &str) -> Result<Option<ProjectRecord>> {
        self.transaction(|registry| Ok(registry.remove(name)))
    }

    pub fn get(&self, name: &str) -> Result<Option<ProjectRecord>> {
        Ok(self.load()?.get(name).cloned())
    }

    pub fn list(&self) -> Result<Vec<(String, ProjectRecord)>> {
        Ok(self.load()?.list())
    }
}

/// Exclusive advisory lock on the registry's lock file.
///
/// Released when dropped. The holder's PID is written into the file so a
/// waiting process can say who it is waiting for.
#[derive(Debug)]
pub struct RegistryLock {
    file: File,
    path: PathBuf,
}

impl RegistryLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::Lock(format!("Failed to open {}: {}", path.display(), e)))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                match read_holder_pid(path) {
                    Some(pid) if holder_alive(pid) => info!(
                        "Waiting for another turbine invocation (PID {}) to release the registry",
                        pid
                    ),
                    _ => info!("Waiting for the registry lock at {}", path.display()),
                }
                file.lock_exclusive().map_err(|e| {
                    Error::Lock(format!("Failed to lock {}: {}", path.display(), e))
                })?;
            }
            Err(e) => {
                return Err(Error::Lock(format!(
                    "Failed to lock {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        let mut lock = Self {
            file,
            path: path.to_path_buf(),
        };
        // Record our PID for diagnostics; failure here does not weaken the lock.
        let _ = lock.file.set_len(0);
        let _ = writeln!(lock.file, "{}", std::process::id());
        debug!("Acquired registry lock {}", lock.path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn read_holder_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn holder_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn holder_alive(_pid: u32) -> bool {
    true
}

/// Four-space indentation, matching files written by earlier releases.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| Error::Config(format!("Registry is not UTF-8: {}", e)))
}

/// Atomic file write using write-then-rename.
///
/// The temp file carries our PID so two processes never share one.
fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "registry".to_string());
    let temp_path = path.with_file_name(format!("{}.{}.tmp", file_name, std::process::id()));

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProjectKind;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn store_in(dir: &Path) -> RegistryStore {
        RegistryStore::for_workspace(&Workspace::new(dir))
    }

    fn record(webserver: u16) -> ProjectRecord {
        let mut record: ProjectRecord = serde_json::from_str(r#"{"kind": "astro"}"#).unwrap();
        record.webserver = Some(webserver);
        record
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(!store.exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_not_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(Error::StorageCorrupt { .. })));

        fs::write(store.path(), "[1, 2, 3]").unwrap();
        assert!(matches!(store.load(), Err(Error::StorageCorrupt { .. })));
    }

    #[test]
    fn test_save_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let mut registry = Registry::new();
        registry.insert("demo-astro-airflow", record(8080));
        store.save(&registry).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("{\n    \"demo-astro-airflow\": {\n        \"kind\": \"astro\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_save_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let mut registry = Registry::new();
        registry.insert("b-oss-airflow", record(8081));
        registry.insert("a-astro-airflow", record(8080));
        store.save(&registry).unwrap();
        let first = fs::read(store.path()).unwrap();

        store.save(&store.load().unwrap()).unwrap();
        assert_eq!(fs::read(store.path()).unwrap(), first);
    }

    #[test]
    fn test_ensure_exists_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.ensure_exists().unwrap());
        assert!(store.load().unwrap().is_empty());

        store.add("demo-astro-airflow", record(8080)).unwrap();
        assert!(!store.ensure_exists().unwrap());
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_add_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.add("demo-astro-airflow", record(8080)).unwrap();
        assert_eq!(
            store.get("demo-astro-airflow").unwrap().unwrap().kind,
            ProjectKind::Astro
        );

        assert!(store.remove("demo-astro-airflow").unwrap().is_some());
        assert!(store.remove("demo-astro-airflow").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_failed_transaction_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.add("keep-astro-airflow", record(8080)).unwrap();
        let before = fs::read(store.path()).unwrap();

        let result: Result<()> = store.transaction(|registry| {
            registry.insert("lost-astro-airflow", record(8081));
            Err(Error::Aborted)
        });
        assert!(matches!(result, Err(Error::Aborted)));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_lock_records_pid_and_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        {
            let lock = store.lock().unwrap();
            let pid = read_holder_pid(lock.path()).unwrap();
            assert_eq!(pid, std::process::id());
        }
        // Re-acquiring after drop must not block.
        drop(store.lock().unwrap());
    }

    #[test]
    fn test_discard_removes_registry_but_keeps_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.add("demo-astro-airflow", record(8080)).unwrap();
        assert!(store.discard().unwrap());
        assert!(!store.exists());
        assert!(dir.path().join(".cache.lock").exists());
        assert!(!store.discard().unwrap());
    }

    /// Spawn a thread that takes the lock and reports once it has it.
    fn lock_in_background(dir: &Path) -> (mpsc::Receiver<()>, thread::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel();
        let store = store_in(dir);
        let handle = thread::spawn(move || {
            let _lock = store.lock().unwrap();
            tx.send(()).unwrap();
        });
        (rx, handle)
    }

    #[test]
    fn test_second_lock_waits_for_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let held = store.lock().unwrap();

        let (acquired, handle) = lock_in_background(dir.path());
        assert!(acquired.recv_timeout(Duration::from_millis(300)).is_err());

        drop(held);
        assert!(acquired.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_lock_stays_exclusive_after_discard() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.add("demo-astro-airflow", record(8080)).unwrap();
        let held = store.lock().unwrap();
        store.discard().unwrap();

        let (acquired, handle) = lock_in_background(dir.path());
        assert!(
            acquired.recv_timeout(Duration::from_millis(300)).is_err(),
            "lock acquired while still held"
        );

        drop(held);
        assert!(acquired.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_ensure_exists_never_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.ensure_exists().unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{}\n");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
