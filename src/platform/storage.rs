//! Instrumented storage primitives backed by `std::fs`
//!
//! Callback forms run the primitive on a worker thread and hand the result
//! to the continuation; the returned handle can be joined.

use super::{deferred, Blocking, Deferred, Done};
use crate::error::Result;
use crate::intercept::catalog::{self, copy_summary, path_summary, rename_summary};
use crate::intercept::{Hook, Registry};
use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

type PathPair = (PathBuf, PathBuf);
type PathBytes = (PathBuf, Vec<u8>);

fn first_path<A>((first, _): &(PathBuf, A)) -> String {
    path_summary(first)
}

/// Summary of a callback call whose arguments lead with a path
fn first_arg_path<A, D>(((first, _), _): &((PathBuf, A), D)) -> String {
    path_summary(first)
}

fn write_file((path, contents): PathBytes) -> io::Result<()> {
    fs::write(path, contents)
}

fn append_file((path, contents): PathBytes) -> io::Result<()> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(&contents)
}

fn copy_file((source, dest): PathPair) -> io::Result<u64> {
    fs::copy(source, dest)
}

fn rename_path((from, to): PathPair) -> io::Result<()> {
    fs::rename(from, to)
}

fn set_permissions((path, permissions): (PathBuf, Permissions)) -> io::Result<()> {
    fs::set_permissions(path, permissions)
}

#[cfg(unix)]
fn make_symlink((target, link): PathPair) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink((target, link): PathPair) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

fn list_dir(path: PathBuf) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// Storage primitives installed through one registry
#[derive(Debug, Clone)]
pub struct Storage {
    read: Blocking<PathBuf, Vec<u8>>,
    read_callback: Deferred<PathBuf, Vec<u8>>,
    write: Blocking<PathBytes, ()>,
    write_callback: Deferred<PathBytes, ()>,
    append: Blocking<PathBytes, ()>,
    append_callback: Deferred<PathBytes, ()>,
    open: Blocking<PathBuf, File>,
    open_callback: Deferred<PathBuf, File>,
    create: Blocking<PathBuf, File>,
    create_callback: Deferred<PathBuf, File>,
    copy: Blocking<PathPair, u64>,
    copy_callback: Deferred<PathPair, u64>,
    rename: Blocking<PathPair, ()>,
    rename_callback: Deferred<PathPair, ()>,
    symlink: Blocking<PathPair, ()>,
    symlink_callback: Deferred<PathPair, ()>,
    set_permissions: Blocking<(PathBuf, Permissions), ()>,
    set_permissions_callback: Deferred<(PathBuf, Permissions), ()>,
    remove: Blocking<PathBuf, ()>,
    remove_callback: Deferred<PathBuf, ()>,
    read_dir: Blocking<PathBuf, Vec<PathBuf>>,
    read_dir_callback: Deferred<PathBuf, Vec<PathBuf>>,
    create_dir: Blocking<PathBuf, ()>,
    create_dir_callback: Deferred<PathBuf, ()>,
    metadata: Blocking<PathBuf, fs::Metadata>,
    metadata_callback: Deferred<PathBuf, fs::Metadata>,
    canonicalize: Blocking<PathBuf, PathBuf>,
    canonicalize_callback: Deferred<PathBuf, PathBuf>,
    exists: Hook<PathBuf, bool>,
}

impl Storage {
    /// Install every storage primitive in `registry`
    ///
    /// # Errors
    /// `VigiaError::Install` if one of the operations was already installed
    /// with another signature.
    pub fn install(registry: &Registry) -> Result<Self> {
        let path = |p: &PathBuf| path_summary(p);
        let paired = |(a, b): &PathPair| copy_summary(a, b);
        let moved = |(a, b): &PathPair| rename_summary(a, b);

        Ok(Self {
            read: registry.install(catalog::READ, fs::read::<PathBuf>, path)?,
            read_callback: registry.install(
                catalog::READ_CALLBACK,
                deferred(fs::read::<PathBuf>),
                first_path,
            )?,
            write: registry.install(catalog::WRITE, write_file, first_path)?,
            write_callback: registry.install(
                catalog::WRITE_CALLBACK,
                deferred(write_file),
                first_arg_path,
            )?,
            append: registry.install(catalog::APPEND, append_file, first_path)?,
            append_callback: registry.install(
                catalog::APPEND_CALLBACK,
                deferred(append_file),
                first_arg_path,
            )?,
            open: registry.install(catalog::OPEN, File::open::<PathBuf>, path)?,
            open_callback: registry.install(
                catalog::OPEN_CALLBACK,
                deferred(File::open::<PathBuf>),
                first_path,
            )?,
            create: registry.install(catalog::CREATE, File::create::<PathBuf>, path)?,
            create_callback: registry.install(
                catalog::CREATE_CALLBACK,
                deferred(File::create::<PathBuf>),
                first_path,
            )?,
            copy: registry.install(catalog::COPY, copy_file, paired)?,
            copy_callback: registry.install(
                catalog::COPY_CALLBACK,
                deferred(copy_file),
                move |(args, _): &(PathPair, Done<u64>)| paired(args),
            )?,
            rename: registry.install(catalog::RENAME, rename_path, moved)?,
            rename_callback: registry.install(
                catalog::RENAME_CALLBACK,
                deferred(rename_path),
                move |(args, _): &(PathPair, Done<()>)| moved(args),
            )?,
            symlink: registry.install(catalog::SYMLINK, make_symlink, first_path)?,
            symlink_callback: registry.install(
                catalog::SYMLINK_CALLBACK,
                deferred(make_symlink),
                first_arg_path,
            )?,
            set_permissions: registry.install(
                catalog::SET_PERMISSIONS,
                set_permissions,
                first_path,
            )?,
            set_permissions_callback: registry.install(
                catalog::SET_PERMISSIONS_CALLBACK,
                deferred(set_permissions),
                first_arg_path,
            )?,
            remove: registry.install(catalog::REMOVE, fs::remove_file::<PathBuf>, path)?,
            remove_callback: registry.install(
                catalog::REMOVE_CALLBACK,
                deferred(fs::remove_file::<PathBuf>),
                first_path,
            )?,
            read_dir: registry.install(catalog::READ_DIR, list_dir, path)?,
            read_dir_callback: registry.install(
                catalog::READ_DIR_CALLBACK,
                deferred(list_dir),
                first_path,
            )?,
            create_dir: registry.install(catalog::CREATE_DIR, fs::create_dir_all::<PathBuf>, path)?,
            create_dir_callback: registry.install(
                catalog::CREATE_DIR_CALLBACK,
                deferred(fs::create_dir_all::<PathBuf>),
                first_path,
            )?,
            metadata: registry.install(catalog::METADATA, fs::metadata::<PathBuf>, path)?,
            metadata_callback: registry.install(
                catalog::METADATA_CALLBACK,
                deferred(fs::metadata::<PathBuf>),
                first_path,
            )?,
            canonicalize: registry.install(
                catalog::CANONICALIZE,
                fs::canonicalize::<PathBuf>,
                path,
            )?,
            canonicalize_callback: registry.install(
                catalog::CANONICALIZE_CALLBACK,
                deferred(fs::canonicalize::<PathBuf>),
                first_path,
            )?,
            exists: registry.install(catalog::EXISTS, |p: PathBuf| p.exists(), path)?,
        })
    }

    pub fn read(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        self.read.call(path.as_ref().to_path_buf())
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn read_callback(&self, path: impl AsRef<Path>, done: Done<Vec<u8>>) -> JoinHandle<()> {
        self.read_callback.call((path.as_ref().to_path_buf(), done))
    }

    pub fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> io::Result<()> {
        self.write.call((path.as_ref().to_path_buf(), contents.as_ref().to_vec()))
    }

    pub fn write_callback(
        &self,
        path: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
        done: Done<()>,
    ) -> JoinHandle<()> {
        let args = (path.as_ref().to_path_buf(), contents.as_ref().to_vec());
        self.write_callback.call((args, done))
    }

    pub fn append(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> io::Result<()> {
        self.append.call((path.as_ref().to_path_buf(), contents.as_ref().to_vec()))
    }

    pub fn append_callback(
        &self,
        path: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
        done: Done<()>,
    ) -> JoinHandle<()> {
        let args = (path.as_ref().to_path_buf(), contents.as_ref().to_vec());
        self.append_callback.call((args, done))
    }

    /// Open `path` for reading
    pub fn open(&self, path: impl AsRef<Path>) -> io::Result<File> {
        self.open.call(path.as_ref().to_path_buf())
    }

    pub fn open_callback(&self, path: impl AsRef<Path>, done: Done<File>) -> JoinHandle<()> {
        self.open_callback.call((path.as_ref().to_path_buf(), done))
    }

    /// Create or truncate `path` for writing
    pub fn create(&self, path: impl AsRef<Path>) -> io::Result<File> {
        self.create.call(path.as_ref().to_path_buf())
    }

    pub fn create_callback(&self, path: impl AsRef<Path>, done: Done<File>) -> JoinHandle<()> {
        self.create_callback.call((path.as_ref().to_path_buf(), done))
    }

    /// Copy `source` to `dest`, returning the number of bytes copied
    pub fn copy(&self, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> io::Result<u64> {
        self.copy.call((source.as_ref().to_path_buf(), dest.as_ref().to_path_buf()))
    }

    pub fn copy_callback(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        done: Done<u64>,
    ) -> JoinHandle<()> {
        let args = (source.as_ref().to_path_buf(), dest.as_ref().to_path_buf());
        self.copy_callback.call((args, done))
    }

    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> io::Result<()> {
        self.rename.call((from.as_ref().to_path_buf(), to.as_ref().to_path_buf()))
    }

    pub fn rename_callback(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
        done: Done<()>,
    ) -> JoinHandle<()> {
        let args = (from.as_ref().to_path_buf(), to.as_ref().to_path_buf());
        self.rename_callback.call((args, done))
    }

    /// Create `link` pointing at `target`
    pub fn symlink(&self, target: impl AsRef<Path>, link: impl AsRef<Path>) -> io::Result<()> {
        self.symlink.call((target.as_ref().to_path_buf(), link.as_ref().to_path_buf()))
    }

    pub fn symlink_callback(
        &self,
        target: impl AsRef<Path>,
        link: impl AsRef<Path>,
        done: Done<()>,
    ) -> JoinHandle<()> {
        let args = (target.as_ref().to_path_buf(), link.as_ref().to_path_buf());
        self.symlink_callback.call((args, done))
    }

    pub fn set_permissions(
        &self,
        path: impl AsRef<Path>,
        permissions: Permissions,
    ) -> io::Result<()> {
        self.set_permissions.call((path.as_ref().to_path_buf(), permissions))
    }

    pub fn set_permissions_callback(
        &self,
        path: impl AsRef<Path>,
        permissions: Permissions,
        done: Done<()>,
    ) -> JoinHandle<()> {
        let args = (path.as_ref().to_path_buf(), permissions);
        self.set_permissions_callback.call((args, done))
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> io::Result<()> {
        self.remove.call(path.as_ref().to_path_buf())
    }

    pub fn remove_callback(&self, path: impl AsRef<Path>, done: Done<()>) -> JoinHandle<()> {
        self.remove_callback.call((path.as_ref().to_path_buf(), done))
    }

    /// Entries of `path`, sorted
    pub fn read_dir(&self, path: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
        self.read_dir.call(path.as_ref().to_path_buf())
    }

    pub fn read_dir_callback(
        &self,
        path: impl AsRef<Path>,
        done: Done<Vec<PathBuf>>,
    ) -> JoinHandle<()> {
        self.read_dir_callback.call((path.as_ref().to_path_buf(), done))
    }

    /// Create `path` and any missing parents
    pub fn create_dir(&self, path: impl AsRef<Path>) -> io::Result<()> {
        self.create_dir.call(path.as_ref().to_path_buf())
    }

    pub fn create_dir_callback(&self, path: impl AsRef<Path>, done: Done<()>) -> JoinHandle<()> {
        self.create_dir_callback.call((path.as_ref().to_path_buf(), done))
    }

    pub fn metadata(&self, path: impl AsRef<Path>) -> io::Result<fs::Metadata> {
        self.metadata.call(path.as_ref().to_path_buf())
    }

    pub fn metadata_callback(
        &self,
        path: impl AsRef<Path>,
        done: Done<fs::Metadata>,
    ) -> JoinHandle<()> {
        self.metadata_callback.call((path.as_ref().to_path_buf(), done))
    }

    pub fn canonicalize(&self, path: impl AsRef<Path>) -> io::Result<PathBuf> {
        self.canonicalize.call(path.as_ref().to_path_buf())
    }

    pub fn canonicalize_callback(
        &self,
        path: impl AsRef<Path>,
        done: Done<PathBuf>,
    ) -> JoinHandle<()> {
        self.canonicalize_callback.call((path.as_ref().to_path_buf(), done))
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.exists.call(path.as_ref().to_path_buf())
    }
}
