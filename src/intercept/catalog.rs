//! Catalog of watched operations and their argument summaries
//!
//! Each blocking primitive has a `_callback` twin that hands its result to
//! a continuation instead of returning it.

use super::OperationId;
use crate::filter::Subsystem;
use std::path::Path;

const fn fs(name: &'static str) -> OperationId {
    OperationId::new(Subsystem::Storage, name)
}

const fn process(name: &'static str) -> OperationId {
    OperationId::new(Subsystem::ProcessSpawn, name)
}

pub const READ: OperationId = fs("read");
pub const READ_CALLBACK: OperationId = fs("read_callback");
pub const WRITE: OperationId = fs("write");
pub const WRITE_CALLBACK: OperationId = fs("write_callback");
pub const APPEND: OperationId = fs("append");
pub const APPEND_CALLBACK: OperationId = fs("append_callback");
pub const OPEN: OperationId = fs("open");
pub const OPEN_CALLBACK: OperationId = fs("open_callback");
pub const CREATE: OperationId = fs("create");
pub const CREATE_CALLBACK: OperationId = fs("create_callback");
pub const COPY: OperationId = fs("copy");
pub const COPY_CALLBACK: OperationId = fs("copy_callback");
pub const RENAME: OperationId = fs("rename");
pub const RENAME_CALLBACK: OperationId = fs("rename_callback");
pub const SYMLINK: OperationId = fs("symlink");
pub const SYMLINK_CALLBACK: OperationId = fs("symlink_callback");
pub const SET_PERMISSIONS: OperationId = fs("set_permissions");
pub const SET_PERMISSIONS_CALLBACK: OperationId = fs("set_permissions_callback");
pub const REMOVE: OperationId = fs("remove");
pub const REMOVE_CALLBACK: OperationId = fs("remove_callback");
pub const READ_DIR: OperationId = fs("read_dir");
pub const READ_DIR_CALLBACK: OperationId = fs("read_dir_callback");
pub const CREATE_DIR: OperationId = fs("create_dir");
pub const CREATE_DIR_CALLBACK: OperationId = fs("create_dir_callback");
pub const METADATA: OperationId = fs("metadata");
pub const METADATA_CALLBACK: OperationId = fs("metadata_callback");
pub const CANONICALIZE: OperationId = fs("canonicalize");
pub const CANONICALIZE_CALLBACK: OperationId = fs("canonicalize_callback");
pub const EXISTS: OperationId = fs("exists");

pub const SPAWN: OperationId = process("spawn");
pub const OUTPUT: OperationId = process("output");
pub const OUTPUT_CALLBACK: OperationId = process("output_callback");
pub const EXEC: OperationId = process("exec");
pub const EXEC_CALLBACK: OperationId = process("exec_callback");

pub const HTTP_REQUEST: OperationId = OperationId::new(Subsystem::NetworkPlain, "request");
pub const HTTPS_REQUEST: OperationId = OperationId::new(Subsystem::NetworkSecure, "request");

pub const LOAD: OperationId = OperationId::flat(Subsystem::ModuleLoad);

const STORAGE_OPERATIONS: &[OperationId] = &[
    READ,
    READ_CALLBACK,
    WRITE,
    WRITE_CALLBACK,
    APPEND,
    APPEND_CALLBACK,
    OPEN,
    OPEN_CALLBACK,
    CREATE,
    CREATE_CALLBACK,
    COPY,
    COPY_CALLBACK,
    RENAME,
    RENAME_CALLBACK,
    SYMLINK,
    SYMLINK_CALLBACK,
    SET_PERMISSIONS,
    SET_PERMISSIONS_CALLBACK,
    REMOVE,
    REMOVE_CALLBACK,
    READ_DIR,
    READ_DIR_CALLBACK,
    CREATE_DIR,
    CREATE_DIR_CALLBACK,
    METADATA,
    METADATA_CALLBACK,
    CANONICALIZE,
    CANONICALIZE_CALLBACK,
    EXISTS,
];

const PROCESS_OPERATIONS: &[OperationId] = &[SPAWN, OUTPUT, OUTPUT_CALLBACK, EXEC, EXEC_CALLBACK];
const HTTP_OPERATIONS: &[OperationId] = &[HTTP_REQUEST];
const HTTPS_OPERATIONS: &[OperationId] = &[HTTPS_REQUEST];
const LOAD_OPERATIONS: &[OperationId] = &[LOAD];

/// Every watched operation of `subsystem`
pub fn operations(subsystem: Subsystem) -> &'static [OperationId] {
    match subsystem {
        Subsystem::Storage => STORAGE_OPERATIONS,
        Subsystem::ProcessSpawn => PROCESS_OPERATIONS,
        Subsystem::NetworkPlain => HTTP_OPERATIONS,
        Subsystem::NetworkSecure => HTTPS_OPERATIONS,
        Subsystem::ModuleLoad => LOAD_OPERATIONS,
    }
}

pub fn path_summary(path: &Path) -> String {
    path.display().to_string()
}

pub fn copy_summary(source: &Path, dest: &Path) -> String {
    format!("source: {}, dest: {}", source.display(), dest.display())
}

pub fn rename_summary(from: &Path, to: &Path) -> String {
    format!("from: {} to: {}", from.display(), to.display())
}

/// Command followed by its arguments, space separated
pub fn command_summary<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|arg| arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-cased verb followed by the full URL
pub fn request_summary(method: &str, url: &str) -> String {
    format!("{} {}", method.to_uppercase(), url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_operations_are_unique_and_belong_to_subsystem() {
        let mut seen = HashSet::new();
        for subsystem in Subsystem::ALL {
            for op in operations(subsystem) {
                assert_eq!(op.subsystem, subsystem);
                assert!(seen.insert(op.to_string()), "duplicate {}", op);
            }
        }
        assert!(seen.contains("fs.read"));
        assert!(seen.contains("child_process.spawn"));
        assert!(seen.contains("https.request"));
        assert!(seen.contains("require"));
    }

    #[test]
    fn test_summaries() {
        assert_eq!(copy_summary(Path::new("a"), Path::new("b")), "source: a, dest: b");
        assert_eq!(rename_summary(Path::new("a"), Path::new("b")), "from: a to: b");
        assert_eq!(command_summary("ls", &["-la", "/tmp"]), "ls -la /tmp");
        assert_eq!(command_summary::<&str>("pwd", &[]), "pwd");
        assert_eq!(
            request_summary("post", "https://api.example.com/v1"),
            "POST https://api.example.com/v1"
        );
    }
}
