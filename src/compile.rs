//! Proto Compilation Helpers
//!
//! Produces reflection pools from `.proto` sources with `protox`, so the
//! extractor, the compatibility rules and the CLI all work from the same
//! descriptors protoc would produce. Well-known types (`google/protobuf/*`)
//! resolve without extra include paths.

use std::path::{Path, PathBuf};

use prost_reflect::{DescriptorPool, MessageDescriptor};
use protox::Compiler;
use tracing::debug;

use crate::error::{Result, SchemaError};

/// Virtual file name used when compiling in-memory text
pub const SCRATCH_FILE_NAME: &str = "schema.proto";

/// Compile `.proto` files against the given include paths.
///
/// With no include paths, each file's parent directory is used.
pub fn compile_files<P: AsRef<Path>>(files: &[P], include_paths: &[PathBuf]) -> Result<DescriptorPool> {
    let mut includes: Vec<PathBuf> = include_paths.to_vec();
    if includes.is_empty() {
        for file in files {
            let parent = file.as_ref().parent().unwrap_or_else(|| Path::new("."));
            let parent = if parent.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                parent.to_path_buf()
            };
            if !includes.contains(&parent) {
                includes.push(parent);
            }
        }
    }

    debug!("Compiling {} proto file(s) with includes {:?}", files.len(), includes);

    let mut compiler = Compiler::new(&includes).map_err(compile_error)?;
    compiler
        .include_imports(true)
        .include_source_info(false)
        .open_files(files.iter().map(|file| file.as_ref()))
        .map_err(compile_error)?;

    load_descriptor_set(&compiler.encode_file_descriptor_set())
}

/// Compile proto text that lives only in memory.
pub fn compile_text(content: &str) -> Result<DescriptorPool> {
    let scratch = tempfile::tempdir()?;
    let file_path = scratch.path().join(SCRATCH_FILE_NAME);
    std::fs::write(&file_path, content)?;

    let mut compiler = Compiler::new([scratch.path()]).map_err(compile_error)?;
    compiler
        .include_imports(true)
        .open_files([SCRATCH_FILE_NAME])
        .map_err(compile_error)?;

    load_descriptor_set(&compiler.encode_file_descriptor_set())
}

/// Decode an encoded `FileDescriptorSet` (as written by `protoc -o`).
pub fn load_descriptor_set(bytes: &[u8]) -> Result<DescriptorPool> {
    DescriptorPool::decode(bytes).map_err(|e| SchemaError::Compile(e.to_string()))
}

/// Look up a message by fully-qualified name.
pub fn find_message(pool: &DescriptorPool, full_name: &str) -> Result<MessageDescriptor> {
    let name = full_name.trim_start_matches('.');
    pool.get_message_by_name(name)
        .ok_or_else(|| SchemaError::NotFound(format!("message {}", name)))
}

fn compile_error(e: protox::Error) -> SchemaError {
    SchemaError::Compile(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_text() {
        let pool = compile_text(
            "syntax = \"proto3\";\npackage gen;\nmessage record {\n\tstring name = 1;\n}\n",
        )
        .unwrap();
        let record = find_message(&pool, "gen.record").unwrap();
        assert_eq!(record.fields().count(), 1);
    }

    #[test]
    fn test_compile_text_with_wrapper_import() {
        let pool = compile_text(
            "syntax = \"proto3\";\nimport \"google/protobuf/wrappers.proto\";\nmessage M {\n\tgoogle.protobuf.StringValue v = 1;\n}\n",
        )
        .unwrap();
        assert!(find_message(&pool, ".google.protobuf.StringValue").is_ok());
    }

    #[test]
    fn test_invalid_text_is_compile_error() {
        let err = compile_text("syntax = \"proto3\";\nmessage {\n").unwrap_err();
        assert!(matches!(err, SchemaError::Compile(_)));
    }

    #[test]
    fn test_missing_message() {
        let pool = compile_text("syntax = \"proto3\";\npackage gen;\nmessage other {}\n").unwrap();
        assert!(matches!(find_message(&pool, "gen.record"), Err(SchemaError::NotFound(_))));
    }
}
