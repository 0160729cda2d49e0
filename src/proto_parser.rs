//! Compiles `.proto` sources into descriptor pools.
//!
//! Compilation goes through protox, so neither build nor run time needs a
//! `protoc` binary. Imports of `google/protobuf/*.proto` always resolve to
//! the bundled well-known types.

use crate::error::{Error, Result};
use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor, ServiceDescriptor};
use protox::file::{ChainFileResolver, File, FileResolver, GoogleFileResolver};
use protox::Compiler;
use std::collections::BTreeMap;
use std::path::Path;

/// Serves `.proto` files from memory, keyed by their import name.
struct SourceResolver {
    files: BTreeMap<String, String>,
}

impl FileResolver for SourceResolver {
    fn resolve_path(&self, path: &Path) -> Option<String> {
        let name = path.to_str()?;
        self.files.contains_key(name).then(|| name.to_owned())
    }

    fn open_file(&self, name: &str) -> Result<File, protox::Error> {
        match self.files.get(name) {
            Some(source) => File::from_source(name, source),
            None => Err(protox::Error::file_not_found(name)),
        }
    }
}

/// Compile in-memory sources into a pool.
///
/// `sources` pairs an import name (`"acme/v1/items.proto"`) with its content;
/// `roots` lists the names to compile; their imports are pulled in
/// transitively from `sources` or the bundled well-known types.
pub fn compile_sources<'a, I>(sources: I, roots: &[&str]) -> Result<DescriptorPool>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let files = sources
        .into_iter()
        .map(|(name, content)| (name.to_owned(), content.to_owned()))
        .collect();

    let mut resolver = ChainFileResolver::new();
    resolver.add(SourceResolver { files });
    resolver.add(GoogleFileResolver::new());

    let mut compiler = Compiler::with_file_resolver(resolver);
    compiler
        .include_imports(true)
        .include_source_info(true)
        .open_files(roots)?;
    encode_and_decode(&compiler)
}

/// Compile a single standalone source, registered as `schema.proto`.
pub fn compile_content(content: &str) -> Result<DescriptorPool> {
    compile_sources([("schema.proto", content)], &["schema.proto"])
}

/// Compile a `.proto` file from disk; imports resolve relative to its directory.
pub fn compile_file(proto_path: &Path) -> Result<DescriptorPool> {
    if !proto_path.is_file() {
        return Err(Error::Io {
            path: proto_path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such proto file"),
        });
    }
    let include_dir = proto_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = proto_path.file_name().map(Path::new).unwrap_or(proto_path);

    let mut compiler = Compiler::new([include_dir])?;
    compiler
        .include_imports(true)
        .include_source_info(true)
        .open_files([file_name])?;
    encode_and_decode(&compiler)
}

// Round-tripping through the encoded set keeps custom options readable as
// extensions on the decoded descriptors.
fn encode_and_decode(compiler: &Compiler) -> Result<DescriptorPool> {
    let encoded = compiler.encode_file_descriptor_set();
    Ok(DescriptorPool::decode(encoded.as_slice())?)
}

/// Look up a message by fully-qualified name.
pub fn find_message(pool: &DescriptorPool, full_name: &str) -> Result<MessageDescriptor> {
    pool.get_message_by_name(full_name)
        .ok_or_else(|| Error::UnknownMessage(full_name.to_owned()))
}

/// Look up a service by fully-qualified name.
pub fn find_service(pool: &DescriptorPool, full_name: &str) -> Result<ServiceDescriptor> {
    pool.get_service_by_name(full_name)
        .ok_or_else(|| Error::UnknownService(full_name.to_owned()))
}

/// Leading comment attached to the element at `path`, if the file was
/// compiled with source info.
pub(crate) fn leading_comment(file: &FileDescriptor, path: &[i32]) -> Option<String> {
    let info = file.file_descriptor_proto().source_code_info.as_ref()?;
    let location = info.location.iter().find(|loc| loc.path == path)?;
    let text = location
        .leading_comments
        .as_deref()?
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}
