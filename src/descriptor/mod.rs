//! Descriptor set handling
//!
//! The registry serves snapshots as serialized `google.protobuf.FileDescriptorSet`
//! blobs. Turning one into readable source happens in three pure steps:
//!
//! 1. [`decode`] splits the blob into [`SchemaFile`]s, keeping input order
//! 2. [`assemble`] picks the wanted files and their dependency closures
//! 3. [`render`] prints each closure as `.proto` source
//!
//! Files refer to each other by name only. An [`AssembledSchema`] borrows from
//! the decoded [`DescriptorSet`] and never owns descriptor data itself.

use prost_types::FileDescriptorProto;

mod assembler;
mod decoder;
mod renderer;

pub use assembler::assemble;
pub use decoder::decode;
pub use renderer::{render, render_all};

/// One decoded file descriptor plus what the rest of the pipeline needs to know about it
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFile {
    pub proto: FileDescriptorProto,
    /// Fully-qualified names of the top-level messages, enums and services
    pub declared: Vec<String>,
    /// Payload bytes the decoder could not map onto a known descriptor field
    pub unretained_bytes: usize,
}

impl SchemaFile {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.proto.dependency
    }

    pub fn declares(&self, full_name: &str) -> bool {
        self.declared.iter().any(|n| n == full_name)
    }
}

/// Decoded files in blob order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    files: Vec<SchemaFile>,
}

impl DescriptorSet {
    pub fn files(&self) -> &[SchemaFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Index of the file with this name
    pub fn position(&self, file_name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name() == file_name)
    }

    pub fn file(&self, file_name: &str) -> Option<&SchemaFile> {
        self.position(file_name).map(|i| &self.files[i])
    }

    /// File declaring `full_name`. When several do, the first in blob order wins.
    pub fn owner_of(&self, full_name: &str) -> Option<&SchemaFile> {
        self.files.iter().find(|f| f.declares(full_name))
    }

    /// Every declared top-level name, in blob order
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .flat_map(|f| f.declared.iter().map(String::as_str))
    }
}

/// A file together with its transitive dependencies, dependencies first
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSchema<'a> {
    pub root: &'a SchemaFile,
    pub files: Vec<&'a SchemaFile>,
}

impl AssembledSchema<'_> {
    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name()).collect()
    }
}
