//! YAML configuration provider built from layered documents.
//!
//! Documents are read in order, optionally passed through variable
//! expansion, parsed, and deep-merged; later documents win. The merged value
//! is then served through a [`Tree`] for dotted-path lookups.

use crate::error::{Error, Result};
use crate::expand::{ExpandOptions, ExpandReader, Lookup};
use crate::merge::deep_merge;
use crate::tree::{Node, Tree, TreeOptions};
use crate::value::strip_tags;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Merged configuration from one or more YAML documents.
#[derive(Debug)]
pub struct YamlProvider {
    tree: Tree,
}

impl YamlProvider {
    /// Start building a provider with non-default options.
    pub fn builder<'l>() -> ProviderBuilder<'l> {
        ProviderBuilder::default()
    }

    /// Create a provider from a list of readers, merged in order.
    pub fn from_readers<I, R>(readers: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: Read,
    {
        Self::builder().from_readers(readers)
    }

    /// Create a provider from byte-backed YAML blobs, merged in order.
    pub fn from_bytes<I, B>(yamls: I) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self::builder().from_bytes(yamls)
    }

    /// Create a provider from a set of YAML files, merged in order.
    pub fn from_files<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::builder().from_files(paths)
    }

    /// Like [`from_readers`](Self::from_readers), with `${var}` and `$var`
    /// references replaced through `lookup` before parsing.
    pub fn from_readers_with_expand<L, I, R>(lookup: &L, readers: I) -> Result<Self>
    where
        L: Lookup,
        I: IntoIterator<Item = R>,
        R: Read,
    {
        Self::builder().expand_with(lookup).from_readers(readers)
    }

    /// Like [`from_files`](Self::from_files), with variable expansion.
    pub fn from_files_with_expand<L, I, P>(lookup: &L, paths: I) -> Result<Self>
    where
        L: Lookup,
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::builder().expand_with(lookup).from_files(paths)
    }

    /// The provider name.
    pub fn name(&self) -> &'static str {
        "yaml"
    }

    /// The whole merged value. `Value::Null` when there were no documents.
    pub fn root(&self) -> &Value {
        self.tree.root().value()
    }

    /// Get a configuration value by dotted path.
    ///
    /// `None` means nothing is configured at `path`; an explicit YAML null is
    /// `Some(Value::Null)`.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.node(path).map(|node| node.value().clone())
    }

    /// Decode the value at `path` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let Some(node) = self.node(path) else {
            return Ok(None);
        };
        serde_yaml::from_value(node.value().clone())
            .map(Some)
            .map_err(|source| Error::Decode {
                path: path.to_string(),
                source,
            })
    }

    /// The tree node at `path`, for walking children directly.
    pub fn node(&self, path: &str) -> Option<Arc<Node>> {
        self.tree.find(path)
    }

    /// The lookup tree, with the path conventions it was built with.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

/// Options for building a [`YamlProvider`].
#[derive(Default)]
pub struct ProviderBuilder<'l> {
    tree: TreeOptions,
    expand: ExpandOptions,
    lookup: Option<&'l dyn Lookup>,
}

impl<'l> ProviderBuilder<'l> {
    pub fn tree_options(mut self, options: TreeOptions) -> Self {
        self.tree = options;
        self
    }

    pub fn expand_options(mut self, options: ExpandOptions) -> Self {
        self.expand = options;
        self
    }

    /// Expand variable references in every document through `lookup`.
    pub fn expand_with(mut self, lookup: &'l dyn Lookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn from_readers<I, R>(self, readers: I) -> Result<YamlProvider>
    where
        I: IntoIterator<Item = R>,
        R: Read,
    {
        self.build(readers.into_iter().map(|reader| (None, reader)))
    }

    pub fn from_bytes<I, B>(self, yamls: I) -> Result<YamlProvider>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let blobs: Vec<B> = yamls.into_iter().collect();
        self.from_readers(blobs.iter().map(|yaml| yaml.as_ref()))
    }

    /// Open every file up front, so a missing file fails before any parsing.
    pub fn from_files<I, P>(self, paths: I) -> Result<YamlProvider>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut files = Vec::new();
        for path in paths {
            let name = path.as_ref().display().to_string();
            let file = File::open(path.as_ref()).map_err(|source| Error::SourceRead {
                origin: Some(name.clone()),
                source,
            })?;
            debug!(path = %name, "Opened yaml config file");
            files.push((Some(name), file));
        }

        self.build(files)
    }

    fn build<I, R>(self, sources: I) -> Result<YamlProvider>
    where
        I: IntoIterator<Item = (Option<String>, R)>,
        R: Read,
    {
        let mut root = Value::Null;
        let mut documents = 0usize;
        for (origin, reader) in sources {
            let current = self.load(reader).map_err(|err| match origin {
                Some(name) => err.with_origin(name),
                None => err,
            })?;
            root = deep_merge(root, current)?;
            documents += 1;
        }

        debug!(
            documents,
            expanded = self.lookup.is_some(),
            "Merged yaml config"
        );

        Ok(YamlProvider {
            tree: Tree::new(root, self.tree),
        })
    }

    /// Read, expand and parse one document.
    fn load<R: Read>(&self, reader: R) -> Result<Value> {
        let mut raw = Vec::new();
        match self.lookup {
            Some(lookup) => {
                ExpandReader::with_options(reader, lookup, self.expand.clone())
                    .read_to_end(&mut raw)?;
            }
            None => {
                let mut reader = reader;
                reader.read_to_end(&mut raw)?;
            }
        }

        let parse = |source| Error::Parse {
            origin: None,
            source,
        };
        // Only the first document of a stream counts; later ones are ignored.
        let mut value = match serde_yaml::Deserializer::from_slice(&raw).next() {
            Some(document) => Value::deserialize(document).map_err(parse)?,
            None => Value::Null,
        };
        value.apply_merge().map_err(parse)?;
        Ok(strip_tags(value))
    }
}
