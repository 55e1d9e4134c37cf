//! Layered YAML configuration.
//!
//! Several YAML documents are deep-merged in order (later documents win,
//! mappings merge key by key, sequences and scalars are replaced) and the
//! result is queried by dotted path with case-insensitive, longest-key-first
//! matching. Raw text can have `${VAR}`, `${VAR:default}` and `$VAR`
//! references expanded before it is parsed.
//!
//! ```
//! use yaml_layers::YamlProvider;
//!
//! let base = "server: {host: localhost, port: 8080}";
//! let local = "server: {port: ${PORT:9000}}";
//! let lookup = |_: &str| -> Option<String> { None };
//! let provider =
//!     YamlProvider::from_readers_with_expand(&lookup, [base.as_bytes(), local.as_bytes()]).unwrap();
//!
//! assert_eq!(provider.get("server.port"), Some(9000.into()));
//! assert_eq!(provider.get("SERVER.Host"), Some("localhost".into()));
//! ```

pub mod cli;
pub mod error;
pub mod expand;
pub mod format;
pub mod merge;
pub mod provider;
pub mod tree;
pub mod value;

pub use error::{Error, Result};
pub use expand::{EnvLookup, ExpandOptions, ExpandReader, Lookup, expand, expand_with};
pub use provider::{ProviderBuilder, YamlProvider};
pub use tree::{Node, Tree, TreeOptions};
pub use value::NodeKind;
