//! Cache key derivation
//!
//! A call is identified by the computation's declared name plus the canonical
//! textual form of its arguments. The composite string is hashed with SHA-256
//! so the resulting key is a fixed-length hex string that is always safe to use
//! as a filename stem.
//!
//! # Composite format
//!
//! ```text
//! <name>:<positional_1>_<positional_2>..:<named_1>=<value_1>_<named_2>=<value_2>..
//! ```
//!
//! Empty sections are dropped, so a call without named arguments is just
//! `add:2_3`. Argument text comes from [`KeyArg`]; two calls whose arguments
//! render to the same text share an entry. Types with unstable text (unordered
//! maps, addresses) must not be used as arguments.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Hash arbitrary text into a 64 character lowercase hex digest
#[must_use]
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Canonical textual form of a single call argument
///
/// Implementations must be deterministic: equal values always render to the
/// same text, regardless of process, platform or insertion order.
pub trait KeyArg {
    /// Render the argument for inclusion in a cache key
    fn key_text(&self) -> String;
}

macro_rules! key_arg_via_to_string {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyArg for $ty {
                fn key_text(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

key_arg_via_to_string!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, str,
    String,
);

impl KeyArg for Path {
    fn key_text(&self) -> String {
        self.display().to_string()
    }
}

impl KeyArg for PathBuf {
    fn key_text(&self) -> String {
        self.as_path().key_text()
    }
}

impl<T: KeyArg + ?Sized> KeyArg for &T {
    fn key_text(&self) -> String {
        (**self).key_text()
    }
}

impl<T: KeyArg + ?Sized> KeyArg for Box<T> {
    fn key_text(&self) -> String {
        (**self).key_text()
    }
}

impl<T: KeyArg> KeyArg for Option<T> {
    fn key_text(&self) -> String {
        self.as_ref()
            .map_or_else(|| "None".to_string(), KeyArg::key_text)
    }
}

impl<T: KeyArg> KeyArg for [T] {
    fn key_text(&self) -> String {
        let items: Vec<String> = self.iter().map(KeyArg::key_text).collect();
        format!("[{}]", items.join(", "))
    }
}

impl<T: KeyArg> KeyArg for Vec<T> {
    fn key_text(&self) -> String {
        self.as_slice().key_text()
    }
}

impl<K: KeyArg, V: KeyArg> KeyArg for BTreeMap<K, V> {
    fn key_text(&self) -> String {
        let items: Vec<String> = self
            .iter()
            .map(|(k, v)| format!("{}: {}", k.key_text(), v.key_text()))
            .collect();
        format!("{{{}}}", items.join(", "))
    }
}

/// Textual key material for one call: positional parts and named parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParts {
    positional: Vec<String>,
    named: Vec<(String, String)>,
}

impl KeyParts {
    /// Empty key material
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    #[must_use]
    pub fn positional<T: KeyArg + ?Sized>(mut self, value: &T) -> Self {
        self.positional.push(value.key_text());
        self
    }

    /// Append a named argument; named arguments keep call order
    #[must_use]
    pub fn named<T: KeyArg + ?Sized>(mut self, name: &str, value: &T) -> Self {
        self.named.push((name.to_string(), value.key_text()));
        self
    }

    /// Rendered positional arguments
    #[must_use]
    pub fn positional_parts(&self) -> &[String] {
        &self.positional
    }

    /// Rendered named arguments
    #[must_use]
    pub fn named_parts(&self) -> &[(String, String)] {
        &self.named
    }
}

/// Argument value of a memoized computation
///
/// Implemented for `()` and tuples of [`KeyArg`] values. Argument structs
/// implement it by hand to contribute named parts:
///
/// ```
/// use diskmemo_cache::{CallArgs, KeyParts};
///
/// struct Search {
///     term: String,
///     limit: u32,
/// }
///
/// impl CallArgs for Search {
///     fn key_parts(&self) -> KeyParts {
///         KeyParts::new().positional(&self.term).named("limit", &self.limit)
///     }
/// }
/// ```
pub trait CallArgs {
    /// Key material for this call
    fn key_parts(&self) -> KeyParts;
}

impl CallArgs for () {
    fn key_parts(&self) -> KeyParts {
        KeyParts::new()
    }
}

impl CallArgs for KeyParts {
    fn key_parts(&self) -> KeyParts {
        self.clone()
    }
}

macro_rules! tuple_call_args {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: KeyArg),+> CallArgs for ($($ty,)+) {
            fn key_parts(&self) -> KeyParts {
                let ($($var,)+) = self;
                KeyParts::new()$(.positional($var))+
            }
        }
    };
}

tuple_call_args!(A a);
tuple_call_args!(A a, B b);
tuple_call_args!(A a, B b, C c);
tuple_call_args!(A a, B b, C c, D d);
tuple_call_args!(A a, B b, C c, D d, E e);
tuple_call_args!(A a, B b, C c, D d, E e, F f);
tuple_call_args!(A a, B b, C c, D d, E e, F f, G g);
tuple_call_args!(A a, B b, C c, D d, E e, F f, G g, H h);

/// Build the composite key string for a call before hashing
///
/// With `is_method` the first positional part is treated as the receiver and
/// left out, so the same logical call on different instances shares a key.
#[must_use]
pub fn composite_key(name: &str, parts: &KeyParts, is_method: bool) -> String {
    let positional = if is_method {
        parts.positional.get(1..).unwrap_or(&[])
    } else {
        parts.positional.as_slice()
    };
    let positional = positional.join("_");
    let named = parts
        .named
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("_");

    [name, positional.as_str(), named.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

/// Derive the entry key for a call
#[must_use]
pub fn derive_key<A: CallArgs + ?Sized>(name: &str, args: &A, is_method: bool) -> String {
    digest(&composite_key(name, &args.key_parts(), is_method))
}

/// How a binding turns calls into entry keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Every call uses the digest of this fixed key
    Explicit(String),
    /// The key is derived from the computation name and call arguments
    Arguments {
        /// Exclude the first positional argument (the receiver)
        is_method: bool,
    },
}

impl KeyStrategy {
    /// Entry key for one call under this strategy
    #[must_use]
    pub fn key_for<A: CallArgs + ?Sized>(&self, name: &str, args: &A) -> String {
        match self {
            Self::Explicit(key) => digest(key),
            Self::Arguments { is_method } => derive_key(name, args, *is_method),
        }
    }
}

impl Default for KeyStrategy {
    fn default() -> Self {
        Self::Arguments { is_method: false }
    }
}
