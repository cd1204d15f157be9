//! Identifier management using string interning for efficient name storage and comparison
//!
//! This module provides two interned string types: [`Name`], a single undotted
//! name segment carried by an element, and [`Symbol`], a fully qualified dotted
//! path used to address elements across the document.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for efficient identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

/// Separator between the segments of a qualified [`Symbol`].
pub const SYMBOL_SEPARATOR: char = '.';

fn interner() -> &'static Mutex<DefaultStringInterner> {
    INTERNER.get_or_init(|| Mutex::new(DefaultStringInterner::new()))
}

fn intern(text: &str) -> DefaultSymbol {
    let mut interner = interner().lock().expect("Failed to acquire interner lock");
    interner.get_or_intern(text)
}

fn resolve_to_string(symbol: DefaultSymbol) -> String {
    let interner = interner().lock().expect("Failed to acquire interner lock");
    interner
        .resolve(symbol)
        .expect("Symbol should exist in interner")
        .to_owned()
}

/// Reports whether `text` is usable as a local element name.
///
/// A legal name is non-empty and contains neither the qualification
/// separator nor whitespace.
///
/// # Examples
///
/// ```
/// use armillary_core::identifier::is_valid_name;
///
/// assert!(is_valid_name("Customer"));
/// assert!(!is_valid_name(""));
/// assert!(!is_valid_name("Model.Customer"));
/// assert!(!is_valid_name("two words"));
/// ```
pub fn is_valid_name(text: &str) -> bool {
    !text.is_empty() && !text.contains(SYMBOL_SEPARATOR) && !text.contains(char::is_whitespace)
}

/// A local element name: one undotted segment such as `Customer` or `Id`.
///
/// Names are interned, so copies are cheap and equality is a symbol
/// comparison rather than a string comparison.
///
/// # Examples
///
/// ```
/// use armillary_core::identifier::Name;
///
/// let a = Name::new("Customer");
/// let b = Name::new("Customer");
/// assert_eq!(a, b);
/// assert_eq!(a, "Customer");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(DefaultSymbol);

impl Name {
    /// Creates a `Name` from a string slice, interning it.
    ///
    /// # Arguments
    ///
    /// * `text` - The string representation of the name
    pub fn new(text: &str) -> Self {
        Self(intern(text))
    }

    /// Returns the interned text as an owned string.
    pub fn as_string(&self) -> String {
        resolve_to_string(self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", resolve_to_string(self.0))
    }
}

impl std::str::FromStr for Name {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Name {
    /// Creates a `Name` from a string slice.
    ///
    /// This is a convenience implementation that calls `Name::new`.
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl PartialEq<str> for Name {
    /// Allows direct comparison with string slices: `name == "string"`
    fn eq(&self, other: &str) -> bool {
        resolve_to_string(self.0) == other
    }
}

impl PartialEq<&str> for Name {
    /// Allows direct comparison with string references: `name == &string`
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// A qualified dotted path addressing an element from the document root,
/// such as `Model.Customer.Id`.
///
/// Symbols are what the symbol table indexes and what reference bindings
/// carry as their textual target. Like [`Name`], they are interned.
///
/// # Examples
///
/// ```
/// use armillary_core::identifier::{Name, Symbol};
///
/// let model = Symbol::from_name(Name::new("Model"));
/// let customer = model.join(Name::new("Customer"));
/// assert_eq!(customer, "Model.Customer");
///
/// let id = customer.join(Name::new("Id"));
/// assert_eq!(id, "Model.Customer.Id");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    /// Creates a `Symbol` from a string slice, interning it.
    ///
    /// The text is taken as-is; it may already contain separator characters.
    pub fn new(text: &str) -> Self {
        Self(intern(text))
    }

    /// Creates a single-segment symbol from a local name.
    pub fn from_name(name: Name) -> Self {
        Self(intern(&name.as_string()))
    }

    /// Appends a name segment, producing the symbol `self.name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use armillary_core::identifier::{Name, Symbol};
    ///
    /// let scope = Symbol::new("Model.Customer");
    /// assert_eq!(scope.join(Name::new("Id")), "Model.Customer.Id");
    /// ```
    pub fn join(&self, name: Name) -> Self {
        let joined = format!(
            "{}{}{}",
            resolve_to_string(self.0),
            SYMBOL_SEPARATOR,
            name.as_string()
        );
        Self(intern(&joined))
    }

    /// Appends another symbol, producing `self.other`.
    ///
    /// Used to qualify a relative path against an enclosing scope.
    ///
    /// # Examples
    ///
    /// ```
    /// use armillary_core::identifier::Symbol;
    ///
    /// let scope = Symbol::new("Model");
    /// let relative = Symbol::new("Customer.Id");
    /// assert_eq!(scope.concat(relative), "Model.Customer.Id");
    /// ```
    pub fn concat(&self, other: Symbol) -> Self {
        let joined = format!(
            "{}{}{}",
            resolve_to_string(self.0),
            SYMBOL_SEPARATOR,
            resolve_to_string(other.0)
        );
        Self(intern(&joined))
    }

    /// Returns the interned text as an owned string.
    pub fn as_string(&self) -> String {
        resolve_to_string(self.0)
    }

    /// Returns the trailing name segment of the path.
    ///
    /// # Examples
    ///
    /// ```
    /// use armillary_core::identifier::Symbol;
    ///
    /// assert_eq!(Symbol::new("Model.Customer.Id").last_segment(), "Id");
    /// assert_eq!(Symbol::new("Orders").last_segment(), "Orders");
    /// ```
    pub fn last_segment(&self) -> Name {
        let text = resolve_to_string(self.0);
        match text.rfind(SYMBOL_SEPARATOR) {
            Some(pos) => Name::new(&text[pos + 1..]),
            None => Name::new(&text),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", resolve_to_string(self.0))
    }
}

impl std::str::FromStr for Symbol {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    /// Creates a `Symbol` from a string slice.
    ///
    /// This is a convenience implementation that calls `Symbol::new`.
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<Name> for Symbol {
    fn from(name: Name) -> Self {
        Self::from_name(name)
    }
}

impl PartialEq<str> for Symbol {
    /// Allows direct comparison with string slices: `symbol == "string"`
    fn eq(&self, other: &str) -> bool {
        resolve_to_string(self.0) == other
    }
}

impl PartialEq<&str> for Symbol {
    /// Allows direct comparison with string references: `symbol == &string`
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_new() {
        let n1 = Name::new("Customer");
        let n2 = Name::new("Customer");
        let n3 = Name::new("Order");

        assert_eq!(n1, n2);
        assert_ne!(n1, n3);
        assert_eq!(n1, "Customer");
    }

    #[test]
    fn test_name_display() {
        let name = Name::new("NavProp");
        assert_eq!(format!("{}", name), "NavProp");
        assert_eq!(name.as_string(), "NavProp");
    }

    #[test]
    fn test_name_from_trait() {
        let n1: Name = "Id".into();
        let n2 = Name::new("Id");

        assert_eq!(n1, n2);
        assert_eq!(n1, "Id");
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("Customer"));
        assert!(is_valid_name("_private"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Model.Customer"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("tab\there"));
    }

    #[test]
    fn test_symbol_join() {
        let model = Symbol::from_name(Name::new("Model"));
        let customer = model.join(Name::new("Customer"));
        let id = customer.join(Name::new("Id"));

        assert_eq!(customer, "Model.Customer");
        assert_eq!(id, "Model.Customer.Id");
        assert_ne!(customer, id);
    }

    #[test]
    fn test_symbol_interning() {
        let s1 = Symbol::new("Model.Customer");
        let s2 = Symbol::from_name(Name::new("Model")).join(Name::new("Customer"));

        assert_eq!(s1, s2);
    }

    #[test]
    fn test_symbol_concat() {
        let scope = Symbol::new("Model.Customer");
        let relative = Symbol::new("Orders.Quantity");
        assert_eq!(scope.concat(relative), "Model.Customer.Orders.Quantity");
    }

    #[test]
    fn test_symbol_last_segment() {
        assert_eq!(Symbol::new("Model.Customer.Id").last_segment(), "Id");
        assert_eq!(Symbol::new("Model").last_segment(), "Model");
    }

    #[test]
    fn test_symbol_from_name() {
        let sym: Symbol = Name::new("Orders").into();
        assert_eq!(sym, "Orders");
    }

    #[test]
    fn test_hash_and_eq() {
        use std::collections::HashMap;

        let k1 = Symbol::new("Model.A");
        let k2 = Symbol::new("Model.A");
        let k3 = Symbol::new("Model.B");

        let mut map = HashMap::new();
        map.insert(k1, 1);
        map.insert(k3, 2);

        assert_eq!(map.get(&k2), Some(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_copy_trait() {
        let n1 = Name::new("copy_me");
        let n2 = n1;
        let n3 = n1;

        assert_eq!(n1, n2);
        assert_eq!(n2, n3);
        assert_eq!(n3, "copy_me");
    }
}
