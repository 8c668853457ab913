//! Message translation.
//!
//! Error messages leave the engine as [`TranslationString`]s: a message id
//! (the default English template) plus named `${slot}` values. A
//! [`Translator`] installed on the root unit turns them into display text.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// A translatable message: default template plus interpolation values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationString {
    msgid: String,
    mapping: Vec<(String, String)>,
}

impl TranslationString {
    pub fn new(msgid: impl Into<String>) -> Self {
        Self {
            msgid: msgid.into(),
            mapping: Vec::new(),
        }
    }

    /// Add a value for the `${name}` slot.
    pub fn with(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.mapping.push((name.into(), value.to_string()));
        self
    }

    pub fn msgid(&self) -> &str {
        &self.msgid
    }

    pub fn mapping(&self) -> &[(String, String)] {
        &self.mapping
    }

    /// Fill the slots of the default template.
    pub fn interpolate(&self) -> String {
        self.interpolate_into(&self.msgid)
    }

    /// Fill the slots of another template (e.g. a translated one).
    ///
    /// Slots are filled in one pass, so substituted values are never
    /// scanned for further slots.
    pub fn interpolate_into(&self, template: &str) -> String {
        static SLOT: OnceLock<Regex> = OnceLock::new();
        let slot = SLOT.get_or_init(|| Regex::new(r"\$\{(\w+)\}").expect("slot pattern compiles"));
        slot.replace_all(template, |caps: &Captures<'_>| {
            self.mapping
                .iter()
                .find(|(name, _)| *name == caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.clone())
        })
        .into_owned()
    }
}

/// Turns translatable messages into display strings.
pub trait Translator: fmt::Debug + Send + Sync {
    fn translate(&self, term: &TranslationString) -> String;
}

/// Interpolates the default template. Used when nothing else is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTranslator;

impl Translator for SimpleTranslator {
    fn translate(&self, term: &TranslationString) -> String {
        term.interpolate()
    }
}

/// Looks up translated templates by message id, falling back to the default.
#[derive(Debug, Clone, Default)]
pub struct CatalogTranslator {
    catalog: HashMap<String, String>,
}

impl CatalogTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a translated template for a message id.
    pub fn insert(mut self, msgid: impl Into<String>, template: impl Into<String>) -> Self {
        self.catalog.insert(msgid.into(), template.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for CatalogTranslator
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            catalog: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Translator for CatalogTranslator {
    fn translate(&self, term: &TranslationString) -> String {
        match self.catalog.get(term.msgid()) {
            Some(template) => term.interpolate_into(template),
            None => term.interpolate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_translator_interpolates_slots() {
        let term = TranslationString::new("${value} is less than minimum value ${min}")
            .with("value", 3)
            .with("min", 5);
        assert_eq!(
            SimpleTranslator.translate(&term),
            "3 is less than minimum value 5"
        );
    }

    #[test]
    fn unknown_slots_are_left_alone() {
        let term = TranslationString::new("Use ${format}.");
        assert_eq!(term.interpolate(), "Use ${format}.");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let term = TranslationString::new("${value} is not one of ${choices}")
            .with("value", "${choices}")
            .with("choices", "red, green");
        assert_eq!(term.interpolate(), "${choices} is not one of red, green");

        let term = TranslationString::new("${a} ${b}")
            .with("a", "${b}")
            .with("b", "${a}");
        assert_eq!(term.interpolate(), "${b} ${a}");
    }

    #[test]
    fn catalog_translator_uses_catalog_then_default() {
        let translator = CatalogTranslator::new()
            .insert("Enter a whole number.", "Introduzca un número entero.");

        let known = TranslationString::new("Enter a whole number.");
        assert_eq!(translator.translate(&known), "Introduzca un número entero.");

        let unknown = TranslationString::new("This field is required.");
        assert_eq!(translator.translate(&unknown), "This field is required.");
    }

    #[test]
    fn catalog_translator_interpolates_translated_template() {
        let translator: CatalogTranslator =
            [("Shorter than minimum length ${min}", "Mindestlänge ${min}")]
                .into_iter()
                .collect();
        let term = TranslationString::new("Shorter than minimum length ${min}").with("min", 3);
        assert_eq!(translator.translate(&term), "Mindestlänge 3");
    }
}
