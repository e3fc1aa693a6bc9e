//! Human-readable rendering of envelopes.
//!
//! ```text
//! {
//!     "Hello."
//! } [
//!     verifiedBy: Signature [
//!         note: "Made by Alice."
//!     ]
//! ]
//! ```
//!
//! Rendering happens in two passes. An envelope is first turned into a
//! tree of [`FormatItem`]s; the flattened tree is then laid out into
//! indented lines. Assertions are sorted by their rendered items, so the
//! output does not depend on digest order.

use ciborium::value::Value;

use crate::assertion::Assertion;
use crate::canonical::{tags, CborDecode};
use crate::digest::Digest;
use crate::envelope::Envelope;
use crate::predicate::{Predicate, PredicateRegistry};
use crate::reference::{Identifier, Reference};
use crate::subject::Subject;

/// Layout options for [`EnvelopeFormatter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Spaces per nesting level.
    pub indent_width: usize,
    /// How many hex characters of a digest to show (`None` for all).
    pub digest_hex_len: Option<usize>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_width: 4,
            digest_hex_len: Some(16),
        }
    }
}

/// One layout instruction.
///
/// The variant order is significant: derived `Ord` compares variants first,
/// and assertions are sorted with it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatItem {
    /// Open a nested block, optionally finishing the current line with text.
    Begin(String),
    /// Close a nested block with a closing line.
    End(String),
    /// Inline text.
    Item(String),
    /// Break between sibling entries.
    Separator,
    List(Vec<FormatItem>),
}

impl FormatItem {
    fn item(s: impl Into<String>) -> Self {
        FormatItem::Item(s.into())
    }

    fn flatten_into(&self, out: &mut Vec<FormatItem>) {
        match self {
            FormatItem::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            other => out.push(other.clone()),
        }
    }

    /// Lay out the item tree as indented text.
    pub fn render(&self, indent_width: usize) -> String {
        let mut flat = Vec::new();
        self.flatten_into(&mut flat);

        let indent = |level: usize| " ".repeat(level * indent_width);
        let mut lines = String::new();
        let mut level = 0usize;
        let mut current = String::new();

        for item in flat {
            match item {
                FormatItem::Begin(text) => {
                    if !text.is_empty() {
                        let line = if current.is_empty() {
                            text
                        } else {
                            if !current.ends_with(' ') {
                                current.push(' ');
                            }
                            current + &text
                        };
                        lines.push_str(&indent(level));
                        lines.push_str(&line);
                        lines.push('\n');
                    }
                    level += 1;
                    current = String::new();
                }
                FormatItem::End(text) => {
                    if !current.is_empty() {
                        lines.push_str(&indent(level));
                        lines.push_str(&current);
                        lines.push('\n');
                        current.clear();
                    }
                    level = level.saturating_sub(1);
                    lines.push_str(&indent(level));
                    lines.push_str(&text);
                    lines.push('\n');
                }
                FormatItem::Item(text) => current.push_str(&text),
                FormatItem::Separator => {
                    if !current.is_empty() {
                        lines.push_str(&indent(level));
                        lines.push_str(&current);
                        lines.push('\n');
                        current.clear();
                    }
                }
                FormatItem::List(_) => {}
            }
        }
        lines.push_str(&current);
        lines.trim().to_string()
    }
}

/// Renders envelopes, naming predicates through a registry.
#[derive(Debug, Clone)]
pub struct EnvelopeFormatter<'a> {
    registry: &'a PredicateRegistry,
    options: FormatOptions,
}

impl<'a> EnvelopeFormatter<'a> {
    pub fn new(registry: &'a PredicateRegistry, options: FormatOptions) -> Self {
        Self { registry, options }
    }

    pub fn format(&self, envelope: &Envelope) -> String {
        self.envelope_item(envelope).render(self.options.indent_width)
    }

    pub fn envelope_item(&self, envelope: &Envelope) -> FormatItem {
        let subject_item = self.subject_item(envelope.subject());
        let is_list = matches!(subject_item, FormatItem::List(_));

        let mut assertion_items: Vec<Vec<FormatItem>> = envelope
            .assertions()
            .iter()
            .map(|a| vec![self.assertion_item(a)])
            .collect();
        assertion_items.sort();
        let joined: Vec<FormatItem> = assertion_items.join(&FormatItem::Separator);
        let has_assertions = !joined.is_empty();

        let mut items = Vec::new();
        if is_list {
            items.push(FormatItem::Begin("{".into()));
        }
        items.push(subject_item);
        if is_list {
            if has_assertions {
                items.push(FormatItem::End("} [".into()));
                items.push(FormatItem::Begin(String::new()));
            } else {
                items.push(FormatItem::End("}".into()));
            }
        }
        if has_assertions {
            if !is_list {
                items.push(FormatItem::Begin("[".into()));
            }
            items.push(FormatItem::List(joined));
            items.push(FormatItem::End("]".into()));
        }
        FormatItem::List(items)
    }

    fn assertion_item(&self, assertion: &Assertion) -> FormatItem {
        FormatItem::List(vec![
            self.envelope_item(assertion.predicate()),
            FormatItem::item(": "),
            self.envelope_item(assertion.object()),
        ])
    }

    fn subject_item(&self, subject: &Subject) -> FormatItem {
        match subject {
            Subject::Leaf(leaf) => self.value_item(leaf.value()),
            Subject::Envelope(envelope) => self.envelope_item(envelope),
            Subject::Encrypted(..) => FormatItem::item("EncryptedMessage"),
            Subject::Reference(Reference::Digest(_)) => FormatItem::item("REDACTED"),
            Subject::Reference(Reference::Identified { id, .. }) => self.identifier_item(id),
        }
    }

    fn value_item(&self, value: &Value) -> FormatItem {
        match value {
            Value::Integer(i) => FormatItem::item(i128::from(*i).to_string()),
            Value::Text(s) => FormatItem::item(format!("\"{s}\"")),
            Value::Bool(b) => FormatItem::item(b.to_string()),
            Value::Float(f) => FormatItem::item(f.to_string()),
            Value::Null => FormatItem::item("null"),
            Value::Bytes(b) => FormatItem::item(format!("Bytes({})", b.len())),
            Value::Tag(tag, inner) => self.tagged_item(*tag, inner, value),
            _ => FormatItem::item("CBOR"),
        }
    }

    fn tagged_item(&self, tag: u64, inner: &Value, whole: &Value) -> FormatItem {
        match tag {
            tags::ENVELOPE => match Envelope::from_cbor(whole) {
                Ok(envelope) => self.envelope_item(&envelope),
                Err(_) => FormatItem::item("<error>"),
            },
            tags::PREDICATE => match Predicate::from_cbor(whole) {
                Ok(predicate) => match self.registry.name(predicate) {
                    Some(name) => FormatItem::item(name),
                    None => FormatItem::item("<unknown predicate>"),
                },
                Err(_) => FormatItem::item("<error>"),
            },
            tags::DIGEST => match Digest::from_cbor(whole) {
                Ok(digest) => FormatItem::item(format!("Digest({})", self.digest_hex(&digest))),
                Err(_) => FormatItem::item("<error>"),
            },
            tags::IDENTIFIER => match Identifier::from_cbor(whole) {
                Ok(id) => self.identifier_item(&id),
                Err(_) => FormatItem::item("<error>"),
            },
            tags::URI => match inner {
                Value::Text(uri) => FormatItem::item(format!("URI({uri})")),
                _ => FormatItem::item("<error>"),
            },
            tags::SIGNATURE => FormatItem::item("Signature"),
            tags::SEALED_MESSAGE => FormatItem::item("SealedMessage"),
            tags::SSKR_SHARE => FormatItem::item("SSKRShare"),
            tags::PUBLIC_KEY_BASE => FormatItem::item("PublicKeyBase"),
            tags::SYMMETRIC_KEY => FormatItem::item("SymmetricKey"),
            tags::ENCRYPTED_MESSAGE => FormatItem::item("EncryptedMessage"),
            tags::PERMIT => FormatItem::item("Permit"),
            _ => FormatItem::item("CBOR"),
        }
    }

    fn identifier_item(&self, id: &Identifier) -> FormatItem {
        FormatItem::item(format!("ID({})", id.to_hex()))
    }

    fn digest_hex(&self, digest: &Digest) -> String {
        let hex = digest.to_hex();
        match self.options.digest_hex_len {
            Some(len) if len < hex.len() => hex[..len].to_string(),
            _ => hex,
        }
    }
}

impl Envelope {
    /// Render with default layout options.
    pub fn format(&self, registry: &PredicateRegistry) -> String {
        EnvelopeFormatter::new(registry, FormatOptions::default()).format(self)
    }
}
