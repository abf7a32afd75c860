//! DER/ASN.1 decoder
//!
//! Parses a DER byte stream into a forest of tagged nodes. Platform CRL
//! verification is not available offline, so certificate and CRL structures
//! are decoded here and signatures are re-verified over the exact byte
//! ranges the decoder records for every node.
//!
//! Nodes live in an arena (`Vec<NodeData>`, children referenced by index);
//! the [`Node`] handle is a cheap `(tree, index)` pair used for traversal.

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// Nesting limit for constructed values and OCTET STRING re-parses
const MAX_DEPTH: usize = 32;

/// Errors raised while decoding a DER stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Asn1Error {
    /// Input ended inside a tag, length, or body
    #[error("truncated DER input at offset {0}")]
    Truncated(usize),

    /// A length field does not fit in usize or exceeds the input
    #[error("invalid length encoding at offset {0}")]
    InvalidLength(usize),

    /// Indefinite length used on a primitive value
    #[error("indefinite length on primitive value at offset {0}")]
    IndefinitePrimitive(usize),

    /// Constructed values nested deeper than the supported limit
    #[error("nesting depth limit exceeded")]
    DepthExceeded,

    /// Bytes remain after the last complete top-level value
    #[error("trailing data after DER content at offset {0}")]
    TrailingData(usize),

    /// The input contains no values at all
    #[error("empty DER input")]
    Empty,
}

/// BER/DER tag class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Universal (built-in ASN.1 types)
    Universal,
    /// Application-specific
    Application,
    /// Context-specific (`[n]` tags)
    ContextSpecific,
    /// Private
    Private,
}

/// A decoded tag: class, primitive/constructed flag, and tag number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Tag class
    pub class: TagClass,
    /// True when the constructed bit is set
    pub constructed: bool,
    /// Tag number
    pub number: u32,
}

/// Universal tag numbers used by the X.509 profile
pub mod tag {
    /// BOOLEAN
    pub const BOOLEAN: u32 = 0x01;
    /// INTEGER
    pub const INTEGER: u32 = 0x02;
    /// BIT STRING
    pub const BIT_STRING: u32 = 0x03;
    /// OCTET STRING
    pub const OCTET_STRING: u32 = 0x04;
    /// NULL
    pub const NULL: u32 = 0x05;
    /// OBJECT IDENTIFIER
    pub const OBJECT_IDENTIFIER: u32 = 0x06;
    /// UTF8String
    pub const UTF8_STRING: u32 = 0x0c;
    /// SEQUENCE / SEQUENCE OF
    pub const SEQUENCE: u32 = 0x10;
    /// SET / SET OF
    pub const SET: u32 = 0x11;
    /// PrintableString
    pub const PRINTABLE_STRING: u32 = 0x13;
    /// IA5String
    pub const IA5_STRING: u32 = 0x16;
    /// UTCTime
    pub const UTC_TIME: u32 = 0x17;
    /// GeneralizedTime
    pub const GENERALIZED_TIME: u32 = 0x18;
}

/// Eagerly decoded value of a primitive node
#[derive(Debug, Clone, PartialEq)]
pub enum Asn1Value {
    /// BOOLEAN
    Boolean(bool),
    /// INTEGER content octets, leading zero octets stripped
    Integer(Vec<u8>),
    /// BIT STRING content with the unused-bits octet dropped
    BitString(Vec<u8>),
    /// OBJECT IDENTIFIER in dotted-decimal form
    Oid(String),
    /// UTF8String / PrintableString / IA5String, or any body that decodes as UTF-8
    Text(String),
    /// UTCTime / GeneralizedTime
    Time(DateTime<Utc>),
    /// Raw body octets
    Bytes(Vec<u8>),
    /// NULL
    Null,
}

struct NodeData {
    tag: Tag,
    /// Header + body (exact encoded extent of this value)
    range: std::ops::Range<usize>,
    /// Content octets only
    body: std::ops::Range<usize>,
    children: Vec<usize>,
    value: Option<Asn1Value>,
}

/// A parsed DER forest over an owned byte buffer
pub struct Asn1Tree {
    data: Vec<u8>,
    nodes: Vec<NodeData>,
    roots: Vec<usize>,
}

/// Handle to one node of an [`Asn1Tree`]
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: &'a Asn1Tree,
    index: usize,
}

impl Asn1Tree {
    /// Parse a complete DER byte stream into a forest.
    ///
    /// Every byte must belong to some value; trailing garbage is an error.
    pub fn parse(data: impl Into<Vec<u8>>) -> Result<Self, Asn1Error> {
        let data = data.into();
        let mut nodes = Vec::new();
        let roots = parse_forest(&data, 0, data.len(), &mut nodes, 0)?;
        if roots.is_empty() {
            return Err(Asn1Error::Empty);
        }
        Ok(Self { data, nodes, roots })
    }

    /// First top-level value
    pub fn root(&self) -> Option<Node<'_>> {
        self.roots.first().map(|&index| Node { tree: self, index })
    }

    /// All top-level values
    pub fn roots(&self) -> impl Iterator<Item = Node<'_>> {
        self.roots.iter().map(move |&index| Node { tree: self, index })
    }

    /// The full input buffer this tree was parsed from
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl<'a> Node<'a> {
    /// Tag of this node
    pub fn tag(&self) -> Tag {
        self.data().tag
    }

    /// Exact encoded bytes of this value, header included
    pub fn raw(&self) -> &'a [u8] {
        &self.tree.data[self.data().range.clone()]
    }

    /// Content octets of this value
    pub fn body(&self) -> &'a [u8] {
        &self.tree.data[self.data().body.clone()]
    }

    /// Number of child values
    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    /// Child value by position
    pub fn child(&self, i: usize) -> Option<Node<'a>> {
        self.data().children.get(i).map(|&index| Node {
            tree: self.tree,
            index,
        })
    }

    /// Iterate child values in order
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + '_ {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&index| Node { tree, index })
    }

    /// Eagerly decoded value, when this node is a recognised primitive
    pub fn value(&self) -> Option<&'a Asn1Value> {
        self.data().value.as_ref()
    }

    /// INTEGER content octets (leading zeros stripped)
    pub fn integer_bytes(&self) -> Option<&'a [u8]> {
        match self.value() {
            Some(Asn1Value::Integer(b)) => Some(b),
            _ => None,
        }
    }

    /// Dotted-decimal OBJECT IDENTIFIER
    pub fn oid(&self) -> Option<&'a str> {
        match self.value() {
            Some(Asn1Value::Oid(s)) => Some(s),
            _ => None,
        }
    }

    /// Decoded text of a string type
    pub fn text(&self) -> Option<&'a str> {
        match self.value() {
            Some(Asn1Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Decoded UTCTime / GeneralizedTime
    pub fn time(&self) -> Option<DateTime<Utc>> {
        match self.value() {
            Some(Asn1Value::Time(t)) => Some(*t),
            _ => None,
        }
    }

    /// BIT STRING content with the unused-bits octet already dropped
    pub fn bit_string(&self) -> Option<&'a [u8]> {
        match self.value() {
            Some(Asn1Value::BitString(b)) => Some(b),
            _ => None,
        }
    }

    /// True for a universal tag with the given number
    pub fn is_universal(&self, number: u32) -> bool {
        let t = self.tag();
        t.class == TagClass::Universal && t.number == number
    }

    /// True for a context-specific tag with the given number
    pub fn is_context(&self, number: u32) -> bool {
        let t = self.tag();
        t.class == TagClass::ContextSpecific && t.number == number
    }

    /// True when this node is a universal UTCTime or GeneralizedTime
    pub fn is_time(&self) -> bool {
        self.is_universal(tag::UTC_TIME) || self.is_universal(tag::GENERALIZED_TIME)
    }

    /// First stringifiable leaf value (depth-first): text or OID
    pub fn as_string(&self) -> Option<String> {
        match self.value() {
            Some(Asn1Value::Text(s)) => return Some(s.clone()),
            Some(Asn1Value::Oid(s)) => return Some(s.clone()),
            _ => {}
        }
        for child in self.children() {
            if let Some(s) = child.as_string() {
                return Some(s);
            }
        }
        None
    }

    /// Depth-first search for an OBJECT IDENTIFIER node with the given value
    pub fn find_oid(&self, oid: &str) -> Option<Node<'a>> {
        if self.oid() == Some(oid) {
            return Some(*self);
        }
        for child in self.children() {
            if let Some(found) = child.find_oid(oid) {
                return Some(found);
            }
        }
        None
    }

    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.index]
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("tag", &self.tag())
            .field("children", &self.child_count())
            .field("value", &self.value())
            .finish()
    }
}

/// Parse consecutive TLVs covering `data[start..end]` exactly
fn parse_forest(
    data: &[u8],
    start: usize,
    end: usize,
    nodes: &mut Vec<NodeData>,
    depth: usize,
) -> Result<Vec<usize>, Asn1Error> {
    let mut offset = start;
    let mut out = Vec::new();
    while offset < end {
        let (index, next) = parse_tlv(data, offset, end, nodes, depth)?;
        out.push(index);
        offset = next;
    }
    if offset != end {
        return Err(Asn1Error::TrailingData(offset));
    }
    Ok(out)
}

/// Parse one TLV starting at `offset`, bounded by `end`
fn parse_tlv(
    data: &[u8],
    offset: usize,
    end: usize,
    nodes: &mut Vec<NodeData>,
    depth: usize,
) -> Result<(usize, usize), Asn1Error> {
    if depth > MAX_DEPTH {
        return Err(Asn1Error::DepthExceeded);
    }
    let (tag, header_len) = parse_tag(data, offset, end)?;
    let len_offset = offset + header_len;
    let (length, len_len) = parse_length(data, len_offset, end)?;
    let body_start = len_offset + len_len;

    match length {
        Length::Definite(body_len) => {
            let body_end = body_start
                .checked_add(body_len)
                .ok_or(Asn1Error::InvalidLength(len_offset))?;
            if body_end > end {
                return Err(Asn1Error::Truncated(offset));
            }
            let index = build_node(data, tag, offset..body_end, body_start..body_end, nodes, depth)?;
            Ok((index, body_end))
        }
        Length::Indefinite => {
            if !tag.constructed {
                return Err(Asn1Error::IndefinitePrimitive(offset));
            }
            // Children run until an end-of-contents marker (00 00)
            let mut children = Vec::new();
            let mut cursor = body_start;
            loop {
                if cursor + 2 > end {
                    return Err(Asn1Error::Truncated(cursor));
                }
                if data[cursor] == 0x00 && data[cursor + 1] == 0x00 {
                    break;
                }
                let (child, next) = parse_tlv(data, cursor, end, nodes, depth + 1)?;
                children.push(child);
                cursor = next;
            }
            let node = NodeData {
                tag,
                range: offset..cursor + 2,
                body: body_start..cursor,
                children,
                value: None,
            };
            nodes.push(node);
            Ok((nodes.len() - 1, cursor + 2))
        }
    }
}

/// Build a node with a definite-length body, recursing into constructed values
fn build_node(
    data: &[u8],
    tag: Tag,
    range: std::ops::Range<usize>,
    body: std::ops::Range<usize>,
    nodes: &mut Vec<NodeData>,
    depth: usize,
) -> Result<usize, Asn1Error> {
    let mut children = Vec::new();
    let mut value = None;

    if tag.constructed {
        children = parse_forest(data, body.start, body.end, nodes, depth + 1)?;
    } else {
        let bytes = &data[body.clone()];
        match tag.class {
            TagClass::Universal => match tag.number {
                tag::BOOLEAN => {
                    value = Some(Asn1Value::Boolean(bytes.first().copied().unwrap_or(0) != 0));
                }
                tag::INTEGER => {
                    let mut v = bytes;
                    while v.len() > 1 && v[0] == 0x00 {
                        v = &v[1..];
                    }
                    value = Some(Asn1Value::Integer(v.to_vec()));
                }
                tag::BIT_STRING => {
                    let content = if bytes.is_empty() { &[][..] } else { &bytes[1..] };
                    value = Some(Asn1Value::BitString(content.to_vec()));
                }
                tag::OCTET_STRING => {
                    // DER frequently nests structures inside OCTET STRINGs
                    // (extension values in particular). Try a full re-parse
                    // of the body first, then fall back to text or bytes.
                    match parse_forest(data, body.start, body.end, nodes, depth + 1) {
                        Ok(sub) if !sub.is_empty() => children = sub,
                        _ => {
                            value = Some(match std::str::from_utf8(bytes) {
                                Ok(s) => Asn1Value::Text(s.to_string()),
                                Err(_) => Asn1Value::Bytes(bytes.to_vec()),
                            });
                        }
                    }
                }
                tag::NULL => value = Some(Asn1Value::Null),
                tag::OBJECT_IDENTIFIER => {
                    value = decode_oid(bytes)
                        .map(Asn1Value::Oid)
                        .or_else(|| Some(Asn1Value::Bytes(bytes.to_vec())));
                }
                tag::UTF8_STRING | tag::PRINTABLE_STRING | tag::IA5_STRING => {
                    value = Some(match std::str::from_utf8(bytes) {
                        Ok(s) => Asn1Value::Text(s.to_string()),
                        Err(_) => Asn1Value::Bytes(bytes.to_vec()),
                    });
                }
                tag::UTC_TIME => {
                    value = std::str::from_utf8(bytes)
                        .ok()
                        .and_then(decode_utc_time)
                        .map(Asn1Value::Time)
                        .or_else(|| Some(Asn1Value::Bytes(bytes.to_vec())));
                }
                tag::GENERALIZED_TIME => {
                    value = std::str::from_utf8(bytes)
                        .ok()
                        .and_then(decode_generalized_time)
                        .map(Asn1Value::Time)
                        .or_else(|| Some(Asn1Value::Bytes(bytes.to_vec())));
                }
                _ => value = Some(Asn1Value::Bytes(bytes.to_vec())),
            },
            // Implicitly tagged values: keep the body, surface text when it
            // happens to be UTF-8 (issuer alt names and the like)
            _ => {
                value = Some(match std::str::from_utf8(bytes) {
                    Ok(s) if !s.is_empty() => Asn1Value::Text(s.to_string()),
                    _ => Asn1Value::Bytes(bytes.to_vec()),
                });
            }
        }
    }

    nodes.push(NodeData {
        tag,
        range,
        body,
        children,
        value,
    });
    Ok(nodes.len() - 1)
}

/// Decode the identifier octets at `offset`, returning the tag and its width
fn parse_tag(data: &[u8], offset: usize, end: usize) -> Result<(Tag, usize), Asn1Error> {
    if offset >= end {
        return Err(Asn1Error::Truncated(offset));
    }
    let first = data[offset];
    let class = match first >> 6 {
        0 => TagClass::Universal,
        1 => TagClass::Application,
        2 => TagClass::ContextSpecific,
        _ => TagClass::Private,
    };
    let constructed = first & 0x20 != 0;
    let number = first & 0x1f;
    if number != 0x1f {
        return Ok((
            Tag {
                class,
                constructed,
                number: u32::from(number),
            },
            1,
        ));
    }
    // High-tag-number form: base-128 continuation bytes
    let mut value: u32 = 0;
    let mut consumed = 1;
    loop {
        if offset + consumed >= end {
            return Err(Asn1Error::Truncated(offset));
        }
        let b = data[offset + consumed];
        consumed += 1;
        value = value
            .checked_mul(128)
            .ok_or(Asn1Error::InvalidLength(offset))?
            + u32::from(b & 0x7f);
        if b & 0x80 == 0 {
            break;
        }
    }
    Ok((
        Tag {
            class,
            constructed,
            number: value,
        },
        consumed,
    ))
}

enum Length {
    Definite(usize),
    Indefinite,
}

/// Decode the length octets at `offset`, returning the length and its width
fn parse_length(data: &[u8], offset: usize, end: usize) -> Result<(Length, usize), Asn1Error> {
    if offset >= end {
        return Err(Asn1Error::Truncated(offset));
    }
    let first = data[offset];
    if first < 0x80 {
        return Ok((Length::Definite(usize::from(first)), 1));
    }
    if first == 0x80 {
        return Ok((Length::Indefinite, 1));
    }
    let count = usize::from(first & 0x7f);
    if count > std::mem::size_of::<usize>() || offset + 1 + count > end {
        return Err(Asn1Error::InvalidLength(offset));
    }
    let mut length: usize = 0;
    for &b in &data[offset + 1..offset + 1 + count] {
        length = length
            .checked_mul(256)
            .ok_or(Asn1Error::InvalidLength(offset))?
            + usize::from(b);
    }
    Ok((Length::Definite(length), 1 + count))
}

/// Decode OBJECT IDENTIFIER content octets to dotted-decimal
fn decode_oid(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let mut arcs: Vec<u64> = Vec::new();
    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        value = value.checked_mul(128)? + u64::from(b & 0x7f);
        if b & 0x80 == 0 {
            if arcs.is_empty() {
                // First subidentifier folds the first two arcs: 40 * a + b
                if value < 40 {
                    arcs.push(0);
                    arcs.push(value);
                } else if value < 80 {
                    arcs.push(1);
                    arcs.push(value - 40);
                } else {
                    arcs.push(2);
                    arcs.push(value - 80);
                }
            } else {
                arcs.push(value);
            }
            value = 0;
        } else if i == bytes.len() - 1 {
            // Continuation bit set on the final octet
            return None;
        }
    }
    Some(
        arcs.iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join("."),
    )
}

/// UTCTime: `yyMMddHHmmssZ` or `yyMMddHHmmZ`, RFC 5280 century rule
fn decode_utc_time(s: &str) -> Option<DateTime<Utc>> {
    let b = s.as_bytes();
    if (b.len() != 13 && b.len() != 11) || *b.last()? != b'Z' {
        return None;
    }
    let yy = two_digits(b, 0)?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    let seconds = if b.len() == 13 { two_digits(b, 10)? } else { 0 };
    build_datetime(year, two_digits(b, 2)?, two_digits(b, 4)?, two_digits(b, 6)?, two_digits(b, 8)?, seconds)
}

/// GeneralizedTime: `yyyyMMddHHmmssZ`
fn decode_generalized_time(s: &str) -> Option<DateTime<Utc>> {
    let b = s.as_bytes();
    if b.len() != 15 || *b.last()? != b'Z' {
        return None;
    }
    let year = two_digits(b, 0)? * 100 + two_digits(b, 2)?;
    build_datetime(year, two_digits(b, 4)?, two_digits(b, 6)?, two_digits(b, 8)?, two_digits(b, 10)?, two_digits(b, 12)?)
}

fn two_digits(b: &[u8], at: usize) -> Option<i32> {
    let hi = b.get(at)?;
    let lo = b.get(at + 1)?;
    if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
        return None;
    }
    Some(i32::from(hi - b'0') * 10 + i32::from(lo - b'0'))
}

fn build_datetime(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(
        year,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
        u32::try_from(hour).ok()?,
        u32::try_from(minute).ok()?,
        u32::try_from(second).ok()?,
    )
    .single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_strips_leading_zero() {
        // INTEGER 0x00AB (leading zero keeps it positive)
        let tree = Asn1Tree::parse(vec![0x02, 0x02, 0x00, 0xab]).unwrap();
        let root = tree.root().unwrap();
        assert!(root.is_universal(tag::INTEGER));
        assert_eq!(root.integer_bytes().unwrap(), &[0xab]);
    }

    #[test]
    fn test_parse_sequence_children() {
        // SEQUENCE { INTEGER 1, INTEGER 2 }
        let tree = Asn1Tree::parse(vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.child(0).unwrap().integer_bytes().unwrap(), &[1]);
        assert_eq!(root.child(1).unwrap().integer_bytes().unwrap(), &[2]);
        // Raw range covers header + body
        assert_eq!(root.raw().len(), 8);
    }

    #[test]
    fn test_decode_oid_ecdsa_with_sha256() {
        let tree = Asn1Tree::parse(vec![
            0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02,
        ])
        .unwrap();
        assert_eq!(tree.root().unwrap().oid().unwrap(), "1.2.840.10045.4.3.2");
    }

    #[test]
    fn test_decode_oid_country_attribute() {
        // 2.5.4.6 encodes as 55 04 06
        let tree = Asn1Tree::parse(vec![0x06, 0x03, 0x55, 0x04, 0x06]).unwrap();
        assert_eq!(tree.root().unwrap().oid().unwrap(), "2.5.4.6");
    }

    #[test]
    fn test_long_form_length() {
        let mut data = vec![0x04, 0x81, 0x80];
        data.extend(std::iter::repeat(0xff).take(128));
        let tree = Asn1Tree::parse(data).unwrap();
        assert_eq!(tree.root().unwrap().body().len(), 128);
    }

    #[test]
    fn test_indefinite_length() {
        // Constructed [0] with indefinite length wrapping INTEGER 5
        let tree = Asn1Tree::parse(vec![0xa0, 0x80, 0x02, 0x01, 0x05, 0x00, 0x00]).unwrap();
        let root = tree.root().unwrap();
        assert!(root.is_context(0));
        assert_eq!(root.child(0).unwrap().integer_bytes().unwrap(), &[5]);
    }

    #[test]
    fn test_bit_string_drops_unused_bits_octet() {
        let tree = Asn1Tree::parse(vec![0x03, 0x03, 0x00, 0xde, 0xad]).unwrap();
        assert_eq!(tree.root().unwrap().bit_string().unwrap(), &[0xde, 0xad]);
    }

    #[test]
    fn test_octet_string_reparses_nested_der() {
        // OCTET STRING { SEQUENCE { NULL } }
        let tree = Asn1Tree::parse(vec![0x04, 0x04, 0x30, 0x02, 0x05, 0x00]).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.child_count(), 1);
        assert!(root.child(0).unwrap().is_universal(tag::SEQUENCE));
    }

    #[test]
    fn test_octet_string_falls_back_to_text() {
        let mut data = vec![0x04, 0x05];
        data.extend_from_slice(b"hello");
        let tree = Asn1Tree::parse(data).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.text().unwrap(), "hello");
    }

    #[test]
    fn test_utc_time_century_rule() {
        // 491231235959Z -> 2049; 500101000000Z -> 1950
        let t = decode_utc_time("491231235959Z").unwrap();
        assert_eq!(t.to_rfc3339(), "2049-12-31T23:59:59+00:00");
        let t = decode_utc_time("500101000000Z").unwrap();
        assert_eq!(t.to_rfc3339(), "1950-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_utc_time_without_seconds() {
        let t = decode_utc_time("2101021530Z").unwrap();
        assert_eq!(t.to_rfc3339(), "2021-01-02T15:30:00+00:00");
    }

    #[test]
    fn test_generalized_time() {
        let t = decode_generalized_time("20301701000000Z");
        assert!(t.is_none()); // month 17 rejected
        let t = decode_generalized_time("20300102030405Z").unwrap();
        assert_eq!(t.to_rfc3339(), "2030-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_find_oid() {
        // SEQUENCE { SEQUENCE { OID 2.5.4.6, PrintableString "AU" } }
        let tree = Asn1Tree::parse(vec![
            0x30, 0x0b, 0x30, 0x09, 0x06, 0x03, 0x55, 0x04, 0x06, 0x13, 0x02, b'A', b'U',
        ])
        .unwrap();
        let root = tree.root().unwrap();
        let found = root.find_oid("2.5.4.6").unwrap();
        assert_eq!(found.oid().unwrap(), "2.5.4.6");
        assert!(root.find_oid("2.5.4.3").is_none());
    }

    #[test]
    fn test_as_string_finds_first_text_leaf() {
        let tree = Asn1Tree::parse(vec![
            0x30, 0x0b, 0x30, 0x09, 0x06, 0x03, 0x55, 0x04, 0x06, 0x13, 0x02, b'A', b'U',
        ])
        .unwrap();
        // OID stringifies first in DFS order
        assert_eq!(tree.root().unwrap().as_string().unwrap(), "2.5.4.6");
    }

    #[test]
    fn test_truncated_input_rejected() {
        assert!(matches!(
            Asn1Tree::parse(vec![0x30, 0x05, 0x02, 0x01]),
            Err(Asn1Error::Truncated(_))
        ));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(Asn1Tree::parse(Vec::new()), Err(Asn1Error::Empty)));
    }
}
