//! Parsing of listing responses

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{ClientError, Result};

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBucketPage {
    pub keys: Vec<String>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

impl ListBucketPage {
    /// Marker to request the following page with
    pub fn continuation(&self) -> Option<&str> {
        if !self.is_truncated {
            return None;
        }
        self.next_marker
            .as_deref()
            .or_else(|| self.keys.last().map(String::as_str))
    }
}

/// A closed element together with its parent and text content
#[derive(Debug)]
struct Leaf {
    parent: String,
    name: String,
    text: String,
}

/// Parse a `ListBucketResult` document
pub fn parse_list_bucket(body: &[u8]) -> Result<ListBucketPage> {
    let mut page = ListBucketPage::default();
    for leaf in leaves(body)? {
        match (leaf.parent.as_str(), leaf.name.as_str()) {
            ("Contents", "Key") => page.keys.push(leaf.text),
            ("ListBucketResult", "IsTruncated") => page.is_truncated = leaf.text.trim() == "true",
            ("ListBucketResult", "NextMarker") if !leaf.text.is_empty() => {
                page.next_marker = Some(leaf.text)
            }
            _ => {}
        }
    }
    Ok(page)
}

/// Parse a `ListAllMyBucketsResult` document into bucket names
pub fn parse_bucket_names(body: &[u8]) -> Result<Vec<String>> {
    Ok(leaves(body)?
        .into_iter()
        .filter(|leaf| leaf.parent == "Bucket" && leaf.name == "Name")
        .map(|leaf| leaf.text)
        .collect())
}

/// `Code` of an S3 error document, if the body is one
pub fn error_code(body: &[u8]) -> Option<String> {
    leaves(body)
        .ok()?
        .into_iter()
        .find(|leaf| leaf.parent == "Error" && leaf.name == "Code")
        .map(|leaf| leaf.text)
}

fn leaves(body: &[u8]) -> Result<Vec<Leaf>> {
    // Text is not trimmed: entity references arrive as separate events and
    // trimming would eat spaces next to them.
    let mut reader = Reader::from_reader(body);
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut leaves = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                text.clear();
            }
            Event::Text(e) => {
                let decoded = e.decode().map_err(xml_error)?;
                text.push_str(&unescape(&decoded).map_err(xml_error)?);
            }
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                let name = e.decode().map_err(xml_error)?;
                text.push_str(&resolve_reference(&name)?);
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    leaves.push(Leaf {
                        parent: stack.last().cloned().unwrap_or_default(),
                        name,
                        text: std::mem::take(&mut text),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ClientError::Xml(format!("unclosed element <{}>", stack.join("><"))));
    }
    Ok(leaves)
}

fn resolve_reference(name: &str) -> Result<String> {
    if let Some(value) = resolve_predefined_entity(name) {
        return Ok(value.to_string());
    }

    let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => name.strip_prefix('#').and_then(|dec| dec.parse().ok()),
    };
    code.and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| ClientError::Xml(format!("unknown entity &{};", name)))
}

fn xml_error(e: impl std::fmt::Display) -> ClientError {
    ClientError::Xml(e.to_string())
}
