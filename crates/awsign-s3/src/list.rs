//! Parsing of `ListObjectsV2` responses.
//!
//! The body is a `<ListBucketResult>` document. Only the parts needed to
//! page through a listing are read: each `<Contents>` entry and the
//! continuation token. Unknown elements are skipped.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use serde::Serialize;

use crate::error::XmlError;

/// One object in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag, including its surrounding quotes.
    pub etag: Option<String>,
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectListing {
    /// Objects on this page, in key order.
    pub objects: Vec<ObjectSummary>,
    /// Whether more pages follow.
    pub is_truncated: bool,
    /// Token for the next page, present when `is_truncated`.
    pub next_continuation_token: Option<String>,
}

/// Parse a `ListObjectsV2` response body.
///
/// # Errors
///
/// Returns `XmlError` if the document is malformed, its root is not
/// `ListBucketResult`, or a `<Contents>` entry has no `<Key>`.
pub fn parse_list_objects(xml: &[u8]) -> Result<ObjectListing, XmlError> {
    let mut reader = Reader::from_reader(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"ListBucketResult" => {
                return read_listing(&mut reader);
            }
            Event::Start(e) => {
                return Err(XmlError::UnexpectedElement(
                    String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ));
            }
            Event::Eof => {
                return Err(XmlError::MissingElement("ListBucketResult".to_string()));
            }
            _ => {}
        }
    }
}

fn read_listing(reader: &mut Reader<&[u8]>) -> Result<ObjectListing, XmlError> {
    let mut listing = ObjectListing::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"Contents" => listing.objects.push(read_summary(reader)?),
                b"IsTruncated" => listing.is_truncated = parse_bool(&read_text_content(reader)?)?,
                b"NextContinuationToken" => {
                    listing.next_continuation_token = Some(read_text_content(reader)?);
                }
                _ => skip_element(reader)?,
            },
            Event::End(_) => return Ok(listing),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF inside ListBucketResult".to_string(),
                ));
            }
            _ => {}
        }
    }
}

fn read_summary(reader: &mut Reader<&[u8]>) -> Result<ObjectSummary, XmlError> {
    let mut key = None;
    let mut size = 0;
    let mut last_modified = None;
    let mut etag = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"Key" => key = Some(read_text_content(reader)?),
                b"Size" => size = parse_u64(&read_text_content(reader)?)?,
                b"LastModified" => {
                    last_modified = Some(parse_timestamp(&read_text_content(reader)?)?);
                }
                b"ETag" => etag = Some(read_text_content(reader)?),
                _ => skip_element(reader)?,
            },
            Event::End(_) => break,
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF inside Contents".to_string(),
                ));
            }
            _ => {}
        }
    }

    Ok(ObjectSummary {
        key: key.ok_or_else(|| XmlError::MissingElement("Key".to_string()))?,
        size,
        last_modified,
        etag,
    })
}

/// Read the text content of the current element and consume its end tag.
///
/// Entity and character references arrive as separate events and are
/// resolved in place.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e
                    .resolve_char_ref()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?
                {
                    text.push(ch);
                    continue;
                }
                let name = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let resolved = resolve_predefined_entity(&name)
                    .ok_or_else(|| XmlError::ParseError(format!("unknown entity &{name};")))?;
                text.push_str(resolved);
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_string(),
                ));
            }
            _ => {}
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, XmlError> {
    match s {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(XmlError::ParseError(format!("invalid boolean: {s}"))),
    }
}

fn parse_u64(s: &str) -> Result<u64, XmlError> {
    s.parse::<u64>()
        .map_err(|e| XmlError::ParseError(format!("invalid u64 '{s}': {e}")))
}

/// Parse an ISO 8601 timestamp such as `2009-10-12T17:50:30.000Z`.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, XmlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| XmlError::ParseError(format!("invalid timestamp '{s}': {e}")))
}
