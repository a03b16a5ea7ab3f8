//! XML serialization for documents sent to the store.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::BytesText;

use crate::error::XmlError;

/// Trait for writing a document's child elements.
///
/// Uses `io::Result` because `quick_xml::Writer` closures require `io::Result<()>`.
pub trait XmlSerialize {
    /// Serialize this value as XML child elements into the given writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if writing to the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize `value` under `root_element`.
///
/// No XML declaration or namespace is written; S3 accepts the bare document.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
pub fn to_xml<T: XmlSerialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(256);
    let mut writer = Writer::new(&mut buf);

    writer
        .create_element(root_element)
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// One uploaded part, as reported back at completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// ETag returned by the part PUT, without surrounding quotes.
    pub etag: String,
}

/// Body of `POST ?uploadId=X`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUpload {
    /// Uploaded parts.
    pub parts: Vec<CompletedPart>,
}

impl CompleteMultipartUpload {
    /// The root element name.
    pub const ROOT: &'static str = "CompleteMultipartUpload";

    /// Build a completion document with parts sorted by ascending part number.
    #[must_use]
    pub fn new(mut parts: Vec<CompletedPart>) -> Self {
        parts.sort_by_key(|p| p.part_number);
        Self { parts }
    }

    /// Serialize to a complete document.
    ///
    /// # Examples
    ///
    /// ```
    /// use updraft_xml::{CompleteMultipartUpload, CompletedPart};
    ///
    /// let doc = CompleteMultipartUpload::new(vec![
    ///     CompletedPart { part_number: 2, etag: "b".to_owned() },
    ///     CompletedPart { part_number: 1, etag: "a".to_owned() },
    /// ]);
    /// let xml = String::from_utf8(doc.to_xml().unwrap()).unwrap();
    /// assert_eq!(
    ///     xml,
    ///     "<CompleteMultipartUpload>\
    ///      <Part><ETag>a</ETag><PartNumber>1</PartNumber></Part>\
    ///      <Part><ETag>b</ETag><PartNumber>2</PartNumber></Part>\
    ///      </CompleteMultipartUpload>"
    /// );
    /// ```
    pub fn to_xml(&self) -> Result<Vec<u8>, XmlError> {
        to_xml(Self::ROOT, self)
    }
}

impl XmlSerialize for CompleteMultipartUpload {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        for part in &self.parts {
            writer.create_element("Part").write_inner_content(|w| {
                write_text_element(w, "ETag", &part.etag)?;
                write_text_element(w, "PartNumber", &part.part_number.to_string())?;
                Ok(())
            })?;
        }
        Ok(())
    }
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}
