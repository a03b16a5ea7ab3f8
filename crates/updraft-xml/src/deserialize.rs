//! XML deserialization for documents returned by the store.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::XmlError;

/// Trait for parsing a document from XML.
///
/// The root element has already been consumed by [`from_xml`]; the
/// implementation reads child elements until the matching end tag.
pub trait XmlDeserialize: Sized {
    /// The expected root element name.
    const ROOT: &'static str;

    /// Deserialize an instance from the given XML reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Parse an XML document whose root must be `T::ROOT`.
///
/// Namespace prefixes on the root are ignored.
///
/// # Errors
///
/// Returns [`XmlError::UnexpectedElement`] if the root is some other element,
/// or another `XmlError` if the XML is malformed.
pub fn from_xml<T: XmlDeserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                let tag_name = std::str::from_utf8(name.as_ref())
                    .map_err(|e| XmlError::ParseError(e.to_string()))?;
                if tag_name != T::ROOT {
                    return Err(XmlError::UnexpectedElement(tag_name.to_owned()));
                }
                return T::deserialize_xml(&mut reader);
            }
            Event::Eof => {
                return Err(XmlError::MissingElement("root element".to_owned()));
            }
            _ => {}
        }
    }
}

/// Response of `POST /{key}?uploads`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitiateMultipartUploadResult {
    /// Bucket name.
    pub bucket: Option<String>,
    /// Object key.
    pub key: Option<String>,
    /// Store-assigned session id.
    pub upload_id: String,
}

impl XmlDeserialize for InitiateMultipartUploadResult {
    const ROOT: &'static str = "InitiateMultipartUploadResult";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut bucket = None;
        let mut key = None;
        let mut upload_id = None;

        read_children(reader, Self::ROOT, |reader, tag| {
            match tag {
                "Bucket" => bucket = Some(read_text_content(reader)?),
                "Key" => key = Some(read_text_content(reader)?),
                "UploadId" => upload_id = Some(read_text_content(reader)?),
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;

        let upload_id = upload_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| XmlError::MissingElement("UploadId".to_owned()))?;

        Ok(Self {
            bucket,
            key,
            upload_id,
        })
    }
}

/// Response of a successful completion POST.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUploadResult {
    /// Object location URL.
    pub location: Option<String>,
    /// Object key.
    pub key: Option<String>,
    /// ETag of the assembled object.
    pub etag: Option<String>,
}

impl XmlDeserialize for CompleteMultipartUploadResult {
    const ROOT: &'static str = "CompleteMultipartUploadResult";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut result = Self::default();
        read_children(reader, Self::ROOT, |reader, tag| {
            match tag {
                "Location" => result.location = Some(read_text_content(reader)?),
                "Key" => result.key = Some(read_text_content(reader)?),
                "ETag" => result.etag = Some(read_text_content(reader)?),
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(result)
    }
}

/// The flat `<Error>` document S3 returns on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3ErrorDocument {
    /// Error code such as `NoSuchUpload`.
    pub code: String,
    /// Human-readable message.
    pub message: Option<String>,
}

impl XmlDeserialize for S3ErrorDocument {
    const ROOT: &'static str = "Error";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut result = Self::default();
        read_children(reader, Self::ROOT, |reader, tag| {
            match tag {
                "Code" => result.code = read_text_content(reader)?,
                "Message" => result.message = Some(read_text_content(reader)?),
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(result)
    }
}

/// Visit each child element of the current element by local name, consuming
/// through the matching end tag.
fn read_children<F>(reader: &mut Reader<&[u8]>, context: &str, mut visit: F) -> Result<(), XmlError>
where
    F: FnMut(&mut Reader<&[u8]>, &str) -> Result<(), XmlError>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                let tag_name = std::str::from_utf8(name.as_ref())
                    .map_err(|e| XmlError::ParseError(e.to_string()))?
                    .to_owned();
                visit(reader, &tag_name)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(format!(
                    "unexpected EOF in {context}"
                )));
            }
            _ => {}
        }
    }
}

/// Read the text content of the current element and consume its end tag.
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
                let name = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let entity = format!("&{name};");
                let resolved = quick_xml::escape::unescape(&entity)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&resolved);
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_owned(),
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
                    "unexpected EOF while skipping element".to_owned(),
                ));
            }
            _ => {}
        }
    }
}
