/// Errors produced while parsing an operator header block
///
/// Any of these aborts the whole send attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("Headers should be in 'Key: Value' format (line {line}: {text:?})")]
    MalformedHeaderLine { line: usize, text: String },
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),
}

/// A single `name: value` line split on its first colon, both sides trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeaderLine {
    pub name: String,
    pub value: String,
}

/// Where a header ends up on the outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    /// Exactly `Content-Type`; sets the body's media type
    ContentType,
    /// Any other `Content-*` header, attached to the body
    OtherContentMetadata,
    /// Everything else, attached to the request itself
    RequestMetadata,
}

impl HeaderClass {
    /// Classifies a header by its (already validated) name, ignoring case
    pub fn of(name: &str) -> Self {
        const CONTENT_PREFIX: &str = "content-";

        if name.eq_ignore_ascii_case("content-type") {
            HeaderClass::ContentType
        } else if name
            .get(..CONTENT_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CONTENT_PREFIX))
        {
            HeaderClass::OtherContentMetadata
        } else {
            HeaderClass::RequestMetadata
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedHeader {
    pub line: RawHeaderLine,
    pub class: HeaderClass,
}

impl ClassifiedHeader {
    pub fn name(&self) -> &str {
        &self.line.name
    }

    pub fn value(&self) -> &str {
        &self.line.value
    }
}

/// Returns true if `name` is acceptable as a header name.
///
/// A valid name is non-empty, made only of visible ASCII (33..=126) other
/// than `:`, and does not start with a digit.
pub fn is_valid_header_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.first() {
        None => false,
        Some(first) if first.is_ascii_digit() => false,
        Some(_) => bytes.iter().all(|&b| (33..=126).contains(&b) && b != b':'),
    }
}

/// Parses a raw header block into classified headers.
///
/// Lines are split on `\n`; blank lines are skipped. Every other line must
/// contain a `:` and carry a valid name. The first bad line fails the whole
/// block, so callers never see a partial result. Values are trimmed but not
/// otherwise checked.
pub fn parse_header_block(raw: &str) -> Result<Vec<ClassifiedHeader>, HeaderError> {
    let mut headers = Vec::new();

    for (index, text) in raw.split('\n').enumerate() {
        if text.trim().is_empty() {
            continue;
        }

        let (name, value) = text
            .split_once(':')
            .ok_or_else(|| HeaderError::MalformedHeaderLine {
                line: index + 1,
                text: text.trim().to_string(),
            })?;

        let name = name.trim();
        if !is_valid_header_name(name) {
            return Err(HeaderError::InvalidHeaderName(name.to_string()));
        }

        headers.push(ClassifiedHeader {
            class: HeaderClass::of(name),
            line: RawHeaderLine {
                name: name.to_string(),
                value: value.trim().to_string(),
            },
        });
    }

    Ok(headers)
}
