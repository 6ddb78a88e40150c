//! MIME type classification for robots.txt captures

/// Decides whether a capture looks like a robots.txt file by MIME type.
///
/// The detected MIME type is only populated since CC-MAIN-2018-34; when it
/// is missing we fall back to the noisy MIME type sent in the HTTP
/// Content-Type header.
///
/// A capture qualifies when:
/// 1. the detected type is absent, or starts with `text/` but is not
///    `text/html`, or is one of the known misdetections `message/rfc822`
///    and `plain/text`; and
/// 2. if (and only if) the detected type is absent, the declared header is
///    absent or contains a case-insensitive `text` occurrence that is not
///    followed by `/html`.
pub fn is_robotstxt_mime_type(detected: Option<&str>, declared: Option<&str>) -> bool {
    let detected_ok = match detected {
        None => true,
        Some(mime) => {
            (mime.starts_with("text/") && mime != "text/html")
                || mime == "message/rfc822"
                || mime == "plain/text"
        }
    };

    let declared_ok = match detected {
        // The declared header is ignored whenever a detected type exists.
        Some(_) => true,
        None => match declared {
            None => true,
            Some(header) => contains_text_not_html(header),
        },
    };

    detected_ok && declared_ok
}

/// True when `header` contains a case-insensitive "text" that is not
/// immediately followed by "/html".
fn contains_text_not_html(header: &str) -> bool {
    let lower = header.to_ascii_lowercase();
    let mut rest = lower.as_str();
    while let Some(pos) = rest.find("text") {
        let after = &rest[pos + "text".len()..];
        if !after.starts_with("/html") {
            return true;
        }
        rest = &rest[pos + 1..];
    }
    false
}
