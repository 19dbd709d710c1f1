//! Call-control markup returned to the telephony platform.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;
use thiserror::Error;

/// Failure while rendering a markup document.
#[derive(Debug, Error)]
#[error("Markup error: {0}")]
pub struct MarkupError(String);

fn markup_error(e: impl std::fmt::Display) -> MarkupError {
    MarkupError(e.to_string())
}

/// Join the public stream base URI and a call id into the per-call stream URL.
pub fn call_stream_url(ws_server_uri: &str, call_id: &str) -> String {
    format!("{}/{}", ws_server_uri.trim_end_matches('/'), call_id)
}

/// Build a response that connects the call to a bidirectional media stream
/// and speaks `fallback_phrase` once the stream ends.
pub fn connect_stream_response(
    stream_url: &str,
    fallback_phrase: &str,
) -> Result<String, MarkupError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(markup_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("Response")))
        .map_err(markup_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("Connect")))
        .map_err(markup_error)?;

    let mut stream = BytesStart::new("Stream");
    stream.push_attribute(("url", stream_url));
    writer
        .write_event(Event::Empty(stream))
        .map_err(markup_error)?;

    writer
        .write_event(Event::End(BytesEnd::new("Connect")))
        .map_err(markup_error)?;

    if !fallback_phrase.is_empty() {
        writer
            .write_event(Event::Start(BytesStart::new("Say")))
            .map_err(markup_error)?;
        writer
            .write_event(Event::Text(BytesText::new(fallback_phrase)))
            .map_err(markup_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("Say")))
            .map_err(markup_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Response")))
        .map_err(markup_error)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(markup_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_stream_url() {
        assert_eq!(
            call_stream_url("wss://relay.example.com/media-stream", "CA123"),
            "wss://relay.example.com/media-stream/CA123"
        );
        assert_eq!(
            call_stream_url("wss://relay.example.com/media-stream/", "CA123"),
            "wss://relay.example.com/media-stream/CA123"
        );
    }

    #[test]
    fn test_connect_stream_response() {
        let xml = connect_stream_response(
            "wss://relay.example.com/media-stream/CA123",
            "I say this after websocket connection ends",
        )
        .unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Connect>\
             <Stream url=\"wss://relay.example.com/media-stream/CA123\"/></Connect>\
             <Say>I say this after websocket connection ends</Say></Response>"
        );
    }

    #[test]
    fn test_markup_is_escaped() {
        let xml = connect_stream_response("wss://h/s?a=1&b=2", "Tom & <Jerry>").unwrap();
        assert!(xml.contains(r#"url="wss://h/s?a=1&amp;b=2""#));
        assert!(xml.contains("<Say>Tom &amp; &lt;Jerry&gt;</Say>"));
    }

    #[test]
    fn test_markup_parses_back() {
        let phrase = "Goodbye & \"thanks\"";
        let xml = connect_stream_response("wss://h/s/CA1?x=<1>", phrase).unwrap();

        let mut reader = quick_xml::Reader::from_str(&xml);
        let mut url = None;
        let mut said = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Empty(e) if e.name().as_ref() == b"Stream" => {
                    let attr = e.try_get_attribute("url").unwrap().unwrap();
                    url = Some(attr.unescape_value().unwrap().into_owned());
                }
                Event::Text(t) => said.push_str(&t.unescape().unwrap()),
                Event::Eof => break,
                _ => {}
            }
        }

        assert_eq!(url.as_deref(), Some("wss://h/s/CA1?x=<1>"));
        assert_eq!(said, phrase);
    }

    #[test]
    fn test_empty_fallback_omits_say() {
        let xml = connect_stream_response("wss://h/s/CA1", "").unwrap();
        assert!(!xml.contains("<Say>"));
        assert!(xml.ends_with("</Connect></Response>"));
    }
}
