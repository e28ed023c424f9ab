use log::info;
use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::EtlError;

/// How to recognize the download link element in the index document.
/// Matching is on the local tag name so namespace prefixes don't matter;
/// `attr` further restricts the match to elements carrying that exact
/// attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSelector {
    pub tag: &'static str,
    pub attr: Option<(&'static str, &'static str)>,
}

/// The files register is a Solr response; each document lists its file as
/// `<str name="download_link">https://firds.esma.europa.eu/firds/DLTINS_20210117_01of01.zip</str>`.
pub const FIRDS_LINK: LinkSelector = LinkSelector {
    tag: "str",
    attr: Some(("name", "download_link")),
};

/// First matching element in document order wins; the walk returns as soon
/// as that element's leading text is complete.  The text is trimmed.
pub fn find_download_link(xml: &[u8], selector: &LinkSelector) -> Result<String, EtlError> {
    match scan(xml, selector) {
        Ok(Some(text)) => {
            let url = text.trim().to_string();
            info!("download link found: {}", url);
            Ok(url)
        }
        Ok(None) => Err(EtlError::LinkNotFound {
            tag: selector.tag.to_string(),
        }),
        Err(e) => Err(EtlError::Xml {
            doc: "register index",
            source: e,
        }),
    }
}

/// Document-order scan.  Once the selector matches, text is accumulated up
/// to the element's first child or its end tag, whichever comes first, the
/// same leading-text rule tree parsers use for `.text`.  A document that
/// ends with elements still open is malformed, unless the early return
/// already fired.
fn scan(xml: &[u8], selector: &LinkSelector) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    let mut text: Option<String> = None;
    // open element count; the name opened at top scope is reported when the
    // document ends before everything closes
    let mut open = 0usize;
    let mut outermost: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if let Some(t) = text.take() {
                    return Ok(Some(t));
                }
                if open == 0 {
                    outermost =
                        Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                open += 1;
                if matches(&e, selector)? {
                    text = Some(String::new());
                }
            }
            Event::Empty(e) => {
                if let Some(t) = text.take() {
                    return Ok(Some(t));
                }
                if matches(&e, selector)? {
                    return Ok(Some(String::new()));
                }
            }
            Event::Text(t) => {
                if let Some(acc) = text.as_mut() {
                    acc.push_str(&t.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::CData(t) => {
                if let Some(acc) = text.as_mut() {
                    acc.push_str(&reader.decoder().decode(&t).map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(_) => {
                open -= 1;
                if let Some(t) = text.take() {
                    return Ok(Some(t));
                }
            }
            Event::Eof => {
                // the reader does not flag unclosed elements at EOF itself
                if open > 0 {
                    let tag = outermost.unwrap_or_default();
                    return Err(IllFormedError::MissingEndTag(tag).into());
                }
                return Ok(None);
            }
            _ => {}
        }
    }
}

fn matches(e: &BytesStart, selector: &LinkSelector) -> Result<bool, quick_xml::Error> {
    if e.local_name().as_ref() != selector.tag.as_bytes() {
        return Ok(false);
    }
    match selector.attr {
        None => Ok(true),
        Some((name, value)) => {
            for attr in e.attributes() {
                let attr = attr.map_err(quick_xml::Error::from)?;
                if attr.key.local_name().as_ref() == name.as_bytes()
                    && attr.unescape_value().map_err(quick_xml::Error::from)? == value
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: LinkSelector = LinkSelector {
        tag: "download",
        attr: None,
    };

    #[test]
    fn first_link_after_empty_sibling() {
        let xml = b"<doc><a/><download>http://x/y.zip</download></doc>";
        assert_eq!(find_download_link(xml, &PLAIN).unwrap(), "http://x/y.zip");
    }

    #[test]
    fn first_of_several_wins() {
        let xml = b"<doc>\
            <meta>ignored</meta>\
            <download>http://x/first.zip</download>\
            <download>http://x/second.zip</download>\
        </doc>";
        assert_eq!(
            find_download_link(xml, &PLAIN).unwrap(),
            "http://x/first.zip"
        );
    }

    #[test]
    fn text_is_trimmed() {
        let xml = b"<doc><download>\n  http://x/y.zip\n</download></doc>";
        assert_eq!(find_download_link(xml, &PLAIN).unwrap(), "http://x/y.zip");
    }

    #[test]
    fn matches_on_local_name() {
        let xml = b"<d:doc xmlns:d=\"urn:example\">\
            <d:download>http://x/y.zip</d:download>\
        </d:doc>";
        assert_eq!(find_download_link(xml, &PLAIN).unwrap(), "http://x/y.zip");
    }

    #[test]
    fn solr_response_picks_the_download_link_str() {
        // shape of the registers response: several <str> fields per doc
        let xml = br#"<response>
  <lst name="responseHeader"><int name="status">0</int></lst>
  <result name="response" numFound="528" start="0">
    <doc>
      <str name="checksum">d147d5c1cba8e0094d3e21264b2858fa</str>
      <str name="download_link">https://firds.esma.europa.eu/firds/DLTINS_20210117_01of01.zip</str>
      <str name="file_name">DLTINS_20210117_01of01.zip</str>
      <str name="file_type">DLTINS</str>
    </doc>
    <doc>
      <str name="download_link">https://firds.esma.europa.eu/firds/DLTINS_20210118_01of01.zip</str>
    </doc>
  </result>
</response>"#;
        assert_eq!(
            find_download_link(xml, &FIRDS_LINK).unwrap(),
            "https://firds.esma.europa.eu/firds/DLTINS_20210117_01of01.zip"
        );
    }

    #[test]
    fn attribute_value_must_match_exactly() {
        let xml = br#"<doc><str name="checksum">abc</str><str name="file_name">f.zip</str></doc>"#;
        let err = find_download_link(xml, &FIRDS_LINK).unwrap_err();
        assert!(matches!(err, EtlError::LinkNotFound { ref tag } if tag == "str"));
    }

    #[test]
    fn no_link_is_an_error() {
        let xml = b"<doc><a>http://not-a-link</a></doc>";
        let err = find_download_link(xml, &PLAIN).unwrap_err();
        assert!(matches!(err, EtlError::LinkNotFound { .. }));
        assert_eq!(err.stage(), "link extraction");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = b"<doc><download>http://x/y.zip</doc></download>";
        let err = find_download_link(xml, &PLAIN).unwrap_err();
        assert!(matches!(err, EtlError::Xml { .. }));
    }

    #[test]
    fn truncated_index_is_an_error() {
        // cut before the link element closes; not a link-not-found case
        let xml = b"<response><download>http://x/y.zip";
        let err = find_download_link(xml, &PLAIN).unwrap_err();
        assert!(matches!(err, EtlError::Xml { doc: "register index", .. }));
    }

    #[test]
    fn truncated_index_without_a_link_is_an_xml_error() {
        let xml = br#"<response><lst name="responseHeader">"#;
        let err = find_download_link(xml, &FIRDS_LINK).unwrap_err();
        assert!(matches!(err, EtlError::Xml { .. }));
    }

    #[test]
    fn link_text_stops_at_first_child() {
        let xml = b"<doc><download>http://x/y.zip<note>mirror</note></download></doc>";
        assert_eq!(find_download_link(xml, &PLAIN).unwrap(), "http://x/y.zip");
    }
}
