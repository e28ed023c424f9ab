use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::EtlError;

/// Output columns: csv header and the tag the value is read from.  The
/// header order is the csv column order, whatever order the tags show up
/// in inside a record.
pub const FIRDS_COLUMNS: [(&str, &str); 6] = [
    ("FinInstrmGnlAttrbts.Id", "Id"),
    ("FinInstrmGnlAttrbts.FullNm", "FullNm"),
    ("FinInstrmGnlAttrbts.ClssfctnTp", "ClssfctnTp"),
    ("FinInstrmGnlAttrbts.CmmdtyDerivInd", "CmmdtyDerivInd"),
    ("FinInstrmGnlAttrbts.NtnlCcy", "NtnlCcy"),
    ("Issr", "Issr"),
];

/// One record per instrument in DLTINS and FULINS files.  The interesting
/// tags sit at different depths under it (`Id` inside `FinInstrmGnlAttrbts`,
/// `Issr` directly under the record type wrapper), hence the descendant
/// search in [`extract_rows`].
pub const FIRDS_RECORD_TAG: &str = "FinInstrm";

/// Walk the payload once, in document order, and build one row per record
/// element.  Within a record the first descendant whose local name equals a
/// column's tag binds that column; the value is the element's leading text
/// (up to its first child element).  Columns never bound render as "", so
/// every row has exactly `columns.len()` fields.  A document that ends with
/// elements still open is malformed, even when whole records completed
/// before the cut; nothing partial is returned.
pub fn extract_rows(
    xml: &[u8],
    record_tag: &str,
    columns: &[(&str, &str)],
) -> Result<Vec<Vec<String>>, EtlError> {
    walk(xml, record_tag, columns).map_err(|e| EtlError::Xml {
        doc: "instrument file",
        source: e,
    })
}

fn walk(
    xml: &[u8],
    record_tag: &str,
    columns: &[(&str, &str)],
) -> Result<Vec<Vec<String>>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut record: Option<RecordState> = None;
    // open element count; the name opened at top scope is reported when the
    // document ends before everything closes
    let mut open = 0usize;
    let mut outermost: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if open == 0 {
                    outermost =
                        Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                open += 1;
                match record.as_mut() {
                    None => {
                        if e.local_name().as_ref() == record_tag.as_bytes() {
                            record = Some(RecordState::new(columns.len()));
                        }
                    }
                    Some(state) => {
                        state.depth += 1;
                        state.close_capture();
                        state.open_capture(&e, columns);
                    }
                }
            }
            Event::Empty(e) => match record.as_mut() {
                None => {
                    if e.local_name().as_ref() == record_tag.as_bytes() {
                        // a record with no children at all still yields a row
                        rows.push(RecordState::new(columns.len()).finish());
                    }
                }
                Some(state) => {
                    state.close_capture();
                    state.open_capture(&e, columns);
                    state.close_capture();
                }
            },
            Event::Text(t) => {
                if let Some(state) = record.as_mut() {
                    state.push_text(&t.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::CData(t) => {
                if let Some(state) = record.as_mut() {
                    state.push_text(&reader.decoder().decode(&t).map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(_) => {
                open -= 1;
                if let Some(mut state) = record.take() {
                    if state.depth == 0 {
                        rows.push(state.finish());
                    } else {
                        state.depth -= 1;
                        state.close_capture();
                        record = Some(state);
                    }
                }
            }
            Event::Eof => {
                // the reader does not flag unclosed elements at EOF itself
                if open > 0 {
                    let tag = outermost.unwrap_or_default();
                    return Err(IllFormedError::MissingEndTag(tag).into());
                }
                return Ok(rows);
            }
            _ => {}
        }
    }
}

/// Bookkeeping for the record element currently open.  `depth` counts open
/// descendant elements so the record's own end tag is recognized; `capture`
/// accumulates the leading text of the element bound most recently.
struct RecordState {
    depth: usize,
    values: Vec<Option<String>>,
    capture: Option<(usize, String)>,
}

impl RecordState {
    fn new(n: usize) -> RecordState {
        RecordState {
            depth: 0,
            values: vec![None; n],
            capture: None,
        }
    }

    /// Bind this element to the first still-unbound column with its tag.
    /// Already-bound columns stay bound, which is what makes the first
    /// descendant in document order win.
    fn open_capture(&mut self, e: &BytesStart, columns: &[(&str, &str)]) {
        let local = e.local_name();
        if let Some(i) = (0..columns.len())
            .find(|&i| self.values[i].is_none() && columns[i].1.as_bytes() == local.as_ref())
        {
            self.capture = Some((i, String::new()));
        }
    }

    /// Leading text ends at the first child element or at the end tag.
    fn close_capture(&mut self) {
        if let Some((i, text)) = self.capture.take() {
            self.values[i] = Some(text);
        }
    }

    fn push_text(&mut self, s: &str) {
        if let Some((_, acc)) = self.capture.as_mut() {
            acc.push_str(s);
        }
    }

    fn finish(self) -> Vec<String> {
        self.values
            .into_iter()
            .map(|v| v.unwrap_or_default())
            .collect()
    }
}

/// Header row then one row per record; zero records still produces the
/// header.  Standard quoting, comma delimiter, UTF-8.
pub fn to_csv(columns: &[(&str, &str)], rows: &[Vec<String>]) -> Result<Vec<u8>, EtlError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(columns.iter().map(|(header, _)| *header))?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| EtlError::Io(std::io::Error::other(e)))
}
