//! Minimal genomic-coordinate extraction from FlyBase ChadoXML.
//!
//! The payload nests `featureloc` elements at arbitrary depth; the first one
//! exposing both `fmin` and `fmax` wins ("good enough" first-match policy).
//! Fields from a `featureloc` missing either offset are discarded wholesale,
//! so coordinates are never stitched together across elements. The reference
//! arm comes from the winning element's `srcfeature` subtree, preferring the
//! stable `uniquename` over the display `name`.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

use crate::domain::GeneLocation;

/// Fields gathered from one `featureloc` element, held back until the
/// closing tag proves both offsets were present.
#[derive(Default)]
struct LocCandidate {
    start: Option<String>,
    end: Option<String>,
    strand: Option<String>,
    arm: Option<String>,
    arm_from_uniquename: bool,
}

impl LocCandidate {
    fn commit(self) -> Option<GeneLocation> {
        let (start, end) = (self.start?, self.end?);
        let mut location = GeneLocation { start, end, ..GeneLocation::default() };
        if let Some(strand) = self.strand {
            location.strand = strand;
        }
        if let Some(arm) = self.arm {
            location.arm = arm;
        }
        Some(location)
    }
}

pub fn parse_location(xml: &str) -> GeneLocation {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut featureloc_depth = 0usize;
    let mut srcfeature_depth = 0usize;
    let mut candidate = LocCandidate::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "featureloc" {
                    featureloc_depth += 1;
                    if featureloc_depth == 1 {
                        candidate = LocCandidate::default();
                    }
                } else if featureloc_depth > 0 && name == "srcfeature" {
                    srcfeature_depth += 1;
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                if name == "featureloc" {
                    featureloc_depth = featureloc_depth.saturating_sub(1);
                    if featureloc_depth == 0 {
                        if let Some(location) = std::mem::take(&mut candidate).commit() {
                            return location;
                        }
                    }
                } else if name == "srcfeature" {
                    srcfeature_depth = srcfeature_depth.saturating_sub(1);
                }
            }
            Ok(Event::Text(t)) => {
                if featureloc_depth == 0 {
                    continue;
                }
                let Ok(text) = t.unescape() else { continue };
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let Some(tag) = stack.last() else { continue };
                let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());

                if srcfeature_depth > 0 {
                    match tag.as_str() {
                        "uniquename" => {
                            candidate.arm = Some(text.to_string());
                            candidate.arm_from_uniquename = true;
                        }
                        "name" if !candidate.arm_from_uniquename => {
                            candidate.arm = Some(text.to_string());
                        }
                        _ => {}
                    }
                } else if parent == Some("featureloc") {
                    match tag.as_str() {
                        "fmin" => candidate.start = Some(text.to_string()),
                        "fmax" => candidate.end = Some(text.to_string()),
                        "strand" => candidate.strand = Some(text.to_string()),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                warn!(%err, "stopping chadoxml scan on malformed payload");
                break;
            }
            Ok(_) => {}
        }
    }

    GeneLocation::default()
}
