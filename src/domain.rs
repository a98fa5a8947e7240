use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// Placeholder for absent location fields. Offsets carry this string instead
/// of a number, so spreadsheet consumers must treat those columns as
/// mixed-type.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder for an absent gene summary.
pub const NOT_AVAILABLE: &str = "Not available";

/// Two-letter type prefix carried by every FlyBase id (gn = gene,
/// tr = transcript, pp = protein, al = allele, st = stock, ...).
pub const GENE_KIND: &str = "gn";
pub const ALLELE_KIND: &str = "al";
pub const STOCK_KIND: &str = "st";

fn id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[Ff][Bb][A-Za-z]{2}\d+$").unwrap())
}

/// Checks the canonical FlyBase id shape (`FB` + two letters + digits)
/// without caring about the record kind.
pub fn is_canonical_shape(value: &str) -> bool {
    id_pattern().is_match(value)
}

/// A FlyBase identifier of any record kind, normalized to the canonical
/// `FB` + lowercase kind + digits spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlybaseId(String);

impl FlybaseId {
    /// Accepts any string in the canonical id shape, case-insensitive on
    /// the prefix. Returns `None` for free text.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if !is_canonical_shape(trimmed) {
            return None;
        }
        let normalized = format!("FB{}{}", trimmed[2..4].to_lowercase(), &trimmed[4..]);
        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two-letter record-kind code, always lowercase.
    pub fn kind(&self) -> &str {
        &self.0[2..4]
    }
}

impl fmt::Display for FlybaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated gene identifier (FBgn). This is the only kind the fetchers
/// accept; it is immutable once produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneId(String);

impl GeneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<FlybaseId> for GeneId {
    type Error = FetchError;

    fn try_from(id: FlybaseId) -> Result<Self, Self::Error> {
        if id.kind() != GENE_KIND {
            return Err(FetchError::UnsupportedIdentifierKind(id.to_string()));
        }
        Ok(Self(id.0))
    }
}

impl FromStr for GeneId {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let id = FlybaseId::parse(value)
            .ok_or_else(|| FetchError::InvalidIdentifier(value.to_string()))?;
        id.try_into()
    }
}

/// Target organisms DIOPT understands, mapped to NCBI taxonomy ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Organism {
    Human,
    Mouse,
    Rat,
    Zebrafish,
    Yeast,
    Celegans,
    Arabidopsis,
}

impl Organism {
    pub fn taxon_id(&self) -> &'static str {
        match self {
            Organism::Human => "9606",
            Organism::Mouse => "10090",
            Organism::Rat => "10116",
            Organism::Zebrafish => "7955",
            Organism::Yeast => "559292",
            Organism::Celegans => "6239",
            Organism::Arabidopsis => "3702",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Organism::Human => "human",
            Organism::Mouse => "mouse",
            Organism::Rat => "rat",
            Organism::Zebrafish => "zebrafish",
            Organism::Yeast => "yeast",
            Organism::Celegans => "c. elegans",
            Organism::Arabidopsis => "arabidopsis",
        }
    }

    /// Label with spaces flattened, for use in output file names.
    pub fn file_label(&self) -> String {
        self.label().replace(' ', "_")
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Organism {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "human" => Ok(Organism::Human),
            "mouse" => Ok(Organism::Mouse),
            "rat" => Ok(Organism::Rat),
            "zebrafish" => Ok(Organism::Zebrafish),
            "yeast" => Ok(Organism::Yeast),
            "c. elegans" | "c.elegans" | "celegans" => Ok(Organism::Celegans),
            "arabidopsis" => Ok(Organism::Arabidopsis),
            _ => Err(FetchError::UnsupportedOrganism(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SpeciesInfo {
    pub genus: String,
    pub species: String,
    pub abbreviation: String,
}

/// Genomic location parsed from ChadoXML. Fields stay as strings because
/// the upstream payload may omit any of them.
#[derive(Debug, Clone, Serialize)]
pub struct GeneLocation {
    pub arm: String,
    pub start: String,
    pub end: String,
    pub strand: String,
}

impl Default for GeneLocation {
    fn default() -> Self {
        Self {
            arm: UNKNOWN.to_string(),
            start: UNKNOWN.to_string(),
            end: UNKNOWN.to_string(),
            strand: UNKNOWN.to_string(),
        }
    }
}

/// One FASTA-style record taken verbatim from the sequence endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sequence: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GeneSequences {
    pub gene: Vec<SequenceRecord>,
    pub transcripts: Vec<SequenceRecord>,
    pub proteins: Vec<SequenceRecord>,
}

/// Allele/stock ids harvested from the hitlist payload, plus the raw result
/// kept for the preview sheet.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedRecords {
    pub alleles: Vec<String>,
    pub stocks: Vec<String>,
    pub allele_count: Option<String>,
    pub stock_count: Option<String>,
    pub raw: Value,
}

impl Default for RelatedRecords {
    fn default() -> Self {
        Self {
            alleles: Vec::new(),
            stocks: Vec::new(),
            allele_count: None,
            stock_count: None,
            raw: Value::Array(Vec::new()),
        }
    }
}

/// Aggregate of every facet fetched for one gene. Each field defaults to an
/// explicit placeholder, so the record is always complete even when every
/// upstream call came back empty.
#[derive(Debug, Clone, Serialize)]
pub struct GeneRecord {
    pub id: GeneId,
    pub species: SpeciesInfo,
    pub summary: Option<String>,
    pub location: GeneLocation,
    pub sequences: GeneSequences,
    pub related: RelatedRecords,
}

impl GeneRecord {
    pub fn empty(id: GeneId) -> Self {
        Self {
            id,
            species: SpeciesInfo::default(),
            summary: None,
            location: GeneLocation::default(),
            sequences: GeneSequences::default(),
            related: RelatedRecords::default(),
        }
    }
}

/// An ortholog table as returned by DIOPT. The column set is not fixed; it
/// is whatever the promoted header row contained.
#[derive(Debug, Clone, Serialize)]
pub struct OrthologTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OrthologTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
