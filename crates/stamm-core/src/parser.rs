//! # Interchange Record Parser
//!
//! Turns genealogy interchange text (`LEVEL [XREF] TAG [VALUE]` per line)
//! into individual and union records.
//!
//! The parser is total: lines that do not match the grammar are dropped,
//! unknown tags are ignored at every depth, and missing optional fields stay
//! unset. The only failure is an unreadable file in [`parse_file`].
//!
//! ## Scan Structure
//!
//! A single forward cursor walks the tokenised lines. A level-0 `INDI` or
//! `FAM` line opens a record whose body is every following line with
//! level > 0. The first level-0 line after the body ends the record and is
//! re-examined by the outer scan.

use crate::ordered::OrderedMap;
use crate::primitives::{INDIVIDUAL_EVENT_TAGS, INDIVIDUAL_TAG, UNION_EVENT_TAGS, UNION_TAG};
use crate::types::{ChildRelation, Sex, StammError};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

// Literal patterns, forced by `patterns_compile` below.
#[allow(clippy::expect_used)]
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(?:(@[^@]+@)\s+)?(\S+)(?:\s(.*))?$").expect("valid line regex")
});

#[allow(clippy::expect_used)]
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*/([^/]*)/(.*)$").expect("valid name regex"));

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// =============================================================================
// RECORD TYPES
// =============================================================================

/// One tokenised line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub level: usize,
    pub xref: Option<String>,
    /// Upper-cased tag.
    pub tag: String,
    /// Everything after the single separator following the tag.
    pub value: String,
}

/// An event block as written in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub tag: String,
    pub date: Option<String>,
    pub place: Option<String>,
    pub description: Option<String>,
}

impl RawEvent {
    fn new(tag: &str, value: &str) -> Self {
        Self {
            tag: tag.to_string(),
            description: non_empty(value),
            ..Self::default()
        }
    }
}

/// A union this individual is a child of, with its pedigree if stated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentUnion {
    pub union_key: String,
    pub pedigree: Option<ChildRelation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndividualRecord {
    pub key: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub maiden_name: Option<String>,
    pub sex: Sex,
    pub notes: Option<String>,
    pub events: Vec<RawEvent>,
    /// Unions in which this individual is a spouse (`FAMS`).
    pub spouse_of: Vec<String>,
    /// Unions in which this individual is a child (`FAMC`).
    pub child_of: Vec<ParentUnion>,
}

impl IndividualRecord {
    /// Pedigree declared for membership in `union_key`, if any.
    pub fn pedigree_in(&self, union_key: &str) -> Option<ChildRelation> {
        self.child_of
            .iter()
            .find(|parent| parent.union_key == union_key)
            .and_then(|parent| parent.pedigree)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionRecord {
    pub key: String,
    pub husband: Option<String>,
    pub wife: Option<String>,
    pub children: Vec<String>,
    pub events: Vec<RawEvent>,
}

/// Parser output: both collections in source order.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub individuals: OrderedMap<String, IndividualRecord>,
    pub unions: OrderedMap<String, UnionRecord>,
}

impl ParsedFile {
    /// Event blocks across both collections, before union fan-out.
    pub fn event_count(&self) -> usize {
        self.individuals
            .values()
            .map(|record| record.events.len())
            .chain(self.unions.values().map(|record| record.events.len()))
            .sum()
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Read and parse a file. Fails only when the file cannot be read.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedFile, StammError> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).map_err(|e| StammError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(parse_bytes(&bytes))
}

/// Parse raw bytes: strips a UTF-8 byte-order mark and decodes lossily.
pub fn parse_bytes(bytes: &[u8]) -> ParsedFile {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    parse_str(&String::from_utf8_lossy(bytes))
}

pub fn parse_str(text: &str) -> ParsedFile {
    let lines: Vec<RecordLine> = text.lines().filter_map(parse_line).collect();
    let parsed = parse_lines(&lines);
    debug!(
        lines = lines.len(),
        individuals = parsed.individuals.len(),
        unions = parsed.unions.len(),
        events = parsed.event_count(),
        "parsed interchange text"
    );
    parsed
}

/// Tokenise one line. Returns `None` for lines outside the grammar.
pub fn parse_line(line: &str) -> Option<RecordLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    let line = line.strip_prefix('\u{feff}').unwrap_or(line).trim_start();
    let caps = LINE_RE.captures(line)?;
    let level = caps.get(1)?.as_str().parse().ok()?;
    Some(RecordLine {
        level,
        xref: caps.get(2).map(|m| m.as_str().to_string()),
        tag: caps.get(3)?.as_str().to_ascii_uppercase(),
        value: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}

/// Build records from already tokenised lines.
pub fn parse_lines(lines: &[RecordLine]) -> ParsedFile {
    let mut parsed = ParsedFile::default();
    let mut cursor = 0;

    while let Some(line) = lines.get(cursor) {
        let is_record = line.level == 0 && (line.tag == INDIVIDUAL_TAG || line.tag == UNION_TAG);
        if !is_record {
            cursor += 1;
            continue;
        }

        let body = record_body(lines, cursor);
        cursor += 1 + body.len();

        let Some(key) = line.xref.clone() else {
            debug!(tag = %line.tag, "dropping record without cross-reference key");
            continue;
        };
        if line.tag == INDIVIDUAL_TAG {
            parsed
                .individuals
                .insert(key.clone(), scan_individual(key, body));
        } else {
            parsed.unions.insert(key.clone(), scan_union(key, body));
        }
    }

    parsed
}

/// Lines after `start` up to (not including) the next level-0 line.
fn record_body(lines: &[RecordLine], start: usize) -> &[RecordLine] {
    let rest = lines.get(start + 1..).unwrap_or_default();
    let len = rest
        .iter()
        .position(|line| line.level == 0)
        .unwrap_or(rest.len());
    rest.get(..len).unwrap_or_default()
}

// =============================================================================
// INDIVIDUAL RECORDS
// =============================================================================

/// The depth-1 block that depth-2 lines attach to.
enum IndividualBlock {
    None,
    PrimaryName,
    AliasName,
    Note,
    Event(RawEvent),
    ParentUnion(usize),
}

fn scan_individual(key: String, body: &[RecordLine]) -> IndividualRecord {
    let mut record = IndividualRecord {
        key,
        ..IndividualRecord::default()
    };
    let mut seen_name = false;
    let mut block = IndividualBlock::None;

    for line in body {
        match line.level {
            1 => {
                if let IndividualBlock::Event(event) =
                    std::mem::replace(&mut block, IndividualBlock::None)
                {
                    record.events.push(event);
                }
                block = open_individual_block(&mut record, line, &mut seen_name);
            }
            2 => match &mut block {
                IndividualBlock::PrimaryName => apply_name_part(&mut record, line),
                IndividualBlock::Note => {
                    append_continuation(&mut record.notes, &line.tag, &line.value);
                }
                IndividualBlock::Event(event) => apply_event_detail(event, line),
                IndividualBlock::ParentUnion(slot) if line.tag == "PEDI" => {
                    if let Some(parent) = record.child_of.get_mut(*slot) {
                        parent.pedigree = Some(ChildRelation::from_pedigree(&line.value));
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    if let IndividualBlock::Event(event) = block {
        record.events.push(event);
    }
    record
}

fn open_individual_block(
    record: &mut IndividualRecord,
    line: &RecordLine,
    seen_name: &mut bool,
) -> IndividualBlock {
    match line.tag.as_str() {
        "NAME" if !*seen_name => {
            *seen_name = true;
            apply_compound_name(record, &line.value);
            IndividualBlock::PrimaryName
        }
        "NAME" => IndividualBlock::AliasName,
        "SEX" => {
            record.sex = Sex::from_code(&line.value);
            IndividualBlock::None
        }
        "FAMS" => {
            if let Some(key) = non_empty(&line.value) {
                record.spouse_of.push(key);
            }
            IndividualBlock::None
        }
        "FAMC" => match non_empty(&line.value) {
            Some(union_key) => {
                record.child_of.push(ParentUnion {
                    union_key,
                    pedigree: None,
                });
                IndividualBlock::ParentUnion(record.child_of.len() - 1)
            }
            None => IndividualBlock::None,
        },
        "NOTE" => {
            let value = line.value.trim();
            // Pointers to level-0 note records are not followed.
            if !(value.starts_with('@') && value.ends_with('@')) {
                append_paragraph(&mut record.notes, &line.value);
            }
            IndividualBlock::Note
        }
        tag if INDIVIDUAL_EVENT_TAGS.contains(&tag) => {
            IndividualBlock::Event(RawEvent::new(tag, &line.value))
        }
        _ => IndividualBlock::None,
    }
}

/// Split `Given /Surname/ suffix`. The surname also seeds the maiden name.
fn apply_compound_name(record: &mut IndividualRecord, value: &str) {
    match NAME_RE.captures(value) {
        Some(caps) => {
            if let Some(given) = caps.get(1).and_then(|m| non_empty(m.as_str())) {
                record.given_name = Some(given);
            }
            if let Some(surname) = caps.get(2).and_then(|m| non_empty(m.as_str())) {
                record.maiden_name = Some(surname.clone());
                record.surname = Some(surname);
            }
        }
        None => {
            if let Some(given) = non_empty(value) {
                record.given_name = Some(given);
            }
        }
    }
}

fn apply_name_part(record: &mut IndividualRecord, line: &RecordLine) {
    let Some(value) = non_empty(&line.value) else {
        return;
    };
    match line.tag.as_str() {
        "GIVN" => record.given_name = Some(value),
        "SURN" => record.surname = Some(value),
        _ => {}
    }
}

// =============================================================================
// UNION RECORDS
// =============================================================================

fn scan_union(key: String, body: &[RecordLine]) -> UnionRecord {
    let mut record = UnionRecord {
        key,
        ..UnionRecord::default()
    };
    let mut open_event: Option<RawEvent> = None;

    for line in body {
        match line.level {
            1 => {
                if let Some(event) = open_event.take() {
                    record.events.push(event);
                }
                match line.tag.as_str() {
                    "HUSB" => record.husband = non_empty(&line.value),
                    "WIFE" => record.wife = non_empty(&line.value),
                    "CHIL" => {
                        if let Some(child) = non_empty(&line.value) {
                            record.children.push(child);
                        }
                    }
                    tag if UNION_EVENT_TAGS.contains(&tag) => {
                        open_event = Some(RawEvent::new(tag, &line.value));
                    }
                    _ => {}
                }
            }
            2 => {
                if let Some(event) = open_event.as_mut() {
                    apply_event_detail(event, line);
                }
            }
            _ => {}
        }
    }

    if let Some(event) = open_event {
        record.events.push(event);
    }
    record
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

fn apply_event_detail(event: &mut RawEvent, line: &RecordLine) {
    match line.tag.as_str() {
        "DATE" => event.date = non_empty(&line.value),
        "PLAC" => event.place = non_empty(&line.value),
        "TYPE" if event.description.is_none() => event.description = non_empty(&line.value),
        "CONT" | "CONC" => append_continuation(&mut event.description, &line.tag, &line.value),
        _ => {}
    }
}

/// `CONT` starts a new line, `CONC` joins directly.
fn append_continuation(target: &mut Option<String>, tag: &str, value: &str) {
    let separator = match tag {
        "CONT" => "\n",
        "CONC" => "",
        _ => return,
    };
    match target {
        Some(text) => {
            text.push_str(separator);
            text.push_str(value);
        }
        None => *target = Some(value.to_string()),
    }
}

fn append_paragraph(target: &mut Option<String>, value: &str) {
    match target {
        Some(text) => {
            text.push_str("\n\n");
            text.push_str(value);
        }
        None => *target = Some(value.to_string()),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// =============================================================================
// TESTS
// =============================================================================
