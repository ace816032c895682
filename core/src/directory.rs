//! Identifier directory: resolves scanned tags and barcodes to members.
//!
//! Loaded once from a CSV export with the columns
//! `tag, barcode, name, login message, logout message` (header row first,
//! both message columns optional). Tags and barcodes live in separate
//! namespaces; a student number can legitimately look like a tag UID.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::DirectoryError;
use crate::model::member::{Member, TagType};

#[derive(Debug, Default, Clone)]
pub struct MemberDirectory {
    by_tag: HashMap<String, Member>,
    by_barcode: HashMap<String, Member>,
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let file = File::open(path).map_err(|err| DirectoryError::Read {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        let directory = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            tags = directory.by_tag.len(),
            barcodes = directory.by_barcode.len(),
            "member directory loaded"
        );
        Ok(directory)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DirectoryError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut directory = Self::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let line = index + 2;
            let field = |i: usize| record.get(i).unwrap_or("").to_string();

            let name = field(2);
            if name.is_empty() {
                warn!(line, "directory row without a member name skipped");
                continue;
            }

            let member = Member {
                tag: field(0),
                barcode: field(1),
                name,
                login_message: Some(field(3)).filter(|m| !m.is_empty()),
                logout_message: Some(field(4)).filter(|m| !m.is_empty()),
            };
            debug!(
                line,
                tag = %member.tag,
                barcode = %member.barcode,
                name = %member.name,
                "directory row"
            );
            directory.insert(member);
        }
        Ok(directory)
    }

    /// Indexes `member` under its non-blank identifiers. A repeated identifier
    /// replaces the earlier entry.
    pub fn insert(&mut self, member: Member) {
        if !member.tag.is_empty() {
            if let Some(previous) = self.by_tag.insert(member.tag.clone(), member.clone()) {
                warn!(
                    tag = %member.tag,
                    previous = %previous.name,
                    now = %member.name,
                    "duplicate tag in directory"
                );
            }
        }
        if !member.barcode.is_empty() {
            let previous = self.by_barcode.insert(member.barcode.clone(), member.clone());
            if let Some(previous) = previous {
                warn!(
                    barcode = %member.barcode,
                    previous = %previous.name,
                    now = %member.name,
                    "duplicate barcode in directory"
                );
            }
        }
    }

    pub fn lookup(&self, identifier: &str, source: TagType) -> Option<&Member> {
        let table = match source {
            TagType::Rfid => &self.by_tag,
            TagType::Barcode => &self.by_barcode,
        };
        table.get(identifier.trim())
    }

    /// Finds a member by the exact name the directory lists them under.
    pub fn find_by_name(&self, name: &str) -> Option<&Member> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.by_tag
            .values()
            .chain(self.by_barcode.values())
            .find(|member| member.name == name)
    }

    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    pub fn barcode_count(&self) -> usize {
        self.by_barcode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty() && self.by_barcode.is_empty()
    }
}
