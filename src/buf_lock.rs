//! # buf.lock
//!
//! The lock file pins every resolved dependency to a commit and a content
//! digest. V1Beta1 and V1 only lock modules; V2 also locks remote check
//! plugins and policies, and a locked policy carries the plugins it uses.
//!
//! Entries are kept in file order on read and sorted by name on write.

use crate::encoding;
use crate::error::{Error, Result};
use crate::file_version::{FileType, FileVersion};
use crate::module_name::ModuleFullName;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of lowercase hex characters in a SHAKE256 digest value.
const DIGEST_HEX_LEN: usize = 128;

/// Number of lowercase hex characters in a V2 commit id.
const COMMIT_HEX_LEN: usize = 32;

/// The kind of content a digest was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DigestType {
    /// Module digest written as `shake256:` by V1 lock files.
    B1,
    B4,
    B5,
    /// Plugin digest.
    P1,
    /// Policy digest.
    O1,
}

impl DigestType {
    pub fn prefix(&self) -> &'static str {
        match self {
            DigestType::B1 => "shake256",
            DigestType::B4 => "b4",
            DigestType::B5 => "b5",
            DigestType::P1 => "p1",
            DigestType::O1 => "o1",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "shake256" => Some(DigestType::B1),
            "b4" => Some(DigestType::B4),
            "b5" => Some(DigestType::B5),
            "p1" => Some(DigestType::P1),
            "o1" => Some(DigestType::O1),
            _ => None,
        }
    }
}

/// A typed content digest, `<type>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    digest_type: DigestType,
    hex: String,
}

impl Digest {
    pub fn new(digest_type: DigestType, hex: &str) -> Result<Self> {
        if hex.len() != DIGEST_HEX_LEN || !is_lower_hex(hex) {
            return Err(Error::invalid_config(format!(
                "digest value for {} must be {} lowercase hex characters",
                digest_type.prefix(),
                DIGEST_HEX_LEN
            )));
        }
        Ok(Self {
            digest_type,
            hex: hex.to_string(),
        })
    }

    pub fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, hex) = s
            .split_once(':')
            .ok_or_else(|| Error::invalid_config(format!("malformed digest {:?}", s)))?;
        let digest_type = DigestType::from_prefix(prefix).ok_or_else(|| Error::InvalidConfig {
            message: format!("unknown digest type {:?}", prefix),
            hint: Some("digest types are b4, b5, p1, o1 or shake256".to_string()),
        })?;
        Digest::new(digest_type, hex)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.digest_type.prefix(), self.hex)
    }
}

/// What a lock entry pins. Decides which digest types are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Module,
    Plugin,
    Policy,
}

impl EntryKind {
    fn allows(&self, file_version: FileVersion, digest_type: DigestType) -> bool {
        match self {
            EntryKind::Module if file_version < FileVersion::V2 => digest_type == DigestType::B1,
            EntryKind::Module => matches!(digest_type, DigestType::B4 | DigestType::B5),
            EntryKind::Plugin => digest_type == DigestType::P1,
            EntryKind::Policy => digest_type == DigestType::O1,
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            EntryKind::Module => "dependency",
            EntryKind::Plugin => "plugin",
            EntryKind::Policy => "policy",
        }
    }
}

/// One pinned module or plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedEntry {
    full_name: ModuleFullName,
    commit: String,
    digest: Option<Digest>,
}

impl LockedEntry {
    pub fn new(full_name: ModuleFullName, commit: impl Into<String>, digest: Option<Digest>) -> Self {
        Self {
            full_name,
            commit: commit.into(),
            digest,
        }
    }

    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }
}

/// A pinned policy and the plugins it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedPolicy {
    entry: LockedEntry,
    plugins: Vec<LockedEntry>,
}

impl LockedPolicy {
    pub fn new(entry: LockedEntry, plugins: Vec<LockedEntry>) -> Self {
        Self { entry, plugins }
    }

    pub fn entry(&self) -> &LockedEntry {
        &self.entry
    }

    pub fn plugins(&self) -> &[LockedEntry] {
        &self.plugins
    }
}

/// A parsed `buf.lock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufLockFile {
    file_version: FileVersion,
    deps: Vec<LockedEntry>,
    plugins: Vec<LockedEntry>,
    policies: Vec<LockedPolicy>,
}

impl BufLockFile {
    /// Build and validate a lock file.
    ///
    /// Commits and digests are checked against the version and the kind of
    /// entry, and no name may be locked twice in the same list.
    pub fn new(
        file_version: FileVersion,
        deps: Vec<LockedEntry>,
        plugins: Vec<LockedEntry>,
        policies: Vec<LockedPolicy>,
    ) -> Result<Self> {
        FileType::BufLock.check_supported(file_version)?;
        if file_version < FileVersion::V2 && (!plugins.is_empty() || !policies.is_empty()) {
            return Err(Error::internal(format!(
                "plugins or policies were locked in a {} buf.lock",
                file_version
            )));
        }
        validate_entries(file_version, EntryKind::Module, &deps)?;
        validate_entries(file_version, EntryKind::Plugin, &plugins)?;
        let policy_entries: Vec<LockedEntry> = policies.iter().map(|p| p.entry.clone()).collect();
        validate_entries(file_version, EntryKind::Policy, &policy_entries)?;
        for policy in &policies {
            validate_entries(file_version, EntryKind::Plugin, &policy.plugins)?;
        }
        Ok(Self {
            file_version,
            deps,
            plugins,
            policies,
        })
    }

    /// Parse a `buf.lock` of any version.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_named(FileType::BufLock.canonical_file_name(), data)
    }

    pub fn parse_named(file_name: &str, data: &[u8]) -> Result<Self> {
        let raw_version = encoding::read_version(file_name, data, true)?;
        let file_version = FileType::BufLock.resolve_version(raw_version.as_deref())?;
        FileType::BufLock.check_file_name(file_name, file_version)?;
        debug!("reading {} as version {}", file_name, file_version);
        match file_version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let external: ExternalBufLockFileV1 =
                    encoding::decode(file_name, Some(file_version), data, true)?;
                let deps = external
                    .deps
                    .into_iter()
                    .map(|dep| dep.into_entry(file_version))
                    .collect::<Result<Vec<_>>>()?;
                Self::new(file_version, deps, Vec::new(), Vec::new())
            }
            FileVersion::V2 => {
                let external: ExternalBufLockFileV2 =
                    encoding::decode(file_name, Some(file_version), data, true)?;
                let deps = entries_from_v2(external.deps)?;
                let plugins = entries_from_v2(external.plugins)?;
                let policies = external
                    .policies
                    .into_iter()
                    .map(|policy| {
                        Ok(LockedPolicy::new(
                            entry_from_v2(policy.name, policy.commit, policy.digest)?,
                            entries_from_v2(policy.plugins)?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::new(file_version, deps, plugins, policies)
            }
        }
    }

    /// The canonical YAML form, with every list sorted by name.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self.file_version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let external = ExternalBufLockFileV1 {
                    version: self.file_version.to_string(),
                    deps: sorted(&self.deps)
                        .into_iter()
                        .map(|entry| ExternalLockedDepV1::from_entry(entry, self.file_version))
                        .collect(),
                };
                encoding::encode_yaml(&external)
            }
            FileVersion::V2 => {
                let mut policies: Vec<&LockedPolicy> = self.policies.iter().collect();
                policies.sort_by(|a, b| a.entry.full_name.cmp(&b.entry.full_name));
                let external = ExternalBufLockFileV2 {
                    version: self.file_version.to_string(),
                    deps: entries_to_v2(&self.deps),
                    plugins: entries_to_v2(&self.plugins),
                    policies: policies
                        .into_iter()
                        .map(|policy| ExternalLockedPolicyV2 {
                            name: policy.entry.full_name.to_string(),
                            commit: policy.entry.commit.clone(),
                            digest: digest_string(&policy.entry),
                            plugins: entries_to_v2(&policy.plugins),
                        })
                        .collect(),
                };
                encoding::encode_yaml(&external)
            }
        }
    }

    pub fn header(&self) -> Option<&'static str> {
        Some("# Generated by buf. DO NOT EDIT.\n")
    }

    pub fn file_type(&self) -> FileType {
        FileType::BufLock
    }

    pub fn file_version(&self) -> FileVersion {
        self.file_version
    }

    /// Locked modules, in file order.
    pub fn deps(&self) -> &[LockedEntry] {
        &self.deps
    }

    /// Locked remote check plugins, in file order (V2 only).
    pub fn plugins(&self) -> &[LockedEntry] {
        &self.plugins
    }

    /// Locked policies, in file order (V2 only).
    pub fn policies(&self) -> &[LockedPolicy] {
        &self.policies
    }
}

fn validate_entries(file_version: FileVersion, kind: EntryKind, entries: &[LockedEntry]) -> Result<()> {
    for (i, entry) in entries.iter().enumerate() {
        if entries[..i].iter().any(|other| other.full_name == entry.full_name) {
            return Err(Error::invalid_config(format!(
                "{} {} is locked more than once",
                kind.noun(),
                entry.full_name
            )));
        }
        if entry.commit.is_empty() {
            return Err(Error::invalid_config(format!(
                "{} {} has no commit",
                kind.noun(),
                entry.full_name
            )));
        }
        if file_version == FileVersion::V2
            && (entry.commit.len() != COMMIT_HEX_LEN || !is_lower_hex(&entry.commit))
        {
            return Err(Error::invalid_config(format!(
                "{} {} has commit {:?}, which is not {} lowercase hex characters",
                kind.noun(),
                entry.full_name,
                entry.commit,
                COMMIT_HEX_LEN
            )));
        }
        match &entry.digest {
            None if file_version == FileVersion::V2 => {
                return Err(Error::invalid_config(format!(
                    "{} {} has no digest",
                    kind.noun(),
                    entry.full_name
                )))
            }
            Some(_) if file_version == FileVersion::V1Beta1 => {
                return Err(Error::internal(format!(
                    "a digest was set on {} in a v1beta1 buf.lock",
                    entry.full_name
                )))
            }
            Some(digest) if !kind.allows(file_version, digest.digest_type) => {
                return Err(Error::invalid_config(format!(
                    "{} {} has a digest of type {}, which is not valid for a {} in a {} buf.lock",
                    kind.noun(),
                    entry.full_name,
                    digest.digest_type.prefix(),
                    kind.noun(),
                    file_version
                )))
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn sorted(entries: &[LockedEntry]) -> Vec<&LockedEntry> {
    let mut sorted: Vec<&LockedEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    sorted
}

fn digest_string(entry: &LockedEntry) -> String {
    entry.digest.as_ref().map(|d| d.to_string()).unwrap_or_default()
}

fn entry_from_v2(name: String, commit: String, digest: String) -> Result<LockedEntry> {
    let digest = if digest.is_empty() {
        None
    } else {
        Some(digest.parse()?)
    };
    Ok(LockedEntry::new(name.parse()?, commit, digest))
}

fn entries_from_v2(external: Vec<ExternalLockedEntryV2>) -> Result<Vec<LockedEntry>> {
    external
        .into_iter()
        .map(|e| entry_from_v2(e.name, e.commit, e.digest))
        .collect()
}

fn entries_to_v2(entries: &[LockedEntry]) -> Vec<ExternalLockedEntryV2> {
    sorted(entries)
        .into_iter()
        .map(|entry| ExternalLockedEntryV2 {
            name: entry.full_name.to_string(),
            commit: entry.commit.clone(),
            digest: digest_string(entry),
        })
        .collect()
}

/// Lock file shape shared by V1Beta1 and V1; V1Beta1 carries no digests.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufLockFileV1 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<ExternalLockedDepV1>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalLockedDepV1 {
    remote: String,
    owner: String,
    repository: String,
    commit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    digest: String,
}

impl ExternalLockedDepV1 {
    fn into_entry(self, file_version: FileVersion) -> Result<LockedEntry> {
        let full_name = ModuleFullName::new(&self.remote, &self.owner, &self.repository)?;
        if file_version == FileVersion::V1Beta1 && !self.digest.is_empty() {
            return Err(Error::Decode {
                file_name: FileType::BufLock.canonical_file_name().to_string(),
                file_version: Some(file_version),
                message: format!("digest is not a field of a v1beta1 dependency ({})", full_name),
            });
        }
        let digest = if self.digest.is_empty() {
            None
        } else {
            Some(self.digest.parse()?)
        };
        Ok(LockedEntry::new(full_name, self.commit, digest))
    }

    fn from_entry(entry: &LockedEntry, file_version: FileVersion) -> Self {
        Self {
            remote: entry.full_name.registry().to_string(),
            owner: entry.full_name.owner().to_string(),
            repository: entry.full_name.name().to_string(),
            commit: entry.commit.clone(),
            digest: if file_version == FileVersion::V1 {
                digest_string(entry)
            } else {
                String::new()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufLockFileV2 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<ExternalLockedEntryV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    plugins: Vec<ExternalLockedEntryV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    policies: Vec<ExternalLockedPolicyV2>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalLockedEntryV2 {
    name: String,
    commit: String,
    #[serde(default)]
    digest: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalLockedPolicyV2 {
    name: String,
    commit: String,
    #[serde(default)]
    digest: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    plugins: Vec<ExternalLockedEntryV2>,
}
