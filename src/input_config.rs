//! # Input Configuration
//!
//! An input names where the files to operate on come from. On the wire it is
//! a sparse record in which exactly one location field is set; that field
//! decides the [`InputConfigType`]. The remaining fields are options, and
//! each type accepts only the options in its row of the allow-list table.
//! A validated input holds an [`InputSource`], whose variant for each type
//! carries only that type's options.
//! `types`, `exclude_types`, `paths` and `exclude_paths` filter the result
//! and are accepted for every type.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// The discriminant of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputConfigType {
    Module,
    Directory,
    GitRepo,
    ProtoFile,
    Tarball,
    ZipArchive,
    BinaryImage,
    JsonImage,
    TextImage,
    YamlImage,
}

impl InputConfigType {
    /// All types, in the order their location keys are listed in errors.
    pub const ALL: [InputConfigType; 10] = [
        InputConfigType::Module,
        InputConfigType::Directory,
        InputConfigType::GitRepo,
        InputConfigType::ProtoFile,
        InputConfigType::Tarball,
        InputConfigType::ZipArchive,
        InputConfigType::BinaryImage,
        InputConfigType::JsonImage,
        InputConfigType::TextImage,
        InputConfigType::YamlImage,
    ];

    /// The wire key that holds this type's location.
    pub fn key(&self) -> &'static str {
        match self {
            InputConfigType::Module => "module",
            InputConfigType::Directory => "directory",
            InputConfigType::GitRepo => "git_repo",
            InputConfigType::ProtoFile => "proto_file",
            InputConfigType::Tarball => "tarball",
            InputConfigType::ZipArchive => "zip_archive",
            InputConfigType::BinaryImage => "binary_image",
            InputConfigType::JsonImage => "json_image",
            InputConfigType::TextImage => "text_image",
            InputConfigType::YamlImage => "yaml_image",
        }
    }
}

impl fmt::Display for InputConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A secondary option of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputOption {
    Compression,
    StripComponents,
    Subdir,
    Branch,
    Tag,
    Ref,
    Commit,
    Depth,
    RecurseSubmodules,
    IncludePackageFiles,
}

impl InputOption {
    pub fn key(&self) -> &'static str {
        match self {
            InputOption::Compression => "compression",
            InputOption::StripComponents => "strip_components",
            InputOption::Subdir => "subdir",
            InputOption::Branch => "branch",
            InputOption::Tag => "tag",
            InputOption::Ref => "ref",
            InputOption::Commit => "commit",
            InputOption::Depth => "depth",
            InputOption::RecurseSubmodules => "recurse_submodules",
            InputOption::IncludePackageFiles => "include_package_files",
        }
    }
}

static ALLOWED_OPTIONS: LazyLock<HashMap<InputConfigType, &'static [InputOption]>> =
    LazyLock::new(|| {
        use InputOption::*;
        HashMap::from([
            (InputConfigType::Module, &[][..]),
            (InputConfigType::Directory, &[][..]),
            (
                InputConfigType::GitRepo,
                &[Branch, Tag, Ref, Commit, Depth, RecurseSubmodules, Subdir][..],
            ),
            (InputConfigType::ProtoFile, &[IncludePackageFiles][..]),
            (InputConfigType::Tarball, &[Compression, StripComponents, Subdir][..]),
            (InputConfigType::ZipArchive, &[StripComponents, Subdir][..]),
            (InputConfigType::BinaryImage, &[Compression][..]),
            (InputConfigType::JsonImage, &[Compression][..]),
            (InputConfigType::TextImage, &[Compression][..]),
            (InputConfigType::YamlImage, &[Compression][..]),
        ])
    });

/// The options a type accepts.
pub fn allowed_options(input_type: InputConfigType) -> &'static [InputOption] {
    ALLOWED_OPTIONS.get(&input_type).copied().unwrap_or(&[])
}

/// Compression of an archive or image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "zstd" => Ok(Compression::Zstd),
            other => Err(Error::invalid_config(format!(
                "unknown compression {:?}, must be one of \"none\", \"gzip\" or \"zstd\"",
                other
            ))),
        }
    }
}

/// The wire shape of an input, shared by `buf.gen.yaml` V2.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalInputConfigV2 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_archive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_components: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurse_submodules: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_package_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,
}

impl ExternalInputConfigV2 {
    fn locations(&self) -> Vec<(InputConfigType, &String)> {
        let slots = [
            &self.module,
            &self.directory,
            &self.git_repo,
            &self.proto_file,
            &self.tarball,
            &self.zip_archive,
            &self.binary_image,
            &self.json_image,
            &self.text_image,
            &self.yaml_image,
        ];
        InputConfigType::ALL
            .iter()
            .zip(slots)
            .filter_map(|(input_type, slot)| slot.as_ref().map(|location| (*input_type, location)))
            .collect()
    }

    fn options_set(&self) -> Vec<InputOption> {
        let set = [
            (InputOption::Compression, self.compression.is_some()),
            (InputOption::StripComponents, self.strip_components.is_some()),
            (InputOption::Subdir, self.subdir.is_some()),
            (InputOption::Branch, self.branch.is_some()),
            (InputOption::Tag, self.tag.is_some()),
            (InputOption::Ref, self.git_ref.is_some()),
            (InputOption::Commit, self.commit.is_some()),
            (InputOption::Depth, self.depth.is_some()),
            (InputOption::RecurseSubmodules, self.recurse_submodules.is_some()),
            (InputOption::IncludePackageFiles, self.include_package_files.is_some()),
        ];
        set.into_iter()
            .filter_map(|(option, is_set)| is_set.then_some(option))
            .collect()
    }
}

/// A `git_repo` input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitRepoInput {
    pub url: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub git_ref: Option<String>,
    pub commit: Option<String>,
    pub depth: Option<u32>,
    pub recurse_submodules: bool,
    pub subdir: Option<String>,
}

/// A `proto_file` input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtoFileInput {
    pub path: String,
    pub include_package_files: bool,
}

/// A `tarball` input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TarballInput {
    pub path: String,
    pub compression: Option<Compression>,
    pub strip_components: Option<u32>,
    pub subdir: Option<String>,
}

/// A `zip_archive` input. Zip archives carry their own compression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipArchiveInput {
    pub path: String,
    pub strip_components: Option<u32>,
    pub subdir: Option<String>,
}

/// An image input of any encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInput {
    pub path: String,
    pub compression: Option<Compression>,
}

/// Where an input comes from. Each variant holds only the options its type
/// accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Module(String),
    Directory(String),
    GitRepo(GitRepoInput),
    ProtoFile(ProtoFileInput),
    Tarball(TarballInput),
    ZipArchive(ZipArchiveInput),
    BinaryImage(ImageInput),
    JsonImage(ImageInput),
    TextImage(ImageInput),
    YamlImage(ImageInput),
}

impl InputSource {
    pub fn input_type(&self) -> InputConfigType {
        match self {
            InputSource::Module(_) => InputConfigType::Module,
            InputSource::Directory(_) => InputConfigType::Directory,
            InputSource::GitRepo(_) => InputConfigType::GitRepo,
            InputSource::ProtoFile(_) => InputConfigType::ProtoFile,
            InputSource::Tarball(_) => InputConfigType::Tarball,
            InputSource::ZipArchive(_) => InputConfigType::ZipArchive,
            InputSource::BinaryImage(_) => InputConfigType::BinaryImage,
            InputSource::JsonImage(_) => InputConfigType::JsonImage,
            InputSource::TextImage(_) => InputConfigType::TextImage,
            InputSource::YamlImage(_) => InputConfigType::YamlImage,
        }
    }

    /// The value of the location key.
    pub fn location(&self) -> &str {
        match self {
            InputSource::Module(location) | InputSource::Directory(location) => location,
            InputSource::GitRepo(git) => &git.url,
            InputSource::ProtoFile(proto_file) => &proto_file.path,
            InputSource::Tarball(tarball) => &tarball.path,
            InputSource::ZipArchive(zip) => &zip.path,
            InputSource::BinaryImage(image)
            | InputSource::JsonImage(image)
            | InputSource::TextImage(image)
            | InputSource::YamlImage(image) => &image.path,
        }
    }

    /// Build the variant for `input_type` from a record whose options have
    /// already been checked against the type's allow-list.
    fn from_external(
        input_type: InputConfigType,
        location: String,
        external: &mut ExternalInputConfigV2,
    ) -> Result<Self> {
        let compression = external
            .compression
            .take()
            .as_deref()
            .map(Compression::parse)
            .transpose()?;
        let image = |path: String| ImageInput { path, compression };
        let source = match input_type {
            InputConfigType::Module => InputSource::Module(location),
            InputConfigType::Directory => InputSource::Directory(location),
            InputConfigType::GitRepo => {
                if external.commit.is_some() && external.tag.is_some() {
                    return Err(Error::invalid_config(
                        "commit and tag cannot both be set on a git_repo input",
                    ));
                }
                if external.depth == Some(0) {
                    return Err(Error::invalid_config("depth must be greater than zero"));
                }
                InputSource::GitRepo(GitRepoInput {
                    url: location,
                    branch: external.branch.take(),
                    tag: external.tag.take(),
                    git_ref: external.git_ref.take(),
                    commit: external.commit.take(),
                    depth: external.depth,
                    recurse_submodules: external.recurse_submodules.unwrap_or(false),
                    subdir: external.subdir.take(),
                })
            }
            InputConfigType::ProtoFile => InputSource::ProtoFile(ProtoFileInput {
                path: location,
                include_package_files: external.include_package_files.unwrap_or(false),
            }),
            InputConfigType::Tarball => InputSource::Tarball(TarballInput {
                path: location,
                compression,
                strip_components: external.strip_components,
                subdir: external.subdir.take(),
            }),
            InputConfigType::ZipArchive => InputSource::ZipArchive(ZipArchiveInput {
                path: location,
                strip_components: external.strip_components,
                subdir: external.subdir.take(),
            }),
            InputConfigType::BinaryImage => InputSource::BinaryImage(image(location)),
            InputConfigType::JsonImage => InputSource::JsonImage(image(location)),
            InputConfigType::TextImage => InputSource::TextImage(image(location)),
            InputConfigType::YamlImage => InputSource::YamlImage(image(location)),
        };
        Ok(source)
    }

    /// Fill in the location key and options of a wire record.
    fn to_external(&self, external: &mut ExternalInputConfigV2) {
        let compression_key = |compression: Option<Compression>| {
            compression.map(|c| c.as_str().to_string())
        };
        match self {
            InputSource::Module(name) => external.module = Some(name.clone()),
            InputSource::Directory(path) => external.directory = Some(path.clone()),
            InputSource::GitRepo(git) => {
                external.git_repo = Some(git.url.clone());
                external.branch = git.branch.clone();
                external.tag = git.tag.clone();
                external.git_ref = git.git_ref.clone();
                external.commit = git.commit.clone();
                external.depth = git.depth;
                external.recurse_submodules = git.recurse_submodules.then_some(true);
                external.subdir = git.subdir.clone();
            }
            InputSource::ProtoFile(proto_file) => {
                external.proto_file = Some(proto_file.path.clone());
                external.include_package_files = proto_file.include_package_files.then_some(true);
            }
            InputSource::Tarball(tarball) => {
                external.tarball = Some(tarball.path.clone());
                external.compression = compression_key(tarball.compression);
                external.strip_components = tarball.strip_components;
                external.subdir = tarball.subdir.clone();
            }
            InputSource::ZipArchive(zip) => {
                external.zip_archive = Some(zip.path.clone());
                external.strip_components = zip.strip_components;
                external.subdir = zip.subdir.clone();
            }
            InputSource::BinaryImage(image) => {
                external.binary_image = Some(image.path.clone());
                external.compression = compression_key(image.compression);
            }
            InputSource::JsonImage(image) => {
                external.json_image = Some(image.path.clone());
                external.compression = compression_key(image.compression);
            }
            InputSource::TextImage(image) => {
                external.text_image = Some(image.path.clone());
                external.compression = compression_key(image.compression);
            }
            InputSource::YamlImage(image) => {
                external.yaml_image = Some(image.path.clone());
                external.compression = compression_key(image.compression);
            }
        }
    }
}

/// A validated input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfig {
    source: InputSource,
    include_types: Vec<String>,
    exclude_types: Vec<String>,
    target_paths: Vec<String>,
    exclude_paths: Vec<String>,
}

impl InputConfig {
    /// Validate the sparse wire record of an input.
    pub fn from_external(mut external: ExternalInputConfigV2) -> Result<Self> {
        let locations = external.locations();
        let (input_type, location) = match locations.as_slice() {
            [(input_type, location)] => (*input_type, (*location).clone()),
            _ => {
                let keys: Vec<&str> = InputConfigType::ALL.iter().map(|t| t.key()).collect();
                return Err(Error::InvalidConfig {
                    message: format!(
                        "exactly one of {} must be set for an input, found {}",
                        keys.join(", "),
                        locations.len()
                    ),
                    hint: None,
                });
            }
        };
        if location.trim().is_empty() {
            return Err(Error::invalid_config(format!("{} must not be empty", input_type)));
        }
        let allowed = allowed_options(input_type);
        if let Some(option) = external
            .options_set()
            .into_iter()
            .find(|option| !allowed.contains(option))
        {
            return Err(Error::invalid_config(format!(
                "option {} is not allowed for an input of type {}",
                option.key(),
                input_type
            )));
        }
        let source = InputSource::from_external(input_type, location, &mut external)?;
        Ok(Self {
            source,
            include_types: external.types,
            exclude_types: external.exclude_types,
            target_paths: external.paths,
            exclude_paths: external.exclude_paths,
        })
    }

    /// The wire record for this input.
    pub fn to_external(&self) -> ExternalInputConfigV2 {
        let mut external = ExternalInputConfigV2 {
            types: self.include_types.clone(),
            exclude_types: self.exclude_types.clone(),
            paths: self.target_paths.clone(),
            exclude_paths: self.exclude_paths.clone(),
            ..Default::default()
        };
        self.source.to_external(&mut external);
        external
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    pub fn input_type(&self) -> InputConfigType {
        self.source.input_type()
    }

    pub fn location(&self) -> &str {
        self.source.location()
    }

    pub fn include_types(&self) -> &[String] {
        &self.include_types
    }

    pub fn exclude_types(&self) -> &[String] {
        &self.exclude_types
    }

    pub fn target_paths(&self) -> &[String] {
        &self.target_paths
    }

    pub fn exclude_paths(&self) -> &[String] {
        &self.exclude_paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<InputConfig> {
        let external: ExternalInputConfigV2 = serde_yaml::from_str(yaml).unwrap();
        InputConfig::from_external(external)
    }

    #[test]
    fn test_git_repo() {
        let input = parse("git_repo: https://github.com/acme/weather.git\nbranch: main\ndepth: 30\nsubdir: proto\npaths: [acme/weather]\n").unwrap();
        assert_eq!(input.input_type(), InputConfigType::GitRepo);
        assert_eq!(input.location(), "https://github.com/acme/weather.git");
        assert_eq!(
            input.source(),
            &InputSource::GitRepo(GitRepoInput {
                url: "https://github.com/acme/weather.git".to_string(),
                branch: Some("main".to_string()),
                depth: Some(30),
                subdir: Some("proto".to_string()),
                ..Default::default()
            })
        );
        assert_eq!(input.target_paths(), &["acme/weather"]);
    }

    #[test]
    fn test_exactly_one_location() {
        let err = parse("types: [acme.v1.Foo]\n").unwrap_err();
        assert!(err.to_string().contains("exactly one of module, directory, git_repo"));
        assert!(err.to_string().contains("found 0"));
        let err = parse("directory: proto\nmodule: buf.build/acme/weather\n").unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_option_allow_list() {
        let err = parse("directory: proto\nbranch: main\n").unwrap_err();
        assert!(err.to_string().contains("option branch is not allowed for an input of type directory"));
        let err = parse("zip_archive: a.zip\ncompression: gzip\n").unwrap_err();
        assert!(err.to_string().contains("compression"));
        let tarball = parse("tarball: a.tar.gz\ncompression: gzip\nstrip_components: 1\n").unwrap();
        assert_eq!(
            tarball.source(),
            &InputSource::Tarball(TarballInput {
                path: "a.tar.gz".to_string(),
                compression: Some(Compression::Gzip),
                strip_components: Some(1),
                subdir: None,
            })
        );
        let proto_file = parse("proto_file: a/b.proto\ninclude_package_files: true\n").unwrap();
        assert!(matches!(
            proto_file.source(),
            InputSource::ProtoFile(ProtoFileInput { include_package_files: true, .. })
        ));
    }

    #[test]
    fn test_commit_and_tag_are_exclusive() {
        let err = parse("git_repo: https://a/b.git\ncommit: abc\ntag: v1\n").unwrap_err();
        assert!(err.to_string().contains("commit and tag"));
    }

    #[test]
    fn test_unknown_compression() {
        let err = parse("binary_image: image.bin\ncompression: lz4\n").unwrap_err();
        assert!(err.to_string().contains("unknown compression"));
    }

    #[test]
    fn test_image_inputs_keep_their_encoding() {
        let input = parse("yaml_image: image.yaml.zst\ncompression: zstd\n").unwrap();
        assert_eq!(
            input.source(),
            &InputSource::YamlImage(ImageInput {
                path: "image.yaml.zst".to_string(),
                compression: Some(Compression::Zstd),
            })
        );
        let external = input.to_external();
        assert_eq!(external.yaml_image.as_deref(), Some("image.yaml.zst"));
        assert_eq!(external.compression.as_deref(), Some("zstd"));
        assert!(external.binary_image.is_none());
    }

    #[test]
    fn test_every_type_has_an_allow_list() {
        for input_type in InputConfigType::ALL {
            assert!(ALLOWED_OPTIONS.contains_key(&input_type), "{}", input_type);
        }
    }

    #[test]
    fn test_filters_allowed_on_every_type() {
        for input_type in InputConfigType::ALL {
            let yaml = format!("{}: x\ntypes: [a.B]\nexclude_types: [a.C]\nexclude_paths: [d]\n", input_type.key());
            let input = parse(&yaml).unwrap();
            assert_eq!(input.input_type(), input_type);
            assert_eq!(input.to_external().exclude_paths, vec!["d"]);
        }
    }
}
