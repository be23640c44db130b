//! Module identity
//!
//! Module names are owned by a separate naming component; configuration
//! files only need to carry them through. `ModuleFullName` checks the
//! `registry/owner/name` shape and otherwise treats the value as opaque.
//! `ModuleRef` adds an optional `:ref` suffix, as used in `deps`.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A fully qualified module name, `registry/owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleFullName {
    registry: String,
    owner: String,
    name: String,
}

impl ModuleFullName {
    pub fn new(registry: &str, owner: &str, name: &str) -> Result<Self> {
        for (part, value) in [("registry", registry), ("owner", owner), ("name", name)] {
            if value.is_empty() || value.contains('/') || value.contains(':') {
                return Err(Error::invalid_config(format!(
                    "module {} {:?} is empty or contains a reserved character",
                    part, value
                )));
            }
        }
        Ok(Self {
            registry: registry.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for ModuleFullName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [registry, owner, name] => ModuleFullName::new(registry, owner, name),
            _ => Err(Error::InvalidConfig {
                message: format!("invalid module name {:?}", s),
                hint: Some("module names have the form registry/owner/name".to_string()),
            }),
        }
    }
}

impl fmt::Display for ModuleFullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.registry, self.owner, self.name)
    }
}

/// A module name with an optional ref, `registry/owner/name[:ref]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleRef {
    full_name: ModuleFullName,
    reference: Option<String>,
}

impl ModuleRef {
    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

impl FromStr for ModuleRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, reference) = match s.split_once(':') {
            Some((name, reference)) => {
                if reference.is_empty() {
                    return Err(Error::invalid_config(format!(
                        "module reference {:?} has an empty ref",
                        s
                    )));
                }
                (name, Some(reference.to_string()))
            }
            None => (s, None),
        };
        Ok(Self {
            full_name: name.parse()?,
            reference,
        })
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{}:{}", self.full_name, reference),
            None => write!(f, "{}", self.full_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let name: ModuleFullName = "buf.build/acme/weather".parse().unwrap();
        assert_eq!(name.registry(), "buf.build");
        assert_eq!(name.owner(), "acme");
        assert_eq!(name.name(), "weather");
        assert_eq!(name.to_string(), "buf.build/acme/weather");
    }

    #[test]
    fn test_parse_full_name_errors() {
        assert!("acme/weather".parse::<ModuleFullName>().is_err());
        assert!("buf.build//weather".parse::<ModuleFullName>().is_err());
        assert!("a/b/c/d".parse::<ModuleFullName>().is_err());
    }

    #[test]
    fn test_parse_module_ref() {
        let module_ref: ModuleRef = "buf.build/acme/weather:v1.2.0".parse().unwrap();
        assert_eq!(module_ref.reference(), Some("v1.2.0"));
        assert_eq!(module_ref.full_name().name(), "weather");
        assert_eq!(module_ref.to_string(), "buf.build/acme/weather:v1.2.0");

        let bare: ModuleRef = "buf.build/acme/weather".parse().unwrap();
        assert_eq!(bare.reference(), None);
        assert!("buf.build/acme/weather:".parse::<ModuleRef>().is_err());
    }
}
