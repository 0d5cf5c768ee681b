//! Target database vendors and versions.
//!
//! A [`Dialect`] is a (vendor, version) pair. Everything that differs between
//! dialects is looked up in the versioned capability table in
//! [`capabilities`], never hard-coded against a vendor in the compiler.

pub mod capabilities;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use capabilities::{Capabilities, Capability, Feature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    SqlServer,
    PostgreSql,
    MySql,
    Sqlite,
}

impl Vendor {
    pub fn all() -> [Vendor; 4] {
        [
            Vendor::SqlServer,
            Vendor::PostgreSql,
            Vendor::MySql,
            Vendor::Sqlite,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Vendor::SqlServer => "sqlserver",
            Vendor::PostgreSql => "postgresql",
            Vendor::MySql => "mysql",
            Vendor::Sqlite => "sqlite",
        }
    }
}

impl FromStr for Vendor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Vendor::SqlServer),
            "postgresql" | "postgres" | "pg" => Ok(Vendor::PostgreSql),
            "mysql" => Ok(Vendor::MySql),
            "sqlite" => Ok(Vendor::Sqlite),
            other => Err(Error::UnsupportedDialect(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::UnsupportedDialect(format!("bad version {:?}", s));
        let mut parts = s.trim().splitn(2, '.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(bad)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| bad())?,
            None => 0,
        };
        Ok(Version::new(major, minor))
    }
}

/// Target dialect: `sqlserver:11.0`, `postgresql:9.3`, `mysql`, ...
///
/// Without a version the newest known version of the vendor is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dialect {
    pub vendor: Vendor,
    pub version: Version,
}

impl Dialect {
    pub fn new(vendor: Vendor, version: Version) -> Self {
        Self { vendor, version }
    }

    pub fn latest(vendor: Vendor) -> Self {
        Self::new(vendor, capabilities::latest_version(vendor))
    }

    pub fn sql_server(major: u16) -> Self {
        Self::new(Vendor::SqlServer, Version::new(major, 0))
    }

    pub fn postgres(major: u16, minor: u16) -> Self {
        Self::new(Vendor::PostgreSql, Version::new(major, minor))
    }

    pub fn mysql(major: u16, minor: u16) -> Self {
        Self::new(Vendor::MySql, Version::new(major, minor))
    }

    pub fn sqlite() -> Self {
        Self::latest(Vendor::Sqlite)
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::latest(Vendor::PostgreSql)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vendor.name(), self.version)
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((vendor, version)) => Ok(Dialect::new(vendor.parse()?, version.parse()?)),
            None => Ok(Dialect::latest(s.parse()?)),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Dialect> for String {
    fn from(d: Dialect) -> Self {
        d.to_string()
    }
}
