use std::fmt;

/// Storage backend that owns a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Provider {
    /// Native buckets of this cluster (or of an attached remote cluster).
    Ais,
    Aws,
    Gcp,
    Azure,
    Oci,
    /// Read-only HTTP(S) origin.
    Ht,
}

impl Provider {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Ais => "ais",
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
            Provider::Oci => "oci",
            Provider::Ht => "ht",
        }
    }

    pub const fn is_remote_backend(&self) -> bool {
        !matches!(self, Provider::Ais)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket namespace. The default (empty) namespace is the global one.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Namespace {
    /// Remote cluster UUID; empty for the local cluster.
    pub uuid: String,
    pub name: String,
}

impl Namespace {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.uuid.is_empty() && self.name.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            return Ok(());
        }
        write!(f, "@{}#{}", self.uuid, self.name)
    }
}

/// Bucket reference: equal iff name, provider and namespace all match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bck {
    pub name: String,
    pub provider: Provider,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ns: Namespace,
}

impl Bck {
    pub fn new(
        name: impl Into<String>,
        provider: Provider,
        ns: Namespace,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            ns,
        }
    }

    /// Local bucket in the global namespace.
    pub fn ais(name: impl Into<String>) -> Self {
        Self::new(name, Provider::Ais, Namespace::global())
    }

    /// True when the bucket matches the optional provider and namespace
    /// filters; `None` matches everything.
    pub fn matches(
        &self,
        provider: Option<Provider>,
        ns: Option<&Namespace>,
    ) -> bool {
        provider.is_none_or(|p| p == self.provider)
            && ns.is_none_or(|ns| *ns == self.ns)
    }
}

impl fmt::Display for Bck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.provider, self.ns, self.name)
    }
}

/// Object within a bucket; the unit a put-mirror job replicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectRef {
    pub bck: Bck,
    pub name: String,
}

impl ObjectRef {
    pub fn new(bck: Bck, name: impl Into<String>) -> Self {
        Self {
            bck,
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bck, self.name)
    }
}

/// Per-bucket mirroring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MirrorConf {
    pub enabled: bool,
    pub copies: u32,
}

impl Default for MirrorConf {
    fn default() -> Self {
        Self {
            enabled: false,
            copies: 2,
        }
    }
}

/// The subset of bucket properties the registry consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BucketProps {
    pub mirror: MirrorConf,
}
