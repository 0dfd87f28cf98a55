//! Backend selection.
//!
//! A backend tag plus the shared [`BackendOptions`] resolve to a spec that
//! carries exactly the fields its backend needs. `build` then constructs the
//! stage capability.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use pump_engine::{Collector, Drain, Enumerator};

use crate::api::{ApiClient, ApiCollector, ApiDrain, ApiPinEnumerator};
use crate::error::{BackendError, Result};
use crate::file::FileEnumerator;
use crate::flatfs::{FlatFsCollector, FlatFsDrain, FlatFsEnumerator, FlatFsStore};

/// Identifier sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum EnumeratorKind {
    /// Newline-separated identifier list
    File,
    /// Recursive pins of an HTTP API node
    #[cfg_attr(feature = "clap", value(name = "apipin"))]
    ApiPin,
    /// Every block of a flat-file store
    #[cfg_attr(feature = "clap", value(name = "flatfs"))]
    FlatFs,
}

/// Block sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CollectorKind {
    /// HTTP API node
    Api,
    /// Flat-file store
    #[cfg_attr(feature = "clap", value(name = "flatfs"))]
    FlatFs,
}

/// Block destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum DrainKind {
    /// HTTP API node
    Api,
    /// Flat-file store
    #[cfg_attr(feature = "clap", value(name = "flatfs"))]
    FlatFs,
}

impl fmt::Display for EnumeratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumeratorKind::File => write!(f, "file"),
            EnumeratorKind::ApiPin => write!(f, "apipin"),
            EnumeratorKind::FlatFs => write!(f, "flatfs"),
        }
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorKind::Api => write!(f, "api"),
            CollectorKind::FlatFs => write!(f, "flatfs"),
        }
    }
}

impl fmt::Display for DrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainKind::Api => write!(f, "api"),
            DrainKind::FlatFs => write!(f, "flatfs"),
        }
    }
}

/// Options of every backend. Only those of the selected backends are read.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub enum_file_path: Option<PathBuf>,
    pub enum_api_pin_url: Option<String>,
    pub enum_api_pin_stream: bool,
    pub enum_flatfs_path: Option<PathBuf>,
    pub coll_api_url: Option<String>,
    pub coll_flatfs_path: Option<PathBuf>,
    pub drain_api_url: Option<String>,
    pub drain_flatfs_path: Option<PathBuf>,
}

fn required<'a, T>(value: &'a Option<T>, option: &'static str) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or(BackendError::MissingOption { option })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumeratorSpec {
    File { path: PathBuf },
    ApiPin { url: String, stream: bool },
    FlatFs { path: PathBuf },
}

impl EnumeratorSpec {
    pub fn from_options(kind: EnumeratorKind, options: &BackendOptions) -> Result<Self> {
        Ok(match kind {
            EnumeratorKind::File => Self::File {
                path: required(&options.enum_file_path, "enum-file-path")?.clone(),
            },
            EnumeratorKind::ApiPin => Self::ApiPin {
                url: required(&options.enum_api_pin_url, "enum-api-pin-url")?.clone(),
                stream: options.enum_api_pin_stream,
            },
            EnumeratorKind::FlatFs => Self::FlatFs {
                path: required(&options.enum_flatfs_path, "enum-flatfs-path")?.clone(),
            },
        })
    }

    pub async fn build(&self) -> Result<Arc<dyn Enumerator>> {
        let enumerator: Arc<dyn Enumerator> = match self {
            Self::File { path } => Arc::new(FileEnumerator::open(path).await?),
            Self::ApiPin { url, stream } => {
                Arc::new(ApiPinEnumerator::new(ApiClient::new(url)?, *stream))
            }
            Self::FlatFs { path } => {
                Arc::new(FlatFsEnumerator::new(FlatFsStore::open(path).await?))
            }
        };
        Ok(enumerator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorSpec {
    Api { url: String },
    FlatFs { path: PathBuf },
}

impl CollectorSpec {
    pub fn from_options(kind: CollectorKind, options: &BackendOptions) -> Result<Self> {
        Ok(match kind {
            CollectorKind::Api => Self::Api {
                url: required(&options.coll_api_url, "coll-api-url")?.clone(),
            },
            CollectorKind::FlatFs => Self::FlatFs {
                path: required(&options.coll_flatfs_path, "coll-flatfs-path")?.clone(),
            },
        })
    }

    pub async fn build(&self) -> Result<Arc<dyn Collector>> {
        let collector: Arc<dyn Collector> = match self {
            Self::Api { url } => Arc::new(ApiCollector::new(ApiClient::new(url)?)),
            Self::FlatFs { path } => {
                Arc::new(FlatFsCollector::new(FlatFsStore::open(path).await?))
            }
        };
        Ok(collector)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainSpec {
    Api { url: String },
    FlatFs { path: PathBuf },
}

impl DrainSpec {
    pub fn from_options(kind: DrainKind, options: &BackendOptions) -> Result<Self> {
        Ok(match kind {
            DrainKind::Api => Self::Api {
                url: required(&options.drain_api_url, "drain-api-url")?.clone(),
            },
            DrainKind::FlatFs => Self::FlatFs {
                path: required(&options.drain_flatfs_path, "drain-flatfs-path")?.clone(),
            },
        })
    }

    pub async fn build(&self) -> Result<Arc<dyn Drain>> {
        let drain: Arc<dyn Drain> = match self {
            Self::Api { url } => Arc::new(ApiDrain::new(ApiClient::new(url)?)),
            Self::FlatFs { path } => Arc::new(FlatFsDrain::new(FlatFsStore::create(path).await?)),
        };
        Ok(drain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_option_named() {
        let options = BackendOptions::default();
        let err = EnumeratorSpec::from_options(EnumeratorKind::File, &options).unwrap_err();
        assert!(matches!(
            err,
            BackendError::MissingOption {
                option: "enum-file-path"
            }
        ));

        let err = CollectorSpec::from_options(CollectorKind::Api, &options).unwrap_err();
        assert_eq!(err.to_string(), "missing required option --coll-api-url");

        let err = DrainSpec::from_options(DrainKind::FlatFs, &options).unwrap_err();
        assert_eq!(err.to_string(), "missing required option --drain-flatfs-path");
    }

    #[test]
    fn test_specs_carry_their_fields() {
        let options = BackendOptions {
            enum_api_pin_url: Some("http://127.0.0.1:5001".to_string()),
            enum_api_pin_stream: true,
            coll_flatfs_path: Some(PathBuf::from("/src")),
            drain_api_url: Some("http://127.0.0.1:5002".to_string()),
            ..Default::default()
        };

        assert_eq!(
            EnumeratorSpec::from_options(EnumeratorKind::ApiPin, &options).unwrap(),
            EnumeratorSpec::ApiPin {
                url: "http://127.0.0.1:5001".to_string(),
                stream: true
            }
        );
        assert_eq!(
            CollectorSpec::from_options(CollectorKind::FlatFs, &options).unwrap(),
            CollectorSpec::FlatFs {
                path: PathBuf::from("/src")
            }
        );
        assert_eq!(
            DrainSpec::from_options(DrainKind::Api, &options).unwrap(),
            DrainSpec::Api {
                url: "http://127.0.0.1:5002".to_string()
            }
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(EnumeratorKind::ApiPin.to_string(), "apipin");
        assert_eq!(CollectorKind::FlatFs.to_string(), "flatfs");
        assert_eq!(DrainKind::Api.to_string(), "api");
    }

    #[tokio::test]
    async fn test_build_failures_are_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let spec = CollectorSpec::FlatFs {
            path: dir.path().join("missing"),
        };
        assert!(spec.build().await.is_err());

        let spec = DrainSpec::Api {
            url: "not a url".to_string(),
        };
        assert!(matches!(
            spec.build().await,
            Err(BackendError::InvalidUrl { .. })
        ));

        let spec = DrainSpec::FlatFs {
            path: dir.path().join("created"),
        };
        assert!(spec.build().await.is_ok());
        assert!(dir.path().join("created").is_dir());
    }
}
