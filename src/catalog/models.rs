//! Catalog model types.
//!
//! Records keep the full JSON object they were read from, so keys that the
//! checker does not interpret survive a rewrite unchanged and in order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Error raised when a JSON object does not have the shape of a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ShapeError(pub String);

/// The ingest protocol a service recommends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputKind {
    #[default]
    Rtmp,
    Hls,
    Ftl,
    Unknown(String),
}

impl OutputKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "rtmp_output" => Self::Rtmp,
            "ffmpeg_hls_muxer" => Self::Hls,
            "ftl_output" => Self::Ftl,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Rtmp => "rtmp_output",
            Self::Hls => "ffmpeg_hls_muxer",
            Self::Ftl => "ftl_output",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ingest server of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Server {
    /// Protocol URI, or a bare hostname for FTL services.
    pub url: String,
    fields: Map<String, Value>,
}

impl Server {
    #[cfg(test)]
    pub fn new(url: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("url".to_string(), Value::String(url.to_string()));
        Self {
            url: url.to_string(),
            fields,
        }
    }
}

impl TryFrom<Map<String, Value>> for Server {
    type Error = ShapeError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let url = fields
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ShapeError("server is missing a string \"url\"".to_string()))?
            .to_string();
        Ok(Self { url, fields })
    }
}

impl From<Server> for Map<String, Value> {
    fn from(server: Server) -> Self {
        let mut fields = server.fields;
        fields.insert("url".to_string(), Value::String(server.url));
        fields
    }
}

/// A streaming service and its candidate ingest servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Service {
    pub name: String,
    /// `recommended.output`, if the service declares one.
    pub recommended_output: Option<String>,
    pub servers: Vec<Server>,
    fields: Map<String, Value>,
}

impl Service {
    #[cfg(test)]
    pub fn new(name: &str, recommended_output: Option<&str>, servers: Vec<Server>) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(output) = recommended_output {
            let mut recommended = Map::new();
            recommended.insert("output".to_string(), Value::String(output.to_string()));
            fields.insert("recommended".to_string(), Value::Object(recommended));
        }
        fields.insert("servers".to_string(), Value::Array(Vec::new()));
        Self {
            name: name.to_string(),
            recommended_output: recommended_output.map(str::to_string),
            servers,
            fields,
        }
    }

    /// The protocol used to probe this service's servers.
    pub fn output_kind(&self) -> OutputKind {
        self.recommended_output
            .as_deref()
            .map(OutputKind::parse)
            .unwrap_or_default()
    }

    /// Copy of this service with a different server list.
    pub fn with_servers(&self, servers: Vec<Server>) -> Self {
        Self {
            servers,
            ..self.clone()
        }
    }
}

impl TryFrom<Map<String, Value>> for Service {
    type Error = ShapeError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ShapeError("service is missing a string \"name\"".to_string()))?
            .to_string();

        let recommended_output = match fields.get("recommended").and_then(|r| r.get("output")) {
            None => None,
            // An explicit null is not a protocol; such services are passed through.
            Some(Value::Null) => Some("null".to_string()),
            Some(Value::String(output)) => Some(output.clone()),
            Some(other) => {
                return Err(ShapeError(format!(
                    "service \"{}\" has a non-string recommended.output: {}",
                    name, other
                )))
            }
        };

        let servers = match fields.get("servers") {
            Some(Value::Array(servers)) => servers
                .iter()
                .map(|server| match server {
                    Value::Object(map) => Server::try_from(map.clone()),
                    other => Err(ShapeError(format!(
                        "service \"{}\" has a non-object server: {}",
                        name, other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(ShapeError(format!(
                    "service \"{}\" has a non-array \"servers\": {}",
                    name, other
                )))
            }
        };

        Ok(Self {
            name,
            recommended_output,
            servers,
            fields,
        })
    }
}

impl From<Service> for Map<String, Value> {
    fn from(service: Service) -> Self {
        let mut fields = service.fields;
        fields.insert("name".to_string(), Value::String(service.name));
        // A service read without a server list is written back without one.
        if fields.contains_key("servers") || !service.servers.is_empty() {
            let servers = service
                .servers
                .into_iter()
                .map(|server| Value::Object(server.into()))
                .collect();
            fields.insert("servers".to_string(), Value::Array(servers));
        }
        fields
    }
}

/// The service catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Catalog {
    pub services: Vec<Service>,
    fields: Map<String, Value>,
}

impl Catalog {
    #[cfg(test)]
    pub fn new(services: Vec<Service>) -> Self {
        let mut fields = Map::new();
        fields.insert("services".to_string(), Value::Array(Vec::new()));
        Self { services, fields }
    }

    /// Copy of this catalog (top-level keys included) with different services.
    pub fn with_services(&self, services: Vec<Service>) -> Self {
        Self {
            services,
            fields: self.fields.clone(),
        }
    }
}

impl TryFrom<Map<String, Value>> for Catalog {
    type Error = ShapeError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let services = match fields.get("services") {
            Some(services @ Value::Array(_)) => {
                Vec::<Service>::deserialize(services).map_err(|e| ShapeError(e.to_string()))?
            }
            _ => return Err(ShapeError("catalog is missing a \"services\" array".to_string())),
        };
        Ok(Self { services, fields })
    }
}

impl From<Catalog> for Map<String, Value> {
    fn from(catalog: Catalog) -> Self {
        let mut fields = catalog.fields;
        let services = catalog
            .services
            .into_iter()
            .map(|service| Value::Object(service.into()))
            .collect();
        fields.insert("services".to_string(), Value::Array(services));
        fields
    }
}

/// One entry of the package descriptor's `files` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PackageFile {
    pub version: i64,
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for PackageFile {
    type Error = ShapeError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let version = fields
            .get("version")
            .and_then(Value::as_i64)
            .ok_or_else(|| ShapeError("package file entry is missing an integer \"version\"".to_string()))?;
        Ok(Self { version, fields })
    }
}

impl From<PackageFile> for Map<String, Value> {
    fn from(file: PackageFile) -> Self {
        let mut fields = file.fields;
        fields.insert("version".to_string(), Value::from(file.version));
        fields
    }
}

/// The package/version descriptor published next to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Package {
    pub version: i64,
    pub files: Vec<PackageFile>,
    fields: Map<String, Value>,
}

impl Package {
    /// Increment the package version together with `files[0].version`.
    pub fn bump_version(&mut self) {
        self.version += 1;
        if let Some(first) = self.files.first_mut() {
            first.version += 1;
        }
    }
}

impl TryFrom<Map<String, Value>> for Package {
    type Error = ShapeError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let version = fields
            .get("version")
            .and_then(Value::as_i64)
            .ok_or_else(|| ShapeError("package is missing an integer \"version\"".to_string()))?;

        let files = match fields.get("files") {
            Some(files @ Value::Array(_)) => {
                Vec::<PackageFile>::deserialize(files).map_err(|e| ShapeError(e.to_string()))?
            }
            _ => return Err(ShapeError("package is missing a \"files\" array".to_string())),
        };
        if files.is_empty() {
            return Err(ShapeError("package \"files\" array is empty".to_string()));
        }

        Ok(Self {
            version,
            files,
            fields,
        })
    }
}

impl From<Package> for Map<String, Value> {
    fn from(package: Package) -> Self {
        let mut fields = package.fields;
        fields.insert("version".to_string(), Value::from(package.version));
        let files = package
            .files
            .into_iter()
            .map(|file| Value::Object(file.into()))
            .collect();
        fields.insert("files".to_string(), Value::Array(files));
        fields
    }
}
