//! YAML loading with custom tags
//!
//! Tags are resolved while the document is read, so the result is a plain
//! YAML value ready for deserialization.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};

/// File extensions picked up by `!include_dir_named`
const INCLUDE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Loads YAML files, resolving `!include`, `!include_dir_named` and `!env_var`
pub struct ConfigLoader {
    /// Base for relative paths passed to [`load_file`](Self::load_file)
    base_dir: PathBuf,
    /// Files currently being loaded, outermost first
    include_stack: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            include_stack: Vec::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Load and resolve a file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = match path.as_ref() {
            p if p.is_absolute() => p.to_path_buf(),
            p => self.base_dir.join(p),
        };

        if self.include_stack.contains(&path) {
            return Err(ConfigError::CircularInclude { path });
        }

        debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        self.include_stack.push(path.clone());
        let result = self.load_str(&content, &path);
        self.include_stack.pop();
        result
    }

    /// Resolve YAML text as if it had been read from `origin`
    pub fn load_str(&mut self, content: &str, origin: &Path) -> ConfigResult<Value> {
        let raw: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
            path: origin.to_path_buf(),
            source,
        })?;
        self.resolve(raw, origin)
    }

    fn resolve(&mut self, value: Value, origin: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged, origin),
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key, self.resolve(value, origin)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.resolve(item, origin))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            scalar => Ok(scalar),
        }
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, origin: &Path) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!(tag = %tag, "Resolving tag");

        match tag.as_str() {
            "!include" => {
                let target = self.tag_path(&tagged.value, origin)?;
                if !target.exists() {
                    return Err(ConfigError::IncludeNotFound { path: target });
                }
                self.load_file(target)
            }
            "!include_dir_named" => {
                let dir = self.tag_path(&tagged.value, origin)?;
                self.include_dir_named(&dir)
            }
            "!env_var" => env_var(&tagged.value),
            _ => {
                // Keep unknown tags, resolving what they wrap
                let value = self.resolve(tagged.value, origin)?;
                Ok(Value::Tagged(Box::new(TaggedValue {
                    tag: tagged.tag,
                    value,
                })))
            }
        }
    }

    fn include_dir_named(&mut self, dir: &Path) -> ConfigResult<Value> {
        if !dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }

        let entries = fs::read_dir(dir).map_err(|source| ConfigError::ReadFile {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| INCLUDE_EXTENSIONS.contains(&ext))
            })
            .collect();
        files.sort();

        debug!(dir = %dir.display(), files = files.len(), "Including directory");

        let mut named = Mapping::new();
        for file in files {
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let value = self.load_file(&file)?;
            named.insert(Value::String(stem), value);
        }
        Ok(Value::Mapping(named))
    }

    /// Path argument of an include tag, relative to the including file
    fn tag_path(&self, value: &Value, origin: &Path) -> ConfigResult<PathBuf> {
        let Value::String(raw) = value else {
            return Err(ConfigError::InvalidIncludePath {
                path: format!("{:?}", value),
                reason: "path must be a string".to_string(),
            });
        };

        let raw = Path::new(raw);
        if raw.is_absolute() {
            return Ok(raw.to_path_buf());
        }
        let dir = origin.parent().unwrap_or(&self.base_dir);
        Ok(dir.join(raw))
    }
}

/// `!env_var NAME` or `!env_var NAME default`
///
/// Text that reads as a YAML number or boolean is typed, so `"250"` becomes a
/// number and `"true"` a boolean. Anything else, empty text included, stays a
/// string.
fn env_var(value: &Value) -> ConfigResult<Value> {
    let Value::String(directive) = value else {
        return Err(ConfigError::InvalidValue {
            key: "!env_var".to_string(),
            reason: "expected a variable name".to_string(),
        });
    };

    let mut parts = directive.trim().splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let default = parts.next().map(str::trim);

    let text = match (std::env::var(name), default) {
        (Ok(text), _) => text,
        (Err(_), Some(default)) => default.to_string(),
        (Err(_), None) => {
            return Err(ConfigError::EnvVarNotFound {
                var: name.to_string(),
            })
        }
    };

    debug!(var = %name, "Substituted env var");
    Ok(match serde_yaml::from_str::<Value>(&text) {
        Ok(scalar @ (Value::Bool(_) | Value::Number(_))) => scalar,
        _ => Value::String(text),
    })
}

/// Load one file relative to `base_dir`
pub fn load_yaml(base_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    ConfigLoader::new(base_dir).load_file(file)
}
