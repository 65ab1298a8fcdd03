//! Builder options and their TOML configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::SpliceResult;
use crate::params::{DefaultComparer, ParameterComparer};
use crate::transform::{AnnotationTransformer, ArgumentTransformer};

/// Characters that suppress the automatic space between two appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSpacing {
    pub separators: String,
    pub openings: String,
}

impl Default for AutoSpacing {
    fn default() -> Self {
        Self {
            separators: ",;".to_string(),
            openings: "(".to_string(),
        }
    }
}

impl AutoSpacing {
    /// True if `c` needs no space next to it.
    pub fn is_neutral(&self, c: char) -> bool {
        c.is_whitespace() || self.separators.contains(c) || self.openings.contains(c)
    }
}

/// Options shared by a builder and everything parsed into it.
///
/// Changing options affects later edits only; content already parsed is
/// never reparsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Map equal captured values to one bound parameter.
    pub reuse_identical_parameters: bool,
    /// Symbol in front of generated references (`@p0`).
    pub parameter_symbol: String,
    pub auto_parameter_prefix: String,
    /// Extra prefix segment for sequence-valued references (`@parray0`).
    pub array_suffix: String,
    pub auto_spacing: AutoSpacing,
    /// Turn `'{x}'` into `{x}` around a single value.
    pub auto_strip_quotes: bool,
    /// Remove common indentation from multi-line templates.
    pub auto_dedent: bool,
    #[serde(skip, default = "default_comparer")]
    pub comparer: Arc<dyn ParameterComparer>,
    #[serde(skip, default = "default_transformer")]
    pub transformer: Arc<dyn ArgumentTransformer>,
}

fn default_comparer() -> Arc<dyn ParameterComparer> {
    Arc::new(DefaultComparer)
}

fn default_transformer() -> Arc<dyn ArgumentTransformer> {
    Arc::new(AnnotationTransformer)
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reuse_identical_parameters: false,
            parameter_symbol: "@".to_string(),
            auto_parameter_prefix: "p".to_string(),
            array_suffix: "array".to_string(),
            auto_spacing: AutoSpacing::default(),
            auto_strip_quotes: true,
            auto_dedent: false,
            comparer: default_comparer(),
            transformer: default_transformer(),
        }
    }
}

static SHARED_DEFAULT: OnceLock<Arc<Options>> = OnceLock::new();

impl Options {
    /// The process-wide default instance used by `SqlBuilder::new`.
    pub fn shared_default() -> Arc<Options> {
        SHARED_DEFAULT
            .get_or_init(|| Arc::new(Options::default()))
            .clone()
    }

    /// Create a new options builder
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// The comparer to use while registering parameters, if reuse is on.
    pub fn active_comparer(&self) -> Option<&dyn ParameterComparer> {
        if self.reuse_identical_parameters {
            Some(self.comparer.as_ref())
        } else {
            None
        }
    }

    pub fn from_toml_str(input: &str) -> SpliceResult<Self> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SpliceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let options = Self::from_toml_str(&text)?;
        tracing::info!("Loaded options from {}", path.display());
        Ok(options)
    }

    /// Default config location: `<config_dir>/sqlsplice/options.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sqlsplice").join("options.toml"))
    }

    /// Load from the default location, or fall back to defaults.
    pub fn discover() -> SpliceResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                tracing::debug!("No options file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Builder for Options
#[derive(Debug, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn reuse_identical_parameters(mut self, reuse: bool) -> Self {
        self.options.reuse_identical_parameters = reuse;
        self
    }

    pub fn parameter_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.options.parameter_symbol = symbol.into();
        self
    }

    pub fn auto_parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.auto_parameter_prefix = prefix.into();
        self
    }

    pub fn array_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.options.array_suffix = suffix.into();
        self
    }

    pub fn auto_spacing(mut self, spacing: AutoSpacing) -> Self {
        self.options.auto_spacing = spacing;
        self
    }

    pub fn auto_strip_quotes(mut self, enabled: bool) -> Self {
        self.options.auto_strip_quotes = enabled;
        self
    }

    pub fn auto_dedent(mut self, enabled: bool) -> Self {
        self.options.auto_dedent = enabled;
        self
    }

    pub fn comparer(mut self, comparer: Arc<dyn ParameterComparer>) -> Self {
        self.options.comparer = comparer;
        self
    }

    pub fn transformer(mut self, transformer: Arc<dyn ArgumentTransformer>) -> Self {
        self.options.transformer = transformer;
        self
    }

    pub fn build(self) -> Arc<Options> {
        Arc::new(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = Options::default();
        assert!(!o.reuse_identical_parameters);
        assert_eq!(o.parameter_symbol, "@");
        assert_eq!(o.auto_parameter_prefix, "p");
        assert_eq!(o.array_suffix, "array");
        assert!(o.auto_strip_quotes);
        assert!(!o.auto_dedent);
        assert!(o.active_comparer().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let o = Options::from_toml_str(
            r#"
            reuse_identical_parameters = true
            parameter_symbol = ":"

            [auto_spacing]
            openings = "(["
            "#,
        )
        .unwrap();
        assert!(o.reuse_identical_parameters);
        assert_eq!(o.parameter_symbol, ":");
        assert_eq!(o.auto_parameter_prefix, "p");
        assert_eq!(o.auto_spacing.openings, "([");
        assert_eq!(o.auto_spacing.separators, ",;");
        assert!(o.active_comparer().is_some());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Options::from_toml_str("reuse_identical_parameters = \"yes\"").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_spacing_neutral_chars() {
        let s = AutoSpacing::default();
        assert!(s.is_neutral(' '));
        assert!(s.is_neutral('\n'));
        assert!(s.is_neutral(','));
        assert!(s.is_neutral('('));
        assert!(!s.is_neutral('a'));
        assert!(!s.is_neutral(')'));
    }
}
