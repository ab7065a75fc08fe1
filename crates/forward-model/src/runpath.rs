//! Run path and init file name formatting.

use std::path::PathBuf;

use crate::error::{ForwardModelError, Result};

/// Replace every `%d` in an init file pattern with the realization index.
pub fn substitute_iens(fmt: &str, iens: usize) -> String {
    fmt.replace("%d", &iens.to_string())
}

/// Run path template.
///
/// Either named placeholders (`<IENS>`, `<ITER>`) or up to two positional
/// `%d`, filled with the realization and then the iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runpaths {
    template: String,
}

impl Runpaths {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let positional = template.matches("%d").count();
        if positional > 2 {
            return Err(ForwardModelError::InvalidRunpath {
                format: template,
                reason: format!("{positional} %d placeholders, at most 2 allowed"),
            });
        }
        if positional > 0 && (template.contains("<IENS>") || template.contains("<ITER>")) {
            return Err(ForwardModelError::InvalidRunpath {
                format: template,
                reason: "mixes %d with named placeholders".to_string(),
            });
        }
        Ok(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn get(&self, iens: usize, iteration: u32) -> PathBuf {
        let named = self
            .template
            .replace("<IENS>", &iens.to_string())
            .replace("<ITER>", &iteration.to_string());

        let mut values = [iens.to_string(), iteration.to_string()].into_iter();
        let mut out = String::with_capacity(named.len());
        let mut rest = named.as_str();
        while let Some(pos) = rest.find("%d") {
            out.push_str(&rest[..pos]);
            if let Some(v) = values.next() {
                out.push_str(&v);
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        PathBuf::from(out)
    }

    /// Run paths for the given realizations.
    pub fn get_paths(&self, realizations: &[usize], iteration: u32) -> Vec<PathBuf> {
        realizations.iter().map(|&i| self.get(i, iteration)).collect()
    }
}
