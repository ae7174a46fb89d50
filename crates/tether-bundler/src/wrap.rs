//! Source wrapping
//!
//! Turns file contents into module definition bodies and escapes values for
//! embedding in JavaScript string literals.

use crate::loader::DEFINE_GLOBAL;

/// How a file's contents become artifact text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// `.js`: optionally eval-wrapped with a sourceURL
    Code,
    /// `.json`: assigned to `module.exports`
    Data,
    /// Legacy file: copied as is
    Verbatim,
}

impl FileKind {
    /// Kind of a module file, by extension; `None` for unrecognized files
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rsplit_once('.') {
            Some((_, "js")) => Some(FileKind::Code),
            Some((_, "json")) => Some(FileKind::Data),
            _ => None,
        }
    }

    /// Tag mixed into cache fingerprints
    pub fn tag(self) -> &'static str {
        match self {
            FileKind::Code => "code",
            FileKind::Data => "data",
            FileKind::Verbatim => "verbatim",
        }
    }

    /// Artifact text for `contents` read from `path`
    pub fn wrap(self, contents: &str, path: &str, wrap_sources: bool) -> String {
        match self {
            FileKind::Code => wrap_code(contents, path, wrap_sources),
            FileKind::Data => format!("module.exports = {};", contents.trim_end()),
            FileKind::Verbatim => contents.to_string(),
        }
    }
}

/// Quote `value` as a JavaScript string literal
///
/// JSON string encoding, plus escapes for U+2028 and U+2029, which older
/// engines reject inside string literals.
pub fn js_string(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

/// Wrap code so stack traces name its original path
///
/// With `wrap_sources` the code runs through `eval` with a `sourceURL`
/// annotation; otherwise it is emitted unchanged and shares the definition
/// function's scope directly.
pub fn wrap_code(contents: &str, path: &str, wrap_sources: bool) -> String {
    if !wrap_sources {
        return contents.to_string();
    }

    let annotated = format!("{}\n//# sourceURL={}", contents, path);
    format!("eval({});", js_string(&annotated))
}

/// Body of a module re-exporting `target`
pub fn reexport(target: &str) -> String {
    format!("module.exports = require({});", js_string(target))
}

/// Body of a shim module re-exporting global `global`
pub fn shim(global: &str) -> String {
    format!("module.exports = window.{};", global)
}

/// Registration statement for one module
pub fn define_statement(name: &str, contents: &str) -> String {
    format!(
        "{}({}, function (module, exports, require) {{\n{}\n}});",
        DEFINE_GLOBAL,
        js_string(name),
        contents
    )
}
