//! Bootstrap program synthesis.
//!
//! The bootstrap program is assembled as text in a fixed order: the entry
//! point marker, the application name binding, the chainload capability
//! binding, the bootstrap logic, then any custom hook code. Later sections may
//! refer to bindings made by earlier ones, so the order is part of the
//! contract.

use std::path::Path;

/// Marks the program as the process entry point.
pub const IDENTITY_MARKER: &str = "__name__ = '__main__'";

/// Constant the bootstrap logic reads the application name from.
pub const APP_NAME_BINDING: &str = "__app_name__";

/// Constant the bootstrap logic reads the chainload capability from.
pub const CHAINLOAD_BINDING: &str = "__chainload_enabled__";

/// Call appended when the program is compiled as an importable module rather
/// than a standalone executable.
pub const ENTRY_INVOCATION: &str = "bootstrap()";

/// Version discovery, validation, in-process load and chainload logic,
/// supplied as source text and injected verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapLogic(String);

impl BootstrapLogic {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Read the logic source from a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        Ok(Self(std::fs::read_to_string(path)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Builder for the bootstrap program text.
#[derive(Debug, Clone)]
pub struct BootstrapSource<'a> {
    app_name: &'a str,
    logic: &'a BootstrapLogic,
    custom_hook: Option<&'a str>,
    chainload: bool,
    invoke_entry: bool,
}

impl<'a> BootstrapSource<'a> {
    pub fn new(app_name: &'a str, logic: &'a BootstrapLogic) -> Self {
        Self {
            app_name,
            logic,
            custom_hook: None,
            chainload: false,
            invoke_entry: false,
        }
    }

    /// Caller-provided code appended after the bootstrap logic.
    pub fn custom_hook(mut self, hook: Option<&'a str>) -> Self {
        self.custom_hook = hook;
        self
    }

    /// Bind the chainload capability flag (off by default).
    pub fn chainload(mut self, enabled: bool) -> Self {
        self.chainload = enabled;
        self
    }

    /// Append [`ENTRY_INVOCATION`] so importing the compiled module runs it.
    pub fn invoke_entry(mut self, invoke: bool) -> Self {
        self.invoke_entry = invoke;
        self
    }

    pub fn render(&self) -> String {
        let mut sections = vec![
            IDENTITY_MARKER.to_string(),
            format!("{APP_NAME_BINDING} = {}", quote_literal(self.app_name)),
            format!(
                "{CHAINLOAD_BINDING} = {}",
                if self.chainload { "True" } else { "False" }
            ),
            self.logic.as_str().to_string(),
        ];
        if let Some(hook) = self.custom_hook {
            sections.push(hook.to_string());
        }
        if self.invoke_entry {
            sections.push(ENTRY_INVOCATION.to_string());
        }
        sections.join("\n")
    }
}

/// Synthesize the bootstrap program for `app_name` with the default
/// capability set (chainload off, no entry invocation).
pub fn synthesize(app_name: &str, logic: &BootstrapLogic, custom_hook: Option<&str>) -> String {
    BootstrapSource::new(app_name, logic)
        .custom_hook(custom_hook)
        .render()
}

/// Single-quoted string literal with backslashes and quotes escaped.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
