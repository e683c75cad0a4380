//! Diagnostics and their output formats - plaintext and JSON.

use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Which problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// None of the requested capabilities is used.
    AllUnused,
    /// A capability is used without being requested by name.
    Unrequested,
    /// A requested capability is never used.
    Unused,
}

impl ProblemKind {
    pub fn message(self, variable: &str, interfaces: &[String]) -> String {
        let list = interfaces.join(", ");
        match self {
            ProblemKind::AllUnused => format!(
                "no interfaces requested by {} are used; remove them or rename it to _ if it's unused",
                variable
            ),
            ProblemKind::Unrequested => format!(
                "{} uses but does not explicitly request interface(s) {}; add it explicitly",
                variable, list
            ),
            ProblemKind::Unused => format!(
                "{} requests but does not use interface(s) {}; remove to use the smallest possible interface",
                variable, list
            ),
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProblemKind::AllUnused => "all_unused",
            ProblemKind::Unrequested => "unrequested",
            ProblemKind::Unused => "unused",
        })
    }
}

/// One finding, positioned at the variable's declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub variable: String,
    pub kind: ProblemKind,
    /// Display names of the offending interfaces; empty for `all_unused`.
    pub interfaces: Vec<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: ProblemKind,
        file: &str,
        line: u32,
        column: u32,
        variable: &str,
        interfaces: Vec<String>,
    ) -> Self {
        let message = kind.message(variable, &interfaces);
        Self {
            file: file.to_string(),
            line,
            column,
            variable: variable.to_string(),
            kind,
            interfaces,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self.message)
    }
}

/// Prints diagnostics as `file:line:col: message` lines.
pub fn print_plain(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        println!("No capability problems found.");
        return;
    }
    for d in diagnostics {
        println!("{}", d);
    }
    println!("\n{} problem(s) found.", diagnostics.len());
}

/// Prints diagnostics in JSON format.
pub fn print_json(diagnostics: &[Diagnostic]) {
    let doc = json!({
        "count": diagnostics.len(),
        "diagnostics": diagnostics,
    });
    match serde_json::to_string_pretty(&doc) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::warn!(error = %e, "JSON serialization failed");
            for d in diagnostics {
                println!("{}", d);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let names = vec!["Secrets".to_string(), "database.Context".to_string()];
        assert_eq!(
            ProblemKind::Unrequested.message("ctx", &names),
            "ctx uses but does not explicitly request interface(s) Secrets, database.Context; add it explicitly"
        );
        assert_eq!(
            ProblemKind::Unused.message("ctx", &names[..1]),
            "ctx requests but does not use interface(s) Secrets; remove to use the smallest possible interface"
        );
        assert!(ProblemKind::AllUnused
            .message("ctx", &[])
            .starts_with("no interfaces requested by ctx are used"));
    }

    #[test]
    fn test_diagnostic_serializes_kind_in_snake_case() {
        let d = Diagnostic::new(ProblemKind::AllUnused, "thing.go", 3, 14, "ctx", vec![]);
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["kind"], "all_unused");
        assert_eq!(value["line"], 3);
        assert_eq!(d.to_string(), format!("thing.go:3:14: {}", d.message));
    }
}
