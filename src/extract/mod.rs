//! Structural extraction.
//!
//! Turns raw file text into a language-tagged structural summary, dispatched
//! purely on the file extension. Every branch is total: no file content can
//! fail extraction — the worst case is an empty or partial summary plus a
//! non-fatal diagnostic.

pub mod java;
pub mod structure;

use tracing::warn;

pub use java::{JavaClass, JavaMethod, JavaParser, format_methods_for_chunks};
pub use structure::{
    GenericStructure, JsStructure, PythonStructure, XmlElement, XmlStructure,
};

/// Maximum entries kept in auxiliary lists (imports, elements, attributes).
pub const MAX_LIST_ENTRIES: usize = 20;

/// Language tag derived from a file path's extension (lowercased, no dot).
#[must_use]
pub fn language_of(file_path: &str) -> String {
    std::path::Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Per-file structural summary, one variant per supported language family.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStructure {
    Java(JavaStructure),
    Xml(XmlStructure),
    Python(PythonStructure),
    JavaScript(JsStructure),
    Generic(GenericStructure),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JavaStructure {
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub classes: Vec<JavaClass>,
}

/// Extract the structural summary for a file, dispatching on extension.
#[must_use]
pub fn extract_structure(code: &str, file_path: &str) -> FileStructure {
    match language_of(file_path).as_str() {
        "java" => FileStructure::Java(extract_java_structure(code, file_path)),
        "xml" => FileStructure::Xml(structure::extract_xml_structure(code, file_path)),
        "py" => FileStructure::Python(structure::extract_python_structure(code)),
        "js" | "ts" | "jsx" | "tsx" => {
            FileStructure::JavaScript(structure::extract_js_structure(code))
        }
        _ => FileStructure::Generic(structure::extract_generic_structure(code)),
    }
}

fn extract_java_structure(code: &str, file_path: &str) -> JavaStructure {
    let parser = match JavaParser::new() {
        Ok(p) => p,
        Err(e) => {
            warn!("Java parser unavailable for {file_path}: {e}");
            return JavaStructure::default();
        }
    };

    let classes = parser.parse(code);
    JavaStructure {
        package: classes.first().map(|c| c.package.clone()).filter(|p| !p.is_empty()),
        imports: structure::extract_java_imports(code),
        classes,
    }
}
