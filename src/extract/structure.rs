//! Non-Java structural extractors: XML census, Python lexical scan, JS/TS
//! regex extraction, and the generic keyword count fallback.
//!
//! Each extractor is total over arbitrary input. A parse failure degrades to
//! an empty or partial summary with a `warn!`, never an error.

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use tracing::warn;

use super::MAX_LIST_ENTRIES;

// ── XML ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlStructure {
    pub root_element: Option<String>,
    /// Element local names with occurrence counts, most frequent first.
    pub elements: Vec<XmlElement>,
    pub attributes: Vec<String>,
    pub namespaces: Vec<String>,
}

/// Census of an XML document: root element, namespaces, element and
/// attribute usage. A mid-stream error keeps whatever was collected.
pub fn extract_xml_structure(code: &str, file_path: &str) -> XmlStructure {
    let mut structure = XmlStructure::default();
    let mut element_counts: Vec<(String, usize)> = Vec::new();

    let mut reader = Reader::from_str(code);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if structure.root_element.is_none() {
                    structure.root_element =
                        Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }

                match element_counts.iter_mut().find(|(name, _)| *name == local) {
                    Some((_, count)) => *count += 1,
                    None => element_counts.push((local, 1)),
                }

                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    if key == "xmlns" || key.starts_with("xmlns:") {
                        let ns = String::from_utf8_lossy(&attr.value).into_owned();
                        if !structure.namespaces.contains(&ns) {
                            structure.namespaces.push(ns);
                        }
                    } else if !structure.attributes.contains(&key)
                        && structure.attributes.len() < MAX_LIST_ENTRIES
                    {
                        structure.attributes.push(key);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Error parsing XML in {file_path}: {e}");
                break;
            }
        }
    }

    element_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    structure.elements = element_counts
        .into_iter()
        .take(MAX_LIST_ENTRIES)
        .map(|(name, count)| XmlElement { name, count })
        .collect();

    structure
}

// ── Python ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PythonFunction {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PythonClass {
    pub name: String,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PythonStructure {
    pub functions: Vec<PythonFunction>,
    pub classes: Vec<PythonClass>,
    pub imports: Vec<String>,
}

/// Tolerant lexical scan of Python source: function, class, and import
/// names only. Indentation delimits class blocks; malformed source yields
/// partial results.
pub fn extract_python_structure(code: &str) -> PythonStructure {
    let (def_re, class_re, import_re, from_re) = match (
        Regex::new(r"^(\s*)def\s+(\w+)\s*\(([^)]*)"),
        Regex::new(r"^(\s*)class\s+(\w+)"),
        Regex::new(r"^\s*import\s+([\w.]+)"),
        Regex::new(r"^\s*from\s+([\w.]+)\s+import"),
    ) {
        (Ok(d), Ok(c), Ok(i), Ok(f)) => (d, c, i, f),
        _ => return PythonStructure::default(),
    };

    let mut structure = PythonStructure::default();
    let lines: Vec<&str> = code.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = def_re.captures(line) {
            let name = caps[2].to_string();
            let args = caps[3]
                .split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            structure.functions.push(PythonFunction { name, args });
        } else if let Some(caps) = class_re.captures(line) {
            let indent = caps[1].len();
            let name = caps[2].to_string();
            let mut methods = Vec::new();
            for body_line in &lines[i + 1..] {
                let trimmed = body_line.trim_start();
                if trimmed.is_empty() {
                    continue;
                }
                let body_indent = body_line.len() - trimmed.len();
                if body_indent <= indent {
                    break;
                }
                if let Some(method_caps) = def_re.captures(body_line) {
                    methods.push(method_caps[2].to_string());
                }
            }
            structure.classes.push(PythonClass { name, methods });
        } else if let Some(caps) = import_re.captures(line) {
            structure.imports.push(caps[1].to_string());
        } else if let Some(caps) = from_re.captures(line) {
            structure.imports.push(caps[1].to_string());
        }
    }

    structure.imports.truncate(MAX_LIST_ENTRIES);
    structure
}

// ── JavaScript / TypeScript ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct JsFunction {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsClass {
    pub name: String,
    pub extends: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsStructure {
    pub functions: Vec<JsFunction>,
    pub classes: Vec<JsClass>,
    pub exports: Vec<String>,
}

/// Regex-based function/class/export extraction for JS and TS families.
pub fn extract_js_structure(code: &str) -> JsStructure {
    let (func_re, class_re, export_re) = match (
        Regex::new(r"(?:async\s+)?function\s+(\w+)\s*\(([^)]*)\)"),
        Regex::new(r"class\s+(\w+)(?:\s+extends\s+(\w+))?"),
        Regex::new(r"export\s+(?:default\s+)?(?:const|function|class)?\s*(\w+)"),
    ) {
        (Ok(f), Ok(c), Ok(e)) => (f, c, e),
        _ => return JsStructure::default(),
    };

    let mut structure = JsStructure::default();

    for caps in func_re.captures_iter(code) {
        structure.functions.push(JsFunction {
            name: caps[1].to_string(),
            args: caps[2]
                .split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        });
    }

    for caps in class_re.captures_iter(code) {
        structure.classes.push(JsClass {
            name: caps[1].to_string(),
            extends: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }

    for caps in export_re.captures_iter(code) {
        structure.exports.push(caps[1].to_string());
    }

    structure
}

// ── Generic fallback ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericStructure {
    pub estimated_functions: usize,
    pub estimated_classes: usize,
}

/// Coarse keyword-occurrence counts for unrecognized languages.
pub fn extract_generic_structure(code: &str) -> GenericStructure {
    let functions = match Regex::new(r"def |function |func ") {
        Ok(re) => re.find_iter(code).count(),
        Err(_) => 0,
    };
    let classes = code.matches("class ").count();
    GenericStructure {
        estimated_functions: functions,
        estimated_classes: classes,
    }
}

// ── Java imports (shared with the Java path) ─────────────────────────

/// Import statements from Java source, capped at [`MAX_LIST_ENTRIES`].
pub fn extract_java_imports(code: &str) -> Vec<String> {
    let import_re = match Regex::new(r"import\s+(?:static\s+)?([^\s;]+);") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    import_re
        .captures_iter(code)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .take(MAX_LIST_ENTRIES)
        .collect()
}
