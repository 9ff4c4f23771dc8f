//! Java structural parser.
//!
//! Enumerates top-level classes with their methods, constructors, fields,
//! inheritance, and annotations using lexical patterns plus explicit
//! brace-depth tracking — no grammar. Extraction is best-effort: malformed
//! Java may under- or over-match, but `parse` is total and never fails.

use regex::Regex;

/// Number of regular methods listed per method-index chunk.
pub const METHODS_PER_CHUNK: usize = 20;

/// Maximum field descriptors recorded per class.
const MAX_FIELDS: usize = 20;

/// Context window (chars) scanned before a method signature for modifiers.
const MODIFIER_WINDOW: usize = 200;

/// Context window (chars) scanned before a class header for annotations.
const ANNOTATION_WINDOW: usize = 200;

const MODIFIER_KEYWORDS: [&str; 7] = [
    "public",
    "private",
    "protected",
    "static",
    "final",
    "abstract",
    "synchronized",
];

#[derive(Debug, Clone, PartialEq)]
pub struct JavaMethod {
    pub name: String,
    /// Return-type token; the `"void"` sentinel for constructors.
    pub return_type: String,
    /// Bound parameter names (last whitespace token of each declaration).
    pub parameters: Vec<String>,
    pub modifiers: Vec<String>,
    /// Line offset within the enclosing class block.
    pub line_number: usize,
    pub is_constructor: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JavaClass {
    pub name: String,
    pub package: String,
    pub modifiers: Vec<String>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub methods: Vec<JavaMethod>,
    pub fields: Vec<String>,
    pub annotations: Vec<String>,
}

impl JavaClass {
    pub fn regular_method_count(&self) -> usize {
        self.methods.iter().filter(|m| !m.is_constructor).count()
    }

    pub fn constructor_count(&self) -> usize {
        self.methods.iter().filter(|m| m.is_constructor).count()
    }
}

pub struct JavaParser {
    block_comment_re: Regex,
    line_comment_re: Regex,
    package_re: Regex,
    class_re: Regex,
    method_re: Regex,
    field_re: Regex,
    annotation_re: Regex,
}

/// A class header located in the cleaned source, with its balanced block.
struct ClassHeader {
    name: String,
    extends: Option<String>,
    implements: Vec<String>,
    header_start: usize,
    brace_pos: usize,
    block_end: usize,
}

impl JavaParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            block_comment_re: Regex::new(r"(?s)/\*.*?\*/")?,
            line_comment_re: Regex::new(r"(?m)//[^\n]*")?,
            package_re: Regex::new(r"package\s+([\w.]+);")?,
            class_re: Regex::new(
                r"(?:public\s+)?(?:abstract\s+)?(?:final\s+)?class\s+(\w+)(?:\s+extends\s+(\w+))?(?:\s+implements\s+([\w,\s]+))?\s*\{",
            )?,
            method_re: Regex::new(
                r"(?:@\w+\s*)*(?:public|private|protected)?\s*(?:static\s+)?(?:final\s+)?(?:synchronized\s+)?(?:<[^>]+>\s*)?(\w+|\w+\[\]|\w+<[^>]+>)\s+(\w+)\s*\(([^)]*)\)\s*(?:throws\s+[^{]+)?\s*\{",
            )?,
            field_re: Regex::new(
                r"(?:public|private|protected)?\s*(?:static\s+)?(?:final\s+)?(\w+(?:<[^>]+>)?(?:\[\])?)\s+(\w+)\s*(?:=|;)",
            )?,
            annotation_re: Regex::new(r"@(\w+)")?,
        })
    }

    /// Parse Java source text and return all top-level classes.
    ///
    /// Total over arbitrary input: unmatched braces and malformed
    /// declarations degrade the result, never abort it.
    pub fn parse(&self, code: &str) -> Vec<JavaClass> {
        let package = self.extract_package(code);
        let clean = self.strip_comments(code);

        let headers = self.find_class_headers(&clean);

        let mut classes = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            if is_nested(header, &headers) {
                continue;
            }

            // Class body with nested class bodies blanked out, so nested
            // methods and fields do not leak into this class's lists.
            let block = mask_nested_blocks(&clean, header, &headers, i);

            classes.push(JavaClass {
                name: header.name.clone(),
                package: package.clone(),
                modifiers: self.extract_modifiers(&header_context(&clean, header)),
                extends: header.extends.clone(),
                implements: header.implements.clone(),
                methods: self.extract_methods(&block, &header.name),
                fields: self.extract_fields(&block),
                annotations: self.extract_class_annotations(&clean, header.header_start),
            });
        }

        classes
    }

    fn strip_comments(&self, code: &str) -> String {
        let no_blocks = self.block_comment_re.replace_all(code, "");
        self.line_comment_re.replace_all(&no_blocks, "").into_owned()
    }

    fn extract_package(&self, code: &str) -> String {
        self.package_re
            .captures(code)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    fn find_class_headers(&self, clean: &str) -> Vec<ClassHeader> {
        let mut headers = Vec::new();
        for caps in self.class_re.captures_iter(clean) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            // The pattern ends with the opening brace.
            let brace_pos = whole.end() - 1;
            let block_end = balanced_block_end(clean, brace_pos);

            let implements = caps
                .get(3)
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            headers.push(ClassHeader {
                name: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                extends: caps.get(2).map(|m| m.as_str().to_string()),
                implements,
                header_start: whole.start(),
                brace_pos,
                block_end,
            });
        }
        headers
    }

    fn extract_methods(&self, class_block: &str, class_name: &str) -> Vec<JavaMethod> {
        let mut methods = Vec::new();

        for caps in self.method_re.captures_iter(class_block) {
            let (whole, return_type, name, params) = match (
                caps.get(0),
                caps.get(1),
                caps.get(2),
                caps.get(3),
            ) {
                (Some(w), Some(r), Some(n), Some(p)) => {
                    (w, r.as_str(), n.as_str(), p.as_str())
                }
                _ => continue,
            };

            let parameters: Vec<String> = params
                .split(',')
                .filter_map(|param| {
                    param.split_whitespace().last().map(|p| p.to_string())
                })
                .collect();

            let context_start = clamp_char_boundary(
                class_block,
                whole.start().saturating_sub(MODIFIER_WINDOW),
            );
            let modifiers = self.extract_modifiers(&class_block[context_start..whole.start()]);

            // Heuristic: a method sharing the class name is a constructor.
            // A regular method that happens to carry the class's name is
            // misclassified; that trade-off is accepted.
            let is_constructor = strip_type_markers(name) == strip_type_markers(class_name);

            methods.push(JavaMethod {
                name: name.to_string(),
                return_type: if is_constructor {
                    "void".to_string()
                } else {
                    return_type.to_string()
                },
                parameters,
                modifiers,
                line_number: class_block[..whole.start()].matches('\n').count(),
                is_constructor,
            });
        }

        methods
    }

    fn extract_fields(&self, class_block: &str) -> Vec<String> {
        let mut fields = Vec::new();
        for caps in self.field_re.captures_iter(class_block) {
            if let (Some(ty), Some(name)) = (caps.get(1), caps.get(2)) {
                fields.push(format!("{} {}", ty.as_str(), name.as_str()));
                if fields.len() >= MAX_FIELDS {
                    break;
                }
            }
        }
        fields
    }

    fn extract_modifiers(&self, context: &str) -> Vec<String> {
        MODIFIER_KEYWORDS
            .iter()
            .filter(|m| context.contains(*m))
            .map(|m| m.to_string())
            .collect()
    }

    fn extract_class_annotations(&self, clean: &str, header_start: usize) -> Vec<String> {
        let window_start =
            clamp_char_boundary(clean, header_start.saturating_sub(ANNOTATION_WINDOW));
        let context = &clean[window_start..header_start];

        let mut annotations: Vec<String> = Vec::new();
        for caps in self.annotation_re.captures_iter(context) {
            if let Some(name) = caps.get(1) {
                let name = name.as_str().to_string();
                if !annotations.contains(&name) {
                    annotations.push(name);
                }
            }
        }
        annotations
    }
}

/// Byte index of the `}` closing the block opened at `brace_pos`, tracking
/// nested depth. Unbalanced input runs to the end of the text.
fn balanced_block_end(text: &str, brace_pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = brace_pos;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len().saturating_sub(1)
}

fn is_nested(header: &ClassHeader, headers: &[ClassHeader]) -> bool {
    headers.iter().any(|other| {
        other.header_start < header.header_start
            && header.header_start > other.brace_pos
            && header.header_start < other.block_end
    })
}

/// The class body starting at its opening brace, with every nested class
/// block replaced by whitespace (newlines kept so line offsets hold).
fn mask_nested_blocks(
    clean: &str,
    header: &ClassHeader,
    headers: &[ClassHeader],
    header_idx: usize,
) -> String {
    let start = header.brace_pos;
    let end = (header.block_end + 1).min(clean.len());
    let mut block: Vec<u8> = clean.as_bytes()[start..end].to_vec();

    for (j, nested) in headers.iter().enumerate() {
        if j == header_idx || nested.header_start <= header.brace_pos {
            continue;
        }
        if nested.header_start >= header.block_end {
            continue;
        }
        let from = nested.brace_pos.saturating_sub(start);
        let to = (nested.block_end.saturating_sub(start) + 1).min(block.len());
        for byte in &mut block[from..to] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
    }

    String::from_utf8_lossy(&block).into_owned()
}

/// Context used for class-level modifier extraction: a short window before
/// the header plus the header text itself up to the `class` keyword.
fn header_context(clean: &str, header: &ClassHeader) -> String {
    let window_start = clamp_char_boundary(clean, header.header_start.saturating_sub(50));
    clean[window_start..=header.brace_pos.min(clean.len() - 1)].to_string()
}

fn strip_type_markers(token: &str) -> &str {
    let token = token.split('[').next().unwrap_or(token);
    token.split('<').next().unwrap_or(token)
}

fn clamp_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

// ── Method chunk formatting ──────────────────────────────────────────

fn bar() -> String {
    "=".repeat(70)
}

fn format_signature_line(index: usize, method: &JavaMethod, with_return: bool) -> String {
    let params = method.parameters.join(", ");
    if with_return {
        format!("{index}. {} {}({params})\n", method.return_type, method.name)
    } else {
        format!("{index}. {}({params})\n", method.name)
    }
}

/// Format a class's method index as retrieval chunks.
///
/// The header chunk carries class identity, the constructors block, and —
/// for classes of up to [`METHODS_PER_CHUNK`] regular methods — the full
/// method list inline. Larger classes get one additional chunk per group of
/// [`METHODS_PER_CHUNK`] methods, covering the alphabetically sorted list.
pub fn format_methods_for_chunks(class: &JavaClass) -> Vec<String> {
    let mut constructors: Vec<&JavaMethod> =
        class.methods.iter().filter(|m| m.is_constructor).collect();
    let mut regular: Vec<&JavaMethod> =
        class.methods.iter().filter(|m| !m.is_constructor).collect();
    constructors.sort_by(|a, b| a.name.cmp(&b.name));
    regular.sort_by(|a, b| a.name.cmp(&b.name));

    let mut chunks = Vec::new();

    let mut header = format!("Java Class: {}\n", class.name);
    let package = if class.package.is_empty() {
        "default"
    } else {
        &class.package
    };
    header.push_str(&format!("Package: {package}\n"));

    if let Some(extends) = &class.extends {
        header.push_str(&format!("Extends: {extends}\n"));
    }
    if !class.implements.is_empty() {
        header.push_str(&format!("Implements: {}\n", class.implements.join(", ")));
    }

    header.push_str(&format!("\nTotal Methods: {}\n", regular.len()));
    header.push_str(&format!("Total Constructors: {}\n\n", constructors.len()));

    if !constructors.is_empty() {
        header.push_str(&format!("{}\n", bar()));
        header.push_str(&format!("CONSTRUCTORS ({})\n", constructors.len()));
        header.push_str(&format!("{}\n", bar()));
        for (i, method) in constructors.iter().enumerate() {
            header.push_str(&format_signature_line(i + 1, method, false));
        }
        header.push('\n');
    }

    if !regular.is_empty() && regular.len() <= METHODS_PER_CHUNK {
        header.push_str(&format!("{}\n", bar()));
        header.push_str(&format!("METHODS 1-{} of {}\n", regular.len(), regular.len()));
        header.push_str(&format!("{}\n", bar()));
        for (i, method) in regular.iter().enumerate() {
            header.push_str(&format_signature_line(i + 1, method, true));
        }
        header.push('\n');
    }

    chunks.push(header);

    if regular.len() > METHODS_PER_CHUNK {
        for group_start in (0..regular.len()).step_by(METHODS_PER_CHUNK) {
            let group_end = (group_start + METHODS_PER_CHUNK).min(regular.len());
            let mut chunk = format!(
                "Java Class: {} - Methods {}-{} of {}\n\n",
                class.name,
                group_start + 1,
                group_end,
                regular.len()
            );
            chunk.push_str(&format!("{}\n", bar()));
            chunk.push_str(&format!(
                "METHODS {}-{} of {}\n",
                group_start + 1,
                group_end,
                regular.len()
            ));
            chunk.push_str(&format!("{}\n", bar()));
            for (i, method) in regular[group_start..group_end].iter().enumerate() {
                chunk.push_str(&format_signature_line(group_start + i + 1, method, true));
            }
            chunk.push('\n');
            chunks.push(chunk);
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> JavaParser {
        JavaParser::new().expect("patterns compile")
    }

    #[test]
    fn test_parse_single_class() {
        let code = r#"
package com.example.auth;

import java.util.List;

public class UserService {
    private String name;

    public UserService(String name) {
        this.name = name;
    }

    public String getName() {
        return name;
    }

    private void reset(final String fallback) {
        this.name = fallback;
    }
}
"#;
        let classes = parser().parse(code);
        assert_eq!(classes.len(), 1);

        let class = &classes[0];
        assert_eq!(class.name, "UserService");
        assert_eq!(class.package, "com.example.auth");
        assert_eq!(class.methods.len(), 3);
        assert_eq!(class.constructor_count(), 1);
        assert_eq!(class.regular_method_count(), 2);

        let ctor = class.methods.iter().find(|m| m.is_constructor).unwrap();
        assert_eq!(ctor.name, "UserService");
        assert_eq!(ctor.return_type, "void", "constructor gets the void sentinel");
        assert_eq!(ctor.parameters, vec!["name"]);

        let reset = class.methods.iter().find(|m| m.name == "reset").unwrap();
        assert_eq!(
            reset.parameters,
            vec!["fallback"],
            "parameter name is the last token of the declaration"
        );
    }

    #[test]
    fn test_extends_and_implements() {
        let code = "public class Worker extends Base implements Runnable, Closeable {\n}\n";
        let classes = parser().parse(code);
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].extends.as_deref(), Some("Base"));
        assert_eq!(classes[0].implements, vec!["Runnable", "Closeable"]);
    }

    #[test]
    fn test_two_top_level_classes() {
        let code = r#"
class First {
    void alpha() {}
}

class Second {
    void beta() {}
    void gamma() {}
}
"#;
        let classes = parser().parse(code);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].name, "First");
        assert_eq!(classes[0].methods.len(), 1);
        assert_eq!(classes[1].name, "Second");
        assert_eq!(classes[1].methods.len(), 2);
    }

    #[test]
    fn test_nested_class_methods_do_not_leak() {
        let code = r#"
public class Outer {
    public void outerOne() {
        int x = 1;
    }

    class Inner {
        public void innerOne() {}
        public void innerTwo() {}
    }

    public void outerTwo() {}
}
"#;
        let classes = parser().parse(code);
        assert_eq!(classes.len(), 1, "only the top-level class is returned");

        let outer = &classes[0];
        assert_eq!(outer.name, "Outer");
        let names: Vec<&str> = outer.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["outerOne", "outerTwo"]);
    }

    #[test]
    fn test_constructor_heuristic_adversarial() {
        // A method named after a *different* class must not be flagged.
        let code = r#"
class Helper {
    void assist() {}
}

class Widget {
    public void Helper() {}

    public Widget() {}
}
"#;
        let classes = parser().parse(code);
        let widget = classes.iter().find(|c| c.name == "Widget").unwrap();

        let helper_method = widget.methods.iter().find(|m| m.name == "Helper").unwrap();
        assert!(
            !helper_method.is_constructor,
            "method named after another class is not a constructor"
        );

        let ctor = widget.methods.iter().find(|m| m.name == "Widget").unwrap();
        assert!(ctor.is_constructor);
    }

    #[test]
    fn test_constructor_heuristic_known_misfire() {
        // A regular method sharing its own class's name is misclassified;
        // the approximation is accepted, not corrected.
        let code = r#"
class Echo {
    public String Echo(String input) {
        return input;
    }
}
"#;
        let classes = parser().parse(code);
        let method = &classes[0].methods[0];
        assert!(method.is_constructor);
        assert_eq!(method.return_type, "void");
    }

    #[test]
    fn test_comments_do_not_contaminate() {
        let code = r#"
public class Quiet {
    // public void phantomLine() {}
    /* public void phantomBlock() { stuff(); } */
    public void real() {}
}
"#;
        let classes = parser().parse(code);
        assert_eq!(classes[0].methods.len(), 1);
        assert_eq!(classes[0].methods[0].name, "real");
    }

    #[test]
    fn test_class_annotations() {
        let code = r#"
@Service
@Deprecated
public class Tagged {
    void run() {}
}
"#;
        let classes = parser().parse(code);
        assert_eq!(classes[0].annotations, vec!["Service", "Deprecated"]);
    }

    #[test]
    fn test_fields_capped_at_twenty() {
        let mut code = String::from("class Wide {\n");
        for i in 0..30 {
            code.push_str(&format!("    private int field{i};\n"));
        }
        code.push_str("}\n");

        let classes = parser().parse(&code);
        assert_eq!(classes[0].fields.len(), 20);
        assert_eq!(classes[0].fields[0], "int field0");
    }

    #[test]
    fn test_malformed_input_is_total() {
        for code in [
            "",
            "class {{{{",
            "public class Broken {",
            "}}} class ) ( {",
            "こんにちは class 世界 {",
        ] {
            // Must not panic; result content is best-effort.
            let _ = parser().parse(code);
        }
    }

    fn class_with_methods(count: usize) -> JavaClass {
        JavaClass {
            name: "Big".to_string(),
            package: "com.example".to_string(),
            modifiers: vec!["public".to_string()],
            extends: None,
            implements: vec![],
            methods: (0..count)
                .map(|i| JavaMethod {
                    name: format!("method{i:02}"),
                    return_type: "void".to_string(),
                    parameters: vec![],
                    modifiers: vec![],
                    line_number: i,
                    is_constructor: false,
                })
                .collect(),
            fields: vec![],
            annotations: vec![],
        }
    }

    #[test]
    fn test_format_small_class_single_chunk() {
        let class = class_with_methods(3);
        let chunks = format_methods_for_chunks(&class);
        assert_eq!(chunks.len(), 1, "3 methods fit in the header chunk");
        assert!(chunks[0].contains("METHODS 1-3 of 3"));
    }

    #[test]
    fn test_format_large_class_grouped() {
        let class = class_with_methods(25);
        let chunks = format_methods_for_chunks(&class);
        // Header plus ceil(25 / 20) group chunks
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].contains("METHODS 1-20 of 25"));
        assert!(chunks[2].contains("METHODS 21-25 of 25"));
        assert!(chunks[0].contains("Total Methods: 25"));
    }

    #[test]
    fn test_format_exact_group_boundary() {
        let class = class_with_methods(40);
        let chunks = format_methods_for_chunks(&class);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[2].contains("METHODS 21-40 of 40"));
    }

    #[test]
    fn test_format_constructors_block() {
        let mut class = class_with_methods(2);
        class.methods.push(JavaMethod {
            name: "Big".to_string(),
            return_type: "void".to_string(),
            parameters: vec!["size".to_string()],
            modifiers: vec![],
            line_number: 0,
            is_constructor: true,
        });
        let chunks = format_methods_for_chunks(&class);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("CONSTRUCTORS (1)"));
        assert!(chunks[0].contains("1. Big(size)"));
        assert!(chunks[0].contains("Total Constructors: 1"));
    }
}
