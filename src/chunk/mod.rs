//! Chunk construction.
//!
//! Turns a source file and its structural summary into the ordered sequence
//! of retrieval-ready chunks: one semantic summary chunk, per-element chunks
//! (Java method indexes and class info, XML element cards), then a generic
//! overlapped split of the raw text so nothing is lost when structural
//! extraction comes up empty.

pub mod splitter;

use crate::extract::{
    FileStructure, JavaClass, extract_structure, format_methods_for_chunks, language_of,
};
pub use splitter::TextSplitter;

/// How many XML element types get their own chunk.
const MAX_XML_ELEMENT_CHUNKS: usize = 10;

/// How many entries of each list the summary chunk mentions.
const SUMMARY_LIST_LIMIT: usize = 5;

/// Chunk type tag, persisted in store metadata and used to weight or filter
/// retrieval results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    SemanticSummary,
    JavaClassMethods,
    JavaClassInfo,
    XmlElement,
    CodeChunk,
    DocChunk,
}

impl ChunkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SemanticSummary => "semantic_summary",
            Self::JavaClassMethods => "java_class_methods",
            Self::JavaClassInfo => "java_class_info",
            Self::XmlElement => "xml_element",
            Self::CodeChunk => "code_chunk",
            Self::DocChunk => "doc_chunk",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "semantic_summary" => Some(Self::SemanticSummary),
            "java_class_methods" => Some(Self::JavaClassMethods),
            "java_class_info" => Some(Self::JavaClassInfo),
            "xml_element" => Some(Self::XmlElement),
            "code_chunk" => Some(Self::CodeChunk),
            "doc_chunk" => Some(Self::DocChunk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMetadata {
    pub source: String,
    pub language: String,
    pub kind: ChunkKind,
    pub class_name: Option<String>,
    pub chunk_index: Option<usize>,
    pub element_name: Option<String>,
    pub element_count: Option<usize>,
}

impl ChunkMetadata {
    fn new(source: &str, language: &str, kind: ChunkKind) -> Self {
        Self {
            source: source.to_string(),
            language: language.to_string(),
            kind,
            class_name: None,
            chunk_index: None,
            element_name: None,
            element_count: None,
        }
    }
}

/// A bounded text payload plus metadata: the unit persisted to and
/// retrieved from the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Build the full chunk sequence for a source file.
///
/// A file whose structural extraction fails entirely still reaches the
/// generic split, so no file silently drops out of the index.
#[must_use]
pub fn build_chunks(file_path: &str, code: &str) -> Vec<Chunk> {
    let language = language_of(file_path);
    let structure = extract_structure(code, file_path);

    let mut chunks = Vec::new();

    chunks.push(Chunk {
        content: summarize(file_path, &language, &structure),
        metadata: ChunkMetadata::new(file_path, &language, ChunkKind::SemanticSummary),
    });

    chunks.extend(element_chunks(file_path, &language, &structure));

    let splitter = TextSplitter::for_code(&language);
    for content in splitter.split(code) {
        chunks.push(Chunk {
            content,
            metadata: ChunkMetadata::new(file_path, &language, ChunkKind::CodeChunk),
        });
    }

    chunks
}

/// Build chunks for a documentation file (already cleaned to plain text).
#[must_use]
pub fn build_doc_chunks(file_path: &str, text: &str) -> Vec<Chunk> {
    let language = language_of(file_path);
    let splitter = TextSplitter::for_docs();
    splitter
        .split(text)
        .into_iter()
        .map(|content| Chunk {
            content,
            metadata: ChunkMetadata::new(file_path, &language, ChunkKind::DocChunk),
        })
        .collect()
}

// ── Summary chunk ────────────────────────────────────────────────────

fn join_first<T, F: Fn(&T) -> String>(items: &[T], f: F) -> String {
    items
        .iter()
        .take(SUMMARY_LIST_LIMIT)
        .map(|i| f(i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn summarize(file_path: &str, language: &str, structure: &FileStructure) -> String {
    let mut summary = format!("File: {file_path}\nLanguage: {language}\n\n");

    match structure {
        FileStructure::Java(java) => {
            if let Some(package) = &java.package {
                summary.push_str(&format!("Package: {package}\n"));
            }
            if !java.imports.is_empty() {
                summary.push_str(&format!(
                    "Imports: {}\n",
                    join_first(&java.imports, |i| i.clone())
                ));
            }
            if !java.classes.is_empty() {
                summary.push_str(&format!(
                    "Classes: {}\n",
                    java.classes
                        .iter()
                        .map(|c| c.name.clone())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            let annotations: Vec<String> = java
                .classes
                .iter()
                .flat_map(|c| c.annotations.iter().cloned())
                .collect();
            if !annotations.is_empty() {
                summary.push_str(&format!(
                    "Annotations used: {}\n",
                    join_first(&annotations, |a| a.clone())
                ));
            }
        }
        FileStructure::Xml(xml) => {
            if let Some(root) = &xml.root_element {
                summary.push_str(&format!("Root element: <{root}>\n"));
            }
            if !xml.namespaces.is_empty() {
                summary.push_str(&format!("Namespaces: {}\n", xml.namespaces.join(", ")));
            }
            if !xml.elements.is_empty() {
                summary.push_str(&format!(
                    "Main elements: {}\n",
                    join_first(&xml.elements, |e| e.name.clone())
                ));
            }
            if !xml.attributes.is_empty() {
                summary.push_str(&format!(
                    "Attributes used: {}\n",
                    join_first(&xml.attributes, |a| a.clone())
                ));
            }
        }
        FileStructure::Python(py) => {
            if !py.functions.is_empty() {
                summary.push_str(&format!(
                    "Functions: {}\n",
                    join_first(&py.functions, |f| f.name.clone())
                ));
            }
            if !py.classes.is_empty() {
                summary.push_str(&format!(
                    "Classes: {}\n",
                    join_first(&py.classes, |c| c.name.clone())
                ));
            }
        }
        FileStructure::JavaScript(js) => {
            if !js.functions.is_empty() {
                summary.push_str(&format!(
                    "Functions: {}\n",
                    join_first(&js.functions, |f| f.name.clone())
                ));
            }
            if !js.classes.is_empty() {
                summary.push_str(&format!(
                    "Classes: {}\n",
                    join_first(&js.classes, |c| c.name.clone())
                ));
            }
            if !js.exports.is_empty() {
                summary.push_str(&format!(
                    "Exports: {}\n",
                    join_first(&js.exports, |e| e.clone())
                ));
            }
        }
        FileStructure::Generic(generic) => {
            summary.push_str(&format!(
                "Estimated functions: {}\nEstimated classes: {}\n",
                generic.estimated_functions, generic.estimated_classes
            ));
        }
    }

    summary
}

// ── Element chunks ───────────────────────────────────────────────────

fn element_chunks(file_path: &str, language: &str, structure: &FileStructure) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    match structure {
        FileStructure::Java(java) => {
            for class in &java.classes {
                if !class.methods.is_empty() {
                    for (chunk_index, content) in
                        format_methods_for_chunks(class).into_iter().enumerate()
                    {
                        let mut metadata =
                            ChunkMetadata::new(file_path, language, ChunkKind::JavaClassMethods);
                        metadata.class_name = Some(class.name.clone());
                        metadata.chunk_index = Some(chunk_index);
                        chunks.push(Chunk { content, metadata });
                    }
                }

                // A class with no methods still gets an info chunk so the
                // class itself stays discoverable.
                let mut metadata =
                    ChunkMetadata::new(file_path, language, ChunkKind::JavaClassInfo);
                metadata.class_name = Some(class.name.clone());
                chunks.push(Chunk {
                    content: class_info_text(class),
                    metadata,
                });
            }
        }
        FileStructure::Xml(xml) => {
            for element in xml.elements.iter().take(MAX_XML_ELEMENT_CHUNKS) {
                let mut content = format!(
                    "XML Element: <{}>\nOccurrences: {}\nFile: {file_path}\n",
                    element.name, element.count
                );
                if !xml.namespaces.is_empty() {
                    content.push_str(&format!(
                        "File namespaces: {}\n",
                        xml.namespaces.join(", ")
                    ));
                }

                let mut metadata = ChunkMetadata::new(file_path, language, ChunkKind::XmlElement);
                metadata.element_name = Some(element.name.clone());
                metadata.element_count = Some(element.count);
                chunks.push(Chunk { content, metadata });
            }
        }
        _ => {}
    }

    chunks
}

fn class_info_text(class: &JavaClass) -> String {
    let mut content = format!("Java Class: {}\n", class.name);
    let package = if class.package.is_empty() {
        "default"
    } else {
        &class.package
    };
    content.push_str(&format!("Package: {package}\n"));
    if let Some(extends) = &class.extends {
        content.push_str(&format!("Extends: {extends}\n"));
    }
    if !class.implements.is_empty() {
        content.push_str(&format!("Implements: {}\n", class.implements.join(", ")));
    }
    content.push_str(&format!("\nMethods: {}\n", class.regular_method_count()));
    content.push_str(&format!("Constructors: {}\n", class.constructor_count()));
    content
}
