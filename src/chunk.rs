use crate::formats::{Chunk, ChunkKind, ChunkMetadata, PersistedDocument};

/// Splits a persisted document into embedding-ready chunks: the title,
/// each section heading, each body paragraph, and each code block with
/// its contextual paragraph folded in.
pub fn prepare_chunks(document: &PersistedDocument) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    let base_metadata = ChunkMetadata {
        doc_id: document.id.clone(),
        subdomain: document.subdomain.clone(),
        url: document.source.url.clone(),
        section: None,
        language: None,
        filename: None,
    };

    if !document.content.title.is_empty() {
        chunks.push(Chunk {
            text: document.content.title.clone(),
            kind: ChunkKind::Title,
            metadata: base_metadata.clone(),
        });
    }

    for section in &document.content.sections {
        if !section.heading.is_empty() {
            chunks.push(Chunk {
                text: section.heading.clone(),
                kind: ChunkKind::Heading,
                metadata: base_metadata.clone(),
            });
        }

        for paragraph in section.body.split('\n') {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            chunks.push(Chunk {
                text: paragraph.to_owned(),
                kind: ChunkKind::Content,
                metadata: ChunkMetadata {
                    section: Some(section.heading.clone()),
                    ..base_metadata.clone()
                },
            });
        }
    }

    for code_block in &document.content.code_blocks {
        if code_block.code.is_empty() {
            continue;
        }
        chunks.push(Chunk {
            text: format!(
                "Code example ({}): {}\n{}",
                code_block.language, code_block.context, code_block.code
            ),
            kind: ChunkKind::Code,
            metadata: ChunkMetadata {
                language: Some(code_block.language.clone()),
                filename: (!code_block.filename.is_empty())
                    .then(|| code_block.filename.clone()),
                ..base_metadata.clone()
            },
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::formats::{CodeBlock, NormalizedDocument, Section};
    use url::Url;

    fn document() -> PersistedDocument {
        let normalized = NormalizedDocument {
            title: "Installing".to_owned(),
            sections: vec![Section {
                heading: "Setup".to_owned(),
                body: "First line.\nSecond line.".to_owned(),
                platform_variants: Default::default(),
            }],
            code_blocks: vec![CodeBlock {
                language: "python".to_owned(),
                code: "print(1)".to_owned(),
                context: "Run it:".to_owned(),
                filename: "demo.py".to_owned(),
            }],
        };
        assemble(
            normalized,
            &Url::parse("https://docs.example/a").expect("url"),
            "ros2",
            "humble",
        )
    }

    #[test]
    fn chunks_cover_title_heading_paragraphs_and_code() {
        let chunks = prepare_chunks(&document());
        let kinds: Vec<ChunkKind> = chunks.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                ChunkKind::Title,
                ChunkKind::Heading,
                ChunkKind::Content,
                ChunkKind::Content,
                ChunkKind::Code,
            ]
        );
    }

    #[test]
    fn content_chunks_carry_their_section_heading() {
        let chunks = prepare_chunks(&document());
        let content: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Content)
            .collect();
        assert_eq!(content[0].text, "First line.");
        assert_eq!(content[0].metadata.section.as_deref(), Some("Setup"));
    }

    #[test]
    fn code_chunk_folds_in_language_and_context() {
        let chunks = prepare_chunks(&document());
        let code = chunks
            .iter()
            .find(|c| c.kind == ChunkKind::Code)
            .expect("code chunk");
        assert_eq!(code.text, "Code example (python): Run it:\nprint(1)");
        assert_eq!(code.metadata.language.as_deref(), Some("python"));
        assert_eq!(code.metadata.filename.as_deref(), Some("demo.py"));
    }

    #[test]
    fn empty_title_produces_no_title_chunk() {
        let mut doc = document();
        doc.content.title.clear();
        let chunks = prepare_chunks(&doc);
        assert!(chunks.iter().all(|c| c.kind != ChunkKind::Title));
    }
}
