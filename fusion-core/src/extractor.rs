//! # Extrator Baseado em Tags
//!
//! Especialização do [`crate::aligner`] para motores que embrulham as menções em
//! marcação inline, por exemplo:
//!
//! ```text
//! original:     Victor Hugo est né à Besançon.
//! transformado: <pers>Victor Hugo</pers> est ne a <loc>Besancon</loc>.
//! ```
//!
//! A camada entra no laço do alinhador sempre que o texto transformado mostra `<`:
//!
//! - **Abertura** `<loc>`: empilha `(nome, tipo, i)`. O tipo vem da tabela do perfil;
//!   tags ignoradas empilham tipo nulo; nome desconhecido é [`Error::UnknownTag`].
//! - **Fechamento** `</loc>`: desempilha e, se o tipo não for nulo, gera a menção
//!   `[início, i)` com correção de span. Nome diferente da abertura só gera aviso:
//!   motores às vezes trocam o par sem estragar os limites.
//! - **Intervalos** `<date>de <range>1914-1918</range></date>`: a menção de data que
//!   envolve o intervalo vira só o texto do intervalo, quebrado nos separadores,
//!   uma menção por pedaço (`1914`, `1918`). O resto da data (`de`) é descartado.
//!
//! Declarações (`<?xml …?>`), comentários (`<!-- … -->`) e tags auto-fechadas
//! (`<br/>`) são consumidas sem efeito.

use regex::Regex;
use tracing::{debug, warn};

use crate::aligner::{divergence, reconcile, AlignmentCursor, MarkupLayer, OpenTag};
use crate::entity::EntityType;
use crate::error::{Error, Result};
use crate::profile::{EngineProfile, TagKind};
use crate::span::{build_span, correct_span, SpanSet};
use crate::text::{context_window, CONTEXT_RADIUS};

/// Forma de uma tag lida entre `<` e `>`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParsedTag<'a> {
    Opening(&'a str),
    Closing(&'a str),
    Skip,
}

fn parse_tag(body: &str) -> ParsedTag<'_> {
    if body.starts_with('?') || body.starts_with('!') {
        return ParsedTag::Skip;
    }
    if let Some(rest) = body.strip_prefix('/') {
        return ParsedTag::Closing(first_word(rest));
    }
    if body.trim_end().ends_with('/') {
        return ParsedTag::Skip;
    }
    ParsedTag::Opening(first_word(body))
}

/// Nome da tag: primeira palavra do corpo (descarta atributos).
fn first_word(body: &str) -> &str {
    body.split_whitespace().next().unwrap_or("")
}

struct TagExtractor<'p> {
    profile: &'p EngineProfile,
    range_piece: Regex,
    spans: SpanSet,
}

impl<'p> TagExtractor<'p> {
    fn new(profile: &'p EngineProfile) -> Result<Self> {
        let pattern = if profile.range_separators.is_empty() {
            "(?s).+".to_string()
        } else {
            format!("[^{}]+", regex::escape(&profile.range_separators))
        };
        let range_piece = Regex::new(&pattern)
            .map_err(|e| Error::config(format!("separadores de intervalo inválidos: {e}")))?;

        Ok(Self {
            profile,
            range_piece,
            spans: SpanSet::new(profile.engine.clone()),
        })
    }

    fn open(&mut self, name: &str, cursor: &mut AlignmentCursor, transformed: &str, tag_pos: usize) -> Result<()> {
        let entity_type = match self.profile.resolve_tag(name) {
            TagKind::Typed(t) => Some(t),
            TagKind::Ignored | TagKind::Range => None,
            TagKind::Unknown => match self.profile.empty_tag_type {
                Some(t) if name.is_empty() => {
                    warn!(
                        engine = %self.profile.engine,
                        context = %context_window(transformed, tag_pos, CONTEXT_RADIUS),
                        "tag vazia, assumindo {t}"
                    );
                    Some(t)
                }
                _ => {
                    return Err(Error::UnknownTag {
                        tag: name.to_string(),
                        position: tag_pos,
                        context: context_window(transformed, tag_pos, CONTEXT_RADIUS),
                    })
                }
            },
        };

        cursor.stack.push(OpenTag {
            name: name.to_string(),
            entity_type,
            start: cursor.i,
            ranges: Vec::new(),
        });
        Ok(())
    }

    fn close(
        &mut self,
        name: &str,
        cursor: &mut AlignmentCursor,
        original: &str,
        transformed: &str,
        tag_pos: usize,
    ) -> Result<()> {
        let Some(open) = cursor.stack.pop() else {
            return Err(divergence(
                original,
                transformed,
                cursor.i,
                tag_pos,
                format!("tag </{name}> fechada sem abertura"),
            ));
        };

        if !open.name.eq_ignore_ascii_case(name) {
            warn!(
                engine = %self.profile.engine,
                opened = %open.name,
                closed = %name,
                context = %context_window(transformed, tag_pos, CONTEXT_RADIUS),
                "tag de fechamento diferente da tag de abertura"
            );
        }

        if self.profile.is_range_tag(&open.name) {
            match cursor.stack.iter_mut().rev().find(|t| t.entity_type.is_some()) {
                Some(outer) => outer.ranges.push((open.start, cursor.i)),
                None => debug!(engine = %self.profile.engine, "intervalo fora de tag tipada, ignorado"),
            }
        }

        let Some(entity_type) = open.entity_type else {
            return Ok(());
        };
        if open.ranges.is_empty() {
            return self.emit(entity_type, open.start, cursor.i, original);
        }
        // texto da menção fora dos intervalos (ex: "de" em `<date>de <range>…`) é descartado
        for (start, end) in open.ranges {
            self.emit_range(entity_type, start, end, original)?;
        }
        Ok(())
    }

    fn emit(&mut self, entity_type: EntityType, start: usize, end: usize, original: &str) -> Result<()> {
        if start >= end {
            warn!(engine = %self.profile.engine, position = start, "menção {entity_type} vazia no texto original, descartada");
            return Ok(());
        }
        self.push_corrected(entity_type, start, end, original)
    }

    /// Uma menção por pedaço do intervalo, separado pelos `range_separators`.
    fn emit_range(&mut self, entity_type: EntityType, start: usize, end: usize, original: &str) -> Result<()> {
        if start >= end {
            warn!(engine = %self.profile.engine, position = start, "intervalo {entity_type} vazio no texto original, descartado");
            return Ok(());
        }

        let pieces: Vec<(usize, usize)> = self
            .range_piece
            .find_iter(&original[start..end])
            .map(|m| (start + m.start(), start + m.end()))
            .collect();
        for (s, e) in pieces {
            self.push_corrected(entity_type, s, e, original)?;
        }
        Ok(())
    }

    fn push_corrected(&mut self, entity_type: EntityType, start: usize, end: usize, original: &str) -> Result<()> {
        let raw = build_span(entity_type, start, end, self.profile.engine.clone(), original)?;
        match correct_span(&raw, original) {
            Ok(span) => self.spans.push(span),
            Err(e) => warn!(engine = %self.profile.engine, "menção descartada: {e}"),
        }
        Ok(())
    }
}

impl MarkupLayer for TagExtractor<'_> {
    fn starts_markup(&self, c: char) -> bool {
        c == '<'
    }

    fn consume(&mut self, cursor: &mut AlignmentCursor, original: &str, transformed: &str) -> Result<()> {
        let tag_pos = cursor.j;
        let body_start = tag_pos + 1;
        let close = transformed[body_start..]
            .find('>')
            .map(|k| body_start + k)
            .ok_or_else(|| divergence(original, transformed, cursor.i, tag_pos, "tag sem '>'"))?;

        // a marcação não tem correspondente no original: só `j` anda
        cursor.move_to(cursor.i, close + 1);

        match parse_tag(&transformed[body_start..close]) {
            ParsedTag::Skip => Ok(()),
            ParsedTag::Opening(name) => self.open(name, cursor, transformed, tag_pos),
            ParsedTag::Closing(name) => self.close(name, cursor, original, transformed, tag_pos),
        }
    }
}

/// Extrai as menções marcadas em `transformed`, em coordenadas de `original`.
///
/// Qualquer [`Error::Alignment`] ou [`Error::UnknownTag`] descarta a contribuição
/// inteira deste motor; nada é compartilhado com outros motores.
pub fn extract_tagged(original: &str, transformed: &str, profile: &EngineProfile) -> Result<SpanSet> {
    let mut layer = TagExtractor::new(profile)?;
    reconcile(original, transformed, profile, AlignmentCursor::new(), &mut layer)?;
    debug!(engine = %profile.engine, mentions = layer.spans.len(), "extração concluída");
    Ok(layer.spans)
}
